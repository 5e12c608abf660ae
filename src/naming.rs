//! Deterministic names for the produced dataset.
//!
//! Every variant lands at
//!
//! ```text
//! {output}/img/{repeats}_{subject} {class}/{subject} ({counter}.{local}).png
//! {output}/img/{repeats}_{subject} {class}/{subject} ({counter}.{local}).txt
//! ```
//!
//! `counter` is the 1-based index of the source image in the batch and
//! `local` the 1-based index of the variant within that image; both are
//! zero-padded to [`COUNTER_WIDTH`] digits. The `{repeats}_` folder prefix is
//! the convention kohya-style trainers use to read the repeat count.
//!
//! [`parse_variant_file_name`] is the inverse of [`variant_file_stem`] and
//! backs listing and deleting produced items.

use serde::Serialize;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Zero-padding width for both counters in a variant id.
pub const COUNTER_WIDTH: usize = 4;

#[derive(Error, Debug)]
pub enum NamingError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("Not a dataset image: {0}")]
    NotAVariant(PathBuf),
}

/// `"{repeats}_{subject} {class_name}"`
pub fn subject_folder_name(repeats: u32, subject: &str, class_name: &str) -> String {
    format!("{repeats}_{subject} {class_name}")
}

/// `{output}/img/{repeats}_{subject} {class_name}`
pub fn subject_folder(output: &Path, repeats: u32, subject: &str, class_name: &str) -> PathBuf {
    output
        .join("img")
        .join(subject_folder_name(repeats, subject, class_name))
}

/// `"{counter:04}.{local:04}"`
pub fn variant_id(counter: u32, local: u32) -> String {
    format!(
        "{counter:0width$}.{local:0width$}",
        width = COUNTER_WIDTH
    )
}

/// `"{subject} ({variant_id})"`, without extension.
pub fn variant_file_stem(subject: &str, counter: u32, local: u32) -> String {
    format!("{subject} ({})", variant_id(counter, local))
}

/// One produced image/caption pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DatasetItem {
    pub image_path: PathBuf,
    pub caption_path: PathBuf,
}

impl DatasetItem {
    pub fn new(folder: &Path, subject: &str, counter: u32, local: u32) -> Self {
        let stem = variant_file_stem(subject, counter, local);
        Self {
            image_path: folder.join(format!("{stem}.png")),
            caption_path: folder.join(format!("{stem}.txt")),
        }
    }

    /// The pair that `image_path` belongs to.
    pub fn from_image_path(image_path: &Path) -> Self {
        Self {
            image_path: image_path.to_path_buf(),
            caption_path: image_path.with_extension("txt"),
        }
    }

    /// Delete both files of the pair.
    ///
    /// The image must exist; a caption that is already gone is not an error.
    pub fn remove(&self) -> Result<(), NamingError> {
        std::fs::remove_file(&self.image_path)?;
        match std::fs::remove_file(&self.caption_path) {
            Err(err) if err.kind() != io::ErrorKind::NotFound => Err(err.into()),
            _ => Ok(()),
        }
    }
}

/// Result of parsing a file name like `ohwx (0003.0012).png`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedVariant {
    pub subject: String,
    pub counter: u32,
    pub local: u32,
}

/// Parse a variant image file name produced by [`DatasetItem::new`].
///
/// - `"ohwx (0001.0002).png"` → subject="ohwx", counter=1, local=2
/// - `"my subject (0012.0001).png"` → subject="my subject", counter=12, local=1
/// - `"ohwx (0001.0002).txt"` → None (captions are not variants)
/// - `"IMG_0001.png"` → None
pub fn parse_variant_file_name(name: &str) -> Option<ParsedVariant> {
    let stem = name.strip_suffix(".png")?;
    let (subject, rest) = stem.rsplit_once(" (")?;
    let id = rest.strip_suffix(')')?;
    let (counter, local) = id.split_once('.')?;
    if subject.is_empty() || !is_digits(counter) || !is_digits(local) {
        return None;
    }
    Some(ParsedVariant {
        subject: subject.to_string(),
        counter: counter.parse().ok()?,
        local: local.parse().ok()?,
    })
}

fn is_digits(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

/// A variant found on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListedItem {
    pub variant: ParsedVariant,
    pub item: DatasetItem,
}

/// List the variants in one subject folder, ordered by `(counter, local)`.
pub fn list_items(folder: &Path) -> Result<Vec<ListedItem>, NamingError> {
    let mut items = Vec::new();
    for entry in std::fs::read_dir(folder)? {
        let path = entry?.path();
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if let Some(variant) = parse_variant_file_name(name) {
            items.push(ListedItem {
                variant,
                item: DatasetItem::from_image_path(&path),
            });
        }
    }
    items.sort_by_key(|listed| (listed.variant.counter, listed.variant.local));
    Ok(items)
}

/// Delete the pair for `image_path`, refusing files that are not variants.
pub fn remove_item(image_path: &Path) -> Result<DatasetItem, NamingError> {
    let is_variant = image_path
        .file_name()
        .and_then(|n| n.to_str())
        .and_then(parse_variant_file_name)
        .is_some();
    if !is_variant {
        return Err(NamingError::NotAVariant(image_path.to_path_buf()));
    }
    let item = DatasetItem::from_image_path(image_path);
    item.remove()?;
    Ok(item)
}
