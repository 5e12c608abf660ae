//! Source folder scanning.
//!
//! Finds the photos a batch will prepare. Only the top level of the source
//! folder is considered:
//!
//! ```text
//! photos/
//! ├── config.toml          # Dataset configuration (optional)
//! ├── IMG_0001.jpg         # counter 1
//! ├── IMG_0001.txt         # Caption sidecar for IMG_0001 (optional)
//! ├── IMG_0002.png         # counter 2
//! ├── notes.md             # Ignored: not an image
//! └── rejects/             # Ignored: subdirectories are not scanned
//!     └── IMG_0003.jpg
//! ```
//!
//! Images are ordered by file name and numbered from 1. That number is the
//! `counter` half of every variant id, so the same folder always produces the
//! same names. Hidden files are skipped. Symlinked photos are followed; a
//! link whose target is missing is logged and skipped.

use crate::imaging::is_supported_image;
use crate::prepare::BatchJob;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to read source folder: {0}")]
    Walk(#[from] walkdir::Error),
    #[error("Source folder does not exist or is not a directory: {0}")]
    NotADirectory(PathBuf),
    #[error("No supported images found in {0}")]
    NoImages(PathBuf),
}

/// List the supported images directly inside `root` as numbered jobs.
pub fn scan_sources(root: &Path) -> Result<Vec<BatchJob>, ScanError> {
    if !root.is_dir() {
        return Err(ScanError::NotADirectory(root.to_path_buf()));
    }

    let mut paths = Vec::new();
    for entry in WalkDir::new(root)
        .min_depth(1)
        .max_depth(1)
        .follow_links(true)
        .sort_by_file_name()
    {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) if err.depth() > 0 => {
                warn!(error = %err, "skipping unreadable source entry");
                continue;
            }
            Err(err) => return Err(err.into()),
        };
        let hidden = entry.file_name().to_string_lossy().starts_with('.');
        if hidden || !entry.file_type().is_file() || !is_supported_image(entry.path()) {
            continue;
        }
        paths.push(entry.into_path());
    }

    if paths.is_empty() {
        return Err(ScanError::NoImages(root.to_path_buf()));
    }
    debug!(images = paths.len(), root = %root.display(), "scanned source folder");

    Ok(paths
        .into_iter()
        .zip(1u32..)
        .map(|(source_path, counter)| BatchJob::new(source_path, counter))
        .collect())
}
