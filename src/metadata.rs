//! Caption resolution.
//!
//! Each source image gets one caption, reused for all of its variants. The
//! first available source wins:
//!
//! 1. **Sidecar**: a text file with the same stem as the image.
//!    `IMG_0042.txt` alongside `IMG_0042.jpg`. Used as written, minus the
//!    trailing line ending.
//! 2. **Default**: `"portrait photo of {subject} {class_name}, best quality"`.
//!
//! An empty sidecar is still a sidecar: the image gets an empty caption.

use std::path::Path;

/// Read the sidecar caption for an image, if the file exists.
pub fn read_sidecar(image_path: &Path) -> Option<String> {
    let sidecar = image_path.with_extension("txt");
    let content = std::fs::read_to_string(sidecar).ok()?;
    Some(content.trim_end_matches(['\n', '\r']).to_string())
}

pub fn default_caption(subject: &str, class_name: &str) -> String {
    format!("portrait photo of {subject} {class_name}, best quality")
}

/// Sidecar caption, falling back to [`default_caption`].
pub fn resolve_caption(image_path: &Path, subject: &str, class_name: &str) -> String {
    read_sidecar(image_path).unwrap_or_else(|| default_caption(subject, class_name))
}
