//! High-level image operations.
//!
//! These functions combine the crop geometry with codec and detector calls.
//! A [`SourceImage`] is decoded and run through face detection once; each
//! [`write_variant`] call then cuts one output size at one zoom level from it
//! and writes the image/caption pair.

use super::backend::{BackendError, Dimensions, ImageBackend, SourcePixels};
use super::calculations::{CropError, compute_crop_box};
use crate::detection::{DetectionError, DetectionOutcome, SharedDetector};
use crate::naming::DatasetItem;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PrepareError {
    #[error("Face detection unavailable: {0}")]
    DetectionUnavailable(#[from] DetectionError),
    #[error("Image codec failed: {0}")]
    Codec(#[from] BackendError),
    #[error("Filesystem error: {0}")]
    Filesystem(#[from] std::io::Error),
    #[error(transparent)]
    InvalidDimensions(#[from] CropError),
}

/// Result type for image operations.
pub type Result<T> = std::result::Result<T, PrepareError>;

/// A decoded source image together with its face detection outcome.
pub struct SourceImage {
    path: PathBuf,
    pixels: SourcePixels,
    detection: DetectionOutcome,
}

impl SourceImage {
    /// Decode `path` and run face detection on it.
    pub fn load(
        backend: &impl ImageBackend,
        detector: &SharedDetector,
        path: &Path,
    ) -> Result<Self> {
        let pixels = backend.decode(path)?;
        let detection = detector.detect(&pixels)?;
        Ok(Self {
            path: path.to_path_buf(),
            pixels,
            detection,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn dimensions(&self) -> Dimensions {
        self.pixels.dimensions()
    }

    pub fn detection(&self) -> &DetectionOutcome {
        &self.detection
    }
}

/// Produce one variant of `source` and write it as `item`.
///
/// All codec work happens in memory before anything touches the disk. A
/// partially written image is removed, and so is the image when its caption
/// cannot be written, so a failed call leaves neither file behind.
pub fn write_variant(
    backend: &impl ImageBackend,
    source: &SourceImage,
    output: Dimensions,
    zoom: f64,
    item: &DatasetItem,
    caption: &str,
) -> Result<()> {
    let bounds = source.dimensions();
    let crop = compute_crop_box(bounds, source.detection.face(), output, zoom)?;
    let region = crop.to_region(bounds);
    let bytes = backend.extract_and_resize(&source.pixels, region, output)?;

    if let Err(err) = std::fs::write(&item.image_path, &bytes) {
        let _ = std::fs::remove_file(&item.image_path);
        return Err(err.into());
    }
    if let Err(err) = std::fs::write(&item.caption_path, caption) {
        let _ = std::fs::remove_file(&item.image_path);
        return Err(err.into());
    }
    Ok(())
}
