//! Image codec trait and shared types.
//!
//! The [`ImageBackend`] trait defines the two codec operations the pipeline
//! needs: decode a source image into memory, and extract a crop region
//! resized to the requested output size as encoded PNG bytes.
//!
//! The production implementation is
//! [`RustBackend`](super::rust_backend::RustBackend), pure Rust and statically
//! linked. Tests use the recording `MockBackend` in this module.

use super::calculations::CropRegion;
use image::{DynamicImage, GrayImage};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Processing failed: {0}")]
    ProcessingFailed(String),
}

/// Pixel dimensions of a source image or a requested output size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl Dimensions {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Width divided by height.
    pub fn aspect(self) -> f64 {
        self.width as f64 / self.height as f64
    }

    /// True when either side is zero.
    pub fn is_degenerate(self) -> bool {
        self.width == 0 || self.height == 0
    }
}

impl fmt::Display for Dimensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

impl From<[u32; 2]> for Dimensions {
    fn from([width, height]: [u32; 2]) -> Self {
        Self { width, height }
    }
}

/// A decoded source image held in memory.
///
/// Decoding happens once per source; every variant of that source is cut
/// from the same buffer.
pub struct SourcePixels {
    image: DynamicImage,
}

impl SourcePixels {
    pub fn new(image: DynamicImage) -> Self {
        Self { image }
    }

    pub fn dimensions(&self) -> Dimensions {
        Dimensions::new(self.image.width(), self.image.height())
    }

    pub fn channels(&self) -> u8 {
        self.image.color().channel_count()
    }

    /// Single-channel copy for face detection.
    pub fn to_gray(&self) -> GrayImage {
        self.image.to_luma8()
    }

    pub fn image(&self) -> &DynamicImage {
        &self.image
    }
}

/// Trait for image codec backends.
///
/// `Sync` is required because one backend instance is shared by every
/// worker in the rayon pool.
pub trait ImageBackend: Sync {
    /// Decode an image file into memory.
    fn decode(&self, path: &Path) -> Result<SourcePixels, BackendError>;

    /// Cut `region` out of `source`, resize it to exactly `output`, and
    /// return the encoded PNG bytes.
    fn extract_and_resize(
        &self,
        source: &SourcePixels,
        region: CropRegion,
        output: Dimensions,
    ) -> Result<Vec<u8>, BackendError>;
}
