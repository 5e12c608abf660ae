//! Pure Rust codec backend built on the `image` crate.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Decode (JPEG, PNG, TIFF, WebP) | `image::ImageReader` (pure Rust decoders) |
//! | Extract | `image::DynamicImage::crop_imm` |
//! | Resize | `image::DynamicImage::resize_exact` with `Lanczos3` filter |
//! | Encode → PNG | `image::DynamicImage::write_to` into an in-memory buffer |
//!
//! Output is always 8-bit PNG (RGB, or RGBA when the source has alpha) so
//! training tools get a lossless, unindexed raster regardless of input.

use super::backend::{BackendError, Dimensions, ImageBackend, SourcePixels};
use super::calculations::CropRegion;
use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat, ImageReader};
use std::io::Cursor;
use std::path::Path;
use std::sync::LazyLock;

/// Extensions whose decoders are compiled in.
const PHOTO_CANDIDATES: &[(&str, ImageFormat)] = &[
    ("jpg", ImageFormat::Jpeg),
    ("jpeg", ImageFormat::Jpeg),
    ("png", ImageFormat::Png),
    ("tif", ImageFormat::Tiff),
    ("tiff", ImageFormat::Tiff),
    ("webp", ImageFormat::WebP),
];

static SUPPORTED_EXTENSIONS: LazyLock<Vec<&'static str>> = LazyLock::new(|| {
    PHOTO_CANDIDATES
        .iter()
        .filter(|(_, fmt)| fmt.reading_enabled())
        .map(|(ext, _)| *ext)
        .collect()
});

/// Returns the set of image file extensions that have working decoders compiled in.
pub fn supported_input_extensions() -> &'static [&'static str] {
    &SUPPORTED_EXTENSIONS
}

/// True when `path` has a supported extension (case-insensitive).
pub fn is_supported_image(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| {
            supported_input_extensions()
                .iter()
                .any(|supported| e.eq_ignore_ascii_case(supported))
        })
}

/// Pure Rust backend using the `image` crate ecosystem.
///
/// See the [module docs](self) for the crate-to-operation mapping.
pub struct RustBackend;

impl RustBackend {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RustBackend {
    fn default() -> Self {
        Self::new()
    }
}

/// Load and decode an image from disk, sniffing the format from content.
fn load_image(path: &Path) -> Result<DynamicImage, BackendError> {
    ImageReader::open(path)
        .map_err(BackendError::Io)?
        .with_guessed_format()
        .map_err(BackendError::Io)?
        .decode()
        .map_err(|e| {
            BackendError::ProcessingFailed(format!("Failed to decode {}: {}", path.display(), e))
        })
}

/// Encode as 8-bit PNG into memory.
fn encode_png(img: &DynamicImage) -> Result<Vec<u8>, BackendError> {
    let normalized = if img.color().has_alpha() {
        DynamicImage::ImageRgba8(img.to_rgba8())
    } else {
        DynamicImage::ImageRgb8(img.to_rgb8())
    };
    let mut buffer = Cursor::new(Vec::new());
    normalized
        .write_to(&mut buffer, ImageFormat::Png)
        .map_err(|e| BackendError::ProcessingFailed(format!("PNG encode failed: {}", e)))?;
    Ok(buffer.into_inner())
}

impl ImageBackend for RustBackend {
    fn decode(&self, path: &Path) -> Result<SourcePixels, BackendError> {
        load_image(path).map(SourcePixels::new)
    }

    fn extract_and_resize(
        &self,
        source: &SourcePixels,
        region: CropRegion,
        output: Dimensions,
    ) -> Result<Vec<u8>, BackendError> {
        let bounds = source.dimensions();
        if region.width == 0
            || region.height == 0
            || region.x + region.width > bounds.width
            || region.y + region.height > bounds.height
        {
            return Err(BackendError::ProcessingFailed(format!(
                "Crop region {}x{}+{}+{} is outside {}",
                region.width, region.height, region.x, region.y, bounds
            )));
        }
        if output.is_degenerate() {
            return Err(BackendError::ProcessingFailed(format!(
                "Cannot resize to {output}"
            )));
        }

        let cropped = source
            .image()
            .crop_imm(region.x, region.y, region.width, region.height);
        let resized = cropped.resize_exact(output.width, output.height, FilterType::Lanczos3);
        encode_png(&resized)
    }
}
