//! Image processing in pure Rust, no system libraries.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Decode** | `image::ImageReader` |
//! | **Crop geometry** | [`compute_crop_box`], [`select_closest_size`] |
//! | **Extract + resize → PNG** | `crop_imm` + Lanczos3 `resize_exact` |
//!
//! The module is split into:
//! - **Calculations**: Pure functions for crop and size math (unit testable)
//! - **Backend**: [`ImageBackend`] trait + [`RustBackend`]
//! - **Operations**: [`SourceImage`] and [`write_variant`], combining
//!   calculations, detection and backend

pub mod backend;
mod calculations;
pub mod operations;
pub mod rust_backend;

pub use backend::{BackendError, Dimensions, ImageBackend, SourcePixels};
pub use calculations::{
    CropBox, CropError, CropRegion, FALLBACK_SIZE, compute_crop_box, select_closest_size,
};
pub use operations::{PrepareError, SourceImage, write_variant};
pub use rust_backend::{RustBackend, is_supported_image, supported_input_extensions};
