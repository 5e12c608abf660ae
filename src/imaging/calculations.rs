//! Pure geometry for crop boxes and output size selection.
//!
//! All functions here are pure and testable without any I/O or images.
//!
//! ## Crop box model
//!
//! For a given output aspect ratio there are two reference boxes:
//!
//! - the **minimal box** (zoom 0): the largest box of the target aspect that
//!   fits inside the source image;
//! - the **maximal box** (zoom 1): the box of the target aspect that hugs the
//!   detected face along the constrained axis.
//!
//! Which axis is constrained is decided once, by comparing the source aspect
//! to the target aspect, and the same axis is used for both boxes. Width and
//! height are interpolated linearly between the two, centered on the face,
//! then shifted (never resized) to stay inside the source.

use super::backend::Dimensions;
use crate::detection::FaceBox;
use thiserror::Error;

/// Output size used when no candidate size is available.
pub const FALLBACK_SIZE: Dimensions = Dimensions::new(1024, 1024);

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CropError {
    #[error("Invalid dimensions: {0}")]
    InvalidDimensions(String),
}

/// Crop rectangle in source pixel coordinates, real-valued.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CropBox {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

/// Integer crop rectangle handed to the codec.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropRegion {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl CropBox {
    pub fn aspect(&self) -> f64 {
        self.width / self.height
    }

    pub fn center(&self) -> (f64, f64) {
        (self.left + self.width / 2.0, self.top + self.height / 2.0)
    }

    /// Round to whole pixels for the codec.
    ///
    /// Rounding can push `x + width` one pixel past the source edge, so the
    /// origin is pulled back after rounding. Size is kept at least 1px.
    pub fn to_region(&self, source: Dimensions) -> CropRegion {
        let width = (self.width.round() as u32).max(1).min(source.width);
        let height = (self.height.round() as u32).max(1).min(source.height);
        CropRegion {
            x: (self.left.round() as u32).min(source.width - width),
            y: (self.top.round() as u32).min(source.height - height),
            width,
            height,
        }
    }
}

/// Compute the crop box for one output size and zoom level.
///
/// # Arguments
/// * `source` - Source image dimensions
/// * `face` - First detected face, if any
/// * `output` - Desired output dimensions (only the aspect ratio matters)
/// * `zoom` - 0.0 = minimal box, 1.0 = maximal box. Values outside `[0, 1]`
///   extrapolate; they are not clamped. Ignored when there is no face.
///
/// # Errors
/// [`CropError::InvalidDimensions`] when either the source or the output has
/// a zero side.
///
/// # Examples
/// ```
/// # use portrait_dataset::imaging::{Dimensions, compute_crop_box};
/// // 4:3 landscape, no face, square output → centered 3000x3000 box
/// let crop = compute_crop_box(
///     Dimensions::new(4000, 3000),
///     None,
///     Dimensions::new(1024, 1024),
///     0.0,
/// )
/// .unwrap();
/// assert_eq!((crop.left, crop.top, crop.width, crop.height), (500.0, 0.0, 3000.0, 3000.0));
/// ```
pub fn compute_crop_box(
    source: Dimensions,
    face: Option<&FaceBox>,
    output: Dimensions,
    zoom: f64,
) -> Result<CropBox, CropError> {
    if source.is_degenerate() {
        return Err(CropError::InvalidDimensions(format!(
            "source image is {source}"
        )));
    }
    if output.is_degenerate() {
        return Err(CropError::InvalidDimensions(format!(
            "requested output is {output}"
        )));
    }

    let source_w = source.width as f64;
    let source_h = source.height as f64;
    let target_aspect = output.aspect();
    // Source wider than target: height is the constrained axis (crop sides).
    let constrain_height = source.aspect() > target_aspect;

    let (minimal_w, minimal_h) = fit_aspect(source_w, source_h, target_aspect, constrain_height);

    let (width, height, center_x, center_y) = match face {
        None => (minimal_w, minimal_h, source_w / 2.0, source_h / 2.0),
        Some(face) => {
            let (maximal_w, maximal_h) =
                fit_aspect(face.width, face.height, target_aspect, constrain_height);
            let (center_x, center_y) = face.center();
            (
                lerp(minimal_w, maximal_w, zoom),
                lerp(minimal_h, maximal_h, zoom),
                center_x,
                center_y,
            )
        }
    };

    Ok(CropBox {
        left: clamp_origin(center_x - width / 2.0, source_w - width),
        top: clamp_origin(center_y - height / 2.0, source_h - height),
        width,
        height,
    })
}

/// Box of `aspect` that spans `width` (or `height` when `constrain_height`).
fn fit_aspect(width: f64, height: f64, aspect: f64, constrain_height: bool) -> (f64, f64) {
    if constrain_height {
        (height * aspect, height)
    } else {
        (width, width / aspect)
    }
}

fn lerp(from: f64, to: f64, t: f64) -> f64 {
    from + t * (to - from)
}

/// Clamp to `[0, upper]`; a negative upper bound resolves to 0.
fn clamp_origin(value: f64, upper: f64) -> f64 {
    value.min(upper).max(0.0)
}

/// Pick the candidate whose aspect ratio is closest to the source.
///
/// Distance is `|candidate_aspect - source_aspect|`. On a tie the earlier
/// candidate wins. Candidates with a zero side are ignored. Returns `None`
/// when no usable candidate exists; callers fall back to [`FALLBACK_SIZE`].
pub fn select_closest_size(source: Dimensions, candidates: &[Dimensions]) -> Option<Dimensions> {
    let source_aspect = source.aspect();
    candidates
        .iter()
        .copied()
        .filter(|candidate| !candidate.is_degenerate())
        .fold(None, |best: Option<(Dimensions, f64)>, candidate| {
            let distance = (candidate.aspect() - source_aspect).abs();
            match best {
                Some((_, best_distance)) if best_distance <= distance => best,
                _ => Some((candidate, distance)),
            }
        })
        .map(|(candidate, _)| candidate)
}
