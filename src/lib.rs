//! # Portrait Dataset
//!
//! Turns a folder of photos of one person into an image/caption dataset for
//! fine-tuning an image model on that subject. Every photo is cut into one or
//! more fixed-resolution PNGs framed on the subject's face, each paired with
//! a caption file.
//!
//! # Pipeline
//!
//! ```text
//! 1. Scan      photos/   →  numbered jobs           (scan)
//! 2. Load      job       →  pixels + face box       (imaging, detection)
//! 3. Variants  sizes × zoom levels → PNG + caption  (imaging, prepare)
//! ```
//!
//! Photos are prepared in parallel; the variants of one photo run in order,
//! and the first failure for a photo skips the rest of that photo's variants.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`scan`] | Finds source photos and assigns their counters |
//! | [`prepare`] | Per-photo variant loop, batch runner, reports and progress events |
//! | [`imaging`] | Crop geometry, size selection, codec backend, variant writer |
//! | [`detection`] | Face detector seam, SeetaFace adapter, load-once shared detector |
//! | [`naming`] | Subject folder and `{subject} ({counter}.{local})` file names |
//! | [`metadata`] | Caption resolution: sidecar `.txt`, then default caption |
//! | [`config`] | `config.toml` loading, merging and validation |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## Face-Anchored Zoom
//!
//! Each output size has a widest crop (the largest box of that aspect ratio
//! that fits the photo) and a tightest crop (the box of that aspect ratio
//! hugging the detected face). A zoom level interpolates between the two, and
//! the box is then shifted, never shrunk, to stay inside the photo. Photos
//! without a detected face get the widest crop, centered.
//!
//! ## One Decode, One Detection
//!
//! A photo is decoded and run through face detection once; every size and
//! zoom variant is cut from those same pixels and that same face box.
//!
//! ## Pure-Rust Imaging
//!
//! Decoding, Lanczos3 resampling and PNG encoding use the `image` crate, and
//! face detection uses `rustface`. No system libraries are needed; only the
//! SeetaFace model file is read at runtime.

pub mod config;
pub mod detection;
pub mod imaging;
pub mod metadata;
pub mod naming;
pub mod output;
pub mod prepare;
pub mod scan;

#[cfg(test)]
pub(crate) mod test_helpers;
