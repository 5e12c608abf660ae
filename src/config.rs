//! Dataset configuration module.
//!
//! Handles loading, validating, and merging the `config.toml` that lives in
//! the source folder. Stock defaults are the base layer; the user file only
//! needs the keys it wants to change.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [subject]
//! name = "ohwx"             # Trigger word used in file names and captions
//! class_name = "person"     # Class word paired with the trigger word
//! # repeats = 5             # Omit to derive from the image count
//!
//! [output]
//! sizes = [[1024, 1024], [832, 1216], [1216, 832]]
//! zoom_levels = [0.0]       # 0 = widest crop, 1 = tight on the face
//! crop = false              # true: every size; false: closest aspect only
//!
//! [repeats]
//! target_steps = 150        # repeats = max(min, ceil(target_steps / images))
//! min = 5
//!
//! [detection]
//! model_path = "model/seeta_fd_frontal_v1.0.bin"
//! min_face_size = 20
//! score_thresh = 2.0
//! pyramid_scale_factor = 0.8
//! slide_window_step = 4
//!
//! [processing]
//! max_processes = 4         # Max parallel workers (omit for auto = CPU cores)
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use crate::imaging::Dimensions;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Smallest face window the SeetaFace cascade supports.
pub const MIN_FACE_SIZE_FLOOR: u32 = 20;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Dataset configuration loaded from `config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PrepareConfig {
    /// Who the dataset is about.
    pub subject: SubjectConfig,
    /// Output sizes, zoom levels and crop mode.
    pub output: OutputConfig,
    /// How to derive the repeat count when the subject does not fix one.
    pub repeats: RepeatsConfig,
    /// Face detector model and tuning.
    pub detection: DetectionConfig,
    /// Parallel processing settings.
    pub processing: ProcessingConfig,
}

impl PrepareConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_name_component("subject.name", &self.subject.name)?;
        check_name_component("subject.class_name", &self.subject.class_name)?;
        if self.subject.repeats == Some(0) {
            return Err(ConfigError::Validation(
                "subject.repeats must be at least 1".into(),
            ));
        }
        if self.output.sizes.iter().any(|[w, h]| *w == 0 || *h == 0) {
            return Err(ConfigError::Validation(
                "output.sizes values must be non-zero".into(),
            ));
        }
        if self.output.zoom_levels.is_empty() {
            return Err(ConfigError::Validation(
                "output.zoom_levels must not be empty".into(),
            ));
        }
        if self.output.zoom_levels.iter().any(|z| !z.is_finite()) {
            return Err(ConfigError::Validation(
                "output.zoom_levels must be finite numbers".into(),
            ));
        }
        if self.repeats.target_steps == 0 || self.repeats.min == 0 {
            return Err(ConfigError::Validation(
                "repeats.target_steps and repeats.min must be at least 1".into(),
            ));
        }
        if self.detection.min_face_size < MIN_FACE_SIZE_FLOOR {
            return Err(ConfigError::Validation(format!(
                "detection.min_face_size must be at least {MIN_FACE_SIZE_FLOOR}"
            )));
        }
        let scale = self.detection.pyramid_scale_factor;
        if !(scale > 0.0 && scale < 1.0) {
            return Err(ConfigError::Validation(
                "detection.pyramid_scale_factor must be between 0 and 1 (exclusive)".into(),
            ));
        }
        if self.detection.slide_window_step == 0 {
            return Err(ConfigError::Validation(
                "detection.slide_window_step must be non-zero".into(),
            ));
        }
        Ok(())
    }

    /// The repeat count for a batch of `image_count` images.
    ///
    /// An explicit `subject.repeats` wins; otherwise
    /// `max(repeats.min, ceil(repeats.target_steps / image_count))`.
    pub fn resolve_repeats(&self, image_count: usize) -> u32 {
        if let Some(repeats) = self.subject.repeats {
            return repeats;
        }
        let images = u32::try_from(image_count.max(1)).unwrap_or(u32::MAX);
        self.repeats
            .target_steps
            .div_ceil(images)
            .max(self.repeats.min)
    }
}

/// Trigger word, class word and optional fixed repeat count.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SubjectConfig {
    pub name: String,
    pub class_name: String,
    pub repeats: Option<u32>,
}

impl Default for SubjectConfig {
    fn default() -> Self {
        Self {
            name: "ohwx".to_string(),
            class_name: "person".to_string(),
            repeats: None,
        }
    }
}

/// Output variants to produce per source image.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputConfig {
    /// Output resolutions as `[width, height]`.
    pub sizes: Vec<[u32; 2]>,
    /// Zoom levels, each producing one variant per size.
    pub zoom_levels: Vec<f64>,
    /// Produce every size (`true`) or only the closest-aspect size (`false`).
    pub crop: bool,
}

impl OutputConfig {
    pub fn dimensions(&self) -> Vec<Dimensions> {
        self.sizes.iter().copied().map(Dimensions::from).collect()
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            sizes: vec![[1024, 1024], [832, 1216], [1216, 832]],
            zoom_levels: vec![0.0],
            crop: false,
        }
    }
}

/// Derived repeat count settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RepeatsConfig {
    pub target_steps: u32,
    pub min: u32,
}

impl Default for RepeatsConfig {
    fn default() -> Self {
        Self {
            target_steps: 150,
            min: 5,
        }
    }
}

/// SeetaFace model location and detector tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DetectionConfig {
    /// Path to the SeetaFace frontal model. Relative paths resolve against
    /// the working directory.
    pub model_path: PathBuf,
    /// Smallest face edge in pixels the detector searches for.
    pub min_face_size: u32,
    /// Minimum classifier score for a window to count as a face.
    pub score_thresh: f64,
    /// Image pyramid downscale step, in `(0, 1)`.
    pub pyramid_scale_factor: f32,
    /// Sliding window stride in pixels.
    pub slide_window_step: u32,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            model_path: PathBuf::from("model/seeta_fd_frontal_v1.0.bin"),
            min_face_size: MIN_FACE_SIZE_FLOOR,
            score_thresh: 2.0,
            pyramid_scale_factor: 0.8,
            slide_window_step: 4,
        }
    }
}

/// Parallel processing settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Maximum number of parallel image processing workers.
    /// When absent or null, defaults to the number of CPU cores.
    /// Values larger than the core count are clamped down.
    pub max_processes: Option<usize>,
}

/// Resolve the effective thread count from config.
///
/// - `None` → use all available cores
/// - `Some(n)` → use `min(n, cores)` (user can constrain down, not up)
pub fn effective_threads(config: &ProcessingConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config
        .max_processes
        .map(|n| n.clamp(1, cores))
        .unwrap_or(cores)
}

/// Subject and class names end up in folder and file names, so each must be
/// a single non-empty path component.
fn check_name_component(field: &str, value: &str) -> Result<(), ConfigError> {
    if value.trim().is_empty() {
        return Err(ConfigError::Validation(format!("{field} must not be empty")));
    }
    if value.contains(['/', '\\', '\0']) || value == "." || value == ".." {
        return Err(ConfigError::Validation(format!(
            "{field} must not contain path separators or be \".\" or \"..\": {value:?}"
        )));
    }
    Ok(())
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
///
/// This is the canonical representation of all default values, used as the
/// base layer for merging user overrides on top.
pub fn stock_defaults_value() -> Result<toml::Value, ConfigError> {
    Ok(toml::Value::try_from(PrepareConfig::default())?)
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Load a `config.toml` from a directory as a raw TOML value.
///
/// Returns `Ok(None)` if no `config.toml` exists in the directory.
/// Returns `Err` if the file exists but contains invalid TOML.
pub fn load_raw_config(path: &Path) -> Result<Option<toml::Value>, ConfigError> {
    let config_path = path.join("config.toml");
    if !config_path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(&config_path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge an optional overlay onto a base value, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<PrepareConfig, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: PrepareConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load config from `config.toml` in the given directory.
///
/// Merges user values on top of stock defaults, rejects unknown keys,
/// and validates the result.
pub fn load_config(root: &Path) -> Result<PrepareConfig, ConfigError> {
    let base = stock_defaults_value()?;
    let overlay = load_raw_config(root)?;
    resolve_config(base, overlay)
}

/// Returns a fully-commented stock `config.toml` with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# Portrait Dataset Configuration
# ==============================
# Place this file as config.toml in the folder holding your source photos.
# All settings are optional. Values shown below are the defaults.
# Unknown keys will cause an error.

# ---------------------------------------------------------------------------
# Subject
# ---------------------------------------------------------------------------
[subject]
# Trigger word. Used in file names and the default caption.
name = "ohwx"

# Class word, e.g. "man", "woman", "dog".
class_name = "person"

# Fixed repeat count for the subject folder name.
# Omit to derive it from the number of images (see [repeats]).
# repeats = 5

# ---------------------------------------------------------------------------
# Output variants
# ---------------------------------------------------------------------------
[output]
# Output resolutions as [width, height].
sizes = [[1024, 1024], [832, 1216], [1216, 832]]

# One variant per size per zoom level.
# 0.0 = widest crop that fits the image, 1.0 = tight on the detected face.
zoom_levels = [0.0]

# true:  produce every size for every image.
# false: produce only the size whose aspect ratio is closest to the source.
crop = false

# ---------------------------------------------------------------------------
# Derived repeats
# ---------------------------------------------------------------------------
[repeats]
# repeats = max(min, ceil(target_steps / number_of_images))
target_steps = 150
min = 5

# ---------------------------------------------------------------------------
# Face detection (SeetaFace frontal model)
# ---------------------------------------------------------------------------
[detection]
model_path = "model/seeta_fd_frontal_v1.0.bin"

# Smallest face edge in pixels to look for (minimum 20).
min_face_size = 20

# Higher = fewer, more confident detections.
score_thresh = 2.0

# Image pyramid step, between 0 and 1.
pyramid_scale_factor = 0.8

# Sliding window stride in pixels.
slide_window_step = 4

# ---------------------------------------------------------------------------
# Processing
# ---------------------------------------------------------------------------
[processing]
# Maximum parallel image-processing workers.
# Omit or comment out to auto-detect (= number of CPU cores).
# max_processes = 4
"##
}
