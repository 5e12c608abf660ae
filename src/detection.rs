//! Face detection seam and the process-wide detector.
//!
//! The pipeline only ever looks at the **first** face a detector reports.
//! Detection runs once per source image, on a grayscale copy of the decoded
//! pixels, and the outcome is reused for every size and zoom variant of that
//! image.
//!
//! ## Load-once model
//!
//! [`SharedDetector`] wraps the detector behind a [`OnceLock`]. The first
//! caller runs the loader; concurrent callers block until that single load
//! finishes and then all observe the same result. A failed load is cached
//! too, so a missing model file is reported once per batch rather than
//! retried per image.
//!
//! The production detector is [`RustfaceDetector`] (SeetaFace frontal model
//! via the `rustface` crate). The model file is read from
//! `[detection] model_path`.

use crate::config::DetectionConfig;
use crate::imaging::{Dimensions, SourcePixels};
use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;
use std::sync::OnceLock;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Error, Debug)]
pub enum DetectionError {
    #[error("Failed to load face model {path}: {source}")]
    ModelLoad {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Face detector unavailable: {0}")]
    Unavailable(String),
}

/// Bounding box of a detected face, in source pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FaceBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    /// Detector score. Scale depends on the detector.
    pub confidence: f64,
}

impl FaceBox {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
            confidence: 0.0,
        }
    }

    pub fn center(&self) -> (f64, f64) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    /// Intersect with the image rectangle.
    ///
    /// SeetaFace can report boxes that poke past the image edge for faces
    /// near the border.
    pub fn clipped_to(&self, bounds: Dimensions) -> Self {
        let left = self.x.clamp(0.0, bounds.width as f64);
        let top = self.y.clamp(0.0, bounds.height as f64);
        let right = (self.x + self.width).clamp(left, bounds.width as f64);
        let bottom = (self.y + self.height).clamp(top, bounds.height as f64);
        Self {
            x: left,
            y: top,
            width: right - left,
            height: bottom - top,
            confidence: self.confidence,
        }
    }
}

/// Result of running detection on one source image.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DetectionOutcome {
    Found(FaceBox),
    NotFound,
}

impl DetectionOutcome {
    /// Keep the first reported face, dropping empty boxes.
    pub fn from_faces(faces: impl IntoIterator<Item = FaceBox>) -> Self {
        faces
            .into_iter()
            .find(|face| face.width > 0.0 && face.height > 0.0)
            .map_or(Self::NotFound, Self::Found)
    }

    pub fn face(&self) -> Option<&FaceBox> {
        match self {
            Self::Found(face) => Some(face),
            Self::NotFound => None,
        }
    }

    pub fn is_found(&self) -> bool {
        matches!(self, Self::Found(_))
    }
}

/// Pluggable face detection backend.
///
/// Implementations must be safe to call from many worker threads at once.
pub trait FaceDetector: Send + Sync {
    /// Detect faces in a row-major grayscale buffer of `width` × `height` bytes.
    fn detect(&self, gray: &[u8], width: u32, height: u32) -> Vec<FaceBox>;
}

/// Face detector backed by the `rustface` crate (SeetaFace engine).
pub struct RustfaceDetector {
    model: rustface::Model,
    settings: DetectionConfig,
}

impl RustfaceDetector {
    /// Read the SeetaFace model named by `settings.model_path`.
    pub fn from_config(settings: &DetectionConfig) -> Result<Self, DetectionError> {
        let path = settings.model_path.clone();
        let file = File::open(&path).map_err(|source| DetectionError::ModelLoad {
            path: path.clone(),
            source,
        })?;
        let model = rustface::read_model(BufReader::new(file)).map_err(|err| {
            DetectionError::ModelLoad {
                path,
                source: std::io::Error::new(std::io::ErrorKind::InvalidData, err.to_string()),
            }
        })?;
        Ok(Self {
            model,
            settings: settings.clone(),
        })
    }
}

impl FaceDetector for RustfaceDetector {
    fn detect(&self, gray: &[u8], width: u32, height: u32) -> Vec<FaceBox> {
        // rustface detectors are stateful (`&mut self`), so each call gets its
        // own detector over the shared read-only model.
        let mut detector = rustface::create_detector_with_model(self.model.clone());
        detector.set_min_face_size(self.settings.min_face_size);
        detector.set_score_thresh(self.settings.score_thresh);
        detector.set_pyramid_scale_factor(self.settings.pyramid_scale_factor);
        detector.set_slide_window_step(
            self.settings.slide_window_step,
            self.settings.slide_window_step,
        );

        let mut faces = detector.detect(&rustface::ImageData::new(gray, width, height));
        // Strongest face first; "first face" then means "most confident".
        faces.sort_by(|a, b| b.score().total_cmp(&a.score()));

        faces
            .iter()
            .map(|face| {
                let bbox = face.bbox();
                FaceBox {
                    x: bbox.x() as f64,
                    y: bbox.y() as f64,
                    width: bbox.width() as f64,
                    height: bbox.height() as f64,
                    confidence: face.score(),
                }
            })
            .collect()
    }
}

type Loader = Box<dyn Fn() -> Result<Box<dyn FaceDetector>, DetectionError> + Send + Sync>;

/// A detector that is loaded at most once and then shared by all workers.
pub struct SharedDetector {
    loader: Loader,
    slot: OnceLock<Result<Box<dyn FaceDetector>, String>>,
}

impl SharedDetector {
    /// Defer loading to the first [`initialize`](Self::initialize) or
    /// [`detect`](Self::detect) call.
    pub fn lazy<F>(loader: F) -> Self
    where
        F: Fn() -> Result<Box<dyn FaceDetector>, DetectionError> + Send + Sync + 'static,
    {
        Self {
            loader: Box::new(loader),
            slot: OnceLock::new(),
        }
    }

    /// Lazily load a [`RustfaceDetector`] from `settings`.
    pub fn rustface(settings: DetectionConfig) -> Self {
        Self::lazy(move || {
            RustfaceDetector::from_config(&settings)
                .map(|detector| Box::new(detector) as Box<dyn FaceDetector>)
        })
    }

    /// Wrap an already-constructed detector.
    pub fn ready(detector: impl FaceDetector + 'static) -> Self {
        let shared = Self::lazy(|| {
            Err(DetectionError::Unavailable(
                "detector was supplied pre-initialised".into(),
            ))
        });
        // A fresh OnceLock is always empty, so this set cannot fail.
        let _ = shared.slot.set(Ok(Box::new(detector)));
        shared
    }

    /// Load the detector if nobody has yet, and return it.
    ///
    /// Safe to call from many threads; the loader runs exactly once.
    pub fn initialize(&self) -> Result<&dyn FaceDetector, DetectionError> {
        self.slot
            .get_or_init(|| {
                info!("loading face detector");
                (self.loader)().map_err(|err| err.to_string())
            })
            .as_deref()
            .map_err(|reason| DetectionError::Unavailable(reason.clone()))
    }

    /// Run detection on decoded pixels and keep the first face.
    pub fn detect(&self, pixels: &SourcePixels) -> Result<DetectionOutcome, DetectionError> {
        let detector = self.initialize()?;
        let bounds = pixels.dimensions();
        let gray = pixels.to_gray();
        let faces = detector.detect(gray.as_raw(), bounds.width, bounds.height);
        debug!(faces = faces.len(), "face detection finished");
        Ok(DetectionOutcome::from_faces(
            faces.into_iter().map(|face| face.clipped_to(bounds)),
        ))
    }
}
