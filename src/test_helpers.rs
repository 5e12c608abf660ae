//! Shared test utilities.
//!
//! Provides a scripted face detector and synthetic image fixtures so tests
//! never depend on a model file or on checked-in photos.
//!
//! # Usage
//!
//! ```rust,ignore
//! use crate::test_helpers::*;
//!
//! let tmp = setup_source_dir(&[("IMG_0001.jpg", 400, 300)]);
//! let detector = MockDetector::with_faces(vec![FaceBox::new(100.0, 50.0, 80.0, 100.0)]);
//! ```

use crate::detection::{FaceBox, FaceDetector};
use image::{ImageBuffer, Rgb};
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tempfile::TempDir;

// =========================================================================
// Detector
// =========================================================================

/// Detector that returns the same faces for every image and counts calls.
pub struct MockDetector {
    faces: Vec<FaceBox>,
    calls: Arc<AtomicUsize>,
}

impl MockDetector {
    pub fn none() -> Self {
        Self::with_faces(Vec::new())
    }

    pub fn with_faces(faces: Vec<FaceBox>) -> Self {
        Self {
            faces,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Shared call counter; stays valid after the detector is moved.
    pub fn calls(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.calls)
    }
}

impl FaceDetector for MockDetector {
    fn detect(&self, gray: &[u8], width: u32, height: u32) -> Vec<FaceBox> {
        assert_eq!(
            gray.len(),
            width as usize * height as usize,
            "grayscale buffer must be width * height bytes"
        );
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.faces.clone()
    }
}

// =========================================================================
// Image fixtures
// =========================================================================

/// Write a gradient JPEG of the given size.
pub fn create_test_jpeg(path: &Path, width: u32, height: u32) {
    let img = ImageBuffer::from_fn(width, height, |x, y| {
        Rgb([
            (x * 255 / width.max(1)) as u8,
            (y * 255 / height.max(1)) as u8,
            128,
        ])
    });
    img.save(path).unwrap();
}

/// Write bytes that carry a JPEG signature but cannot be decoded.
pub fn write_corrupt_image(path: &Path) {
    std::fs::write(path, [0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, b'J', b'F', b'I', b'F']).unwrap();
}

/// Create a temp source folder holding JPEGs of the given names and sizes.
pub fn setup_source_dir(images: &[(&str, u32, u32)]) -> TempDir {
    let tmp = TempDir::new().unwrap();
    for (name, width, height) in images {
        create_test_jpeg(&tmp.path().join(name), *width, *height);
    }
    tmp
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mock_detector_counts_calls() {
        let detector = MockDetector::with_faces(vec![FaceBox::new(1.0, 2.0, 3.0, 4.0)]);
        let calls = detector.calls();
        let faces = detector.detect(&[0; 6], 3, 2);
        assert_eq!(faces.len(), 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn source_dir_holds_decodable_jpegs() {
        let tmp = setup_source_dir(&[("a.jpg", 40, 30), ("b.jpg", 30, 40)]);
        let a = image::open(tmp.path().join("a.jpg")).unwrap();
        assert_eq!((a.width(), a.height()), (40, 30));
        assert!(tmp.path().join("b.jpg").exists());
    }
}
