//! Dataset preparation: every source image becomes a set of variants.
//!
//! For each source image the pipeline produces one variant per
//! `(size, zoom)` pair, sizes outer and zoom levels inner, in config order.
//! Each variant is a PNG and a caption file, named by [`crate::naming`].
//!
//! ## Output Structure
//!
//! ```text
//! dataset/
//! └── img/
//!     └── 5_ohwx person/
//!         ├── ohwx (0001.0001).png
//!         ├── ohwx (0001.0001).txt
//!         ├── ohwx (0001.0002).png     # second size or zoom of image 1
//!         ├── ohwx (0001.0002).txt
//!         ├── ohwx (0002.0001).png
//!         └── ...
//! ```
//!
//! ## Failure handling
//!
//! An image moves through [`ImageState`]: it starts `Pending` and ends
//! `Succeeded` or `Failed`. The first failure of any kind (decode, folder
//! creation, codec, write) moves it to `Failed`, and every remaining variant
//! of that image is skipped. Pairs written before the failure stay on disk.
//! Other images are unaffected; failures are logged and reported, never
//! propagated.
//!
//! ## Parallel Processing
//!
//! Images are prepared in parallel using [rayon](https://docs.rs/rayon); the
//! variants of one image are produced sequentially. The pool size is set by
//! the caller (see [`crate::config::effective_threads`]).

use crate::config::PrepareConfig;
use crate::detection::{DetectionError, SharedDetector};
use crate::imaging::{
    Dimensions, FALLBACK_SIZE, ImageBackend, PrepareError, SourceImage, select_closest_size,
    write_variant,
};
use crate::metadata::resolve_caption;
use crate::naming::{self, DatasetItem};
use rayon::prelude::*;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;
use tracing::{debug, info, warn};

/// One source image to prepare.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchJob {
    pub source_path: PathBuf,
    /// 1-based position of the image in the batch.
    pub counter: u32,
    /// Caption to use instead of the sidecar/default lookup.
    pub caption: Option<String>,
}

impl BatchJob {
    pub fn new(source_path: PathBuf, counter: u32) -> Self {
        Self {
            source_path,
            counter,
            caption: None,
        }
    }

    pub fn with_caption(mut self, caption: impl Into<String>) -> Self {
        self.caption = Some(caption.into());
        self
    }
}

/// Settings shared by every job in a batch.
#[derive(Debug, Clone)]
pub struct PrepareSettings {
    pub sizes: Vec<Dimensions>,
    pub zoom_levels: Vec<f64>,
    pub crop: bool,
    pub subject: String,
    pub class_name: String,
    pub repeats: u32,
    /// Dataset root; the subject folder is created under `{output}/img/`.
    pub output: PathBuf,
}

impl PrepareSettings {
    /// Build settings from config for a batch of `image_count` images.
    pub fn from_config(config: &PrepareConfig, image_count: usize, output: &Path) -> Self {
        Self {
            sizes: config.output.dimensions(),
            zoom_levels: config.output.zoom_levels.clone(),
            crop: config.output.crop,
            subject: config.subject.name.clone(),
            class_name: config.subject.class_name.clone(),
            repeats: config.resolve_repeats(image_count),
            output: output.to_path_buf(),
        }
    }

    pub fn subject_folder(&self) -> PathBuf {
        naming::subject_folder(&self.output, self.repeats, &self.subject, &self.class_name)
    }

    /// Variants each image produces when nothing fails.
    pub fn variants_per_image(&self) -> usize {
        let sizes = if self.crop { self.sizes.len().max(1) } else { 1 };
        sizes * self.zoom_levels.len()
    }
}

/// Output sizes to produce for a source of the given dimensions.
///
/// With `crop` every configured size is used in order; otherwise only the
/// one closest in aspect ratio. No usable size yields [`FALLBACK_SIZE`].
pub fn requested_sizes(settings: &PrepareSettings, source: Dimensions) -> Vec<Dimensions> {
    if settings.crop && !settings.sizes.is_empty() {
        return settings.sizes.clone();
    }
    vec![select_closest_size(source, &settings.sizes).unwrap_or(FALLBACK_SIZE)]
}

/// Per-image progress. `Failed` is absorbing.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ImageState {
    #[default]
    Pending,
    Succeeded,
    Failed { reason: String },
}

impl ImageState {
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }

    /// Record a failure. Only the first one is kept.
    pub fn fail(&mut self, reason: impl Into<String>) {
        if !self.is_failed() {
            *self = Self::Failed {
                reason: reason.into(),
            };
        }
    }

    /// Mark a pending image as succeeded. A failed image stays failed.
    pub fn succeed(&mut self) {
        if matches!(self, Self::Pending) {
            *self = Self::Succeeded;
        }
    }

    fn finish(self) -> ImageStatus {
        match self {
            Self::Succeeded => ImageStatus::Succeeded,
            Self::Failed { reason } => ImageStatus::Failed { reason },
            Self::Pending => ImageStatus::Failed {
                reason: "image was never completed".into(),
            },
        }
    }
}

/// Final outcome of one image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ImageStatus {
    Succeeded,
    Failed { reason: String },
}

/// What happened to one source image.
#[derive(Debug, Clone, Serialize)]
pub struct ImageReport {
    pub source_path: PathBuf,
    pub counter: u32,
    pub status: ImageStatus,
    /// Pairs written for this image, in variant order.
    pub items: Vec<DatasetItem>,
    /// Variants started before the image finished or failed.
    pub attempted: usize,
    pub face_found: bool,
}

impl ImageReport {
    pub fn is_failed(&self) -> bool {
        matches!(self.status, ImageStatus::Failed { .. })
    }
}

/// Reports for a whole batch, in job order.
#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    pub folder: PathBuf,
    pub repeats: u32,
    pub images: Vec<ImageReport>,
}

impl BatchReport {
    pub fn succeeded(&self) -> usize {
        self.images.iter().filter(|r| !r.is_failed()).count()
    }

    pub fn failed(&self) -> usize {
        self.images.iter().filter(|r| r.is_failed()).count()
    }

    pub fn items_written(&self) -> usize {
        self.images.iter().map(|r| r.items.len()).sum()
    }
}

/// Progress events sent while a batch runs.
#[derive(Debug, Clone)]
pub enum PrepareEvent {
    BatchStarted {
        image_count: usize,
        folder: PathBuf,
    },
    ImagePrepared {
        counter: u32,
        source_path: PathBuf,
        face_found: bool,
        items: Vec<DatasetItem>,
    },
    ImageFailed {
        counter: u32,
        source_path: PathBuf,
        reason: String,
        written: usize,
    },
}

impl PrepareEvent {
    pub fn from_report(report: &ImageReport) -> Self {
        match &report.status {
            ImageStatus::Succeeded => Self::ImagePrepared {
                counter: report.counter,
                source_path: report.source_path.clone(),
                face_found: report.face_found,
                items: report.items.clone(),
            },
            ImageStatus::Failed { reason } => Self::ImageFailed {
                counter: report.counter,
                source_path: report.source_path.clone(),
                reason: reason.clone(),
                written: report.items.len(),
            },
        }
    }
}

/// Prepare every variant of one source image.
///
/// Never returns an error: failures end up in the report's status.
pub fn prepare_image(
    backend: &impl ImageBackend,
    detector: &SharedDetector,
    job: &BatchJob,
    settings: &PrepareSettings,
) -> ImageReport {
    let mut state = ImageState::Pending;
    let mut report = ImageReport {
        source_path: job.source_path.clone(),
        counter: job.counter,
        status: ImageStatus::Succeeded,
        items: Vec::new(),
        attempted: 0,
        face_found: false,
    };

    let caption = job.caption.clone().unwrap_or_else(|| {
        resolve_caption(&job.source_path, &settings.subject, &settings.class_name)
    });
    let folder = settings.subject_folder();

    let source = std::fs::create_dir_all(&folder)
        .map_err(PrepareError::from)
        .and_then(|()| SourceImage::load(backend, detector, &job.source_path));
    let source = match source {
        Ok(source) => source,
        Err(err) => {
            warn!(source = %job.source_path.display(), error = %err, "skipping image");
            state.fail(err.to_string());
            report.status = state.finish();
            return report;
        }
    };
    report.face_found = source.detection().is_found();
    debug!(
        source = %job.source_path.display(),
        dimensions = %source.dimensions(),
        face_found = report.face_found,
        "source loaded"
    );

    let mut local = 0;
    for output in requested_sizes(settings, source.dimensions()) {
        for &zoom in &settings.zoom_levels {
            if state.is_failed() {
                continue;
            }
            local += 1;
            report.attempted += 1;
            let item = DatasetItem::new(&folder, &settings.subject, job.counter, local);
            match write_variant(backend, &source, output, zoom, &item, &caption) {
                Ok(()) => report.items.push(item),
                Err(err) => {
                    warn!(
                        source = %job.source_path.display(),
                        size = %output,
                        zoom,
                        error = %err,
                        "variant failed, skipping the rest of this image"
                    );
                    state.fail(err.to_string());
                }
            }
        }
    }

    state.succeed();
    report.status = state.finish();
    report
}

/// Prepare all jobs in parallel and collect their reports in job order.
///
/// The detector is initialised before any job starts; if it cannot be loaded
/// the whole batch fails without touching the output folder.
pub fn prepare_batch(
    backend: &impl ImageBackend,
    detector: &SharedDetector,
    jobs: &[BatchJob],
    settings: &PrepareSettings,
    progress: Option<Sender<PrepareEvent>>,
) -> Result<BatchReport, DetectionError> {
    detector.initialize()?;

    let folder = settings.subject_folder();
    info!(images = jobs.len(), folder = %folder.display(), "preparing dataset");
    if let Some(tx) = &progress {
        tx.send(PrepareEvent::BatchStarted {
            image_count: jobs.len(),
            folder: folder.clone(),
        })
        .ok();
    }

    let images: Vec<ImageReport> = jobs
        .par_iter()
        .map_with(progress, |progress, job| {
            let report = prepare_image(backend, detector, job, settings);
            if let Some(tx) = progress {
                tx.send(PrepareEvent::from_report(&report)).ok();
            }
            report
        })
        .collect();

    Ok(BatchReport {
        folder,
        repeats: settings.repeats,
        images,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::FaceBox;
    use crate::imaging::backend::tests::{MockBackend, RecordedOp};
    use crate::test_helpers::MockDetector;
    use std::fs;
    use tempfile::TempDir;

    fn settings(output: &Path) -> PrepareSettings {
        PrepareSettings {
            sizes: vec![Dimensions::new(32, 32), Dimensions::new(24, 32)],
            zoom_levels: vec![0.0, 1.0],
            crop: true,
            subject: "ohwx".into(),
            class_name: "person".into(),
            repeats: 5,
            output: output.to_path_buf(),
        }
    }

    fn job(dir: &Path, name: &str, counter: u32) -> BatchJob {
        BatchJob::new(dir.join(name), counter)
    }

    fn files_in(folder: &Path) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(folder)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    // =========================================================================
    // Settings
    // =========================================================================

    #[test]
    fn settings_from_config_derive_repeats() {
        let config = PrepareConfig::default();
        let settings = PrepareSettings::from_config(&config, 10, Path::new("/data"));
        assert_eq!(settings.repeats, 15);
        assert_eq!(settings.sizes.len(), 3);
        assert_eq!(
            settings.subject_folder(),
            PathBuf::from("/data/img/15_ohwx person")
        );
    }

    #[test]
    fn variants_per_image_depends_on_crop() {
        let mut s = settings(Path::new("/out"));
        assert_eq!(s.variants_per_image(), 4);
        s.crop = false;
        assert_eq!(s.variants_per_image(), 2);
    }

    #[test]
    fn requested_sizes_without_crop_picks_closest() {
        let mut s = settings(Path::new("/out"));
        s.crop = false;
        s.sizes = vec![
            Dimensions::new(1024, 1024),
            Dimensions::new(832, 1216),
            Dimensions::new(1216, 832),
        ];
        assert_eq!(
            requested_sizes(&s, Dimensions::new(3000, 2000)),
            vec![Dimensions::new(1216, 832)]
        );
        assert_eq!(
            requested_sizes(&s, Dimensions::new(2000, 3000)),
            vec![Dimensions::new(832, 1216)]
        );
    }

    #[test]
    fn requested_sizes_with_crop_keeps_order() {
        let s = settings(Path::new("/out"));
        assert_eq!(requested_sizes(&s, Dimensions::new(10, 10)), s.sizes);
    }

    #[test]
    fn requested_sizes_fall_back_when_empty() {
        let mut s = settings(Path::new("/out"));
        s.sizes.clear();
        assert_eq!(requested_sizes(&s, Dimensions::new(10, 10)), vec![FALLBACK_SIZE]);
        s.crop = false;
        assert_eq!(requested_sizes(&s, Dimensions::new(10, 10)), vec![FALLBACK_SIZE]);
    }

    // =========================================================================
    // ImageState
    // =========================================================================

    #[test]
    fn failed_state_is_absorbing() {
        let mut state = ImageState::default();
        assert_eq!(state, ImageState::Pending);
        state.fail("first");
        state.fail("second");
        assert_eq!(
            state,
            ImageState::Failed {
                reason: "first".into()
            }
        );
        assert_eq!(
            state.finish(),
            ImageStatus::Failed {
                reason: "first".into()
            }
        );
    }

    #[test]
    fn succeed_moves_pending_to_succeeded() {
        let mut state = ImageState::default();
        state.succeed();
        assert_eq!(state, ImageState::Succeeded);
        assert_eq!(state.finish(), ImageStatus::Succeeded);
    }

    #[test]
    fn succeed_does_not_clear_failure() {
        let mut state = ImageState::default();
        state.fail("codec");
        state.succeed();
        assert_eq!(
            state.finish(),
            ImageStatus::Failed {
                reason: "codec".into()
            }
        );
    }

    #[test]
    fn unfinished_state_is_not_reported_as_success() {
        assert!(matches!(
            ImageState::Pending.finish(),
            ImageStatus::Failed { .. }
        ));
    }

    // =========================================================================
    // prepare_image
    // =========================================================================

    #[test]
    fn image_produces_full_product_in_order() {
        let tmp = TempDir::new().unwrap();
        let backend = MockBackend::new();
        let detector = SharedDetector::ready(MockDetector::none());
        let s = settings(tmp.path());

        let report = prepare_image(&backend, &detector, &job(tmp.path(), "a.jpg", 3), &s);

        assert_eq!(report.status, ImageStatus::Succeeded);
        assert_eq!(report.attempted, 4);
        let names: Vec<String> = report
            .items
            .iter()
            .map(|i| i.image_path.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(
            names,
            vec![
                "ohwx (0003.0001).png",
                "ohwx (0003.0002).png",
                "ohwx (0003.0003).png",
                "ohwx (0003.0004).png",
            ]
        );

        // Size outer, zoom inner.
        let sizes: Vec<(u32, u32)> = backend
            .get_operations()
            .iter()
            .filter_map(|op| match op {
                RecordedOp::Extract { width, height, .. } => Some((*width, *height)),
                RecordedOp::Decode(_) => None,
            })
            .collect();
        assert_eq!(sizes, vec![(32, 32), (32, 32), (24, 32), (24, 32)]);
    }

    #[test]
    fn image_is_decoded_and_detected_once() {
        let tmp = TempDir::new().unwrap();
        let backend = MockBackend::new();
        let mock = MockDetector::with_faces(vec![FaceBox::new(20.0, 10.0, 16.0, 20.0)]);
        let calls = mock.calls();
        let detector = SharedDetector::ready(mock);

        let report = prepare_image(
            &backend,
            &detector,
            &job(tmp.path(), "a.jpg", 1),
            &settings(tmp.path()),
        );

        assert!(report.face_found);
        assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 1);
        let decodes = backend
            .get_operations()
            .iter()
            .filter(|op| matches!(op, RecordedOp::Decode(_)))
            .count();
        assert_eq!(decodes, 1);
    }

    #[test]
    fn caption_comes_from_sidecar_or_default() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("a.txt"), "ohwx person laughing").unwrap();
        let backend = MockBackend::new();
        let detector = SharedDetector::ready(MockDetector::none());
        let mut s = settings(tmp.path());
        s.zoom_levels = vec![0.0];
        s.crop = false;

        let with_sidecar = prepare_image(&backend, &detector, &job(tmp.path(), "a.jpg", 1), &s);
        let without = prepare_image(&backend, &detector, &job(tmp.path(), "b.jpg", 2), &s);

        assert_eq!(
            fs::read_to_string(&with_sidecar.items[0].caption_path).unwrap(),
            "ohwx person laughing"
        );
        assert_eq!(
            fs::read_to_string(&without.items[0].caption_path).unwrap(),
            "portrait photo of ohwx person, best quality"
        );
    }

    #[test]
    fn job_caption_overrides_sidecar() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("a.txt"), "from sidecar").unwrap();
        let backend = MockBackend::new();
        let detector = SharedDetector::ready(MockDetector::none());
        let mut s = settings(tmp.path());
        s.crop = false;
        s.zoom_levels = vec![0.0];

        let report = prepare_image(
            &backend,
            &detector,
            &job(tmp.path(), "a.jpg", 1).with_caption("explicit"),
            &s,
        );

        assert_eq!(
            fs::read_to_string(&report.items[0].caption_path).unwrap(),
            "explicit"
        );
    }

    #[test]
    fn decode_failure_fails_image_without_files() {
        let tmp = TempDir::new().unwrap();
        let backend = MockBackend::new().failing_decode("bad.jpg");
        let detector = SharedDetector::ready(MockDetector::none());
        let s = settings(tmp.path());

        let report = prepare_image(&backend, &detector, &job(tmp.path(), "bad.jpg", 1), &s);

        assert!(report.is_failed());
        assert_eq!(report.attempted, 0);
        assert!(report.items.is_empty());
        assert_eq!(backend.extract_count(), 0);
        assert!(files_in(&s.subject_folder()).is_empty());
    }

    #[test]
    fn first_failure_skips_remaining_variants() {
        let tmp = TempDir::new().unwrap();
        let backend = MockBackend::new().failing_extract(2);
        let detector = SharedDetector::ready(MockDetector::none());
        let s = settings(tmp.path());

        let report = prepare_image(&backend, &detector, &job(tmp.path(), "a.jpg", 1), &s);

        assert!(
            matches!(&report.status, ImageStatus::Failed { reason } if reason.contains("mock extract failure"))
        );
        assert_eq!(report.attempted, 2);
        assert_eq!(report.items.len(), 1);
        assert_eq!(backend.extract_count(), 2);
        assert_eq!(
            files_in(&s.subject_folder()),
            vec!["ohwx (0001.0001).png", "ohwx (0001.0001).txt"]
        );
    }

    #[test]
    fn unwritable_output_fails_image() {
        let tmp = TempDir::new().unwrap();
        // A file where the `img` directory should be.
        fs::write(tmp.path().join("img"), b"").unwrap();
        let backend = MockBackend::new();
        let detector = SharedDetector::ready(MockDetector::none());

        let report = prepare_image(
            &backend,
            &detector,
            &job(tmp.path(), "a.jpg", 1),
            &settings(tmp.path()),
        );

        assert!(report.is_failed());
        assert!(backend.get_operations().is_empty());
    }

    // =========================================================================
    // prepare_batch
    // =========================================================================

    #[test]
    fn batch_isolates_failing_image() {
        let tmp = TempDir::new().unwrap();
        let backend = MockBackend::new().failing_decode("b.jpg");
        let detector = SharedDetector::ready(MockDetector::none());
        let s = settings(tmp.path());
        let jobs = vec![
            job(tmp.path(), "a.jpg", 1),
            job(tmp.path(), "b.jpg", 2),
            job(tmp.path(), "c.jpg", 3),
        ];

        let report = prepare_batch(&backend, &detector, &jobs, &s, None).unwrap();

        assert_eq!(report.succeeded(), 2);
        assert_eq!(report.failed(), 1);
        assert_eq!(report.items_written(), 8);
        let counters: Vec<u32> = report.images.iter().map(|r| r.counter).collect();
        assert_eq!(counters, vec![1, 2, 3]);
        assert!(report.images[1].is_failed());

        let files = files_in(&s.subject_folder());
        assert_eq!(files.len(), 16);
        assert!(files.iter().all(|f| !f.contains("(0002.")));
    }

    #[test]
    fn batch_isolates_image_failing_on_first_variant() {
        let tmp = TempDir::new().unwrap();
        let backend = MockBackend::new();
        let detector = SharedDetector::ready(MockDetector::none());
        let s = settings(tmp.path());
        // A directory where image 2's first PNG goes makes that write fail.
        let blocked = DatasetItem::new(&s.subject_folder(), &s.subject, 2, 1);
        fs::create_dir_all(&blocked.image_path).unwrap();
        let jobs = vec![
            job(tmp.path(), "a.jpg", 1),
            job(tmp.path(), "b.jpg", 2),
            job(tmp.path(), "c.jpg", 3),
        ];

        let report = prepare_batch(&backend, &detector, &jobs, &s, None).unwrap();

        let failed = &report.images[1];
        assert!(
            matches!(&failed.status, ImageStatus::Failed { reason } if reason.contains("Filesystem"))
        );
        assert_eq!(failed.attempted, 1);
        assert!(failed.items.is_empty());
        assert_eq!(report.images[0].items.len(), 4);
        assert_eq!(report.images[2].items.len(), 4);
        assert_eq!(backend.extract_count(), 9);

        let files: Vec<String> = fs::read_dir(s.subject_folder())
            .unwrap()
            .map(|e| e.unwrap().path())
            .filter(|p| p.is_file())
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(files.len(), 16);
        assert!(files.iter().all(|f| !f.contains("(0002.")));
    }

    #[test]
    fn batch_keeps_empty_sidecar_caption() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("a.txt"), "").unwrap();
        let backend = MockBackend::new();
        let detector = SharedDetector::ready(MockDetector::none());
        let mut s = settings(tmp.path());
        s.crop = false;
        s.zoom_levels = vec![0.0];

        let report =
            prepare_batch(&backend, &detector, &[job(tmp.path(), "a.jpg", 1)], &s, None).unwrap();

        let item = &report.images[0].items[0];
        assert_eq!(fs::read_to_string(&item.caption_path).unwrap(), "");
    }

    #[test]
    fn batch_rerun_into_same_folder_succeeds() {
        let tmp = TempDir::new().unwrap();
        let backend = MockBackend::new();
        let detector = SharedDetector::ready(MockDetector::none());
        let s = settings(tmp.path());
        let jobs = vec![job(tmp.path(), "a.jpg", 1)];

        let first = prepare_batch(&backend, &detector, &jobs, &s, None).unwrap();
        let second = prepare_batch(&backend, &detector, &jobs, &s, None).unwrap();

        assert_eq!(first.failed(), 0);
        assert_eq!(second.failed(), 0);
        assert_eq!(files_in(&s.subject_folder()).len(), 8);
    }

    #[test]
    fn batch_fails_up_front_without_detector() {
        let tmp = TempDir::new().unwrap();
        let backend = MockBackend::new();
        let detector =
            SharedDetector::lazy(|| Err(DetectionError::Unavailable("missing model".into())));
        let s = settings(tmp.path());

        let result = prepare_batch(&backend, &detector, &[job(tmp.path(), "a.jpg", 1)], &s, None);

        assert!(result.is_err());
        assert!(backend.get_operations().is_empty());
        assert!(!tmp.path().join("img").exists());
    }

    #[test]
    fn batch_emits_events() {
        let tmp = TempDir::new().unwrap();
        let backend = MockBackend::new().failing_decode("b.jpg");
        let detector = SharedDetector::ready(MockDetector::none());
        let s = settings(tmp.path());
        let jobs = vec![job(tmp.path(), "a.jpg", 1), job(tmp.path(), "b.jpg", 2)];
        let (tx, rx) = std::sync::mpsc::channel();

        prepare_batch(&backend, &detector, &jobs, &s, Some(tx)).unwrap();
        let events: Vec<PrepareEvent> = rx.iter().collect();

        assert_eq!(events.len(), 3);
        assert!(matches!(
            events[0],
            PrepareEvent::BatchStarted { image_count: 2, .. }
        ));
        let prepared = events
            .iter()
            .filter(|e| matches!(e, PrepareEvent::ImagePrepared { counter: 1, .. }))
            .count();
        let failed = events
            .iter()
            .filter(|e| matches!(e, PrepareEvent::ImageFailed { counter: 2, written: 0, .. }))
            .count();
        assert_eq!((prepared, failed), (1, 1));
    }

    #[test]
    fn report_serializes_status_tag() {
        let report = ImageReport {
            source_path: PathBuf::from("a.jpg"),
            counter: 1,
            status: ImageStatus::Failed {
                reason: "boom".into(),
            },
            items: Vec::new(),
            attempted: 1,
            face_found: false,
        };
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["status"]["state"], "failed");
        assert_eq!(json["status"]["reason"], "boom");
    }
}
