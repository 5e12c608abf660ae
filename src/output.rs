//! CLI output formatting for all commands.
//!
//! # Information-First Display
//!
//! Every photo is shown by its positional index and file name, with what
//! happened to it as indented context lines. Produced pairs are shown by
//! their file name only; the subject folder is printed once in the header.
//!
//! # Output Format
//!
//! ## Prepare
//!
//! ```text
//! ohwx person (3 photos) → dataset/img/50_ohwx person
//! 001 IMG_0001.jpg
//!     Face: found
//!     ohwx (0001.0001).png
//! 002 IMG_0002.jpg
//!     Failed: Image codec failed: ...
//!
//! Prepared 2 of 3 photos, 2 pairs written, 1 failed
//! ```
//!
//! ## Check
//!
//! ```text
//! Photos (3)
//! 001 IMG_0001.jpg
//! 002 IMG_0002.jpg
//! 003 IMG_0003.jpg
//!
//! Plan
//!     Subject: ohwx person
//!     Folder: dataset/img/50_ohwx person
//!     Sizes: 1024x1024, 832x1216 (closest aspect per photo)
//!     Zoom levels: 0, 0.5
//!     Variants: 2 per photo, 6 total
//! ```
//!
//! # Architecture
//!
//! Each command has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format
//! functions are pure: no I/O, no side effects.

use crate::naming::ListedItem;
use crate::prepare::{BatchJob, BatchReport, PrepareEvent, PrepareSettings};
use std::path::Path;

// ============================================================================
// Shared display helpers
// ============================================================================

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

/// File name of a path, or the whole path when it has none.
fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|f| f.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Format a photo line: positional index + file name.
///
/// ```text
/// 001 IMG_0001.jpg
/// ```
fn photo_line(index: usize, path: &Path) -> String {
    format!("{} {}", format_index(index), file_name(path))
}

fn plural(count: usize, one: &str, many: &str) -> String {
    if count == 1 {
        format!("{count} {one}")
    } else {
        format!("{count} {many}")
    }
}

// ============================================================================
// Prepare
// ============================================================================

/// Format a single prepare progress event as display lines.
pub fn format_prepare_event(event: &PrepareEvent, settings: &PrepareSettings) -> Vec<String> {
    match event {
        PrepareEvent::BatchStarted {
            image_count,
            folder,
        } => vec![format!(
            "{} {} ({}) \u{2192} {}",
            settings.subject,
            settings.class_name,
            plural(*image_count, "photo", "photos"),
            folder.display()
        )],
        PrepareEvent::ImagePrepared {
            counter,
            source_path,
            face_found,
            items,
        } => {
            let mut lines = vec![photo_line(*counter as usize, source_path)];
            let face = if *face_found { "found" } else { "none, centered crop" };
            lines.push(format!("{}Face: {}", indent(1), face));
            for item in items {
                lines.push(format!("{}{}", indent(1), file_name(&item.image_path)));
            }
            lines
        }
        PrepareEvent::ImageFailed {
            counter,
            source_path,
            reason,
            written,
        } => {
            let mut lines = vec![
                photo_line(*counter as usize, source_path),
                format!("{}Failed: {}", indent(1), reason),
            ];
            if *written > 0 {
                lines.push(format!(
                    "{}Kept {} written before the failure",
                    indent(1),
                    plural(*written, "pair", "pairs")
                ));
            }
            lines
        }
    }
}

/// Format the closing summary of a prepare run.
pub fn format_batch_summary(report: &BatchReport) -> Vec<String> {
    let total = report.images.len();
    let mut summary = format!(
        "Prepared {} of {}, {} written",
        report.succeeded(),
        plural(total, "photo", "photos"),
        plural(report.items_written(), "pair", "pairs"),
    );
    if report.failed() > 0 {
        summary.push_str(&format!(", {} failed", report.failed()));
    }
    vec![String::new(), summary]
}

/// Print the closing summary to stdout.
pub fn print_batch_summary(report: &BatchReport) {
    for line in format_batch_summary(report) {
        println!("{}", line);
    }
}

// ============================================================================
// Check
// ============================================================================

fn format_zoom(zoom: f64) -> String {
    format!("{zoom}")
}

/// Format the plan for a prepare run without running it.
pub fn format_check_output(jobs: &[BatchJob], settings: &PrepareSettings) -> Vec<String> {
    let mut lines = vec![format!("Photos ({})", jobs.len())];
    for job in jobs {
        lines.push(photo_line(job.counter as usize, &job.source_path));
    }

    let sizes = if settings.sizes.is_empty() {
        format!("{}", crate::imaging::FALLBACK_SIZE)
    } else {
        settings
            .sizes
            .iter()
            .map(|s| s.to_string())
            .collect::<Vec<_>>()
            .join(", ")
    };
    let mode = if settings.crop {
        "every size"
    } else {
        "closest aspect per photo"
    };
    let zooms = settings
        .zoom_levels
        .iter()
        .map(|z| format_zoom(*z))
        .collect::<Vec<_>>()
        .join(", ");
    let per_image = settings.variants_per_image();

    lines.push(String::new());
    lines.push("Plan".to_string());
    lines.push(format!(
        "{}Subject: {} {}",
        indent(1),
        settings.subject,
        settings.class_name
    ));
    lines.push(format!(
        "{}Folder: {}",
        indent(1),
        settings.subject_folder().display()
    ));
    lines.push(format!("{}Sizes: {} ({})", indent(1), sizes, mode));
    lines.push(format!("{}Zoom levels: {}", indent(1), zooms));
    lines.push(format!(
        "{}Variants: {} per photo, {} total",
        indent(1),
        per_image,
        per_image * jobs.len()
    ));
    lines
}

/// Print the check plan to stdout.
pub fn print_check_output(jobs: &[BatchJob], settings: &PrepareSettings) {
    for line in format_check_output(jobs, settings) {
        println!("{}", line);
    }
}

// ============================================================================
// List
// ============================================================================

/// Format the pairs found in a subject folder.
///
/// ```text
/// 0001.0001 ohwx (0001.0001).png
/// 0001.0002 ohwx (0001.0002).png
///
/// 2 pairs in dataset/img/5_ohwx person
/// ```
pub fn format_item_list(folder: &Path, items: &[ListedItem]) -> Vec<String> {
    let mut lines: Vec<String> = items
        .iter()
        .map(|listed| {
            format!(
                "{} {}",
                crate::naming::variant_id(listed.variant.counter, listed.variant.local),
                file_name(&listed.item.image_path)
            )
        })
        .collect();
    if !lines.is_empty() {
        lines.push(String::new());
    }
    lines.push(format!(
        "{} in {}",
        plural(items.len(), "pair", "pairs"),
        folder.display()
    ));
    lines
}

/// Print the item list to stdout.
pub fn print_item_list(folder: &Path, items: &[ListedItem]) {
    for line in format_item_list(folder, items) {
        println!("{}", line);
    }
}
