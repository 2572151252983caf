//! CLI output formatting.
//!
//! Every entity gets a header line (position + name + counts) followed by
//! indented context lines, so the output reads as an inventory of the
//! dataset while still pointing at the files behind it.
//!
//! ## Folders
//!
//! ```text
//! Folders in Trips
//! 001 Oslo (12 files)
//!     Path: Trips/Oslo
//!     Preview: Trips/Oslo/IMG_0001.jpg
//! 002 Rome (0 files, 2 subfolders)
//!     Path: Trips/Rome
//!     Preview: Trips/Rome/Day1/a.jpg
//! ```
//!
//! ## Scan
//!
//! ```text
//! Scanned Trips
//!     Indexed: 42 files (1 skipped)
//!     Thumbnails: 3 generated, 39 reused
//!     Batches: 1
//! ```
//!
//! Each section has a `format_*` function (returns `Vec<String>`, no I/O)
//! and a `print_*` wrapper that writes to stdout.

use crate::folders::Folder;
use crate::scan::ScanReport;

fn format_index(pos: usize) -> String {
    format!("{:03}", pos)
}

/// `"Trips"` for a folder key, `"the dataset root"` for `""`.
fn folder_label(key: &str) -> &str {
    if key.is_empty() {
        "the dataset root"
    } else {
        key
    }
}

fn plural(count: usize, one: &str, many: &str) -> String {
    if count == 1 {
        format!("{count} {one}")
    } else {
        format!("{count} {many}")
    }
}

/// `001 Rome (0 files, 2 subfolders)`. Subfolders are only mentioned when present.
fn folder_header(index: usize, folder: &Folder) -> String {
    let mut counts = plural(folder.count, "file", "files");
    if folder.subfolder_count > 0 {
        counts.push_str(&format!(
            ", {}",
            plural(folder.subfolder_count, "subfolder", "subfolders")
        ));
    }
    format!("{} {} ({})", format_index(index), folder.name, counts)
}

// ============================================================================
// Folders
// ============================================================================

pub fn format_folders(parent: &str, folders: &[Folder]) -> Vec<String> {
    let mut lines = vec![format!("Folders in {}", folder_label(parent))];
    if folders.is_empty() {
        lines.push("    (none)".to_string());
        return lines;
    }
    for (i, folder) in folders.iter().enumerate() {
        lines.push(folder_header(i + 1, folder));
        lines.push(format!("    Path: {}", folder.path));
        if let Some(preview) = &folder.thumbnail {
            lines.push(format!("    Preview: {}", preview));
        }
    }
    lines
}

pub fn print_folders(parent: &str, folders: &[Folder]) {
    for line in format_folders(parent, folders) {
        println!("{}", line);
    }
}

// ============================================================================
// Scan
// ============================================================================

pub fn format_scan_report(report: &ScanReport) -> Vec<String> {
    let mut lines = vec![format!("Scanned {}", folder_label(&report.folder))];

    let mut indexed = format!(
        "    Indexed: {}",
        plural(report.files_processed, "file", "files")
    );
    if report.files_skipped > 0 {
        indexed.push_str(&format!(" ({} skipped)", report.files_skipped));
    }
    lines.push(indexed);

    let mut thumbs = format!(
        "    Thumbnails: {} generated, {} reused",
        report.thumbnails_generated, report.thumbnails_reused
    );
    if report.thumbnails_failed > 0 {
        thumbs.push_str(&format!(", {} failed", report.thumbnails_failed));
    }
    lines.push(thumbs);

    lines.push(format!("    Batches: {}", report.batches_committed));
    lines
}

pub fn print_scan_report(report: &ScanReport) {
    for line in format_scan_report(report) {
        println!("{}", line);
    }
}
