//! Folder scanning.
//!
//! Walks one folder subtree of the dataset and writes a media row for every
//! supported file in it:
//!
//! ```text
//! dataset/                         rows written for scan("Trips")
//! ├── Trips/
//! │   ├── a.jpg                    ("Trips", "a.jpg")
//! │   ├── .thumbnails/             skipped (hidden)
//! │   └── Rome/
//! │       ├── b.gif                ("Trips/Rome", "b.gif")
//! │       └── c.mp4                ("Trips/Rome", "c.mp4")
//! └── Other/                       not visited
//! ```
//!
//! Entries are visited in file-name order. For each file the scanner probes
//! dimensions, makes sure a thumbnail exists, and buffers the row. Buffered
//! rows are written in one transaction every `batch_size` files and once more
//! at the end.
//!
//! ## Failures
//!
//! - **Per file** (stat failure, empty file): logged, file skipped, scan continues.
//! - **Probe or thumbnail failure**: not a failure at all. The row is written
//!   with null dimensions or a null thumbnail.
//! - **Whole scan** (walk error, store error): the scan stops. Batches already
//!   committed stay; the pending batch is dropped.

use crate::config::GalleryConfig;
use crate::media::{self, MediaBackend, MediaKind, ThumbnailOutcome, ThumbnailSettings};
use crate::paths::{self, PathError};
use crate::store::{MediaItem, MediaRepository, StoreError};
use chrono::{DateTime, Utc};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};
use walkdir::{DirEntry, WalkDir};

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("Folder not found: {0}")]
    FolderNotFound(PathBuf),
    #[error("Path rejected: {0}")]
    Path(#[from] PathError),
    #[error("Walk error: {0}")]
    Walk(#[from] walkdir::Error),
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

/// Why a single file was left out of the scan.
#[derive(Error, Debug)]
enum SkipReason {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("empty file")]
    Empty,
    #[error("not under the dataset root")]
    OutsideRoot,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanOptions {
    /// Rows per transaction.
    pub batch_size: usize,
    pub thumbnails: ThumbnailSettings,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            batch_size: 100,
            thumbnails: ThumbnailSettings::default(),
        }
    }
}

impl ScanOptions {
    pub fn from_config(config: &GalleryConfig) -> Self {
        Self {
            batch_size: config.scan.batch_size.max(1),
            thumbnails: config.thumbnails.settings(),
        }
    }
}

/// Counters for one scan.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanReport {
    /// Folder key the scan ran on (`""` for the root).
    pub folder: String,
    pub files_processed: usize,
    pub files_skipped: usize,
    pub thumbnails_generated: usize,
    pub thumbnails_reused: usize,
    pub thumbnails_failed: usize,
    pub batches_committed: usize,
}

impl fmt::Display for ScanReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} files indexed, {} skipped; thumbnails: {} generated, {} reused",
            self.files_processed,
            self.files_skipped,
            self.thumbnails_generated,
            self.thumbnails_reused,
        )?;
        if self.thumbnails_failed > 0 {
            write!(f, ", {} failed", self.thumbnails_failed)?;
        }
        Ok(())
    }
}

/// Scan `folder` (relative to `root`) and everything below it.
pub fn scan(
    root: &Path,
    folder: &str,
    backend: &(impl MediaBackend + ?Sized),
    repo: &(impl MediaRepository + ?Sized),
    options: &ScanOptions,
) -> Result<ScanReport, ScanError> {
    let key = paths::folder_key(folder)?;
    let dir = paths::resolve_within(root, folder)?;
    if !dir.is_dir() {
        return Err(ScanError::FolderNotFound(dir));
    }

    info!(folder = %key, "scan started");
    let mut report = ScanReport {
        folder: key,
        ..ScanReport::default()
    };
    let batch_size = options.batch_size.max(1);
    let mut batch = Vec::with_capacity(batch_size);

    let walker = WalkDir::new(&dir)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !is_hidden_dir(e));

    for entry in walker {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let Some(kind) = media::classify(entry.path()) else {
            continue;
        };

        match index_file(root, entry.path(), kind, backend, options, &mut report) {
            Ok(item) => {
                batch.push(item);
                report.files_processed += 1;
            }
            Err(e) => {
                warn!(path = %entry.path().display(), error = %e, "skipping file");
                report.files_skipped += 1;
                continue;
            }
        }

        if batch.len() >= batch_size {
            flush(repo, &mut batch, &mut report)?;
            debug!(folder = %report.folder, files = report.files_processed, "batch committed");
        }
    }
    flush(repo, &mut batch, &mut report)?;

    info!(folder = %report.folder, "scan finished: {report}");
    Ok(report)
}

fn flush(
    repo: &(impl MediaRepository + ?Sized),
    batch: &mut Vec<MediaItem>,
    report: &mut ScanReport,
) -> Result<(), StoreError> {
    if batch.is_empty() {
        return Ok(());
    }
    repo.upsert_batch(batch)?;
    batch.clear();
    report.batches_committed += 1;
    Ok(())
}

/// Hidden directories, `.thumbnails` included.
fn is_hidden_dir(entry: &DirEntry) -> bool {
    entry.file_type().is_dir() && entry.file_name().to_string_lossy().starts_with('.')
}

/// Build the row for one file. Probe and thumbnail failures only null out fields.
fn index_file(
    root: &Path,
    path: &Path,
    kind: MediaKind,
    backend: &(impl MediaBackend + ?Sized),
    options: &ScanOptions,
    report: &mut ScanReport,
) -> Result<MediaItem, SkipReason> {
    let metadata = fs::metadata(path)?;
    if metadata.len() == 0 {
        return Err(SkipReason::Empty);
    }
    let modified_at: DateTime<Utc> = metadata.modified()?.into();

    let filename = path
        .file_name()
        .ok_or(SkipReason::OutsideRoot)?
        .to_string_lossy()
        .to_string();
    let folder_path = path
        .parent()
        .and_then(|dir| paths::relative_slash(dir, root))
        .ok_or(SkipReason::OutsideRoot)?;

    let info = media::extract(backend, path, kind);

    let thumbnail = media::make_thumbnail(backend, path, root, kind, &options.thumbnails);
    match &thumbnail {
        Some(ThumbnailOutcome::Generated(_)) => report.thumbnails_generated += 1,
        Some(ThumbnailOutcome::Reused(_)) => report.thumbnails_reused += 1,
        None => report.thumbnails_failed += 1,
    }
    let thumbnail_path = thumbnail.map(ThumbnailOutcome::into_relative_path);

    Ok(MediaItem {
        folder_path,
        filename,
        kind,
        file_size: metadata.len(),
        dimensions: info.dimensions,
        duration: info.duration,
        frame_rate: info.frame_rate,
        thumbnail_path,
        modified_at,
        indexed_at: Utc::now(),
    })
}
