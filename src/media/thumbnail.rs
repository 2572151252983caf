//! Thumbnail planning and caching.
//!
//! Every source file gets one thumbnail next to it:
//!
//! ```text
//! Trips/Rome/IMG_0042.jpg  →  Trips/Rome/.thumbnails/IMG_0042_thumb.jpg
//! Trips/Rome/walk.mp4      →  Trips/Rome/.thumbnails/walk_thumb.jpg
//! ```
//!
//! A thumbnail whose mtime is at least the source's mtime is reused as-is;
//! that comparison is the only cache rule. Pixel work is delegated to a
//! [`MediaBackend`].

use super::MediaKind;
use super::backend::{MediaBackend, ProbeError};
use super::params::{Quality, ThumbnailParams};
use crate::paths;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Hidden per-folder directory holding generated thumbnails.
pub const THUMBNAIL_DIR: &str = ".thumbnails";

#[derive(Error, Debug)]
pub enum ThumbnailError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("Decode failed: {0}")]
    Decode(#[from] ProbeError),
    #[error("Encode failed: {0}")]
    Encode(String),
    #[error("No thumbnail location for {0}")]
    NoDestination(PathBuf),
    #[error("{path} is outside {root}")]
    OutsideRoot { path: PathBuf, root: PathBuf },
}

/// Bounding box and encoding quality for generated thumbnails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThumbnailSettings {
    pub max_width: u32,
    pub max_height: u32,
    pub quality: Quality,
}

impl Default for ThumbnailSettings {
    fn default() -> Self {
        Self {
            max_width: 300,
            max_height: 300,
            quality: Quality::default(),
        }
    }
}

/// What [`ensure_thumbnail`] did. Both carry the root-relative thumbnail path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ThumbnailOutcome {
    Reused(String),
    Generated(String),
}

impl ThumbnailOutcome {
    pub fn relative_path(&self) -> &str {
        match self {
            ThumbnailOutcome::Reused(p) | ThumbnailOutcome::Generated(p) => p,
        }
    }

    pub fn into_relative_path(self) -> String {
        match self {
            ThumbnailOutcome::Reused(p) | ThumbnailOutcome::Generated(p) => p,
        }
    }
}

/// Where the thumbnail for `source` lives. `None` for paths without a file name.
pub fn thumbnail_path_for(source: &Path) -> Option<PathBuf> {
    let dir = source.parent()?;
    let stem = source.file_stem()?.to_string_lossy();
    Some(dir.join(THUMBNAIL_DIR).join(format!("{stem}_thumb.jpg")))
}

/// True when `thumb` exists and is not older than `source`.
pub fn is_fresh(thumb: &Path, source: &Path) -> io::Result<bool> {
    let thumb_modified = match fs::metadata(thumb) {
        Ok(meta) => meta.modified()?,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(false),
        Err(e) => return Err(e),
    };
    let source_modified = fs::metadata(source)?.modified()?;
    Ok(thumb_modified >= source_modified)
}

/// Make sure `source` has an up-to-date thumbnail.
///
/// Creates the `.thumbnails` directory on demand. On failure any partially
/// written output is removed.
pub fn ensure_thumbnail(
    backend: &(impl MediaBackend + ?Sized),
    source: &Path,
    root: &Path,
    kind: MediaKind,
    settings: &ThumbnailSettings,
) -> Result<ThumbnailOutcome, ThumbnailError> {
    let dest =
        thumbnail_path_for(source).ok_or_else(|| ThumbnailError::NoDestination(source.into()))?;
    let relative = paths::relative_slash(&dest, root).ok_or_else(|| ThumbnailError::OutsideRoot {
        path: dest.clone(),
        root: root.to_path_buf(),
    })?;

    if is_fresh(&dest, source)? {
        return Ok(ThumbnailOutcome::Reused(relative));
    }

    if let Some(dir) = dest.parent() {
        fs::create_dir_all(dir)?;
    }
    let params = ThumbnailParams {
        source: source.to_path_buf(),
        output: dest.clone(),
        kind,
        max_width: settings.max_width,
        max_height: settings.max_height,
        quality: settings.quality,
    };
    if let Err(e) = backend.thumbnail(&params) {
        let _ = fs::remove_file(&dest);
        return Err(e);
    }
    Ok(ThumbnailOutcome::Generated(relative))
}

/// Scanner-facing wrapper around [`ensure_thumbnail`]: failures are logged
/// and become `None`.
pub fn make_thumbnail(
    backend: &(impl MediaBackend + ?Sized),
    source: &Path,
    root: &Path,
    kind: MediaKind,
    settings: &ThumbnailSettings,
) -> Option<ThumbnailOutcome> {
    match ensure_thumbnail(backend, source, root, kind, settings) {
        Ok(outcome) => Some(outcome),
        Err(e) => {
            tracing::warn!(path = %source.display(), error = %e, "thumbnail generation failed");
            None
        }
    }
}
