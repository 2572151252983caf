//! Media backend trait and shared types.
//!
//! The [`MediaBackend`] trait defines the two operations the scanner needs:
//! probe (dimensions, duration, frame rate) and thumbnail (bounded JPEG).
//!
//! The production implementation is
//! [`NativeBackend`](super::native::NativeBackend): the `image` crate for
//! stills and GIFs, `ffprobe`/`ffmpeg` subprocesses for video.

use super::MediaKind;
use super::params::ThumbnailParams;
use super::thumbnail::ThumbnailError;
use image::ImageError;
use serde::Serialize;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Why a file could not be probed.
#[derive(Error, Debug)]
pub enum ProbeError {
    #[error("File not found: {0}")]
    NotFound(PathBuf),
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("Corrupt media {path}: {reason}")]
    Corrupt { path: PathBuf, reason: String },
    #[error("Unsupported format: {0}")]
    Unsupported(PathBuf),
    #[error("{tool} failed: {reason}")]
    Tool { tool: &'static str, reason: String },
}

impl ProbeError {
    pub(crate) fn from_io(path: &Path, err: io::Error) -> Self {
        if err.kind() == io::ErrorKind::NotFound {
            ProbeError::NotFound(path.to_path_buf())
        } else {
            ProbeError::Io(err)
        }
    }

    pub(crate) fn from_image(path: &Path, err: ImageError) -> Self {
        match err {
            ImageError::IoError(e) => Self::from_io(path, e),
            ImageError::Unsupported(_) => ProbeError::Unsupported(path.to_path_buf()),
            other => ProbeError::Corrupt {
                path: path.to_path_buf(),
                reason: other.to_string(),
            },
        }
    }

    pub(crate) fn corrupt(path: &Path, reason: impl Into<String>) -> Self {
        ProbeError::Corrupt {
            path: path.to_path_buf(),
            reason: reason.into(),
        }
    }
}

/// Pixel dimensions of a still image or video frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

/// Everything a probe can learn about a file. All fields are optional:
/// stills have no duration, and only videos carry a frame rate.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MediaInfo {
    pub dimensions: Option<Dimensions>,
    /// Seconds.
    pub duration: Option<f64>,
    /// Frames per second.
    pub frame_rate: Option<f64>,
}

impl MediaInfo {
    pub fn still(dimensions: Dimensions) -> Self {
        Self {
            dimensions: Some(dimensions),
            ..Self::default()
        }
    }
}

/// Trait for media processing backends.
///
/// `Send + Sync` because a single backend is shared by the HTTP handlers and
/// every scan worker.
pub trait MediaBackend: Send + Sync {
    /// Read dimensions and timing.
    fn probe(&self, path: &Path, kind: MediaKind) -> Result<MediaInfo, ProbeError>;

    /// Render a bounded JPEG thumbnail to `params.output`.
    fn thumbnail(&self, params: &ThumbnailParams) -> Result<(), ThumbnailError>;
}
