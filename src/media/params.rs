//! Parameter types for media operations.
//!
//! These structs describe *what* to render, not *how*. They are the interface
//! between [`thumbnail`](super::thumbnail) (which decides where thumbnails go
//! and whether they need rebuilding) and the [`backend`](super::backend)
//! (which does the pixel work), so tests can swap in a mock backend.

use super::MediaKind;
use std::path::PathBuf;

/// JPEG quality (1-100).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quality(pub u32);

impl Quality {
    pub fn new(value: u32) -> Self {
        Self(value.clamp(1, 100))
    }

    pub fn value(self) -> u32 {
        self.0
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self(85)
    }
}

/// A single thumbnail render: fit `source` inside the box, write JPEG to `output`.
#[derive(Debug, Clone, PartialEq)]
pub struct ThumbnailParams {
    pub source: PathBuf,
    pub output: PathBuf,
    /// Videos are decoded through ffmpeg, everything else in-process.
    pub kind: MediaKind,
    pub max_width: u32,
    pub max_height: u32,
    pub quality: Quality,
}
