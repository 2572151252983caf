//! Media classification, probing and thumbnails.
//!
//! | Operation | Images | GIFs | Videos |
//! |---|---|---|---|
//! | **Dimensions** | `ImageReader::into_dimensions` | `GifDecoder` | `ffprobe` JSON |
//! | **Duration** | none | sum of frame delays | frame count / fps |
//! | **Thumbnail** | decode → RGB → Lanczos3 → JPEG | first frame, same path | `ffmpeg` first frame → PNG → same path |
//!
//! The module is split into:
//! - **Calculations**: pure functions for fit boxes and durations (unit testable)
//! - **Parameters**: data structures describing a thumbnail render
//! - **Backend**: [`MediaBackend`] trait + [`NativeBackend`]
//! - **Thumbnail**: destination planning, freshness and the scanner-facing
//!   [`make_thumbnail`]
//!
//! [`extract`] and [`make_thumbnail`] are the two entry points the scanner
//! uses. Both swallow (and log) errors: a file that cannot be probed is still
//! indexed, just with null metadata.

pub mod backend;
mod calculations;
pub mod ffmpeg;
pub mod native;
mod params;
pub mod thumbnail;

pub use backend::{Dimensions, MediaBackend, MediaInfo, ProbeError};
pub use native::NativeBackend;
pub use params::{Quality, ThumbnailParams};
pub use thumbnail::{
    THUMBNAIL_DIR, ThumbnailError, ThumbnailOutcome, ThumbnailSettings, ensure_thumbnail,
    make_thumbnail, thumbnail_path_for,
};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Extensions indexed as video.
pub const VIDEO_EXTENSIONS: &[&str] = &["mp4", "mov", "avi", "webm"];

/// Every extension the gallery indexes, videos included.
pub const SUPPORTED_EXTENSIONS: &[&str] = &[
    "jpg", "jpeg", "png", "gif", "bmp", "webp", "heic", "mp4", "mov", "avi", "webm",
];

/// Coarse media type, decided by file extension alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Gif,
    Video,
}

impl MediaKind {
    pub fn as_str(self) -> &'static str {
        match self {
            MediaKind::Image => "image",
            MediaKind::Gif => "gif",
            MediaKind::Video => "video",
        }
    }

    pub fn is_video(self) -> bool {
        self == MediaKind::Video
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MediaKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "image" => Ok(MediaKind::Image),
            "gif" => Ok(MediaKind::Gif),
            "video" => Ok(MediaKind::Video),
            other => Err(format!("unknown media kind: {other}")),
        }
    }
}

/// Classify a path by extension (case-insensitive). `None` = not indexed.
pub fn classify(path: &Path) -> Option<MediaKind> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    if !SUPPORTED_EXTENSIONS.contains(&ext.as_str()) {
        return None;
    }
    Some(if VIDEO_EXTENSIONS.contains(&ext.as_str()) {
        MediaKind::Video
    } else if ext == "gif" {
        MediaKind::Gif
    } else {
        MediaKind::Image
    })
}

/// Probe a file, mapping any failure to empty metadata.
///
/// The error is logged at `warn`; callers that need to tell failures apart
/// use [`MediaBackend::probe`] directly.
pub fn extract(backend: &(impl MediaBackend + ?Sized), path: &Path, kind: MediaKind) -> MediaInfo {
    match backend.probe(path, kind) {
        Ok(info) => info,
        Err(e) => {
            tracing::warn!(path = %path.display(), kind = %kind, error = %e, "could not read media metadata");
            MediaInfo::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::backend::tests::MockBackend;
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn classify_by_extension() {
        assert_eq!(classify(Path::new("a/b.jpg")), Some(MediaKind::Image));
        assert_eq!(classify(Path::new("b.HEIC")), Some(MediaKind::Image));
        assert_eq!(classify(Path::new("b.webp")), Some(MediaKind::Image));
        assert_eq!(classify(Path::new("anim.GIF")), Some(MediaKind::Gif));
        assert_eq!(classify(Path::new("clip.MoV")), Some(MediaKind::Video));
        assert_eq!(classify(Path::new("clip.webm")), Some(MediaKind::Video));
    }

    #[test]
    fn classify_rejects_unsupported() {
        assert_eq!(classify(Path::new("notes.txt")), None);
        assert_eq!(classify(Path::new("raw.cr2")), None);
        assert_eq!(classify(Path::new("no_extension")), None);
        assert_eq!(classify(Path::new(".jpg")), None);
    }

    #[test]
    fn kind_string_roundtrip() {
        for kind in [MediaKind::Image, MediaKind::Gif, MediaKind::Video] {
            assert_eq!(kind.as_str().parse::<MediaKind>(), Ok(kind));
        }
        assert!("movie".parse::<MediaKind>().is_err());
    }

    #[test]
    fn extract_passes_through_probe_result() {
        let backend = MockBackend::new();
        let path = PathBuf::from("/data/a.jpg");
        backend.set_info(
            &path,
            MediaInfo::still(Dimensions {
                width: 640,
                height: 480,
            }),
        );

        let info = extract(&backend, &path, MediaKind::Image);
        assert_eq!(
            info.dimensions,
            Some(Dimensions {
                width: 640,
                height: 480
            })
        );
    }

    #[test]
    fn extract_maps_errors_to_empty() {
        let backend = MockBackend::new();
        backend.fail_probe(Path::new("/data/broken.jpg"));

        let info = extract(&backend, Path::new("/data/broken.jpg"), MediaKind::Image);
        assert_eq!(info, MediaInfo::default());
    }
}
