//! Production backend: `image` for stills and GIFs, ffmpeg for video.
//!
//! See the [module docs](super) for the operation-to-tool mapping.

use super::MediaKind;
use super::backend::{Dimensions, MediaBackend, MediaInfo, ProbeError};
use super::calculations::{animation_duration, fit_within};
use super::ffmpeg;
use super::params::ThumbnailParams;
use super::thumbnail::ThumbnailError;
use image::codecs::gif::GifDecoder;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{AnimationDecoder, DynamicImage, ImageDecoder, ImageReader, RgbImage};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

/// Backend used by the server and CLI.
#[derive(Debug, Clone)]
pub struct NativeBackend {
    ffmpeg: PathBuf,
    ffprobe: PathBuf,
}

impl NativeBackend {
    /// Use `ffmpeg` and `ffprobe` from `PATH`.
    pub fn new() -> Self {
        Self::with_tools("ffmpeg", "ffprobe")
    }

    pub fn with_tools(ffmpeg: impl Into<PathBuf>, ffprobe: impl Into<PathBuf>) -> Self {
        Self {
            ffmpeg: ffmpeg.into(),
            ffprobe: ffprobe.into(),
        }
    }
}

impl Default for NativeBackend {
    fn default() -> Self {
        Self::new()
    }
}

/// Open an image, sniffing the format from content rather than extension.
fn load_image(path: &Path) -> Result<DynamicImage, ProbeError> {
    ImageReader::open(path)
        .map_err(|e| ProbeError::from_io(path, e))?
        .with_guessed_format()
        .map_err(|e| ProbeError::from_io(path, e))?
        .decode()
        .map_err(|e| ProbeError::from_image(path, e))
}

fn probe_still(path: &Path) -> Result<MediaInfo, ProbeError> {
    let (width, height) = ImageReader::open(path)
        .map_err(|e| ProbeError::from_io(path, e))?
        .with_guessed_format()
        .map_err(|e| ProbeError::from_io(path, e))?
        .into_dimensions()
        .map_err(|e| ProbeError::from_image(path, e))?;
    Ok(MediaInfo::still(Dimensions { width, height }))
}

/// Dimensions plus total animation time. Decodes every frame.
fn probe_gif(path: &Path) -> Result<MediaInfo, ProbeError> {
    let file = File::open(path).map_err(|e| ProbeError::from_io(path, e))?;
    let decoder =
        GifDecoder::new(BufReader::new(file)).map_err(|e| ProbeError::from_image(path, e))?;
    let (width, height) = decoder.dimensions();

    let delays = decoder
        .into_frames()
        .map(|frame| {
            frame.map(|f| {
                let (num, den) = f.delay().numer_denom_ms();
                if den == 0 { 0.0 } else { num as f64 / den as f64 }
            })
        })
        .collect::<Result<Vec<f64>, _>>()
        .map_err(|e| ProbeError::from_image(path, e))?;

    Ok(MediaInfo {
        dimensions: Some(Dimensions { width, height }),
        duration: animation_duration(&delays),
        frame_rate: None,
    })
}

/// Write `img` as a baseline JPEG, removing the file if encoding fails.
fn save_jpeg(img: RgbImage, path: &Path, quality: u32) -> Result<(), ThumbnailError> {
    let result = write_jpeg(img, path, quality);
    if result.is_err() {
        let _ = std::fs::remove_file(path);
    }
    result
}

fn write_jpeg(img: RgbImage, path: &Path, quality: u32) -> Result<(), ThumbnailError> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    let encoder = JpegEncoder::new_with_quality(&mut writer, quality.clamp(1, 100) as u8);
    DynamicImage::ImageRgb8(img)
        .write_with_encoder(encoder)
        .map_err(|e| ThumbnailError::Encode(e.to_string()))?;
    writer.flush()?;
    Ok(())
}

impl MediaBackend for NativeBackend {
    fn probe(&self, path: &Path, kind: MediaKind) -> Result<MediaInfo, ProbeError> {
        match kind {
            MediaKind::Image => probe_still(path),
            MediaKind::Gif => probe_gif(path),
            MediaKind::Video => ffmpeg::probe_video(&self.ffprobe, path),
        }
    }

    fn thumbnail(&self, params: &ThumbnailParams) -> Result<(), ThumbnailError> {
        let img = match params.kind {
            MediaKind::Video => ffmpeg::first_frame(&self.ffmpeg, &params.source)?,
            MediaKind::Image | MediaKind::Gif => load_image(&params.source)?,
        };

        // JPEG has no alpha: palette, grey and RGBA sources all become plain RGB.
        let rgb = img.to_rgb8();
        let source = (rgb.width(), rgb.height());
        let (w, h) = fit_within(source, (params.max_width, params.max_height));
        let fitted = if (w, h) == source {
            rgb
        } else {
            image::imageops::resize(&rgb, w, h, FilterType::Lanczos3)
        };

        save_jpeg(fitted, &params.output, params.quality.value())
    }
}
