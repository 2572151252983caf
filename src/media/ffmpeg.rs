//! Video support through the `ffprobe` and `ffmpeg` executables.
//!
//! Probing asks `ffprobe` for the first video stream as JSON; thumbnails ask
//! `ffmpeg` for exactly one frame, piped back as a PNG. Both calls go through
//! [`Command::output`], which waits for the child, so no process outlives the
//! call whether it succeeds or fails.

use super::backend::{Dimensions, MediaInfo, ProbeError};
use super::calculations::video_duration;
use image::{DynamicImage, ImageFormat};
use serde::Deserialize;
use std::path::Path;
use std::process::{Command, Output};

#[derive(Debug, Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    streams: Vec<ProbeStream>,
    format: Option<ProbeFormat>,
}

/// ffprobe reports most numbers as strings.
#[derive(Debug, Deserialize)]
struct ProbeStream {
    width: Option<u32>,
    height: Option<u32>,
    r_frame_rate: Option<String>,
    avg_frame_rate: Option<String>,
    nb_frames: Option<String>,
    duration: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ProbeFormat {
    duration: Option<String>,
}

/// Probe the first video stream of `path`.
pub fn probe_video(ffprobe: &Path, path: &Path) -> Result<MediaInfo, ProbeError> {
    if !path.exists() {
        return Err(ProbeError::NotFound(path.to_path_buf()));
    }

    let output = Command::new(ffprobe)
        .args(["-v", "error", "-select_streams", "v:0", "-show_entries"])
        .arg("stream=width,height,r_frame_rate,avg_frame_rate,nb_frames,duration:format=duration")
        .args(["-of", "json"])
        .arg(path)
        .output()
        .map_err(|e| ProbeError::Tool {
            tool: "ffprobe",
            reason: e.to_string(),
        })?;
    check_status(&output, path)?;

    parse_probe_output(&output.stdout, path)
}

/// Decode the first frame of `path` into memory.
pub fn first_frame(ffmpeg: &Path, path: &Path) -> Result<DynamicImage, ProbeError> {
    if !path.exists() {
        return Err(ProbeError::NotFound(path.to_path_buf()));
    }

    let output = Command::new(ffmpeg)
        .args(["-v", "error", "-i"])
        .arg(path)
        .args([
            "-frames:v", "1", "-f", "image2pipe", "-vcodec", "png", "-pix_fmt", "rgb24", "-",
        ])
        .output()
        .map_err(|e| ProbeError::Tool {
            tool: "ffmpeg",
            reason: e.to_string(),
        })?;
    check_status(&output, path)?;

    if output.stdout.is_empty() {
        return Err(ProbeError::corrupt(path, "no video frame decoded"));
    }
    image::load_from_memory_with_format(&output.stdout, ImageFormat::Png)
        .map_err(|e| ProbeError::from_image(path, e))
}

fn check_status(output: &Output, path: &Path) -> Result<(), ProbeError> {
    if output.status.success() {
        return Ok(());
    }
    let stderr = String::from_utf8_lossy(&output.stderr);
    Err(ProbeError::corrupt(path, stderr.trim()))
}

/// Turn ffprobe's JSON into [`MediaInfo`].
///
/// Frame rate prefers the average rate over the nominal one. Frame count
/// falls back to `duration * fps` when the container does not declare it.
fn parse_probe_output(json: &[u8], path: &Path) -> Result<MediaInfo, ProbeError> {
    let parsed: ProbeOutput =
        serde_json::from_slice(json).map_err(|e| ProbeError::corrupt(path, e.to_string()))?;
    let stream = parsed
        .streams
        .into_iter()
        .next()
        .ok_or_else(|| ProbeError::corrupt(path, "no video stream"))?;

    let dimensions = match (stream.width, stream.height) {
        (Some(width), Some(height)) if width > 0 && height > 0 => {
            Some(Dimensions { width, height })
        }
        _ => None,
    };

    let fps = stream
        .avg_frame_rate
        .as_deref()
        .and_then(parse_frame_rate)
        .or_else(|| stream.r_frame_rate.as_deref().and_then(parse_frame_rate));

    let seconds = stream
        .duration
        .as_deref()
        .or(parsed.format.as_ref().and_then(|f| f.duration.as_deref()))
        .and_then(|d| d.parse::<f64>().ok())
        .filter(|d| *d > 0.0);

    let frame_count = stream
        .nb_frames
        .as_deref()
        .and_then(|n| n.parse::<u64>().ok())
        .filter(|n| *n > 0)
        .or_else(|| match (seconds, fps) {
            (Some(s), Some(f)) => Some((s * f).round() as u64),
            _ => None,
        });

    let duration = match (frame_count, fps) {
        (Some(frames), Some(fps)) => video_duration(frames, fps),
        _ => None,
    };

    Ok(MediaInfo {
        dimensions,
        duration,
        frame_rate: fps,
    })
}

/// Parse `"30000/1001"` or `"25"` into frames per second. `"0/0"` is `None`.
fn parse_frame_rate(raw: &str) -> Option<f64> {
    let rate = match raw.split_once('/') {
        Some((num, den)) => {
            let num: f64 = num.trim().parse().ok()?;
            let den: f64 = den.trim().parse().ok()?;
            if den == 0.0 {
                return None;
            }
            num / den
        }
        None => raw.trim().parse().ok()?,
    };
    (rate.is_finite() && rate > 0.0).then_some(rate)
}
