//! Pure calculation functions for thumbnails and timing.
//!
//! All functions here are pure and testable without any I/O or media files.

/// Delay assumed for animation frames that declare none, in milliseconds.
pub const DEFAULT_FRAME_DELAY_MS: f64 = 100.0;

/// Scale `source` down to fit inside `bound`, preserving aspect ratio.
///
/// Never upscales: a source already inside the box is returned unchanged.
/// Neither side drops below 1px.
///
/// ```text
/// fit_within((1600, 900), (300, 300)) == (300, 169)
/// fit_within((200, 100),  (300, 300)) == (200, 100)
/// ```
pub fn fit_within(source: (u32, u32), bound: (u32, u32)) -> (u32, u32) {
    let (src_w, src_h) = source;
    let (max_w, max_h) = bound;

    if src_w == 0 || src_h == 0 || (src_w <= max_w && src_h <= max_h) {
        return source;
    }

    let scale = (max_w as f64 / src_w as f64).min(max_h as f64 / src_h as f64);
    let w = ((src_w as f64 * scale).round() as u32).max(1);
    let h = ((src_h as f64 * scale).round() as u32).max(1);
    (w, h)
}

/// Video duration in seconds, or `None` when the frame rate is unknown.
pub fn video_duration(frame_count: u64, fps: f64) -> Option<f64> {
    (fps > 0.0).then(|| frame_count as f64 / fps)
}

/// Total running time of an animation in seconds.
///
/// Frames with no delay count as [`DEFAULT_FRAME_DELAY_MS`]. A single frame
/// is a still picture and has no duration.
pub fn animation_duration(delays_ms: &[f64]) -> Option<f64> {
    if delays_ms.len() <= 1 {
        return None;
    }
    let total_ms: f64 = delays_ms
        .iter()
        .map(|&d| if d > 0.0 { d } else { DEFAULT_FRAME_DELAY_MS })
        .sum();
    Some(total_ms / 1000.0)
}
