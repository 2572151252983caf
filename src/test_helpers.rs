//! Shared test utilities: synthetic media files written with the `image` crate.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let tmp = TempDir::new().unwrap();
//! create_test_jpeg(&tmp.path().join("wide.jpg"), 800, 400);
//! create_animated_gif(&tmp.path().join("anim.gif"), 32, 16, &[200, 0, 300]);
//! ```

use image::codecs::gif::GifEncoder;
use image::codecs::jpeg::JpegEncoder;
use image::{
    Delay, ExtendedColorType, Frame, ImageEncoder, LumaA, Rgb, RgbImage, Rgba, RgbaImage,
};
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::Path;
use std::time::Duration;

fn create_parent(path: &Path) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
}

// =========================================================================
// Stills
// =========================================================================

/// Create a small valid JPEG file with the given dimensions.
pub fn create_test_jpeg(path: &Path, width: u32, height: u32) {
    create_parent(path);
    let img = RgbImage::from_fn(width, height, |x, y| {
        Rgb([(x % 256) as u8, (y % 256) as u8, 128])
    });
    let writer = BufWriter::new(File::create(path).unwrap());
    JpegEncoder::new(writer)
        .write_image(img.as_raw(), width, height, ExtendedColorType::Rgb8)
        .unwrap();
}

/// PNG with a transparent left half.
pub fn create_test_png_rgba(path: &Path, width: u32, height: u32) {
    create_parent(path);
    let img = RgbaImage::from_fn(width, height, |x, _| {
        let alpha = if x < width / 2 { 0 } else { 255 };
        Rgba([200, 40, 40, alpha])
    });
    img.save(path).unwrap();
}

/// Grayscale PNG with an alpha channel.
pub fn create_test_png_gray_alpha(path: &Path, width: u32, height: u32) {
    create_parent(path);
    let img = image::ImageBuffer::from_fn(width, height, |x, y| {
        LumaA([((x + y) % 256) as u8, 180u8])
    });
    img.save(path).unwrap();
}

// =========================================================================
// Animation
// =========================================================================

/// GIF with one frame per entry in `delays_ms`.
///
/// Delays are stored in centiseconds, so use multiples of 10.
pub fn create_animated_gif(path: &Path, width: u32, height: u32, delays_ms: &[u32]) {
    create_parent(path);
    let file = File::create(path).unwrap();
    let mut encoder = GifEncoder::new(BufWriter::new(file));
    for (i, delay) in delays_ms.iter().enumerate() {
        let shade = (i * 60 % 256) as u8;
        let buffer = RgbaImage::from_pixel(width, height, Rgba([shade, 0, 255 - shade, 255]));
        let delay = Delay::from_saturating_duration(Duration::from_millis(u64::from(*delay)));
        encoder
            .encode_frame(Frame::from_parts(buffer, 0, 0, delay))
            .unwrap();
    }
}
