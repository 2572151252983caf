//! End-to-end: real images on disk → scan → store → cache policy → layout.
//!
//! Uses the production backend with JPEG/PNG/GIF files generated on the fly,
//! so no ffmpeg is needed. Videos are not covered here.

use chrono::{TimeDelta, Utc};
use folder_gal::cache::CachePolicy;
use folder_gal::layout::{self, LayoutParams};
use folder_gal::media::{Dimensions, MediaKind, NativeBackend};
use folder_gal::scan::{self, ScanOptions};
use folder_gal::store::{MediaKey, MediaRepository, PageRequest, SqliteStore};
use image::{Rgb, RgbImage, Rgba, RgbaImage};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn write_jpeg(root: &Path, rel: &str, width: u32, height: u32) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    RgbImage::from_fn(width, height, |x, y| Rgb([(x % 256) as u8, (y % 256) as u8, 90]))
        .save(&path)
        .unwrap();
}

fn write_png(root: &Path, rel: &str, width: u32, height: u32) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    RgbaImage::from_pixel(width, height, Rgba([10, 200, 30, 128]))
        .save(&path)
        .unwrap();
}

/// Trips/ holds the three images of the worked layout example, a corrupt
/// file and a non-media file; Trips/Rome/ one more image.
fn dataset() -> TempDir {
    let tmp = TempDir::new().unwrap();
    write_jpeg(tmp.path(), "Trips/a.jpg", 1600, 900);
    write_png(tmp.path(), "Trips/b.png", 800, 800);
    write_jpeg(tmp.path(), "Trips/c.jpg", 1200, 600);
    write_jpeg(tmp.path(), "Trips/Rome/r.jpg", 640, 480);
    fs::write(tmp.path().join("Trips/broken.jpg"), b"definitely not a jpeg").unwrap();
    fs::write(tmp.path().join("Trips/readme.txt"), b"notes").unwrap();
    tmp
}

#[test]
fn scan_store_and_lay_out_a_folder() {
    let tmp = dataset();
    let store = SqliteStore::open(&tmp.path().join("db/gallery.db")).unwrap();
    let backend = NativeBackend::new();
    let policy = CachePolicy::default();

    assert!(policy.is_stale(&store, "Trips").unwrap(), "never scanned");

    let report = scan::scan(tmp.path(), "Trips", &backend, &store, &ScanOptions::default())
        .unwrap();

    // a, b, c, broken + Rome/r
    assert_eq!(report.files_processed, 5);
    assert_eq!(report.thumbnails_generated, 4);
    assert_eq!(report.thumbnails_failed, 1);
    assert!(!policy.is_stale(&store, "Trips").unwrap());

    let page = store
        .query_by_folder("Trips", PageRequest::new(1, 100))
        .unwrap();
    let names: Vec<&str> = page.items.iter().map(|i| i.filename.as_str()).collect();
    assert_eq!(names, vec!["a.jpg", "b.png", "broken.jpg", "c.jpg"]);

    let broken = &page.items[2];
    assert_eq!(broken.dimensions, None);
    assert_eq!(broken.thumbnail_path, None);

    let a = &page.items[0];
    assert_eq!(a.kind, MediaKind::Image);
    assert_eq!(
        a.thumbnail_path.as_deref(),
        Some("Trips/.thumbnails/a_thumb.jpg")
    );
    let thumb = image::image_dimensions(tmp.path().join("Trips/.thumbnails/a_thumb.jpg")).unwrap();
    assert_eq!(thumb, (300, 169));

    // Lay out the files with known dimensions: the worked example.
    let dims: Vec<Dimensions> = page.items.iter().filter_map(|i| i.dimensions).collect();
    let sizes = layout::justify(&dims, &LayoutParams::default());
    let widths: Vec<u32> = sizes.iter().map(|s| s.width).collect();
    assert_eq!(widths.iter().sum::<u32>() + 2 * 8, 1200);
    // One row, justified in full.
    assert!(sizes.iter().all(|s| s.height == 248));
}

#[test]
fn rescan_is_idempotent_and_keeps_thumbnails() {
    let tmp = dataset();
    let store = SqliteStore::open_in_memory().unwrap();
    let backend = NativeBackend::new();
    let options = ScanOptions::default();

    scan::scan(tmp.path(), "", &backend, &store, &options).unwrap();
    let thumb = tmp.path().join("Trips/Rome/.thumbnails/r_thumb.jpg");
    let first_mtime = fs::metadata(&thumb).unwrap().modified().unwrap();
    let before = store.get_media(&MediaKey::new("Trips/Rome", "r.jpg")).unwrap().unwrap();

    let report = scan::scan(tmp.path(), "", &backend, &store, &options).unwrap();
    let after = store.get_media(&MediaKey::new("Trips/Rome", "r.jpg")).unwrap().unwrap();

    assert_eq!(report.thumbnails_generated, 0);
    assert_eq!(fs::metadata(&thumb).unwrap().modified().unwrap(), first_mtime);
    assert_eq!(
        (before.dimensions, before.file_size, before.modified_at, before.thumbnail_path),
        (after.dimensions, after.file_size, after.modified_at, after.thumbnail_path)
    );
}

#[test]
fn stale_window_reopens_a_scanned_folder() {
    let tmp = dataset();
    let store = SqliteStore::open_in_memory().unwrap();
    scan::scan(
        tmp.path(),
        "Trips/Rome",
        &NativeBackend::new(),
        &store,
        &ScanOptions::default(),
    )
    .unwrap();

    let latest = store
        .most_recent_by_folder("Trips/Rome")
        .unwrap()
        .map(|item| item.indexed_at);

    let policy = CachePolicy::default();
    assert!(!policy.is_stale_at(latest, Utc::now()));
    assert!(policy.is_stale_at(latest, Utc::now() + TimeDelta::hours(2)));
    // Only the scanned subtree was indexed.
    assert!(policy.is_stale(&store, "Trips").unwrap());
}
