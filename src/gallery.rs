//! Gallery service: the operations behind the HTTP API.
//!
//! A [`Gallery`] owns its collaborators explicitly (dataset root, metadata
//! store, media backend, scan queue) and is shared between request handlers
//! as a [`SharedGallery`].
//!
//! Reads never write media rows. A folder view serves whatever the store has
//! and, if the folder is stale, queues a background scan:
//!
//! ```text
//! folder_view("Trips")
//!   ├── cache policy: stale? ──yes──→ queue.request("Trips")   (returns at once)
//!   ├── store.query_by_folder("Trips", page)
//!   └── layout::justify(page items) → LayoutItem[]
//! ```
//!
//! Files that are favorited or tagged but not indexed yet are laid out as
//! 300×300.

use crate::cache::CachePolicy;
use crate::config::{self, GalleryConfig};
use crate::folders::{self, Breadcrumb, Folder, FolderError};
use crate::layout::{self, LayoutParams};
use crate::media::{self, Dimensions, MediaBackend, MediaKind, NativeBackend, THUMBNAIL_DIR};
use crate::paths::{self, PathError};
use crate::queue::{QueueError, ScanQueue};
use crate::scan::{self, ScanError, ScanOptions, ScanReport};
use crate::store::{
    DEFAULT_TAG_COLOR, Favorite, MediaItem, MediaKey, MediaRepository, PageRequest, SqliteStore,
    StoreError, Tag, TagSummary,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

pub type SharedGallery = Arc<Gallery>;

/// Laid out size of files with no known dimensions.
pub const FALLBACK_DIMENSIONS: Dimensions = Dimensions {
    width: 300,
    height: 300,
};

#[derive(Error, Debug)]
pub enum GalleryError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
    #[error("{0}")]
    Path(#[from] PathError),
    #[error("{0}")]
    Folders(#[from] FolderError),
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("{0}")]
    Queue(#[from] QueueError),
    #[error("Scan failed: {0}")]
    Scan(#[from] ScanError),
    #[error("Folder not found: {0}")]
    FolderNotFound(String),
    #[error("File not found: {0}")]
    MediaNotFound(String),
    #[error("Unsupported file type: {0}")]
    Unsupported(String),
    #[error("Already in favorites: {0}")]
    AlreadyFavorite(String),
    #[error("Not in favorites: {0}")]
    NotFavorite(String),
    #[error("Tag name is required")]
    TagNameRequired,
    #[error("Invalid color {0:?}, expected #rgb or #rrggbb")]
    InvalidColor(String),
    #[error("Tag already exists: {0}")]
    TagExists(String),
    #[error("Tag not found: {0}")]
    TagNotFound(i64),
    #[error("Tag {tag_id} is not assigned to {path}")]
    TagNotAssigned { tag_id: i64, path: String },
}

impl GalleryError {
    /// True when a user supplied path tried to leave the dataset.
    pub fn is_escape(&self) -> bool {
        matches!(
            self,
            GalleryError::Path(PathError::Escapes(_))
                | GalleryError::Folders(FolderError::Path(PathError::Escapes(_)))
                | GalleryError::Scan(ScanError::Path(PathError::Escapes(_)))
        )
    }
}

/// Everything a [`Gallery`] needs besides its collaborators.
#[derive(Debug, Clone)]
pub struct GalleryOptions {
    pub layout: LayoutParams,
    pub policy: CachePolicy,
    pub per_page: u32,
    pub workers: usize,
    pub scan: ScanOptions,
}

impl Default for GalleryOptions {
    fn default() -> Self {
        Self {
            layout: LayoutParams::default(),
            policy: CachePolicy::default(),
            per_page: 100,
            workers: 2,
            scan: ScanOptions::default(),
        }
    }
}

impl GalleryOptions {
    pub fn from_config(config: &GalleryConfig) -> Self {
        Self {
            layout: config.layout,
            policy: CachePolicy::new(config.scan.freshness()),
            per_page: config.scan.per_page,
            workers: config::effective_workers(&config.scan),
            scan: ScanOptions::from_config(config),
        }
    }
}

// ============================================================================
// Views
// ============================================================================

/// A file as shown to clients. Everything but the identity is optional so
/// favorites and tags of not-yet-indexed files can still be listed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MediaView {
    pub folder: String,
    pub filename: String,
    /// `folder/filename`, relative to the dataset root.
    pub path: String,
    pub file_type: Option<MediaKind>,
    pub file_size: Option<u64>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub duration: Option<f64>,
    pub frame_rate: Option<f64>,
    pub thumbnail: Option<String>,
    pub modified_at: Option<DateTime<Utc>>,
}

impl From<MediaItem> for MediaView {
    fn from(item: MediaItem) -> Self {
        let path = item.key().relative_path();
        Self {
            path,
            file_type: Some(item.kind),
            file_size: Some(item.file_size),
            width: item.dimensions.map(|d| d.width),
            height: item.dimensions.map(|d| d.height),
            duration: item.duration,
            frame_rate: item.frame_rate,
            thumbnail: item.thumbnail_path,
            modified_at: Some(item.modified_at),
            folder: item.folder_path,
            filename: item.filename,
        }
    }
}

impl MediaView {
    /// A file the store knows nothing about yet.
    fn unindexed(key: &MediaKey) -> Self {
        Self {
            folder: key.folder_path.clone(),
            filename: key.filename.clone(),
            path: key.relative_path(),
            file_type: media::classify(Path::new(&key.filename)),
            file_size: None,
            width: None,
            height: None,
            duration: None,
            frame_rate: None,
            thumbnail: None,
            modified_at: None,
        }
    }

    fn dimensions(&self) -> Dimensions {
        match (self.width, self.height) {
            (Some(width), Some(height)) => Dimensions { width, height },
            _ => FALLBACK_DIMENSIONS,
        }
    }
}

/// A file placed in the justified grid.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LayoutItem {
    #[serde(flatten)]
    pub media: MediaView,
    pub calc_width: u32,
    pub calc_height: u32,
    pub is_favorite: bool,
    pub tags: Vec<Tag>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FolderPage {
    pub folder: String,
    pub breadcrumbs: Vec<Breadcrumb>,
    pub subfolders: Vec<Folder>,
    pub images: Vec<LayoutItem>,
    pub current_page: u32,
    pub total_pages: u32,
    pub total_images: u64,
    pub per_page: u32,
    /// A background scan of this folder is queued or running.
    pub scan_queued: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TagPage {
    pub tag: Tag,
    pub images: Vec<LayoutItem>,
}

/// Not laid out yet: a view plus its annotations.
struct Entry {
    media: MediaView,
    is_favorite: bool,
    tags: Vec<Tag>,
}

// ============================================================================
// Service
// ============================================================================

pub struct Gallery {
    root: PathBuf,
    store: Arc<SqliteStore>,
    backend: Arc<dyn MediaBackend>,
    queue: ScanQueue,
    options: GalleryOptions,
}

impl Gallery {
    /// Start the scan workers and wire the collaborators together.
    pub fn new(
        root: impl Into<PathBuf>,
        store: Arc<SqliteStore>,
        backend: Arc<dyn MediaBackend>,
        options: GalleryOptions,
    ) -> Result<Self, GalleryError> {
        let root = root.into();
        let job = {
            let root = root.clone();
            let store = Arc::clone(&store);
            let backend = Arc::clone(&backend);
            let scan_options = options.scan;
            move |folder: &str| {
                match scan::scan(&root, folder, backend.as_ref(), store.as_ref(), &scan_options) {
                    Ok(report) => debug!(folder, "background scan done: {report}"),
                    Err(e) => warn!(folder, error = %e, "background scan failed"),
                }
            }
        };
        let queue = ScanQueue::new(options.workers, job)?;
        info!(root = %root.display(), workers = queue.workers(), "gallery ready");
        Ok(Self {
            root,
            store,
            backend,
            queue,
            options,
        })
    }

    /// Open the store and build the native backend from configuration.
    pub fn from_config(config: &GalleryConfig) -> Result<Self, GalleryError> {
        let store = Arc::new(SqliteStore::open(&config.database)?);
        let backend = Arc::new(NativeBackend::with_tools(
            &config.video.ffmpeg,
            &config.video.ffprobe,
        ));
        Self::new(
            &config.dataset,
            store,
            backend,
            GalleryOptions::from_config(config),
        )
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn store(&self) -> &SqliteStore {
        &self.store
    }

    pub fn queue(&self) -> &ScanQueue {
        &self.queue
    }

    // ------------------------------------------------------------------------
    // Folders
    // ------------------------------------------------------------------------

    pub fn list_folders(&self, parent: &str) -> Result<Vec<Folder>, GalleryError> {
        Ok(folders::list_folders(&self.root, parent)?)
    }

    /// One page of a folder, laid out.
    pub fn folder_view(
        &self,
        folder: &str,
        page: u32,
        per_page: Option<u32>,
        container_width: Option<u32>,
    ) -> Result<FolderPage, GalleryError> {
        let key = paths::folder_key(folder)?;
        if !paths::resolve_within(&self.root, &key)?.is_dir() {
            return Err(GalleryError::FolderNotFound(key));
        }

        if self.options.policy.is_stale(self.store.as_ref(), &key)? {
            self.queue.request(&key);
        }
        let scan_queued = self.queue.in_flight(&key);

        let request = PageRequest::new(page, per_page.unwrap_or(self.options.per_page));
        let rows = self.store.query_by_folder(&key, request)?;
        let favorites = self.store.favorite_names(&key)?;
        let mut tags = self.store.tags_for_folder(&key)?;

        let entries = rows
            .items
            .into_iter()
            .map(|item| Entry {
                is_favorite: favorites.contains(&item.filename),
                tags: tags.remove(&item.filename).unwrap_or_default(),
                media: MediaView::from(item),
            })
            .collect();

        Ok(FolderPage {
            breadcrumbs: folders::breadcrumbs(&key),
            subfolders: folders::list_folders(&self.root, &key)?,
            images: self.lay_out(entries, container_width),
            current_page: request.page,
            total_pages: request.total_pages(rows.total),
            total_images: rows.total,
            per_page: request.per_page,
            scan_queued,
            folder: key,
        })
    }

    /// Scan a folder now, on the calling thread.
    pub fn scan_now(&self, folder: &str) -> Result<ScanReport, GalleryError> {
        Ok(scan::scan(
            &self.root,
            folder,
            self.backend.as_ref(),
            self.store.as_ref(),
            &self.options.scan,
        )?)
    }

    // ------------------------------------------------------------------------
    // Favorites
    // ------------------------------------------------------------------------

    /// Favorites, newest first, laid out.
    pub fn favorites_view(
        &self,
        container_width: Option<u32>,
    ) -> Result<Vec<LayoutItem>, GalleryError> {
        let keys = self
            .store
            .list_favorites()?
            .into_iter()
            .map(|f| f.key())
            .collect::<Vec<_>>();
        let entries = self.entries_for(&keys)?;
        Ok(self.lay_out(entries, container_width))
    }

    pub fn add_favorite(&self, folder: &str, filename: &str) -> Result<(), GalleryError> {
        let (key, _) = self.existing_media(folder, filename)?;
        if !self.store.add_favorite(&key)? {
            return Err(GalleryError::AlreadyFavorite(key.relative_path()));
        }
        Ok(())
    }

    pub fn remove_favorite(&self, folder: &str, filename: &str) -> Result<(), GalleryError> {
        let key = media_key(folder, filename)?;
        if !self.store.remove_favorite(&key)? {
            return Err(GalleryError::NotFavorite(key.relative_path()));
        }
        Ok(())
    }

    pub fn list_favorites(&self) -> Result<Vec<Favorite>, GalleryError> {
        Ok(self.store.list_favorites()?)
    }

    // ------------------------------------------------------------------------
    // Tags
    // ------------------------------------------------------------------------

    /// Create a tag. The name is trimmed; the color defaults to
    /// [`DEFAULT_TAG_COLOR`].
    pub fn create_tag(&self, name: &str, color: Option<&str>) -> Result<Tag, GalleryError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(GalleryError::TagNameRequired);
        }
        let color = match color.map(str::trim).filter(|c| !c.is_empty()) {
            Some(c) if is_hex_color(c) => c,
            Some(c) => return Err(GalleryError::InvalidColor(c.to_string())),
            None => DEFAULT_TAG_COLOR,
        };
        self.store
            .create_tag(name, color)?
            .ok_or_else(|| GalleryError::TagExists(name.to_string()))
    }

    pub fn list_tags(&self) -> Result<Vec<TagSummary>, GalleryError> {
        Ok(self.store.list_tags()?)
    }

    pub fn delete_tag(&self, tag_id: i64) -> Result<(), GalleryError> {
        if !self.store.delete_tag(tag_id)? {
            return Err(GalleryError::TagNotFound(tag_id));
        }
        Ok(())
    }

    pub fn image_tags(&self, folder: &str, filename: &str) -> Result<Vec<Tag>, GalleryError> {
        Ok(self.store.tags_for_media(&media_key(folder, filename)?)?)
    }

    /// Attach a tag. Attaching it twice is not an error.
    pub fn assign_tag(
        &self,
        folder: &str,
        filename: &str,
        tag_id: i64,
    ) -> Result<Tag, GalleryError> {
        let key = media_key(folder, filename)?;
        let tag = self.tag(tag_id)?;
        self.store.assign_tag(&key, tag_id)?;
        Ok(tag)
    }

    pub fn unassign_tag(
        &self,
        folder: &str,
        filename: &str,
        tag_id: i64,
    ) -> Result<(), GalleryError> {
        let key = media_key(folder, filename)?;
        if !self.store.unassign_tag(&key, tag_id)? {
            return Err(GalleryError::TagNotAssigned {
                tag_id,
                path: key.relative_path(),
            });
        }
        Ok(())
    }

    /// Files carrying a tag, most recently tagged first, laid out.
    pub fn tag_view(
        &self,
        tag_id: i64,
        container_width: Option<u32>,
    ) -> Result<TagPage, GalleryError> {
        let tag = self.tag(tag_id)?;
        let keys = self.store.media_with_tag(tag_id)?;
        let entries = self.entries_for(&keys)?;
        Ok(TagPage {
            tag,
            images: self.lay_out(entries, container_width),
        })
    }

    // ------------------------------------------------------------------------
    // Files
    // ------------------------------------------------------------------------

    /// Path and kind of a media file, for serving its bytes.
    pub fn media_file(
        &self,
        folder: &str,
        filename: &str,
    ) -> Result<(PathBuf, MediaKind), GalleryError> {
        let (key, path) = self.existing_media(folder, filename)?;
        let kind = media::classify(&path).ok_or(GalleryError::Unsupported(key.relative_path()))?;
        Ok((path, kind))
    }

    /// Path of a generated thumbnail. Only files inside a thumbnail directory
    /// are served.
    pub fn thumbnail_file(&self, relative: &str) -> Result<PathBuf, GalleryError> {
        let path = paths::resolve_within(&self.root, relative)?;
        let in_thumbnail_dir = path
            .parent()
            .and_then(Path::file_name)
            .is_some_and(|dir| dir == THUMBNAIL_DIR);
        if !in_thumbnail_dir || !path.is_file() {
            return Err(GalleryError::MediaNotFound(relative.to_string()));
        }
        Ok(path)
    }

    /// Delete a media file with its thumbnail and every record about it.
    pub fn delete_media(&self, folder: &str, filename: &str) -> Result<(), GalleryError> {
        let (key, path) = self.existing_media(folder, filename)?;

        fs::remove_file(&path)?;
        if let Some(thumb) = media::thumbnail_path_for(&path) {
            match fs::remove_file(&thumb) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => warn!(path = %thumb.display(), error = %e, "could not remove thumbnail"),
            }
        }
        self.store.delete_media_records(&key)?;
        info!(path = %key.relative_path(), "deleted media file");
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Helpers
    // ------------------------------------------------------------------------

    fn tag(&self, tag_id: i64) -> Result<Tag, GalleryError> {
        self.store
            .get_tag(tag_id)?
            .ok_or(GalleryError::TagNotFound(tag_id))
    }

    /// Validate a file reference and confirm a supported file is there.
    fn existing_media(
        &self,
        folder: &str,
        filename: &str,
    ) -> Result<(MediaKey, PathBuf), GalleryError> {
        let key = media_key(folder, filename)?;
        let path = paths::resolve_within(&self.root, &key.relative_path())?;
        if media::classify(&path).is_none() {
            return Err(GalleryError::Unsupported(key.relative_path()));
        }
        if !path.is_file() {
            return Err(GalleryError::MediaNotFound(key.relative_path()));
        }
        Ok((key, path))
    }

    /// Views for arbitrary files, joined with the store. Order is kept.
    fn entries_for(&self, keys: &[MediaKey]) -> Result<Vec<Entry>, GalleryError> {
        keys.iter()
            .map(|key| -> Result<Entry, GalleryError> {
                let media = match self.store.get_media(key)? {
                    Some(item) => MediaView::from(item),
                    None => MediaView::unindexed(key),
                };
                Ok(Entry {
                    media,
                    is_favorite: self.store.is_favorite(key)?,
                    tags: self.store.tags_for_media(key)?,
                })
            })
            .collect()
    }

    fn lay_out(&self, entries: Vec<Entry>, container_width: Option<u32>) -> Vec<LayoutItem> {
        let params = match container_width.filter(|w| *w > 0) {
            Some(width) => self.options.layout.with_container_width(width),
            None => self.options.layout,
        };
        let dims: Vec<Dimensions> = entries.iter().map(|e| e.media.dimensions()).collect();
        let sizes = layout::justify(&dims, &params);
        entries
            .into_iter()
            .zip(sizes)
            .map(|(entry, size)| LayoutItem {
                media: entry.media,
                calc_width: size.width,
                calc_height: size.height,
                is_favorite: entry.is_favorite,
                tags: entry.tags,
            })
            .collect()
    }
}

/// Lexically validated key for `folder` + `filename`.
fn media_key(folder: &str, filename: &str) -> Result<MediaKey, GalleryError> {
    let folder = paths::folder_key(folder)?;
    let filename = paths::file_name(filename)?;
    Ok(MediaKey::new(folder, filename))
}

/// `#rgb` or `#rrggbb`.
fn is_hex_color(color: &str) -> bool {
    color
        .strip_prefix('#')
        .is_some_and(|hex| {
            matches!(hex.len(), 3 | 6) && hex.chars().all(|c| c.is_ascii_hexdigit())
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::MediaInfo;
    use crate::media::backend::tests::MockBackend;
    use std::time::{Duration, Instant};
    use tempfile::TempDir;

    fn touch(root: &Path, rel: &str) -> PathBuf {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, b"pixels").unwrap();
        path
    }

    fn setup() -> (TempDir, Arc<MockBackend>, Gallery) {
        let tmp = TempDir::new().unwrap();
        for rel in ["Trips/a.jpg", "Trips/b.jpg", "Trips/c.mp4", "Trips/Rome/r.jpg"] {
            touch(tmp.path(), rel);
        }
        let backend = Arc::new(MockBackend::new());
        backend.set_info(
            &tmp.path().join("Trips/a.jpg"),
            MediaInfo::still(Dimensions {
                width: 1600,
                height: 900,
            }),
        );
        let gallery = Gallery::new(
            tmp.path(),
            Arc::new(SqliteStore::open_in_memory().unwrap()),
            backend.clone(),
            GalleryOptions::default(),
        )
        .unwrap();
        (tmp, backend, gallery)
    }

    fn wait_idle(gallery: &Gallery, folder: &str) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while gallery.queue().in_flight(folder) {
            assert!(Instant::now() < deadline, "scan did not finish");
            std::thread::sleep(Duration::from_millis(5));
        }
    }

    fn names(items: &[LayoutItem]) -> Vec<&str> {
        items.iter().map(|i| i.media.filename.as_str()).collect()
    }

    // =========================================================================
    // Folder view
    // =========================================================================

    #[test]
    fn first_view_queues_scan_and_serves_nothing_yet() {
        let (_tmp, _backend, gallery) = setup();

        let page = gallery.folder_view("Trips", 1, None, None).unwrap();
        assert_eq!(page.folder, "Trips");
        wait_idle(&gallery, "Trips");

        let page = gallery.folder_view("Trips", 1, None, None).unwrap();
        assert_eq!(names(&page.images), vec!["a.jpg", "b.jpg", "c.mp4"]);
        assert_eq!(page.total_images, 3);
        assert_eq!(page.total_pages, 1);
        assert!(!page.scan_queued, "fresh folder must not be rescanned");
    }

    #[test]
    fn folder_view_lays_out_and_annotates() {
        let (_tmp, _backend, gallery) = setup();
        gallery.scan_now("Trips").unwrap();
        gallery.add_favorite("Trips", "b.jpg").unwrap();
        let tag = gallery.create_tag("beach", None).unwrap();
        gallery.assign_tag("Trips", "a.jpg", tag.id).unwrap();

        let page = gallery.folder_view("Trips", 1, None, Some(800)).unwrap();

        let a = &page.images[0];
        assert_eq!(a.media.width, Some(1600));
        assert_eq!(a.tags, vec![tag]);
        assert!(!a.is_favorite);
        assert!(page.images[1].is_favorite);
        assert!(page.images.iter().all(|i| i.calc_width > 0 && i.calc_height > 0));
        let row: u32 = page.images.iter().map(|i| i.calc_width).sum::<u32>() + 8 * 2;
        assert!(row <= 800);
        assert_eq!(page.breadcrumbs.len(), 1);
        assert_eq!(page.subfolders[0].path, "Trips/Rome");
    }

    #[test]
    fn folder_view_paginates() {
        let (_tmp, _backend, gallery) = setup();
        gallery.scan_now("Trips").unwrap();

        let page = gallery.folder_view("Trips", 2, Some(2), None).unwrap();

        assert_eq!(names(&page.images), vec!["c.mp4"]);
        assert_eq!(page.current_page, 2);
        assert_eq!(page.per_page, 2);
        assert_eq!(page.total_pages, 2);
        assert_eq!(page.total_images, 3);
    }

    #[test]
    fn unknown_folder_is_not_found() {
        let (_tmp, _backend, gallery) = setup();
        assert!(matches!(
            gallery.folder_view("Nowhere", 1, None, None),
            Err(GalleryError::FolderNotFound(_))
        ));
    }

    #[test]
    fn escaping_folder_is_rejected() {
        let (_tmp, backend, gallery) = setup();
        let err = gallery.folder_view("../etc", 1, None, None).unwrap_err();
        assert!(err.is_escape());
        assert!(backend.get_operations().is_empty());
    }

    // =========================================================================
    // Favorites
    // =========================================================================

    #[test]
    fn favorite_lifecycle() {
        let (_tmp, _backend, gallery) = setup();

        gallery.add_favorite("Trips", "a.jpg").unwrap();
        assert!(matches!(
            gallery.add_favorite("Trips", "a.jpg"),
            Err(GalleryError::AlreadyFavorite(_))
        ));
        assert_eq!(gallery.list_favorites().unwrap().len(), 1);

        gallery.remove_favorite("Trips", "a.jpg").unwrap();
        assert!(matches!(
            gallery.remove_favorite("Trips", "a.jpg"),
            Err(GalleryError::NotFavorite(_))
        ));
    }

    #[test]
    fn favorite_of_missing_file_is_not_found() {
        let (_tmp, _backend, gallery) = setup();
        assert!(matches!(
            gallery.add_favorite("Trips", "zzz.jpg"),
            Err(GalleryError::MediaNotFound(_))
        ));
    }

    #[test]
    fn favorites_view_uses_fallback_for_unindexed() {
        let (_tmp, _backend, gallery) = setup();
        gallery.add_favorite("Trips", "b.jpg").unwrap();

        let items = gallery.favorites_view(None).unwrap();

        assert_eq!(items.len(), 1);
        assert_eq!(items[0].media.width, None);
        assert_eq!(items[0].media.file_type, Some(MediaKind::Image));
        assert!(items[0].is_favorite);
        // Lone item: 200 * 1.0 = 200 wide, under the 400 cap.
        assert_eq!((items[0].calc_width, items[0].calc_height), (200, 200));
    }

    // =========================================================================
    // Tags
    // =========================================================================

    #[test]
    fn create_tag_validates() {
        let (_tmp, _backend, gallery) = setup();

        let tag = gallery.create_tag("  sunset ", Some("#F0a")).unwrap();
        assert_eq!(tag.name, "sunset");
        assert_eq!(tag.color, "#F0a");
        assert_eq!(gallery.create_tag("plain", None).unwrap().color, DEFAULT_TAG_COLOR);

        assert!(matches!(
            gallery.create_tag("   ", None),
            Err(GalleryError::TagNameRequired)
        ));
        assert!(matches!(
            gallery.create_tag("x", Some("red")),
            Err(GalleryError::InvalidColor(_))
        ));
        assert!(matches!(
            gallery.create_tag("sunset", None),
            Err(GalleryError::TagExists(_))
        ));
    }

    #[test]
    fn assign_and_unassign() {
        let (_tmp, _backend, gallery) = setup();
        let tag = gallery.create_tag("beach", None).unwrap();

        gallery.assign_tag("Trips", "a.jpg", tag.id).unwrap();
        gallery.assign_tag("Trips", "a.jpg", tag.id).unwrap();
        assert_eq!(gallery.image_tags("Trips", "a.jpg").unwrap(), vec![tag.clone()]);

        gallery.unassign_tag("Trips", "a.jpg", tag.id).unwrap();
        assert!(matches!(
            gallery.unassign_tag("Trips", "a.jpg", tag.id),
            Err(GalleryError::TagNotAssigned { .. })
        ));
        assert!(matches!(
            gallery.assign_tag("Trips", "a.jpg", 999),
            Err(GalleryError::TagNotFound(999))
        ));
    }

    #[test]
    fn tag_view_lists_tagged_files() {
        let (_tmp, _backend, gallery) = setup();
        gallery.scan_now("Trips").unwrap();
        let tag = gallery.create_tag("best", None).unwrap();
        gallery.assign_tag("Trips", "a.jpg", tag.id).unwrap();
        gallery.assign_tag("Trips/Rome", "r.jpg", tag.id).unwrap();

        let view = gallery.tag_view(tag.id, None).unwrap();

        assert_eq!(view.tag, tag);
        assert_eq!(view.images.len(), 2);
        assert!(view.images.iter().all(|i| i.tags.len() == 1));
    }

    #[test]
    fn delete_tag_unknown() {
        let (_tmp, _backend, gallery) = setup();
        assert!(matches!(
            gallery.delete_tag(42),
            Err(GalleryError::TagNotFound(42))
        ));
    }

    // =========================================================================
    // Files
    // =========================================================================

    #[test]
    fn delete_media_removes_everything() {
        let (tmp, _backend, gallery) = setup();
        gallery.scan_now("Trips").unwrap();
        gallery.add_favorite("Trips", "a.jpg").unwrap();
        let tag = gallery.create_tag("beach", None).unwrap();
        gallery.assign_tag("Trips", "a.jpg", tag.id).unwrap();
        let thumb = tmp.path().join("Trips/.thumbnails/a_thumb.jpg");
        assert!(thumb.exists());

        gallery.delete_media("Trips", "a.jpg").unwrap();

        assert!(!tmp.path().join("Trips/a.jpg").exists());
        assert!(!thumb.exists());
        let key = MediaKey::new("Trips", "a.jpg");
        assert!(gallery.store().get_media(&key).unwrap().is_none());
        assert!(gallery.list_favorites().unwrap().is_empty());
        assert!(gallery.image_tags("Trips", "a.jpg").unwrap().is_empty());

        assert!(matches!(
            gallery.delete_media("Trips", "a.jpg"),
            Err(GalleryError::MediaNotFound(_))
        ));
    }

    #[test]
    fn delete_rejects_unsupported_and_escapes() {
        let (tmp, _backend, gallery) = setup();
        touch(tmp.path(), "Trips/notes.txt");

        assert!(matches!(
            gallery.delete_media("Trips", "notes.txt"),
            Err(GalleryError::Unsupported(_))
        ));
        assert!(gallery.delete_media("..", "a.jpg").unwrap_err().is_escape());
        assert!(matches!(
            gallery.delete_media("Trips", "../a.jpg"),
            Err(GalleryError::Path(_))
        ));
        assert!(tmp.path().join("Trips/notes.txt").exists());
    }

    #[test]
    fn thumbnail_file_only_serves_thumbnail_dirs() {
        let (_tmp, _backend, gallery) = setup();
        gallery.scan_now("Trips").unwrap();

        assert!(gallery.thumbnail_file("Trips/.thumbnails/a_thumb.jpg").is_ok());
        assert!(matches!(
            gallery.thumbnail_file("Trips/a.jpg"),
            Err(GalleryError::MediaNotFound(_))
        ));
        assert!(
            gallery
                .thumbnail_file("../x/.thumbnails/a_thumb.jpg")
                .unwrap_err()
                .is_escape()
        );
    }

    #[test]
    fn media_file_reports_kind() {
        let (tmp, _backend, gallery) = setup();
        let (path, kind) = gallery.media_file("Trips", "c.mp4").unwrap();
        assert_eq!(path, tmp.path().join("Trips/c.mp4"));
        assert_eq!(kind, MediaKind::Video);
    }

    #[test]
    fn hex_colors() {
        assert!(is_hex_color("#fff"));
        assert!(is_hex_color("#667eea"));
        assert!(!is_hex_color("667eea"));
        assert!(!is_hex_color("#ffff"));
        assert!(!is_hex_color("#ggg"));
    }
}
