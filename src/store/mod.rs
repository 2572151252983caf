//! SQLite metadata store.
//!
//! One database file holds four tables:
//!
//! | Table | Key | Written by |
//! |---|---|---|
//! | `media` | `(folder_path, filename)` | the scanner only |
//! | `favorites` | `(folder_path, filename)` | favorites API |
//! | `tags` | `id`, unique `name` | tags API |
//! | `image_tags` | `(folder_path, filename, tag_id)` | tags API |
//!
//! The scanner and cache policy only see the [`MediaRepository`] trait; the
//! favorites and tags operations live directly on [`SqliteStore`].
//!
//! A single connection sits behind a mutex and is shared by HTTP handlers and
//! scan workers. Scan writes arrive in batches, one transaction each, so the
//! lock is held briefly.

mod favorites;
mod media;
mod tags;

pub use favorites::Favorite;
pub use media::{MediaItem, MediaKey};
pub use tags::{DEFAULT_TAG_COLOR, Tag, TagSummary};

use rusqlite::Connection;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Database lock poisoned")]
    Poisoned,
}

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS media (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    folder_path TEXT NOT NULL,
    filename TEXT NOT NULL,
    file_type TEXT NOT NULL CHECK (file_type IN ('image', 'gif', 'video')),
    file_size INTEGER NOT NULL,
    width INTEGER,
    height INTEGER,
    duration REAL,
    frame_rate REAL,
    thumbnail_path TEXT,
    modified_at TEXT NOT NULL,
    indexed_at TEXT NOT NULL,
    UNIQUE (folder_path, filename),
    CHECK ((width IS NULL) = (height IS NULL))
);
CREATE INDEX IF NOT EXISTS media_folder_indexed ON media (folder_path, indexed_at);

CREATE TABLE IF NOT EXISTS favorites (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    folder_path TEXT NOT NULL,
    filename TEXT NOT NULL,
    created_at TEXT NOT NULL,
    UNIQUE (folder_path, filename)
);

CREATE TABLE IF NOT EXISTS tags (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL UNIQUE,
    color TEXT NOT NULL DEFAULT '#667eea',
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS image_tags (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    folder_path TEXT NOT NULL,
    filename TEXT NOT NULL,
    tag_id INTEGER NOT NULL REFERENCES tags (id) ON DELETE CASCADE,
    created_at TEXT NOT NULL,
    UNIQUE (folder_path, filename, tag_id)
);
CREATE INDEX IF NOT EXISTS image_tags_tag ON image_tags (tag_id);
";

/// One page of a paginated query. Pages are 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub per_page: u32,
}

impl PageRequest {
    /// Both values are raised to at least 1.
    pub fn new(page: u32, per_page: u32) -> Self {
        Self {
            page: page.max(1),
            per_page: per_page.max(1),
        }
    }

    pub fn offset(&self) -> u64 {
        (self.page as u64 - 1) * self.per_page as u64
    }

    /// Number of pages needed for `total` rows (0 when there are none).
    pub fn total_pages(&self, total: u64) -> u32 {
        total.div_ceil(self.per_page as u64) as u32
    }
}

/// Rows of one page plus the total row count across all pages.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
}

/// Media row persistence as seen by the scanner and the cache policy.
pub trait MediaRepository: Send + Sync {
    /// Insert or update one row, keyed by `(folder_path, filename)`.
    fn upsert(&self, item: &MediaItem) -> Result<(), StoreError> {
        self.upsert_batch(std::slice::from_ref(item))
    }

    /// Insert or update many rows in a single transaction: all or nothing.
    fn upsert_batch(&self, items: &[MediaItem]) -> Result<(), StoreError>;

    /// Rows of one folder (not its subfolders), ordered by filename.
    fn query_by_folder(&self, folder: &str, page: PageRequest)
    -> Result<Page<MediaItem>, StoreError>;

    /// The folder's most recently indexed row.
    fn most_recent_by_folder(&self, folder: &str) -> Result<Option<MediaItem>, StoreError>;

    /// Remove one row. Returns whether it existed.
    fn delete_by_key(&self, key: &MediaKey) -> Result<bool, StoreError>;
}

/// [`MediaRepository`] plus favorites and tags, backed by one SQLite file.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (or create) the database at `path`, creating parent directories.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        let mode: String =
            conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
        tracing::debug!(path = %path.display(), journal_mode = %mode, "opened metadata store");
        Self::init(conn)
    }

    /// Private database for tests and one-off runs.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, StoreError> {
        conn.busy_timeout(Duration::from_secs(5))?;
        conn.pragma_update(None, "foreign_keys", true)?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub(crate) fn lock(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn.lock().map_err(|_| StoreError::Poisoned)
    }
}
