use super::{MediaRepository, Page, PageRequest, SqliteStore, StoreError};
use crate::media::{Dimensions, MediaKind};
use chrono::{DateTime, Utc};
use const_format::formatcp;
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSqlOutput, ValueRef};
use rusqlite::{OptionalExtension, Row, ToSql, named_params};
use serde::Serialize;

const COLUMNS: &str = "folder_path, filename, file_type, file_size, width, height, \
    duration, frame_rate, thumbnail_path, modified_at, indexed_at";

const UPSERT: &str = formatcp!(
    "INSERT INTO media ({COLUMNS}) \
    VALUES (:folder_path, :filename, :file_type, :file_size, :width, :height, \
        :duration, :frame_rate, :thumbnail_path, :modified_at, :indexed_at) \
    ON CONFLICT (folder_path, filename) DO UPDATE SET \
        file_type = excluded.file_type, \
        file_size = excluded.file_size, \
        width = excluded.width, \
        height = excluded.height, \
        duration = excluded.duration, \
        frame_rate = excluded.frame_rate, \
        thumbnail_path = excluded.thumbnail_path, \
        modified_at = excluded.modified_at, \
        indexed_at = excluded.indexed_at"
);

/// Identity of a media file: its folder (relative, `/`-separated) and name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct MediaKey {
    pub folder_path: String,
    pub filename: String,
}

impl MediaKey {
    pub fn new(folder_path: impl Into<String>, filename: impl Into<String>) -> Self {
        Self {
            folder_path: folder_path.into(),
            filename: filename.into(),
        }
    }

    /// `folder/filename`, or just `filename` at the root.
    pub fn relative_path(&self) -> String {
        if self.folder_path.is_empty() {
            self.filename.clone()
        } else {
            format!("{}/{}", self.folder_path, self.filename)
        }
    }
}

/// One indexed file.
#[derive(Debug, Clone, PartialEq)]
pub struct MediaItem {
    pub folder_path: String,
    pub filename: String,
    pub kind: MediaKind,
    pub file_size: u64,
    pub dimensions: Option<Dimensions>,
    pub duration: Option<f64>,
    pub frame_rate: Option<f64>,
    /// Relative to the dataset root.
    pub thumbnail_path: Option<String>,
    /// Source file mtime.
    pub modified_at: DateTime<Utc>,
    /// When the scan that wrote this row ran.
    pub indexed_at: DateTime<Utc>,
}

impl MediaItem {
    pub fn key(&self) -> MediaKey {
        MediaKey::new(self.folder_path.clone(), self.filename.clone())
    }
}

impl ToSql for MediaKind {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(self.as_str().into())
    }
}

impl FromSql for MediaKind {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|e: String| FromSqlError::Other(e.into()))
    }
}

impl TryFrom<&Row<'_>> for MediaItem {
    type Error = rusqlite::Error;

    fn try_from(row: &Row<'_>) -> Result<Self, Self::Error> {
        let width: Option<u32> = row.get("width")?;
        let height: Option<u32> = row.get("height")?;
        Ok(MediaItem {
            folder_path: row.get("folder_path")?,
            filename: row.get("filename")?,
            kind: row.get("file_type")?,
            file_size: row.get("file_size")?,
            dimensions: width
                .zip(height)
                .map(|(width, height)| Dimensions { width, height }),
            duration: row.get("duration")?,
            frame_rate: row.get("frame_rate")?,
            thumbnail_path: row.get("thumbnail_path")?,
            modified_at: row.get("modified_at")?,
            indexed_at: row.get("indexed_at")?,
        })
    }
}

impl MediaRepository for SqliteStore {
    fn upsert_batch(&self, items: &[MediaItem]) -> Result<(), StoreError> {
        if items.is_empty() {
            return Ok(());
        }
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare_cached(UPSERT)?;
            for item in items {
                stmt.execute(named_params! {
                    ":folder_path": item.folder_path,
                    ":filename": item.filename,
                    ":file_type": item.kind,
                    ":file_size": item.file_size,
                    ":width": item.dimensions.map(|d| d.width),
                    ":height": item.dimensions.map(|d| d.height),
                    ":duration": item.duration,
                    ":frame_rate": item.frame_rate,
                    ":thumbnail_path": item.thumbnail_path,
                    ":modified_at": item.modified_at,
                    ":indexed_at": item.indexed_at,
                })?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    fn query_by_folder(
        &self,
        folder: &str,
        page: PageRequest,
    ) -> Result<Page<MediaItem>, StoreError> {
        let conn = self.lock()?;
        let total: u64 = conn.query_row(
            "SELECT COUNT(*) FROM media WHERE folder_path = ?1",
            [folder],
            |row| row.get(0),
        )?;

        let mut stmt = conn.prepare_cached(formatcp!(
            "SELECT {COLUMNS} FROM media \
            WHERE folder_path = :folder \
            ORDER BY filename \
            LIMIT :limit OFFSET :offset"
        ))?;
        let items = stmt
            .query_map(
                named_params! {
                    ":folder": folder,
                    ":limit": page.per_page,
                    ":offset": page.offset(),
                },
                |row| MediaItem::try_from(row),
            )?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Page { items, total })
    }

    fn most_recent_by_folder(&self, folder: &str) -> Result<Option<MediaItem>, StoreError> {
        let conn = self.lock()?;
        let item = conn
            .query_row(
                formatcp!(
                    "SELECT {COLUMNS} FROM media \
                    WHERE folder_path = ?1 \
                    ORDER BY indexed_at DESC \
                    LIMIT 1"
                ),
                [folder],
                |row| MediaItem::try_from(row),
            )
            .optional()?;
        Ok(item)
    }

    fn delete_by_key(&self, key: &MediaKey) -> Result<bool, StoreError> {
        let conn = self.lock()?;
        let deleted = conn.execute(
            "DELETE FROM media WHERE folder_path = ?1 AND filename = ?2",
            [&key.folder_path, &key.filename],
        )?;
        Ok(deleted > 0)
    }
}

impl SqliteStore {
    /// Look up a single row.
    pub fn get_media(&self, key: &MediaKey) -> Result<Option<MediaItem>, StoreError> {
        let conn = self.lock()?;
        let item = conn
            .query_row(
                formatcp!(
                    "SELECT {COLUMNS} FROM media \
                    WHERE folder_path = ?1 AND filename = ?2"
                ),
                [&key.folder_path, &key.filename],
                |row| MediaItem::try_from(row),
            )
            .optional()?;
        Ok(item)
    }

    /// Drop every record about a file: its media row, tag assignments and
    /// favorite, in one transaction. Returns whether a media row existed.
    pub fn delete_media_records(&self, key: &MediaKey) -> Result<bool, StoreError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let params = [&key.folder_path, &key.filename];
        let deleted = tx.execute(
            "DELETE FROM media WHERE folder_path = ?1 AND filename = ?2",
            params,
        )?;
        tx.execute(
            "DELETE FROM image_tags WHERE folder_path = ?1 AND filename = ?2",
            params,
        )?;
        tx.execute(
            "DELETE FROM favorites WHERE folder_path = ?1 AND filename = ?2",
            params,
        )?;
        tx.commit()?;
        Ok(deleted > 0)
    }
}
