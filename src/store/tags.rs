use super::{MediaKey, SqliteStore, StoreError};
use chrono::{DateTime, Utc};
use const_format::formatcp;
use rusqlite::{OptionalExtension, Row};
use serde::Serialize;
use std::collections::HashMap;

/// Color given to tags created without one.
pub const DEFAULT_TAG_COLOR: &str = "#667eea";

const TAG_COLUMNS: &str = "tags.id, tags.name, tags.color, tags.created_at";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Tag {
    pub id: i64,
    pub name: String,
    pub color: String,
    pub created_at: DateTime<Utc>,
}

/// A tag with the number of files carrying it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TagSummary {
    #[serde(flatten)]
    pub tag: Tag,
    pub image_count: u64,
}

impl TryFrom<&Row<'_>> for Tag {
    type Error = rusqlite::Error;

    fn try_from(row: &Row<'_>) -> Result<Self, Self::Error> {
        Ok(Tag {
            id: row.get(0)?,
            name: row.get(1)?,
            color: row.get(2)?,
            created_at: row.get(3)?,
        })
    }
}

impl SqliteStore {
    /// Create a tag. Returns `None` if the name is taken.
    pub fn create_tag(&self, name: &str, color: &str) -> Result<Option<Tag>, StoreError> {
        let conn = self.lock()?;
        let created_at = Utc::now();
        let inserted = conn.execute(
            "INSERT INTO tags (name, color, created_at) VALUES (?1, ?2, ?3) \
            ON CONFLICT (name) DO NOTHING",
            (name, color, created_at),
        )?;
        if inserted == 0 {
            return Ok(None);
        }
        Ok(Some(Tag {
            id: conn.last_insert_rowid(),
            name: name.to_string(),
            color: color.to_string(),
            created_at,
        }))
    }

    pub fn get_tag(&self, id: i64) -> Result<Option<Tag>, StoreError> {
        let conn = self.lock()?;
        let tag = conn
            .query_row(
                formatcp!("SELECT {TAG_COLUMNS} FROM tags WHERE id = ?1"),
                [id],
                |row| Tag::try_from(row),
            )
            .optional()?;
        Ok(tag)
    }

    /// All tags by name, with usage counts.
    pub fn list_tags(&self) -> Result<Vec<TagSummary>, StoreError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare_cached(formatcp!(
            "SELECT {TAG_COLUMNS}, COUNT(image_tags.id) FROM tags \
            LEFT JOIN image_tags ON image_tags.tag_id = tags.id \
            GROUP BY tags.id \
            ORDER BY tags.name"
        ))?;
        let tags = stmt
            .query_map([], |row| {
                Ok(TagSummary {
                    tag: Tag::try_from(row)?,
                    image_count: row.get(4)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(tags)
    }

    /// Delete a tag and its assignments. Returns `false` for unknown ids.
    pub fn delete_tag(&self, id: i64) -> Result<bool, StoreError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM image_tags WHERE tag_id = ?1", [id])?;
        let deleted = tx.execute("DELETE FROM tags WHERE id = ?1", [id])?;
        tx.commit()?;
        Ok(deleted > 0)
    }

    /// Tags on one file, by name.
    pub fn tags_for_media(&self, key: &MediaKey) -> Result<Vec<Tag>, StoreError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare_cached(formatcp!(
            "SELECT {TAG_COLUMNS} FROM tags \
            JOIN image_tags ON image_tags.tag_id = tags.id \
            WHERE image_tags.folder_path = ?1 AND image_tags.filename = ?2 \
            ORDER BY tags.name"
        ))?;
        let tags = stmt
            .query_map([&key.folder_path, &key.filename], |row| Tag::try_from(row))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(tags)
    }

    /// Tags of every file in `folder`, keyed by file name.
    pub fn tags_for_folder(&self, folder: &str) -> Result<HashMap<String, Vec<Tag>>, StoreError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare_cached(formatcp!(
            "SELECT {TAG_COLUMNS}, image_tags.filename FROM tags \
            JOIN image_tags ON image_tags.tag_id = tags.id \
            WHERE image_tags.folder_path = ?1 \
            ORDER BY tags.name"
        ))?;
        let rows = stmt.query_map([folder], |row| {
            Ok((row.get::<_, String>(4)?, Tag::try_from(row)?))
        })?;

        let mut by_file: HashMap<String, Vec<Tag>> = HashMap::new();
        for row in rows {
            let (filename, tag) = row?;
            by_file.entry(filename).or_default().push(tag);
        }
        Ok(by_file)
    }

    /// Attach a tag. Returns `false` if it was already attached.
    pub fn assign_tag(&self, key: &MediaKey, tag_id: i64) -> Result<bool, StoreError> {
        let conn = self.lock()?;
        let inserted = conn.execute(
            "INSERT INTO image_tags (folder_path, filename, tag_id, created_at) \
            VALUES (?1, ?2, ?3, ?4) \
            ON CONFLICT (folder_path, filename, tag_id) DO NOTHING",
            (&key.folder_path, &key.filename, tag_id, Utc::now()),
        )?;
        Ok(inserted == 1)
    }

    /// Returns `false` if the tag was not attached.
    pub fn unassign_tag(&self, key: &MediaKey, tag_id: i64) -> Result<bool, StoreError> {
        let conn = self.lock()?;
        let deleted = conn.execute(
            "DELETE FROM image_tags WHERE folder_path = ?1 AND filename = ?2 AND tag_id = ?3",
            (&key.folder_path, &key.filename, tag_id),
        )?;
        Ok(deleted > 0)
    }

    /// Files carrying a tag, most recently tagged first.
    pub fn media_with_tag(&self, tag_id: i64) -> Result<Vec<MediaKey>, StoreError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare_cached(
            "SELECT folder_path, filename FROM image_tags \
            WHERE tag_id = ?1 \
            ORDER BY created_at DESC, id DESC",
        )?;
        let keys = stmt
            .query_map([tag_id], |row| {
                Ok(MediaKey::new(
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(keys)
    }
}
