use super::{MediaKey, SqliteStore, StoreError};
use chrono::{DateTime, Utc};
use rusqlite::OptionalExtension;
use serde::Serialize;
use std::collections::HashSet;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Favorite {
    pub id: i64,
    pub folder_path: String,
    pub filename: String,
    pub created_at: DateTime<Utc>,
}

impl Favorite {
    pub fn key(&self) -> MediaKey {
        MediaKey::new(self.folder_path.clone(), self.filename.clone())
    }
}

impl SqliteStore {
    /// Mark a file as favorite. Returns `false` if it already was.
    pub fn add_favorite(&self, key: &MediaKey) -> Result<bool, StoreError> {
        let conn = self.lock()?;
        let inserted = conn.execute(
            "INSERT INTO favorites (folder_path, filename, created_at) \
            VALUES (?1, ?2, ?3) \
            ON CONFLICT (folder_path, filename) DO NOTHING",
            (&key.folder_path, &key.filename, Utc::now()),
        )?;
        Ok(inserted == 1)
    }

    /// Returns `false` if the file was not a favorite.
    pub fn remove_favorite(&self, key: &MediaKey) -> Result<bool, StoreError> {
        let conn = self.lock()?;
        let deleted = conn.execute(
            "DELETE FROM favorites WHERE folder_path = ?1 AND filename = ?2",
            [&key.folder_path, &key.filename],
        )?;
        Ok(deleted > 0)
    }

    /// All favorites, newest first.
    pub fn list_favorites(&self) -> Result<Vec<Favorite>, StoreError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare_cached(
            "SELECT id, folder_path, filename, created_at FROM favorites \
            ORDER BY created_at DESC, id DESC",
        )?;
        let favorites = stmt
            .query_map([], |row| {
                Ok(Favorite {
                    id: row.get(0)?,
                    folder_path: row.get(1)?,
                    filename: row.get(2)?,
                    created_at: row.get(3)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(favorites)
    }

    pub fn is_favorite(&self, key: &MediaKey) -> Result<bool, StoreError> {
        let conn = self.lock()?;
        let found = conn
            .query_row(
                "SELECT 1 FROM favorites WHERE folder_path = ?1 AND filename = ?2",
                [&key.folder_path, &key.filename],
                |_| Ok(()),
            )
            .optional()?;
        Ok(found.is_some())
    }

    /// File names in `folder` that are favorites.
    pub fn favorite_names(&self, folder: &str) -> Result<HashSet<String>, StoreError> {
        let conn = self.lock()?;
        let mut stmt =
            conn.prepare_cached("SELECT filename FROM favorites WHERE folder_path = ?1")?;
        let names = stmt
            .query_map([folder], |row| row.get(0))?
            .collect::<Result<HashSet<String>, _>>()?;
        Ok(names)
    }
}
