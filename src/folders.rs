//! Folder listing, read live from the filesystem.
//!
//! Folders are never stored. Each listing reads the parent directory and one
//! level below it, plus however deep it takes to find a preview:
//!
//! ```text
//! Trips/                  → Folder { count: 0, subfolder_count: 2, thumbnail: Trips/Oslo/b.jpg }
//! ├── Oslo/b.jpg            (no media of its own: the preview is the first
//! ├── Rome/Day1/a.jpg        file found depth-first, subfolders by name)
//! └── .thumbnails/          hidden, never listed or counted
//! ```
//!
//! A folder appears only if it has media files or visible subfolders.
//! Symlinks are not followed, same as the scanner.

use crate::media;
use crate::paths::{self, PathError};
use serde::Serialize;
use std::fs;
use std::io;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FolderError {
    #[error("Path rejected: {0}")]
    Path(#[from] PathError),
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// A browsable folder under the dataset root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Folder {
    pub name: String,
    /// Relative to the dataset root, `/`-separated.
    pub path: String,
    /// Media files directly inside (not recursive).
    pub count: usize,
    pub has_subfolders: bool,
    pub subfolder_count: usize,
    /// Relative path of a media file to preview the folder with.
    pub thumbnail: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Breadcrumb {
    pub name: String,
    pub path: String,
}

/// Visible subfolders of `parent`, sorted by name.
///
/// A parent that does not exist has no subfolders. Subfolders that cannot be
/// read are skipped with a warning.
pub fn list_folders(root: &Path, parent: &str) -> Result<Vec<Folder>, FolderError> {
    let parent_key = paths::folder_key(parent)?;
    let base = paths::resolve_within(root, parent)?;
    if !base.is_dir() {
        return Ok(Vec::new());
    }

    let mut folders = Vec::new();
    for name in visible_subdirs(&base)? {
        let dir = base.join(&name);
        let rel = join_rel(&parent_key, &name);
        match describe(&dir, name, rel) {
            Ok(Some(folder)) => folders.push(folder),
            Ok(None) => {}
            Err(e) => {
                tracing::warn!(folder = %dir.display(), error = %e, "skipping unreadable folder")
            }
        }
    }
    Ok(folders)
}

/// `a/b/c` → `[a → a, b → a/b, c → a/b/c]`. The root has no breadcrumbs.
pub fn breadcrumbs(path: &str) -> Vec<Breadcrumb> {
    let mut crumbs = Vec::new();
    let mut current = String::new();
    for part in path.split('/').filter(|p| !p.is_empty() && *p != ".") {
        current = join_rel(&current, part);
        crumbs.push(Breadcrumb {
            name: part.to_string(),
            path: current.clone(),
        });
    }
    crumbs
}

fn describe(dir: &Path, name: String, rel: String) -> io::Result<Option<Folder>> {
    let media = media_files(dir)?;
    let subdirs = visible_subdirs(dir)?;

    if media.is_empty() && subdirs.is_empty() {
        return Ok(None);
    }

    let thumbnail = match media.first() {
        Some(file) => Some(join_rel(&rel, file)),
        None => subdirs
            .iter()
            .find_map(|sub| first_media(&dir.join(sub), &join_rel(&rel, sub))),
    };

    Ok(Some(Folder {
        name,
        path: rel,
        count: media.len(),
        has_subfolders: !subdirs.is_empty(),
        subfolder_count: subdirs.len(),
        thumbnail,
    }))
}

/// First media file under `dir`, depth-first with entries sorted by name.
/// Unreadable directories are treated as empty.
fn first_media(dir: &Path, rel: &str) -> Option<String> {
    if let Some(file) = media_files(dir).ok()?.first() {
        return Some(join_rel(rel, file));
    }
    visible_subdirs(dir)
        .ok()?
        .iter()
        .find_map(|sub| first_media(&dir.join(sub), &join_rel(rel, sub)))
}

/// Names of non-hidden subdirectories, sorted. Symlinks are skipped.
fn visible_subdirs(dir: &Path) -> io::Result<Vec<String>> {
    let mut names = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().to_string();
        if name.starts_with('.') {
            continue;
        }
        if entry.file_type()?.is_dir() {
            names.push(name);
        }
    }
    names.sort();
    Ok(names)
}

/// Names of supported media files directly in `dir`, sorted.
fn media_files(dir: &Path) -> io::Result<Vec<String>> {
    let mut names = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if entry.file_type()?.is_file() && media::classify(&path).is_some() {
            names.push(entry.file_name().to_string_lossy().to_string());
        }
    }
    names.sort();
    Ok(names)
}

fn join_rel(parent: &str, name: &str) -> String {
    if parent.is_empty() {
        name.to_string()
    } else {
        format!("{parent}/{name}")
    }
}
