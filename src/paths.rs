//! Traversal-safe handling of user supplied relative paths.
//!
//! Every folder or file name that arrives over HTTP goes through here before
//! it touches the filesystem. Two checks, in order:
//!
//! 1. **Lexical**: the path is normalized component by component. `..` may
//!    only cancel a component that was pushed earlier; absolute paths and
//!    anything that climbs above the base are rejected without any I/O.
//! 2. **Canonical**: if the joined path exists, its canonical form must still
//!    start with the canonical base, which catches symlinks that point out.
//!
//! Paths stored in the database and returned to clients are always relative
//! to the dataset root and `/`-separated.

use std::io;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PathError {
    #[error("Path escapes the dataset: {0}")]
    Escapes(String),
    #[error("Invalid file name: {0:?}")]
    InvalidName(String),
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// Normalize a relative path without touching the filesystem.
///
/// `""`, `"."` and `"a/.."` normalize to the empty path (the base itself).
pub fn normalize_relative(relative: &str) -> Result<PathBuf, PathError> {
    let mut normalized = PathBuf::new();
    for component in Path::new(relative).components() {
        match component {
            Component::Normal(part) => normalized.push(part),
            Component::CurDir => {}
            Component::ParentDir => {
                if !normalized.pop() {
                    return Err(PathError::Escapes(relative.to_string()));
                }
            }
            Component::RootDir | Component::Prefix(_) => {
                return Err(PathError::Escapes(relative.to_string()));
            }
        }
    }
    Ok(normalized)
}

/// Canonical `/`-separated form of a relative folder path, `""` for the root.
pub fn folder_key(relative: &str) -> Result<String, PathError> {
    Ok(to_slash(&normalize_relative(relative)?))
}

/// Resolve `relative` under `base`, rejecting anything that escapes it.
///
/// The returned path is `base` joined with the normalized relative path (not
/// canonicalized), so it stays comparable with other paths built from `base`.
pub fn resolve_within(base: &Path, relative: &str) -> Result<PathBuf, PathError> {
    let normalized = normalize_relative(relative)?;
    let joined = base.join(&normalized);

    if joined.symlink_metadata().is_ok() {
        let canonical = joined.canonicalize()?;
        let canonical_base = base.canonicalize()?;
        if !canonical.starts_with(&canonical_base) {
            return Err(PathError::Escapes(relative.to_string()));
        }
    }
    Ok(joined)
}

/// Validate a bare file name: one normal component, no separators.
pub fn file_name(name: &str) -> Result<&str, PathError> {
    let mut components = Path::new(name).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) if !name.contains('/') && !name.contains('\\') => {
            Ok(name)
        }
        (Some(Component::ParentDir), None) => Err(PathError::Escapes(name.to_string())),
        _ => Err(PathError::InvalidName(name.to_string())),
    }
}

/// Split `a/b/c.jpg` into (`a/b`, `c.jpg`). A bare name has folder `""`.
pub fn split_media_path(relative: &str) -> Result<(String, String), PathError> {
    let normalized = normalize_relative(relative)?;
    let name = normalized
        .file_name()
        .ok_or_else(|| PathError::InvalidName(relative.to_string()))?
        .to_string_lossy()
        .to_string();
    let folder = normalized.parent().map(to_slash).unwrap_or_default();
    Ok((folder, name))
}

/// Join path components with `/` regardless of platform.
pub fn to_slash(path: &Path) -> String {
    path.components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// `path` relative to `root` in `/` form, or `None` if it is not under `root`.
pub fn relative_slash(path: &Path, root: &Path) -> Option<String> {
    path.strip_prefix(root).ok().map(to_slash)
}
