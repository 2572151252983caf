//! Gallery configuration.
//!
//! Handles loading, validating, and merging `folder-gal.toml`. Stock defaults
//! are the base layer; the user file is merged over them key by key, so it
//! only needs the values it wants to change. Environment variables and CLI
//! flags are applied on top of the merged result.
//!
//! ```text
//! stock defaults  →  folder-gal.toml  →  DATASET_PATH / HOST / PORT  →  CLI flags
//! ```
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! dataset = "dataset"       # Root of the media collection
//! database = "gallery.db"   # SQLite metadata store
//!
//! [server]
//! host = "127.0.0.1"
//! port = 5001
//!
//! [layout]
//! container_width = 1200    # Row width when the client sends none
//! row_height = 200          # Target row height
//! gap = 8                   # Gap between items
//! max_trailing_width = 400  # Widest a lone item on the last row may be
//!
//! [thumbnails]
//! max_width = 300
//! max_height = 300
//! quality = 85              # JPEG quality (1-100)
//!
//! [scan]
//! batch_size = 100          # Rows per store transaction
//! freshness_secs = 3600     # Rescan folders indexed longer ago than this
//! per_page = 100            # Default page size of the folder view
//! # workers = 2             # Background scan threads (omit for auto)
//!
//! [video]
//! ffmpeg = "ffmpeg"
//! ffprobe = "ffprobe"
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use crate::layout::LayoutParams;
use crate::media::{Quality, ThumbnailSettings};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Looked up in the working directory when no `--config` is given.
pub const DEFAULT_CONFIG_FILE: &str = "folder-gal.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GalleryConfig {
    /// Root of the media collection. Every served path is confined to it.
    pub dataset: PathBuf,
    /// SQLite file holding media rows, favorites and tags.
    pub database: PathBuf,
    pub server: ServerConfig,
    pub layout: LayoutParams,
    pub thumbnails: ThumbnailsConfig,
    pub scan: ScanConfig,
    pub video: VideoConfig,
}

impl Default for GalleryConfig {
    fn default() -> Self {
        Self {
            dataset: PathBuf::from("dataset"),
            database: PathBuf::from("gallery.db"),
            server: ServerConfig::default(),
            layout: LayoutParams::default(),
            thumbnails: ThumbnailsConfig::default(),
            scan: ScanConfig::default(),
            video: VideoConfig::default(),
        }
    }
}

impl GalleryConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.thumbnails.quality == 0 || self.thumbnails.quality > 100 {
            return Err(ConfigError::Validation(
                "thumbnails.quality must be 1-100".into(),
            ));
        }
        if self.thumbnails.max_width == 0 || self.thumbnails.max_height == 0 {
            return Err(ConfigError::Validation(
                "thumbnails.max_width and max_height must be non-zero".into(),
            ));
        }
        if self.layout.container_width == 0 || self.layout.row_height == 0 {
            return Err(ConfigError::Validation(
                "layout.container_width and row_height must be non-zero".into(),
            ));
        }
        if self.scan.batch_size == 0 {
            return Err(ConfigError::Validation(
                "scan.batch_size must be non-zero".into(),
            ));
        }
        if self.scan.per_page == 0 {
            return Err(ConfigError::Validation(
                "scan.per_page must be non-zero".into(),
            ));
        }
        if self.scan.workers == Some(0) {
            return Err(ConfigError::Validation(
                "scan.workers must be at least 1 (omit for auto)".into(),
            ));
        }
        Ok(())
    }

    /// Apply `DATASET_PATH`, `HOST` and `PORT`.
    ///
    /// Takes the lookup as a function so tests don't touch the process
    /// environment.
    pub fn apply_env(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some(dataset) = lookup("DATASET_PATH") {
            self.dataset = PathBuf::from(dataset);
        }
        if let Some(host) = lookup("HOST") {
            self.server.host = host;
        }
        if let Some(port) = lookup("PORT") {
            self.server.port = port
                .trim()
                .parse()
                .map_err(|_| ConfigError::Validation(format!("PORT is not a port: {port}")))?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 5001,
        }
    }
}

impl ServerConfig {
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Thumbnail bounding box and JPEG quality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ThumbnailsConfig {
    pub max_width: u32,
    pub max_height: u32,
    pub quality: u32,
}

impl Default for ThumbnailsConfig {
    fn default() -> Self {
        let settings = ThumbnailSettings::default();
        Self {
            max_width: settings.max_width,
            max_height: settings.max_height,
            quality: settings.quality.value(),
        }
    }
}

impl ThumbnailsConfig {
    pub fn settings(&self) -> ThumbnailSettings {
        ThumbnailSettings {
            max_width: self.max_width,
            max_height: self.max_height,
            quality: Quality::new(self.quality),
        }
    }
}

/// Scanning, caching and paging.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScanConfig {
    /// Rows buffered per store transaction.
    pub batch_size: usize,
    /// Folders indexed longer ago than this are rescanned in the background.
    pub freshness_secs: u64,
    /// Background scan threads.
    /// When absent, `min(2, cores)`. Larger values are clamped to the core count.
    pub workers: Option<usize>,
    /// Page size of the folder view when the client sends none.
    pub per_page: u32,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            batch_size: 100,
            freshness_secs: 3600,
            workers: None,
            per_page: 100,
        }
    }
}

impl ScanConfig {
    pub fn freshness(&self) -> Duration {
        Duration::from_secs(self.freshness_secs)
    }
}

/// Resolve the effective scan worker count.
///
/// - `None` → `min(2, cores)`
/// - `Some(n)` → `min(n, cores)` (user can constrain down, not up)
pub fn effective_workers(config: &ScanConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config.workers.unwrap_or(2).min(cores).max(1)
}

/// External tools used for video.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct VideoConfig {
    pub ffmpeg: PathBuf,
    pub ffprobe: PathBuf,
}

impl Default for VideoConfig {
    fn default() -> Self {
        Self {
            ffmpeg: PathBuf::from("ffmpeg"),
            ffprobe: PathBuf::from("ffprobe"),
        }
    }
}

// ============================================================================
// Loading and merging
// ============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
///
/// This is the base layer user overrides are merged on top of.
pub fn stock_defaults_value() -> Result<toml::Value, ConfigError> {
    Ok(toml::Value::try_from(GalleryConfig::default())?)
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Read a config file as a raw TOML value. `Ok(None)` if it does not exist.
pub fn load_raw_config(path: &Path) -> Result<Option<toml::Value>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge an optional overlay onto a base value, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<GalleryConfig, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: GalleryConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load configuration.
///
/// With an explicit path the file must exist. Without one,
/// [`DEFAULT_CONFIG_FILE`] in the working directory is used if present and
/// stock defaults otherwise.
pub fn load_config(explicit: Option<&Path>) -> Result<GalleryConfig, ConfigError> {
    let overlay = match explicit {
        Some(path) => Some(toml::from_str(&fs::read_to_string(path)?)?),
        None => load_raw_config(Path::new(DEFAULT_CONFIG_FILE))?,
    };
    resolve_config(stock_defaults_value()?, overlay)
}

/// Returns a fully-commented stock `folder-gal.toml` with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# folder-gal configuration
# ========================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults.
#
# DATASET_PATH, HOST and PORT in the environment override this file;
# command-line flags override both.
# Unknown keys will cause an error.

# Root of the media collection. Nothing outside it is ever served or deleted.
dataset = "dataset"

# SQLite file for media metadata, favorites and tags.
database = "gallery.db"

# ---------------------------------------------------------------------------
# HTTP server
# ---------------------------------------------------------------------------
[server]
host = "127.0.0.1"
port = 5001

# ---------------------------------------------------------------------------
# Justified grid layout (pixels)
# ---------------------------------------------------------------------------
[layout]
# Row width used when the client does not send ?width=.
container_width = 1200

# Height rows are filled at before being justified.
row_height = 200

# Horizontal gap between items in a row.
gap = 8

# A single item left over on the last row is never wider than this.
max_trailing_width = 400

# ---------------------------------------------------------------------------
# Thumbnails
# ---------------------------------------------------------------------------
[thumbnails]
# Thumbnails fit inside this box; sources are never upscaled.
max_width = 300
max_height = 300

# JPEG quality (1 = worst, 100 = best).
quality = 85

# ---------------------------------------------------------------------------
# Scanning
# ---------------------------------------------------------------------------
[scan]
# Media rows written per store transaction.
batch_size = 100

# A folder whose newest row was indexed longer ago than this (seconds)
# is rescanned in the background when viewed.
freshness_secs = 3600

# Default page size of the folder view.
per_page = 100

# Background scan threads.
# Omit to auto-detect (= min(2, CPU cores)).
# workers = 2

# ---------------------------------------------------------------------------
# Video
# ---------------------------------------------------------------------------
[video]
# Executables used to probe videos and grab their first frame.
# When missing, videos are listed without dimensions or thumbnails.
ffmpeg = "ffmpeg"
ffprobe = "ffprobe"
"##
}
