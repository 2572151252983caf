//! Metadata freshness policy.
//!
//! A folder's rows are served straight from the store. Whether they also
//! trigger a background rescan depends on how long ago the folder was last
//! indexed:
//!
//! ```text
//! no rows                      → stale (never scanned)
//! newest indexed_at ≤ window   → fresh
//! newest indexed_at > window   → stale
//! ```
//!
//! The age is taken from the scan stamp (`indexed_at`), not from the source
//! files' mtimes. A folder of ten-year-old photos that was scanned a minute
//! ago is fresh; a folder scanned yesterday is stale even if nothing in it
//! changed. Recency is per folder: one recently indexed row keeps the whole
//! folder fresh.

use crate::store::{MediaRepository, StoreError};
use chrono::{DateTime, Utc};
use std::time::Duration;

/// Default freshness window: one hour.
pub const DEFAULT_FRESHNESS: Duration = Duration::from_secs(3600);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CachePolicy {
    window_ms: i64,
}

impl Default for CachePolicy {
    fn default() -> Self {
        Self::new(DEFAULT_FRESHNESS)
    }
}

impl CachePolicy {
    pub fn new(window: Duration) -> Self {
        Self {
            window_ms: i64::try_from(window.as_millis()).unwrap_or(i64::MAX),
        }
    }

    /// Staleness given the newest scan stamp of a folder (if any) and the
    /// current time. A stamp in the future counts as fresh.
    pub fn is_stale_at(&self, latest: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
        match latest {
            None => true,
            Some(stamp) => now.signed_duration_since(stamp).num_milliseconds() > self.window_ms,
        }
    }

    /// Staleness of `folder` right now, as recorded in `repo`.
    pub fn is_stale(
        &self,
        repo: &(impl MediaRepository + ?Sized),
        folder: &str,
    ) -> Result<bool, StoreError> {
        let latest = repo.most_recent_by_folder(folder)?.map(|item| item.indexed_at);
        Ok(self.is_stale_at(latest, Utc::now()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::{Dimensions, MediaKind};
    use crate::store::{MediaItem, SqliteStore};
    use chrono::{TimeDelta, TimeZone};

    fn noon() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 11, 15, 12, 0, 0).unwrap()
    }

    fn row(folder: &str, indexed_at: DateTime<Utc>) -> MediaItem {
        MediaItem {
            folder_path: folder.to_string(),
            filename: "a.jpg".to_string(),
            kind: MediaKind::Image,
            file_size: 10,
            dimensions: Some(Dimensions {
                width: 1,
                height: 1,
            }),
            duration: None,
            frame_rate: None,
            thumbnail_path: None,
            modified_at: Utc.with_ymd_and_hms(2010, 1, 1, 0, 0, 0).unwrap(),
            indexed_at,
        }
    }

    // =========================================================================
    // Window boundaries
    // =========================================================================

    #[test]
    fn never_scanned_is_stale() {
        assert!(CachePolicy::default().is_stale_at(None, noon()));
    }

    #[test]
    fn within_window_is_fresh() {
        let policy = CachePolicy::default();
        let stamp = noon() - TimeDelta::minutes(59);
        assert!(!policy.is_stale_at(Some(stamp), noon()));
    }

    #[test]
    fn exactly_at_window_is_fresh() {
        let policy = CachePolicy::default();
        let stamp = noon() - TimeDelta::hours(1);
        assert!(!policy.is_stale_at(Some(stamp), noon()));
    }

    #[test]
    fn past_window_is_stale() {
        let policy = CachePolicy::default();
        let stamp = noon() - TimeDelta::hours(1) - TimeDelta::seconds(1);
        assert!(policy.is_stale_at(Some(stamp), noon()));
    }

    #[test]
    fn future_stamp_is_fresh() {
        let policy = CachePolicy::default();
        let stamp = noon() + TimeDelta::minutes(5);
        assert!(!policy.is_stale_at(Some(stamp), noon()));
    }

    #[test]
    fn custom_window() {
        let policy = CachePolicy::new(Duration::from_secs(60));
        assert!(!policy.is_stale_at(Some(noon() - TimeDelta::seconds(60)), noon()));
        assert!(policy.is_stale_at(Some(noon() - TimeDelta::seconds(61)), noon()));
    }

    #[test]
    fn zero_window_is_always_stale_for_past_stamps() {
        let policy = CachePolicy::new(Duration::ZERO);
        let stamp = noon() - TimeDelta::milliseconds(1);
        assert!(policy.is_stale_at(Some(stamp), noon()));
    }

    // =========================================================================
    // Against the store
    // =========================================================================

    #[test]
    fn empty_folder_in_store_is_stale() {
        let store = SqliteStore::open_in_memory().unwrap();
        assert!(CachePolicy::default().is_stale(&store, "Trips").unwrap());
    }

    #[test]
    fn recent_scan_of_old_files_is_fresh() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.upsert(&row("Trips", Utc::now())).unwrap();
        assert!(!CachePolicy::default().is_stale(&store, "Trips").unwrap());
    }

    #[test]
    fn old_scan_is_stale() {
        let store = SqliteStore::open_in_memory().unwrap();
        store
            .upsert(&row("Trips", Utc::now() - TimeDelta::hours(2)))
            .unwrap();
        assert!(CachePolicy::default().is_stale(&store, "Trips").unwrap());
    }
}
