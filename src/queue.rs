//! Background scan queue.
//!
//! A fixed-size rayon pool runs scan jobs. Each job is keyed by folder: while
//! a scan of a folder is queued or running, further requests for the same
//! folder are dropped. Requests never block and are never joined.
//!
//! The key is released when the job ends however it ends, including by
//! panicking. A panicking scan is logged and the worker thread survives.

use std::collections::HashSet;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use thiserror::Error;
use tracing::{debug, error};

#[derive(Error, Debug)]
pub enum QueueError {
    #[error("Could not start scan workers: {0}")]
    Pool(#[from] rayon::ThreadPoolBuildError),
}

type Job = Arc<dyn Fn(&str) + Send + Sync>;
type InFlight = Arc<Mutex<HashSet<String>>>;

pub struct ScanQueue {
    pool: rayon::ThreadPool,
    in_flight: InFlight,
    job: Job,
}

impl ScanQueue {
    /// Start `workers` threads (at least one) that run `job` for each
    /// accepted folder.
    pub fn new(
        workers: usize,
        job: impl Fn(&str) + Send + Sync + 'static,
    ) -> Result<Self, QueueError> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers.max(1))
            .thread_name(|i| format!("scan-worker-{i}"))
            .build()?;
        Ok(Self {
            pool,
            in_flight: Arc::new(Mutex::new(HashSet::new())),
            job: Arc::new(job),
        })
    }

    /// Queue a scan of `folder`. Returns `false` if one is already pending.
    pub fn request(&self, folder: &str) -> bool {
        if !lock(&self.in_flight).insert(folder.to_string()) {
            debug!(folder, "scan already pending, request dropped");
            return false;
        }

        let guard = Release {
            in_flight: Arc::clone(&self.in_flight),
            folder: folder.to_string(),
        };
        let job = Arc::clone(&self.job);
        self.pool.spawn(move || {
            let guard = guard;
            if catch_unwind(AssertUnwindSafe(|| job(&guard.folder))).is_err() {
                error!(folder = %guard.folder, "scan worker panicked");
            }
        });
        debug!(folder, "scan queued");
        true
    }

    /// Whether a scan of `folder` is queued or running.
    pub fn in_flight(&self, folder: &str) -> bool {
        lock(&self.in_flight).contains(folder)
    }

    /// Number of folders queued or running.
    pub fn pending(&self) -> usize {
        lock(&self.in_flight).len()
    }

    pub fn workers(&self) -> usize {
        self.pool.current_num_threads()
    }
}

/// A panicking job never holds this lock, but stay usable if it was poisoned.
fn lock(in_flight: &Mutex<HashSet<String>>) -> MutexGuard<'_, HashSet<String>> {
    in_flight.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Removes the folder from the in-flight set when dropped.
struct Release {
    in_flight: InFlight,
    folder: String,
}

impl Drop for Release {
    fn drop(&mut self) {
        lock(&self.in_flight).remove(&self.folder);
    }
}
