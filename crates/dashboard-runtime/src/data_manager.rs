//! TTL-cached snapshot manager for the account dashboard.
//!
//! Wraps [`Snapshot::load`] with a configurable time-to-live cache and
//! retry logic. Callers use [`DataManager::get_snapshot`] to obtain a
//! fresh-or-cached [`Snapshot`]; the manager handles staleness checks, up to
//! three load attempts with back-off, and fallback to the previous snapshot
//! when a reload fails.

use std::path::PathBuf;
use std::thread;
use std::time::{Duration, Instant};

use dashboard_core::criteria::PipelineConfig;
use dashboard_data::analysis::Snapshot;

// ── Defaults ──────────────────────────────────────────────────────────────────

/// Maximum number of load attempts before giving up.
const MAX_RETRY_ATTEMPTS: u32 = 3;

// ── DataManager ───────────────────────────────────────────────────────────────

/// TTL-cached owner of the current [`Snapshot`].
///
/// # Example
/// ```no_run
/// use std::path::PathBuf;
/// use dashboard_core::criteria::PipelineConfig;
/// use dashboard_runtime::data_manager::DataManager;
///
/// let mut mgr = DataManager::new(300, PathBuf::from("data.csv"), PipelineConfig::default());
/// if let Some(snapshot) = mgr.get_snapshot(false) {
///     println!("records: {}", snapshot.records().len());
/// }
/// ```
pub struct DataManager {
    /// Maximum age of a cached snapshot before it is considered stale.
    cache_ttl: Duration,
    /// CSV file the snapshot is loaded from.
    data_path: PathBuf,
    /// Pipeline switches applied on every load.
    config: PipelineConfig,
    cache: Option<Snapshot>,
    cache_timestamp: Option<Instant>,
    /// Description of the last load error.
    last_error: Option<String>,
}

impl DataManager {
    pub fn new(cache_ttl_secs: u64, data_path: PathBuf, config: PipelineConfig) -> Self {
        Self {
            cache_ttl: Duration::from_secs(cache_ttl_secs),
            data_path,
            config,
            cache: None,
            cache_timestamp: None,
            last_error: None,
        }
    }

    // ── Public API ────────────────────────────────────────────────────────

    /// Return the snapshot, using the cache when it is still valid.
    ///
    /// When `force_refresh` is `true` the cache is bypassed. On load failure
    /// the previous snapshot (if any) is returned and [`last_error`] is set.
    ///
    /// [`last_error`]: DataManager::last_error
    pub fn get_snapshot(&mut self, force_refresh: bool) -> Option<&Snapshot> {
        if !force_refresh && self.is_cache_valid() {
            tracing::debug!("returning cached snapshot");
            return self.cache.as_ref();
        }

        match self.load_with_retry() {
            Ok(snapshot) => {
                tracing::debug!(
                    records = snapshot.records().len(),
                    path = %self.data_path.display(),
                    "snapshot cache updated"
                );
                self.cache = Some(snapshot);
                self.cache_timestamp = Some(Instant::now());
                self.last_error = None;
                self.cache.as_ref()
            }
            Err(e) => {
                tracing::warn!(error = %e, "load failed; falling back to cached snapshot");
                self.last_error = Some(e);
                self.cache.as_ref()
            }
        }
    }

    /// Discard the current snapshot, forcing the next call to reload.
    pub fn invalidate_cache(&mut self) {
        self.cache = None;
        self.cache_timestamp = None;
        tracing::debug!("cache invalidated");
    }

    /// Age of the cached snapshot, or `None` if nothing has been loaded.
    pub fn cache_age(&self) -> Option<Duration> {
        self.cache_timestamp.map(|ts| ts.elapsed())
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    // ── Private helpers ───────────────────────────────────────────────────

    fn is_cache_valid(&self) -> bool {
        match (self.cache.as_ref(), self.cache_timestamp) {
            (Some(_), Some(ts)) => ts.elapsed() < self.cache_ttl,
            _ => false,
        }
    }

    /// Back-off schedule: attempt 1 → 0 ms, attempt 2 → 100 ms, attempt 3 → 200 ms.
    fn load_with_retry(&self) -> Result<Snapshot, String> {
        let mut last_err = String::new();

        for attempt in 0..MAX_RETRY_ATTEMPTS {
            if attempt > 0 {
                let sleep_ms = (attempt as u64) * 100;
                tracing::debug!(attempt, sleep_ms, "retrying load after back-off");
                thread::sleep(Duration::from_millis(sleep_ms));
            }

            match Snapshot::load(&self.data_path, self.config) {
                Ok(snapshot) => return Ok(snapshot),
                Err(e) => {
                    tracing::warn!(attempt, error = %e, "load attempt failed");
                    last_err = e.to_string();
                }
            }
        }

        Err(last_err)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
