//! Run log for batch analysis.
//!
//! Tracks what a run did (sessions analyzed, rows dropped, windows and rows
//! written) and which sessions failed, so a batch can be audited afterwards.
//! Counters are atomic so worker threads can record into a shared log.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

/// A session that could not be analyzed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionFailure {
    /// Group/session key
    pub session: String,
    /// Transcript file, when known
    pub source: Option<PathBuf>,
    pub error: String,
}

/// Counters for the current run.
#[derive(Debug)]
pub struct RunLog {
    run_id: Uuid,
    sessions_processed: AtomicU64,
    sessions_failed: AtomicU64,
    groups_skipped: AtomicU64,
    rows_dropped: AtomicU64,
    windows_generated: AtomicU64,
    rows_written: AtomicU64,
    failures: Mutex<Vec<SessionFailure>>,
    started_at: DateTime<Utc>,
    /// Path for persisting stats
    persist_path: Option<PathBuf>,
    /// Totals from earlier runs, loaded from `persist_path`
    previous: Option<PersistedStats>,
}

impl RunLog {
    /// Create an in-memory log with a fresh run id.
    pub fn new() -> Self {
        Self {
            run_id: Uuid::new_v4(),
            sessions_processed: AtomicU64::new(0),
            sessions_failed: AtomicU64::new(0),
            groups_skipped: AtomicU64::new(0),
            rows_dropped: AtomicU64::new(0),
            windows_generated: AtomicU64::new(0),
            rows_written: AtomicU64::new(0),
            failures: Mutex::new(Vec::new()),
            started_at: Utc::now(),
            persist_path: None,
            previous: None,
        }
    }

    /// Create a run log that accumulates into a file across runs.
    pub fn with_persistence(path: PathBuf) -> Self {
        let mut log = Self::new();
        log.persist_path = Some(path);

        if let Err(e) = log.load() {
            tracing::warn!(error = %e, "could not load previous run stats");
        }

        log
    }

    /// Identifier of this run.
    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// Record a successfully analyzed and written session.
    pub fn record_session(&self, rows_dropped: u64, windows: u64, rows_written: u64) {
        self.sessions_processed.fetch_add(1, Ordering::Relaxed);
        self.rows_dropped.fetch_add(rows_dropped, Ordering::Relaxed);
        self.windows_generated.fetch_add(windows, Ordering::Relaxed);
        self.rows_written.fetch_add(rows_written, Ordering::Relaxed);
    }

    /// Record a failed session with enough context to find it again.
    pub fn record_failure(&self, failure: SessionFailure) {
        self.sessions_failed.fetch_add(1, Ordering::Relaxed);
        if let Ok(mut failures) = self.failures.lock() {
            failures.push(failure);
        }
    }

    /// Record a group directory that was not found.
    pub fn record_group_skipped(&self) {
        self.groups_skipped.fetch_add(1, Ordering::Relaxed);
    }

    /// Failures recorded so far.
    pub fn failures(&self) -> Vec<SessionFailure> {
        self.failures
            .lock()
            .map(|f| f.clone())
            .unwrap_or_default()
    }

    /// Get the current statistics.
    pub fn stats(&self) -> RunStats {
        RunStats {
            run_id: self.run_id,
            sessions_processed: self.sessions_processed.load(Ordering::Relaxed),
            sessions_failed: self.sessions_failed.load(Ordering::Relaxed),
            groups_skipped: self.groups_skipped.load(Ordering::Relaxed),
            rows_dropped: self.rows_dropped.load(Ordering::Relaxed),
            windows_generated: self.windows_generated.load(Ordering::Relaxed),
            rows_written: self.rows_written.load(Ordering::Relaxed),
            started_at: self.started_at,
            duration_secs: (Utc::now() - self.started_at).num_milliseconds() as f64 / 1000.0,
        }
    }

    /// Get a summary string for display.
    pub fn summary(&self) -> String {
        let stats = self.stats();
        let mut summary = format!(
            "Run Statistics ({}):\n\
             - Sessions analyzed: {}\n\
             - Sessions failed: {}\n\
             - Groups skipped: {}\n\
             - Transcript rows dropped: {}\n\
             - Windows generated: {}\n\
             - Rows written: {}\n\
             - Duration: {:.1} seconds",
            stats.run_id,
            stats.sessions_processed,
            stats.sessions_failed,
            stats.groups_skipped,
            stats.rows_dropped,
            stats.windows_generated,
            stats.rows_written,
            stats.duration_secs
        );

        let failures = self.failures();
        if !failures.is_empty() {
            summary.push_str("\n\nFailed sessions:");
            for failure in failures {
                summary.push_str(&format!("\n- {}: {}", failure.session, failure.error));
            }
        }

        if let Some(ref previous) = self.previous {
            summary.push_str(&format!(
                "\n\nAll runs: {} sessions analyzed, {} failed",
                previous.sessions_processed + stats.sessions_processed,
                previous.sessions_failed + stats.sessions_failed
            ));
        }

        summary
    }

    /// Save cumulative stats and this run's failures to disk.
    pub fn save(&self) -> Result<(), std::io::Error> {
        if let Some(ref path) = self.persist_path {
            // Ensure parent directory exists
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }

            let stats = self.stats();
            let previous = self.previous.clone().unwrap_or_default();
            let persisted = PersistedStats {
                runs: previous.runs + 1,
                sessions_processed: previous.sessions_processed + stats.sessions_processed,
                sessions_failed: previous.sessions_failed + stats.sessions_failed,
                rows_written: previous.rows_written + stats.rows_written,
                last_run_id: Some(self.run_id),
                last_failures: self.failures(),
                last_updated: Some(Utc::now()),
            };

            let json = serde_json::to_string_pretty(&persisted).map_err(std::io::Error::other)?;

            std::fs::write(path, json)?;
        }
        Ok(())
    }

    /// Load stats from disk.
    fn load(&mut self) -> Result<(), std::io::Error> {
        if let Some(ref path) = self.persist_path {
            if path.exists() {
                let content = std::fs::read_to_string(path)?;
                let persisted: PersistedStats =
                    serde_json::from_str(&content).map_err(std::io::Error::other)?;
                self.previous = Some(persisted);
            }
        }
        Ok(())
    }
}

impl Default for RunLog {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of run statistics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunStats {
    pub run_id: Uuid,
    pub sessions_processed: u64,
    pub sessions_failed: u64,
    pub groups_skipped: u64,
    pub rows_dropped: u64,
    pub windows_generated: u64,
    pub rows_written: u64,
    pub started_at: DateTime<Utc>,
    pub duration_secs: f64,
}

/// Stats format for persistence.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct PersistedStats {
    runs: u64,
    sessions_processed: u64,
    sessions_failed: u64,
    rows_written: u64,
    last_run_id: Option<Uuid>,
    last_failures: Vec<SessionFailure>,
    last_updated: Option<DateTime<Utc>>,
}

/// Thread-safe shared run log.
pub type SharedRunLog = Arc<RunLog>;

/// Create a new shared run log.
pub fn create_shared_log() -> SharedRunLog {
    Arc::new(RunLog::new())
}

/// Create a new shared run log with persistence.
pub fn create_shared_log_with_persistence(path: PathBuf) -> SharedRunLog {
    Arc::new(RunLog::with_persistence(path))
}
