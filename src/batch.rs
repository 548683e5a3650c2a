//! Batch analysis over grouped transcript directories.
//!
//! Transcripts live under `<root>/group N/` as files ending in
//! [`TRANSCRIPT_SUFFIX`]; the text before the suffix is the session prefix.
//! Output for group N goes to `<out>/group_N/`. Sessions are independent and
//! run on a small worker pool; one session failing never stops the others.

use crate::core::{AnalysisError, OverlapPolicy, SessionAnalyzer, SessionBounds, SessionStats};
use crate::io::{read_transcript, write_session, OutputFormat, SessionFiles, SourceError};
use crate::report::{SessionFailure, SharedRunLog};
use crossbeam_channel::{bounded, unbounded};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thiserror::Error;

/// File name suffix identifying transcript files.
pub const TRANSCRIPT_SUFFIX: &str = "_word_level_transcriptions.csv";

/// Errors for a single session.
#[derive(Debug, Error)]
pub enum BatchError {
    #[error(transparent)]
    Source(#[from] SourceError),
    #[error("analysis failed: {0}")]
    Analysis(#[from] AnalysisError),
}

/// One transcript to analyze.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionJob {
    /// Group number, when discovered from a `group N` directory
    pub group: Option<usize>,
    /// File prefix before [`TRANSCRIPT_SUFFIX`]
    pub prefix: String,
    pub transcript: PathBuf,
    pub out_dir: PathBuf,
}

impl SessionJob {
    /// Key used in logs and failure reports.
    pub fn key(&self) -> String {
        match self.group {
            Some(group) => format!("group_{group}/{}", self.prefix),
            None => self.prefix.clone(),
        }
    }

    /// Keys tried, in order, when looking up session cutoffs.
    pub fn bounds_keys(&self) -> Vec<String> {
        let mut keys = vec![self.key()];
        if let Some(group) = self.group {
            keys.push(self.prefix.clone());
            keys.push(format!("group_{group}"));
        }
        keys
    }

    /// Cutoffs for this session, trying each of [`Self::bounds_keys`] in order.
    pub fn find_bounds(&self, bounds: &HashMap<String, SessionBounds>) -> Option<SessionBounds> {
        self.bounds_keys()
            .iter()
            .find_map(|key| bounds.get(key).copied())
    }
}

/// Session prefix of a transcript file name, if it is one.
pub fn session_prefix(file_name: &str) -> Option<&str> {
    file_name
        .strip_suffix(TRANSCRIPT_SUFFIX)
        .filter(|prefix| !prefix.is_empty())
}

/// Find transcripts in `group 1` to `group num_groups` under `transcripts_dir`.
///
/// Missing group directories are skipped and recorded in the run log.
pub fn discover_sessions(
    transcripts_dir: &Path,
    output_dir: &Path,
    num_groups: usize,
    log: &SharedRunLog,
) -> Result<Vec<SessionJob>, SourceError> {
    let mut jobs = Vec::new();

    for group in 1..=num_groups {
        let group_dir = transcripts_dir.join(format!("group {group}"));
        if !group_dir.is_dir() {
            tracing::info!(dir = ?group_dir, "skipping missing group directory");
            log.record_group_skipped();
            continue;
        }

        let mut transcripts: Vec<(String, PathBuf)> = std::fs::read_dir(&group_dir)
            .map_err(|e| SourceError::io(&group_dir, e))?
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.is_file())
            .filter_map(|p| {
                let name = p.file_name()?.to_str()?;
                let prefix = session_prefix(name)?.to_string();
                Some((prefix, p))
            })
            .collect();
        transcripts.sort();

        let out_dir = output_dir.join(format!("group_{group}"));
        jobs.extend(transcripts.into_iter().map(|(prefix, transcript)| SessionJob {
            group: Some(group),
            prefix,
            transcript,
            out_dir: out_dir.clone(),
        }));
    }

    Ok(jobs)
}

/// Outcome of a completed session.
#[derive(Debug, Clone)]
pub struct SessionReport {
    pub key: String,
    pub files: SessionFiles,
    pub stats: SessionStats,
    pub speakers: usize,
}

/// Analyze one session and write its tables.
pub fn run_session(
    job: &SessionJob,
    analyzer: &SessionAnalyzer,
    bounds: &HashMap<String, SessionBounds>,
    format: OutputFormat,
) -> Result<SessionReport, BatchError> {
    let rows = read_transcript(&job.transcript)?;
    let session_bounds = job.find_bounds(bounds);
    if session_bounds.is_none() && analyzer.options().policy == OverlapPolicy::Bounded {
        tracing::warn!(session = %job.key(), "no cutoffs found for session");
    }

    let output = analyzer.analyze(rows, session_bounds)?;
    let files = write_session(&job.out_dir, &job.prefix, &output, format)?;

    Ok(SessionReport {
        key: job.key(),
        speakers: output.series.speakers.len(),
        stats: output.stats,
        files,
    })
}

/// Totals for a batch run.
#[derive(Debug, Clone, Default)]
pub struct BatchSummary {
    pub completed: Vec<SessionReport>,
    pub failed: usize,
    /// Sessions never started because the run was stopped
    pub cancelled: usize,
}

/// Runs session jobs on a worker pool.
pub struct BatchRunner {
    analyzer: SessionAnalyzer,
    bounds: HashMap<String, SessionBounds>,
    format: OutputFormat,
    workers: usize,
    log: SharedRunLog,
    stop: Arc<AtomicBool>,
}

impl BatchRunner {
    /// Create a runner; `workers` is clamped to at least one.
    pub fn new(
        analyzer: SessionAnalyzer,
        bounds: HashMap<String, SessionBounds>,
        format: OutputFormat,
        workers: usize,
        log: SharedRunLog,
    ) -> Self {
        Self {
            analyzer,
            bounds,
            format,
            workers: workers.max(1),
            log,
            stop: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Flag that stops dispatching new sessions once set.
    ///
    /// Sessions already running are finished.
    pub fn stop_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.stop)
    }

    /// Run all jobs and report per-session outcomes to the run log.
    pub fn run(&self, jobs: Vec<SessionJob>) -> BatchSummary {
        let total = jobs.len();
        let (job_tx, job_rx) = bounded::<SessionJob>(self.workers);
        let (result_tx, result_rx) = unbounded();
        let mut summary = BatchSummary::default();

        std::thread::scope(|scope| {
            for _ in 0..self.workers {
                let job_rx = job_rx.clone();
                let result_tx = result_tx.clone();
                scope.spawn(move || {
                    for job in job_rx.iter() {
                        let outcome = run_session(&job, &self.analyzer, &self.bounds, self.format);
                        if result_tx.send((job, outcome)).is_err() {
                            break;
                        }
                    }
                });
            }
            drop(result_tx);
            drop(job_rx);

            let mut dispatched = 0;
            for job in jobs {
                if self.stop.load(Ordering::SeqCst) {
                    tracing::info!("stop requested, not dispatching remaining sessions");
                    break;
                }
                if job_tx.send(job).is_err() {
                    break;
                }
                dispatched += 1;
            }
            drop(job_tx);
            summary.cancelled = total - dispatched;

            for (job, outcome) in result_rx.iter() {
                self.record(&job, outcome, &mut summary);
            }
        });

        summary
    }

    fn record(
        &self,
        job: &SessionJob,
        outcome: Result<SessionReport, BatchError>,
        summary: &mut BatchSummary,
    ) {
        match outcome {
            Ok(report) => {
                let dropped = report.stats.rows_dropped();
                self.log.record_session(
                    dropped as u64,
                    report.stats.windows as u64,
                    report.files.rows_written as u64,
                );
                tracing::info!(
                    session = %report.key,
                    speakers = report.speakers,
                    windows = report.stats.windows,
                    dropped,
                    "session complete"
                );
                summary.completed.push(report);
            }
            Err(e) => {
                tracing::error!(
                    session = %job.key(),
                    path = ?job.transcript,
                    error = %e,
                    "session failed"
                );
                self.log.record_failure(SessionFailure {
                    session: job.key(),
                    source: Some(job.transcript.clone()),
                    error: e.to_string(),
                });
                summary.failed += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::create_shared_log;

    #[test]
    fn test_session_prefix() {
        assert_eq!(session_prefix("p07_word_level_transcriptions.csv"), Some("p07"));
        assert_eq!(session_prefix("_word_level_transcriptions.csv"), None);
        assert_eq!(session_prefix("p07_summary.csv"), None);
    }

    #[test]
    fn test_bounds_lookup_order() {
        let job = SessionJob {
            group: Some(2),
            prefix: "p07".to_string(),
            transcript: PathBuf::from("x.csv"),
            out_dir: PathBuf::from("out"),
        };
        assert_eq!(job.key(), "group_2/p07");

        let mut bounds = HashMap::new();
        bounds.insert("group_2".to_string(), SessionBounds::new(0.0, 10.0));
        assert_eq!(job.find_bounds(&bounds), Some(SessionBounds::new(0.0, 10.0)));

        bounds.insert("group_2/p07".to_string(), SessionBounds::new(5.0, 10.0));
        assert_eq!(job.find_bounds(&bounds), Some(SessionBounds::new(5.0, 10.0)));
    }

    #[test]
    fn test_discover_skips_missing_groups() {
        let root = tempfile::tempdir().unwrap();
        let group = root.path().join("group 2");
        std::fs::create_dir_all(&group).unwrap();
        std::fs::write(group.join("b_word_level_transcriptions.csv"), "").unwrap();
        std::fs::write(group.join("a_word_level_transcriptions.csv"), "").unwrap();
        std::fs::write(group.join("notes.txt"), "").unwrap();

        let log = create_shared_log();
        let jobs = discover_sessions(root.path(), Path::new("out"), 3, &log).unwrap();

        let keys: Vec<String> = jobs.iter().map(SessionJob::key).collect();
        assert_eq!(keys, vec!["group_2/a", "group_2/b"]);
        assert_eq!(jobs[0].out_dir, Path::new("out").join("group_2"));
        assert_eq!(log.stats().groups_skipped, 2);
    }
}
