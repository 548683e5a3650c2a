//! File sources and sinks around the core analysis.
//!
//! Sources read the dictionary, transcripts and session cutoffs from CSV.
//! Sinks persist the per-speaker and group tables as CSV, JSON or JSON Lines.

pub mod sinks;
pub mod sources;

pub use sinks::{
    format_seconds, write_session, write_table, OutputFormat, SessionFiles, SummaryReport,
};
pub use sources::{
    dictionary_from_reader, read_dictionary, read_session_bounds, read_transcript,
    session_bounds_from_reader, transcript_from_reader, DictionaryColumns,
};

use std::path::PathBuf;
use thiserror::Error;

/// Errors reading or writing analysis files.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("IO error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("CSV error in {path:?}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
    #[error("{path:?} is missing required column '{column}'")]
    MissingColumn { path: PathBuf, column: String },
    #[error("Serialize error for {path:?}: {source}")]
    Serialize {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl SourceError {
    /// I/O failure on `path`.
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        SourceError::Io {
            path: path.into(),
            source,
        }
    }

    /// CSV failure on `path`.
    pub(crate) fn csv(path: impl Into<PathBuf>, source: csv::Error) -> Self {
        SourceError::Csv {
            path: path.into(),
            source,
        }
    }
}
