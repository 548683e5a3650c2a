//! Core analysis for Diction Series.
//!
//! This module contains:
//! - Utterance validation and tokenization
//! - Overlapping window generation
//! - Per-window dictionary matching
//! - Dense per-speaker and group series assembly
//! - Category summary statistics

pub mod matcher;
pub mod pipeline;
pub mod series;
pub mod stats;
pub mod utterance;
pub mod windowing;

// Re-export commonly used types
pub use matcher::{match_window, OverlapPolicy, ParticipantFilter, WindowTally, NO_SPEAKER};
pub use pipeline::{AnalysisError, AnalysisOptions, SessionAnalyzer, SessionOutput, SessionStats};
pub use series::{assemble, SeriesRow, SessionSeries, SpeakerSeries};
pub use stats::{summarize, CategorySummary};
pub use utterance::{filter_utterances, tokenize, FilterOutcome, RawUtterance, Utterance};
pub use windowing::{
    generate_windows, SessionBounds, Window, WindowConfig, WindowGenerator,
    DEFAULT_MAX_WINDOWS, DEFAULT_STEP_SECS, DEFAULT_WINDOW_SIZE_SECS,
};
