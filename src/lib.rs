//! Diction Series - windowed dictionary word-usage time series for speech.
//!
//! This library turns a time-stamped transcript and a categorized word
//! dictionary into per-speaker and group category counts over overlapping
//! time windows, for downstream behavioral and linguistic analysis.
//!
//! # Matching rules
//!
//! - **Literal words** match whole tokens, case-insensitively
//! - **Wildcard words** (`art*`) match from the start of a token
//! - **Negative categories** (codes starting with `N`) are dropped entirely
//! - **Every hit counts**: redundant dictionary entries are not deduplicated
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        Diction Series                        │
//! ├─────────────────────────────────────────────────────────────┤
//! │  ┌─────────────┐   ┌─────────────┐   ┌─────────────┐       │
//! │  │   Lexicon   │──▶│   Matcher   │──▶│   Series    │       │
//! │  │ (dictionary)│   │ (per window)│   │ (assemble)  │       │
//! │  └─────────────┘   └─────────────┘   └─────────────┘       │
//! │                           ▲                  │              │
//! │  ┌─────────────┐   ┌─────────────┐           ▼              │
//! │  │  Utterance  │──▶│  Windowing  │   ┌─────────────┐       │
//! │  │   Filter    │   │ (30s / 15s) │   │ Speaker and │       │
//! │  └─────────────┘   └─────────────┘   │ group tables│       │
//! │                                      └─────────────┘       │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```
//! use diction_series::core::{AnalysisOptions, RawUtterance, SessionAnalyzer};
//! use diction_series::lexicon::{DictionaryEntry, Lexicon};
//!
//! let lexicon = Lexicon::build(vec![
//!     DictionaryEntry::new("hello", "POS"),
//!     DictionaryEntry::new("art*", "CRE"),
//! ])
//! .unwrap();
//! let analyzer = SessionAnalyzer::new(lexicon, AnalysisOptions::default()).unwrap();
//!
//! let rows = vec![RawUtterance::new("A", "0", "5", "Hello there, great artwork!")];
//! let output = analyzer.analyze(rows, None).unwrap();
//!
//! assert_eq!(output.series.group.len(), 1);
//! assert_eq!(output.series.group[0].count("CRE"), 1);
//! ```

pub mod batch;
pub mod config;
pub mod core;
pub mod io;
pub mod lexicon;
pub mod report;

// Re-export key types at crate root for convenience
pub use batch::{BatchError, BatchRunner, BatchSummary, SessionJob};
pub use config::{Config, ConfigError};
pub use core::{
    AnalysisError, AnalysisOptions, OverlapPolicy, ParticipantFilter, SessionAnalyzer,
    SessionBounds, SessionOutput, SessionSeries, WindowConfig, NO_SPEAKER,
};
pub use io::{OutputFormat, SourceError};
pub use lexicon::{DictionaryEntry, Lexicon, LexiconError};
pub use report::{RunLog, SharedRunLog};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
