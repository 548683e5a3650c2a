//! Run reporting for Diction Series.
//!
//! Tracks what each batch run processed and which sessions failed.

pub mod log;

// Re-export commonly used types
pub use log::{
    create_shared_log, create_shared_log_with_persistence, RunLog, RunStats, SessionFailure,
    SharedRunLog,
};
