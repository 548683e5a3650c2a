//! Overlapping time windows over a session.
//!
//! Windows are fixed-length (default 30 seconds) and start every `step`
//! seconds (default 15), so consecutive windows overlap by half.

use crate::core::utterance::Utterance;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default window length in seconds.
pub const DEFAULT_WINDOW_SIZE_SECS: f64 = 30.0;

/// Default distance between window starts in seconds.
pub const DEFAULT_STEP_SECS: f64 = 15.0;

/// Default cap on windows per session; about 17 days at the default step.
pub const DEFAULT_MAX_WINDOWS: usize = 100_000;

/// Window configuration errors.
#[derive(Debug, Error, PartialEq)]
pub enum WindowConfigError {
    #[error("window size must be a positive number of seconds, got {0}")]
    InvalidSize(f64),
    #[error("window step must be a positive number of seconds, got {0}")]
    InvalidStep(f64),
    #[error("window limit must be at least 1")]
    InvalidMaxWindows,
}

/// Window length and step.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WindowConfig {
    pub size_secs: f64,
    pub step_secs: f64,
    /// Sessions needing more windows than this are rejected
    #[serde(default = "default_max_windows")]
    pub max_windows: usize,
}

fn default_max_windows() -> usize {
    DEFAULT_MAX_WINDOWS
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            size_secs: DEFAULT_WINDOW_SIZE_SECS,
            step_secs: DEFAULT_STEP_SECS,
            max_windows: DEFAULT_MAX_WINDOWS,
        }
    }
}

impl WindowConfig {
    /// Create a validated window configuration.
    pub fn new(size_secs: f64, step_secs: f64) -> Result<Self, WindowConfigError> {
        let config = Self {
            size_secs,
            step_secs,
            ..Self::default()
        };
        config.validate()?;
        Ok(config)
    }

    /// Check that size and step are positive and finite.
    pub fn validate(&self) -> Result<(), WindowConfigError> {
        if !(self.size_secs.is_finite() && self.size_secs > 0.0) {
            return Err(WindowConfigError::InvalidSize(self.size_secs));
        }
        if !(self.step_secs.is_finite() && self.step_secs > 0.0) {
            return Err(WindowConfigError::InvalidStep(self.step_secs));
        }
        if self.max_windows == 0 {
            return Err(WindowConfigError::InvalidMaxWindows);
        }
        Ok(())
    }

    /// Number of windows `bounds` would generate.
    ///
    /// Computed in floating point so it can be checked before generating.
    pub fn window_count(&self, bounds: &SessionBounds) -> f64 {
        if bounds.end <= bounds.start {
            return 0.0;
        }
        ((bounds.end - bounds.start) / self.step_secs).ceil()
    }
}

/// Start/end of the analyzed part of a session, in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SessionBounds {
    pub start: f64,
    pub end: f64,
}

impl SessionBounds {
    /// Bounds from explicit cutoffs in seconds.
    pub fn new(start: f64, end: f64) -> Self {
        Self { start, end }
    }

    /// Bounds spanning `0` to the latest utterance end.
    ///
    /// With no utterances the span is empty and generates no windows.
    pub fn from_utterances(utterances: &[Utterance]) -> Self {
        let end = utterances
            .iter()
            .map(|u| u.end)
            .fold(None, |max: Option<f64>, e| Some(max.map_or(e, |m| m.max(e))))
            .unwrap_or(0.0);
        Self { start: 0.0, end }
    }

    /// Whether an utterance lies fully inside the bounds.
    pub fn contains_utterance(&self, utterance: &Utterance) -> bool {
        utterance.start >= self.start && utterance.end <= self.end
    }
}

/// A single analysis window.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Window {
    pub index: usize,
    pub start: f64,
    pub end: f64,
}

/// Lazy, restartable sequence of windows covering a session.
///
/// Yields `start_i = bounds.start + i * step` while `start_i < bounds.end`.
#[derive(Debug, Clone)]
pub struct WindowGenerator {
    bounds: SessionBounds,
    config: WindowConfig,
    next_index: usize,
}

impl WindowGenerator {
    /// Generator positioned at the first window of `bounds`.
    pub fn new(bounds: SessionBounds, config: WindowConfig) -> Self {
        Self {
            bounds,
            config,
            next_index: 0,
        }
    }

    /// Start over from the first window.
    pub fn restart(&mut self) {
        self.next_index = 0;
    }

    fn window_at(&self, index: usize) -> Window {
        // Multiplying instead of accumulating keeps starts exact multiples.
        let start = self.bounds.start + index as f64 * self.config.step_secs;
        Window {
            index,
            start,
            end: start + self.config.size_secs,
        }
    }
}

impl Iterator for WindowGenerator {
    type Item = Window;

    fn next(&mut self) -> Option<Window> {
        let window = self.window_at(self.next_index);
        if window.start < self.bounds.end {
            self.next_index += 1;
            Some(window)
        } else {
            None
        }
    }
}

/// Collect all windows for a session.
pub fn generate_windows(bounds: SessionBounds, config: WindowConfig) -> Vec<Window> {
    WindowGenerator::new(bounds, config).collect()
}
