//! Single-session analysis: filter, window, match, assemble.

use crate::core::matcher::{match_window, OverlapPolicy, ParticipantFilter, WindowTally};
use crate::core::series::{assemble, SessionSeries};
use crate::core::utterance::{filter_utterances, RawUtterance};
use crate::core::windowing::{generate_windows, SessionBounds, WindowConfig, WindowConfigError};
use crate::lexicon::Lexicon;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Options controlling how a session is analyzed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisOptions {
    pub window: WindowConfig,
    pub policy: OverlapPolicy,
    /// Only consulted by [`OverlapPolicy::Bounded`]
    pub participants: ParticipantFilter,
}

/// Session analysis errors.
#[derive(Debug, Error, PartialEq)]
pub enum AnalysisError {
    #[error("session bounds are required for the bounded overlap policy")]
    MissingBounds,
    #[error("invalid session bounds: start {start}, end {end}")]
    InvalidBounds { start: f64, end: f64 },
    #[error("session spans {count} windows, more than the limit of {max}")]
    TooManyWindows { count: f64, max: usize },
    #[error(transparent)]
    Window(#[from] WindowConfigError),
}

/// Counters describing what happened to a session's input.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionStats {
    pub rows_read: usize,
    pub utterances_kept: usize,
    pub rows_dropped_invalid: usize,
    pub rows_dropped_out_of_bounds: usize,
    pub windows: usize,
    pub tallies: usize,
}

impl SessionStats {
    /// Rows dropped for any reason.
    pub fn rows_dropped(&self) -> usize {
        self.rows_dropped_invalid + self.rows_dropped_out_of_bounds
    }
}

/// Result of analyzing one session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionOutput {
    pub bounds: SessionBounds,
    pub series: SessionSeries,
    pub stats: SessionStats,
}

/// Runs the windowed dictionary analysis for sessions sharing one lexicon.
///
/// The analyzer holds no per-session state, so one instance can serve many
/// sessions from several threads.
#[derive(Debug, Clone)]
pub struct SessionAnalyzer {
    lexicon: Lexicon,
    options: AnalysisOptions,
}

impl SessionAnalyzer {
    /// Create an analyzer, rejecting an invalid window configuration.
    pub fn new(lexicon: Lexicon, options: AnalysisOptions) -> Result<Self, AnalysisError> {
        options.window.validate()?;
        Ok(Self { lexicon, options })
    }

    /// The lexicon sessions are matched against.
    pub fn lexicon(&self) -> &Lexicon {
        &self.lexicon
    }

    /// Window and overlap settings in use.
    pub fn options(&self) -> &AnalysisOptions {
        &self.options
    }

    /// Analyze one session's transcript rows.
    ///
    /// `bounds` truncates the session when given; without it the session
    /// spans `0` to the last utterance end. The bounded policy requires bounds.
    pub fn analyze<I>(
        &self,
        rows: I,
        bounds: Option<SessionBounds>,
    ) -> Result<SessionOutput, AnalysisError>
    where
        I: IntoIterator<Item = RawUtterance>,
    {
        if self.options.policy == OverlapPolicy::Bounded && bounds.is_none() {
            return Err(AnalysisError::MissingBounds);
        }
        if let Some(b) = bounds {
            if !(b.start.is_finite() && b.end.is_finite()) || b.start > b.end {
                return Err(AnalysisError::InvalidBounds {
                    start: b.start,
                    end: b.end,
                });
            }
        }

        let rows: Vec<RawUtterance> = rows.into_iter().collect();
        let rows_read = rows.len();
        let filtered = filter_utterances(rows, bounds.as_ref());
        let utterances = filtered.utterances;

        let bounds = bounds.unwrap_or_else(|| SessionBounds::from_utterances(&utterances));
        let count = self.options.window.window_count(&bounds);
        if count > self.options.window.max_windows as f64 {
            return Err(AnalysisError::TooManyWindows {
                count,
                max: self.options.window.max_windows,
            });
        }
        let windows = generate_windows(bounds, self.options.window);

        let tallies: Vec<WindowTally> = windows
            .iter()
            .flat_map(|window| {
                match_window(
                    window,
                    &utterances,
                    &self.lexicon,
                    self.options.policy,
                    &self.options.participants,
                )
            })
            .collect();

        let series = assemble(&windows, &tallies, &self.lexicon.categories());

        let stats = SessionStats {
            rows_read,
            utterances_kept: utterances.len(),
            rows_dropped_invalid: filtered.dropped_invalid,
            rows_dropped_out_of_bounds: filtered.dropped_out_of_bounds,
            windows: windows.len(),
            tallies: tallies.len(),
        };

        tracing::debug!(
            policy = %self.options.policy,
            rows = stats.rows_read,
            kept = stats.utterances_kept,
            windows = stats.windows,
            speakers = series.speakers.len(),
            "session analyzed"
        );

        Ok(SessionOutput {
            bounds,
            series,
            stats,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::windowing::DEFAULT_MAX_WINDOWS;
    use crate::lexicon::DictionaryEntry;

    fn analyzer(policy: OverlapPolicy) -> SessionAnalyzer {
        let lexicon = Lexicon::build(vec![
            DictionaryEntry::new("hello", "POS"),
            DictionaryEntry::new("art*", "CRE"),
        ])
        .unwrap();
        SessionAnalyzer::new(
            lexicon,
            AnalysisOptions {
                policy,
                ..Default::default()
            },
        )
        .unwrap()
    }

    #[test]
    fn test_bounded_requires_bounds() {
        let result = analyzer(OverlapPolicy::Bounded).analyze(Vec::new(), None);
        assert_eq!(result.unwrap_err(), AnalysisError::MissingBounds);
    }

    #[test]
    fn test_inverted_bounds_rejected() {
        let result = analyzer(OverlapPolicy::Unbounded)
            .analyze(Vec::new(), Some(SessionBounds::new(10.0, 5.0)));
        assert!(matches!(result, Err(AnalysisError::InvalidBounds { .. })));
    }

    #[test]
    fn test_invalid_window_config_rejected() {
        let options = AnalysisOptions {
            window: WindowConfig {
                step_secs: 0.0,
                ..Default::default()
            },
            ..Default::default()
        };
        let err = SessionAnalyzer::new(Lexicon::default(), options).unwrap_err();
        assert!(matches!(err, AnalysisError::Window(_)));
    }

    #[test]
    fn test_stats_reflect_drops() {
        let rows = vec![
            RawUtterance::new("A", "0", "5", "hello"),
            RawUtterance::new("A", "bad", "5", "hello"),
        ];
        let output = analyzer(OverlapPolicy::Unbounded).analyze(rows, None).unwrap();
        assert_eq!(output.stats.rows_read, 2);
        assert_eq!(output.stats.utterances_kept, 1);
        assert_eq!(output.stats.rows_dropped_invalid, 1);
        assert_eq!(output.stats.rows_dropped(), 1);
        assert_eq!(output.stats.windows, 1);
        assert_eq!(output.bounds, SessionBounds::new(0.0, 5.0));
    }

    #[test]
    fn test_runaway_end_time_fails_session() {
        // A corrupt end time must not try to allocate billions of windows
        let rows = vec![RawUtterance::new("A", "0", "1e12", "hello")];
        let result = analyzer(OverlapPolicy::Unbounded).analyze(rows, None);
        assert!(matches!(
            result,
            Err(AnalysisError::TooManyWindows { max, .. }) if max == DEFAULT_MAX_WINDOWS
        ));

        let result = analyzer(OverlapPolicy::Bounded)
            .analyze(Vec::new(), Some(SessionBounds::new(0.0, 1e12)));
        assert!(matches!(result, Err(AnalysisError::TooManyWindows { .. })));
    }
}
