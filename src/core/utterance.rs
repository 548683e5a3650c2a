//! Utterance records and the filtering step that turns raw transcript rows
//! into typed, tokenized utterances.

use crate::core::windowing::SessionBounds;
use serde::{Deserialize, Serialize};

/// A transcript row as read from the source, before validation.
///
/// Every field is optional: sources hand over whatever they found and the
/// filter decides what survives.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawUtterance {
    pub speaker: Option<String>,
    pub start: Option<String>,
    pub end: Option<String>,
    pub text: Option<String>,
}

impl RawUtterance {
    /// Row with every field present.
    pub fn new(speaker: &str, start: &str, end: &str, text: &str) -> Self {
        Self {
            speaker: Some(speaker.to_string()),
            start: Some(start.to_string()),
            end: Some(end.to_string()),
            text: Some(text.to_string()),
        }
    }
}

/// A validated utterance with tokenized text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Utterance {
    pub speaker: String,
    /// Start time in seconds
    pub start: f64,
    /// End time in seconds
    pub end: f64,
    /// Lower-cased word tokens
    pub tokens: Vec<String>,
}

impl Utterance {
    /// Build an utterance, tokenizing `text`.
    pub fn new(speaker: impl Into<String>, start: f64, end: f64, text: &str) -> Self {
        Self {
            speaker: speaker.into(),
            start,
            end,
            tokens: tokenize(text),
        }
    }
}

/// Why a raw row was dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    MissingField,
    InvalidTime,
    OutsideBounds,
}

/// Result of filtering a session's rows.
#[derive(Debug, Clone, Default)]
pub struct FilterOutcome {
    pub utterances: Vec<Utterance>,
    /// Rows missing a field or carrying an unparseable time
    pub dropped_invalid: usize,
    /// Valid rows cut by the session bounds
    pub dropped_out_of_bounds: usize,
}

/// Parse a time field in seconds. Returns `None` for anything that is not a
/// finite number.
pub fn parse_seconds(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Split text into lower-cased word tokens.
///
/// A token is a maximal run of alphanumeric characters or underscores.
pub fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !(c.is_alphanumeric() || c == '_'))
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

fn non_blank(field: &Option<String>) -> Option<&str> {
    field.as_deref().filter(|s| !s.trim().is_empty())
}

/// Validate a single raw row.
pub fn validate(row: &RawUtterance) -> Result<Utterance, DropReason> {
    let speaker = non_blank(&row.speaker).ok_or(DropReason::MissingField)?;
    let text = non_blank(&row.text).ok_or(DropReason::MissingField)?;
    let start = non_blank(&row.start).ok_or(DropReason::MissingField)?;
    let end = non_blank(&row.end).ok_or(DropReason::MissingField)?;

    let start = parse_seconds(start).ok_or(DropReason::InvalidTime)?;
    let end = parse_seconds(end).ok_or(DropReason::InvalidTime)?;

    Ok(Utterance::new(speaker.trim(), start, end, text))
}

/// Clean a session's rows, optionally truncating to the session bounds.
///
/// Invalid rows are dropped, never reported as errors.
pub fn filter_utterances<I>(rows: I, bounds: Option<&SessionBounds>) -> FilterOutcome
where
    I: IntoIterator<Item = RawUtterance>,
{
    let mut outcome = FilterOutcome::default();

    for (index, row) in rows.into_iter().enumerate() {
        let utterance = match validate(&row) {
            Ok(u) => u,
            Err(reason) => {
                tracing::trace!(index, ?reason, "dropping transcript row");
                outcome.dropped_invalid += 1;
                continue;
            }
        };

        if let Some(bounds) = bounds {
            if !bounds.contains_utterance(&utterance) {
                outcome.dropped_out_of_bounds += 1;
                continue;
            }
        }

        outcome.utterances.push(utterance);
    }

    outcome
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenize() {
        assert_eq!(
            tokenize("Hello there, great artwork!"),
            vec!["hello", "there", "great", "artwork"]
        );
        assert_eq!(tokenize("we're  snake_case 42x"), vec!["we", "re", "snake_case", "42x"]);
        assert!(tokenize("  ...  ").is_empty());
    }

    #[test]
    fn test_tokenize_unicode() {
        assert_eq!(tokenize("Ça VA, Zoë"), vec!["ça", "va", "zoë"]);
    }

    #[test]
    fn test_parse_seconds() {
        assert_eq!(parse_seconds(" 1.5 "), Some(1.5));
        assert_eq!(parse_seconds("12"), Some(12.0));
        assert_eq!(parse_seconds("abc"), None);
        assert_eq!(parse_seconds("NaN"), None);
        assert_eq!(parse_seconds("inf"), None);
    }

    #[test]
    fn test_validate_drops_missing_fields() {
        let mut row = RawUtterance::new("A", "0", "1", "hi");
        assert!(validate(&row).is_ok());

        row.text = Some("   ".to_string());
        assert_eq!(validate(&row), Err(DropReason::MissingField));

        let row = RawUtterance {
            speaker: None,
            ..RawUtterance::new("A", "0", "1", "hi")
        };
        assert_eq!(validate(&row), Err(DropReason::MissingField));

        let row = RawUtterance::new("A", "zero", "1", "hi");
        assert_eq!(validate(&row), Err(DropReason::InvalidTime));
    }

    #[test]
    fn test_filter_counts_drops() {
        let rows = vec![
            RawUtterance::new("A", "0", "2", "one"),
            RawUtterance::new("B", "x", "2", "two"),
            RawUtterance::default(),
        ];
        let outcome = filter_utterances(rows, None);
        assert_eq!(outcome.utterances.len(), 1);
        assert_eq!(outcome.dropped_invalid, 2);
        assert_eq!(outcome.dropped_out_of_bounds, 0);
    }

    #[test]
    fn test_filter_with_bounds() {
        let bounds = SessionBounds::new(10.0, 20.0);
        let rows = vec![
            RawUtterance::new("A", "5", "12", "before"),
            RawUtterance::new("A", "10", "20", "inside"),
            RawUtterance::new("A", "18", "21", "after"),
        ];
        let outcome = filter_utterances(rows, Some(&bounds));
        assert_eq!(outcome.utterances.len(), 1);
        assert_eq!(outcome.utterances[0].tokens, vec!["inside"]);
        assert_eq!(outcome.dropped_out_of_bounds, 2);
    }
}
