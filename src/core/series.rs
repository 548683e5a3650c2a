//! Dense per-speaker and group time series from window tallies.

use crate::core::matcher::{WindowTally, NO_SPEAKER};
use crate::core::windowing::Window;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Separator used when joining the speakers active in a group row.
pub const SPEAKER_SEPARATOR: &str = ", ";

/// One output row: a speaker (or speaker list) in one window.
///
/// `counts` always holds every session category, zero when nothing matched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesRow {
    pub speaker: String,
    pub window_start: f64,
    pub window_end: f64,
    pub counts: BTreeMap<String, u64>,
    /// Gap or placeholder row rather than a real speaker's tally
    #[serde(default)]
    pub placeholder: bool,
}

impl SeriesRow {
    fn zeroed(speaker: impl Into<String>, window: &Window, categories: &BTreeSet<String>) -> Self {
        Self {
            speaker: speaker.into(),
            window_start: window.start,
            window_end: window.end,
            counts: categories.iter().map(|c| (c.clone(), 0)).collect(),
            placeholder: false,
        }
    }

    fn gap(window: &Window, categories: &BTreeSet<String>) -> Self {
        Self {
            placeholder: true,
            ..Self::zeroed(NO_SPEAKER, window, categories)
        }
    }

    fn from_tally(tally: &WindowTally, categories: &BTreeSet<String>) -> Self {
        let mut row = Self::zeroed(tally.speaker.clone(), &tally.window, categories);
        for (category, count) in row.counts.iter_mut() {
            *count = tally.count(category);
        }
        row.placeholder = tally.is_placeholder();
        row
    }

    /// Count for `category`, zero when the column is absent.
    pub fn count(&self, category: &str) -> u64 {
        self.counts.get(category).copied().unwrap_or(0)
    }

    /// Sum over all categories.
    pub fn total(&self) -> u64 {
        self.counts.values().sum()
    }
}

/// Time series for one speaker, one row per generated window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeakerSeries {
    pub speaker: String,
    pub rows: Vec<SeriesRow>,
}

impl SpeakerSeries {
    /// Rows where this speaker was actually tallied (not gap rows).
    pub fn active_rows(&self) -> impl Iterator<Item = &SeriesRow> {
        self.rows.iter().filter(|r| !r.placeholder)
    }
}

/// Everything produced for one session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSeries {
    /// Category columns, sorted
    pub categories: Vec<String>,
    /// Tally rows sorted by `(window_start, speaker)`
    pub rows: Vec<SeriesRow>,
    /// One series per distinct speaker, sorted by speaker
    pub speakers: Vec<SpeakerSeries>,
    /// Cross-speaker sums, one row per window
    pub group: Vec<SeriesRow>,
}

fn by_window_then_speaker(a: &SeriesRow, b: &SeriesRow) -> std::cmp::Ordering {
    a.window_start
        .total_cmp(&b.window_start)
        .then_with(|| a.speaker.cmp(&b.speaker))
}

/// Fold per-window tallies into dense series.
///
/// Per-speaker series get a zero row labelled [`NO_SPEAKER`] for each window
/// the speaker has no tally in. When no real speaker appears but placeholder
/// tallies exist, the placeholders form the only speaker series. The group
/// series sums every tally in a window, including windows with none.
pub fn assemble(
    windows: &[Window],
    tallies: &[WindowTally],
    categories: &BTreeSet<String>,
) -> SessionSeries {
    let mut rows: Vec<SeriesRow> = tallies
        .iter()
        .map(|t| SeriesRow::from_tally(t, categories))
        .collect();
    rows.sort_by(by_window_then_speaker);

    let mut by_window: BTreeMap<usize, Vec<&WindowTally>> = BTreeMap::new();
    for tally in tallies {
        by_window.entry(tally.window.index).or_default().push(tally);
    }

    let real_speakers: BTreeSet<&str> = tallies
        .iter()
        .filter(|t| !t.is_placeholder())
        .map(|t| t.speaker.as_str())
        .collect();

    let speakers = if real_speakers.is_empty() {
        placeholder_series(windows, &by_window, categories)
    } else {
        real_speakers
            .into_iter()
            .map(|speaker| speaker_series(speaker, windows, &by_window, categories))
            .collect()
    };

    let group = windows
        .iter()
        .map(|window| {
            let in_window = by_window.get(&window.index).map(Vec::as_slice).unwrap_or(&[]);
            group_row(window, in_window, categories)
        })
        .collect();

    SessionSeries {
        categories: categories.iter().cloned().collect(),
        rows,
        speakers,
        group,
    }
}

fn speaker_series(
    speaker: &str,
    windows: &[Window],
    by_window: &BTreeMap<usize, Vec<&WindowTally>>,
    categories: &BTreeSet<String>,
) -> SpeakerSeries {
    let mut rows: Vec<SeriesRow> = windows
        .iter()
        .map(|window| {
            by_window
                .get(&window.index)
                .and_then(|ts| ts.iter().find(|t| !t.is_placeholder() && t.speaker == speaker))
                .map(|t| SeriesRow::from_tally(t, categories))
                .unwrap_or_else(|| SeriesRow::gap(window, categories))
        })
        .collect();
    rows.sort_by(|a, b| a.window_start.total_cmp(&b.window_start));

    SpeakerSeries {
        speaker: speaker.to_string(),
        rows,
    }
}

fn placeholder_series(
    windows: &[Window],
    by_window: &BTreeMap<usize, Vec<&WindowTally>>,
    categories: &BTreeSet<String>,
) -> Vec<SpeakerSeries> {
    let has_placeholders = by_window
        .values()
        .flatten()
        .any(|t| t.is_placeholder());
    if !has_placeholders {
        return Vec::new();
    }

    vec![SpeakerSeries {
        speaker: NO_SPEAKER.to_string(),
        rows: windows
            .iter()
            .map(|w| SeriesRow::gap(w, categories))
            .collect(),
    }]
}

fn group_row(
    window: &Window,
    tallies: &[&WindowTally],
    categories: &BTreeSet<String>,
) -> SeriesRow {
    let mut row = SeriesRow::zeroed(String::new(), window, categories);
    for tally in tallies {
        for (category, count) in row.counts.iter_mut() {
            *count += tally.count(category);
        }
    }

    let speakers: BTreeSet<&str> = tallies.iter().map(|t| t.speaker.as_str()).collect();
    row.speaker = speakers.into_iter().collect::<Vec<_>>().join(SPEAKER_SEPARATOR);
    row.placeholder = !tallies.is_empty() && tallies.iter().all(|t| t.is_placeholder());
    row
}

#[cfg(test)]
mod tests {
    use super::*;

    fn windows(n: usize) -> Vec<Window> {
        (0..n)
            .map(|i| Window {
                index: i,
                start: i as f64 * 15.0,
                end: i as f64 * 15.0 + 30.0,
            })
            .collect()
    }

    fn categories() -> BTreeSet<String> {
        ["X", "Y"].iter().map(|s| s.to_string()).collect()
    }

    fn tally(window: Window, speaker: &str, counts: &[(&str, u64)]) -> WindowTally {
        WindowTally {
            window,
            speaker: speaker.to_string(),
            counts: counts.iter().map(|(c, n)| (c.to_string(), *n)).collect(),
            placeholder: false,
        }
    }

    #[test]
    fn test_group_sums_and_joins_speakers() {
        let ws = windows(1);
        let tallies = vec![tally(ws[0], "B", &[]), tally(ws[0], "A", &[("X", 1)])];
        let series = assemble(&ws, &tallies, &categories());

        assert_eq!(series.group.len(), 1);
        assert_eq!(series.group[0].speaker, "A, B");
        assert_eq!(series.group[0].count("X"), 1);
        assert_eq!(series.group[0].count("Y"), 0);
    }

    #[test]
    fn test_rows_are_dense_and_sorted() {
        let ws = windows(2);
        let tallies = vec![
            tally(ws[1], "A", &[("Y", 2)]),
            tally(ws[0], "B", &[("X", 1)]),
            tally(ws[0], "A", &[]),
        ];
        let series = assemble(&ws, &tallies, &categories());

        let order: Vec<(f64, &str)> = series
            .rows
            .iter()
            .map(|r| (r.window_start, r.speaker.as_str()))
            .collect();
        assert_eq!(order, vec![(0.0, "A"), (0.0, "B"), (15.0, "A")]);
        for row in series.rows.iter().chain(series.group.iter()) {
            assert_eq!(row.counts.len(), 2);
        }
    }

    #[test]
    fn test_speaker_series_gap_filled() {
        let ws = windows(3);
        let tallies = vec![
            tally(ws[0], "A", &[("X", 1)]),
            tally(ws[2], "A", &[("X", 4)]),
            tally(ws[1], "B", &[("Y", 1)]),
        ];
        let series = assemble(&ws, &tallies, &categories());

        assert_eq!(series.speakers.len(), 2);
        let a = &series.speakers[0];
        assert_eq!(a.speaker, "A");
        assert_eq!(a.rows.len(), 3);
        assert_eq!(a.rows[1].speaker, NO_SPEAKER);
        assert_eq!(a.rows[1].total(), 0);
        assert_eq!(a.rows[2].count("X"), 4);
        assert_eq!(a.active_rows().count(), 2);
    }

    #[test]
    fn test_placeholder_only_session() {
        let ws = windows(2);
        let tallies: Vec<WindowTally> = ws.iter().map(|w| WindowTally::placeholder(*w)).collect();
        let series = assemble(&ws, &tallies, &categories());

        assert_eq!(series.speakers.len(), 1);
        assert_eq!(series.speakers[0].speaker, NO_SPEAKER);
        assert_eq!(series.speakers[0].rows.len(), 2);
        assert_eq!(series.speakers[0].active_rows().count(), 0);
        assert!(series
            .group
            .iter()
            .all(|r| r.speaker == NO_SPEAKER && r.placeholder && r.total() == 0));
    }

    #[test]
    fn test_no_speakers_degrades_gracefully() {
        let ws = windows(2);
        let series = assemble(&ws, &[], &categories());

        assert!(series.speakers.is_empty());
        assert_eq!(series.group.len(), 2);
        assert!(series.group.iter().all(|r| r.speaker.is_empty() && r.total() == 0));
    }

    #[test]
    fn test_placeholder_not_a_speaker_when_real_speakers_exist() {
        let ws = windows(2);
        let tallies = vec![
            WindowTally::placeholder(ws[0]),
            tally(ws[1], "A", &[("X", 1)]),
        ];
        let series = assemble(&ws, &tallies, &categories());

        let names: Vec<&str> = series.speakers.iter().map(|s| s.speaker.as_str()).collect();
        assert_eq!(names, vec!["A"]);
        assert_eq!(series.speakers[0].rows[0].speaker, NO_SPEAKER);
        assert!(series.speakers[0].rows[0].placeholder);
    }

    #[test]
    fn test_speaker_named_like_placeholder_keeps_series() {
        let ws = windows(2);
        let tallies = vec![tally(ws[0], NO_SPEAKER, &[("X", 3)])];
        let series = assemble(&ws, &tallies, &categories());

        assert_eq!(series.speakers.len(), 1);
        let speaker = &series.speakers[0];
        assert_eq!(speaker.speaker, NO_SPEAKER);
        assert_eq!(speaker.rows[0].count("X"), 3);
        assert!(!speaker.rows[0].placeholder);
        assert!(speaker.rows[1].placeholder);
        assert_eq!(speaker.active_rows().count(), 1);
        assert_eq!(series.group[0].count("X"), 3);
        assert!(!series.group[0].placeholder);
    }
}
