//! Per-window dictionary matching.
//!
//! For one window, selects the utterances that overlap it according to an
//! [`OverlapPolicy`] and tallies per-speaker, per-category match counts over
//! their tokens.

use crate::core::utterance::Utterance;
use crate::core::windowing::Window;
use crate::lexicon::Lexicon;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Speaker label for "nobody active" placeholder and gap rows.
///
/// Placeholders are identified by [`WindowTally::placeholder`], not by this
/// label, so a transcript speaker with the same name stays a real speaker.
pub const NO_SPEAKER: &str = "no_speaker";

/// How utterances are assigned to windows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverlapPolicy {
    /// `start < window.end && end >= window.start`. Whole session, all speakers.
    #[default]
    Unbounded,
    /// `end < window.end && end >= window.start`, i.e. the utterance is
    /// assigned by where it ends. Used with session cutoffs and a participant
    /// allow-list; silent windows get a [`NO_SPEAKER`] placeholder.
    Bounded,
}

impl OverlapPolicy {
    /// Whether `utterance` counts toward `window` under this policy.
    pub fn overlaps(&self, utterance: &Utterance, window: &Window) -> bool {
        match self {
            OverlapPolicy::Unbounded => {
                utterance.start < window.end && utterance.end >= window.start
            }
            OverlapPolicy::Bounded => utterance.end < window.end && utterance.end >= window.start,
        }
    }

    /// Whether silent windows are represented by a placeholder tally.
    pub fn emits_placeholder(&self) -> bool {
        matches!(self, OverlapPolicy::Bounded)
    }

    /// Configuration name of the policy.
    pub fn as_str(&self) -> &'static str {
        match self {
            OverlapPolicy::Unbounded => "unbounded",
            OverlapPolicy::Bounded => "bounded",
        }
    }
}

impl std::str::FromStr for OverlapPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "unbounded" => Ok(OverlapPolicy::Unbounded),
            "bounded" => Ok(OverlapPolicy::Bounded),
            other => Err(format!(
                "unknown overlap policy '{other}' (expected unbounded or bounded)"
            )),
        }
    }
}

impl std::fmt::Display for OverlapPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Allow-list of participant speaker identifiers.
///
/// An empty filter allows every speaker.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticipantFilter {
    participants: BTreeSet<String>,
}

impl ParticipantFilter {
    /// Build a filter from speaker identifiers; blanks are ignored.
    pub fn new<I, S>(participants: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            participants: participants
                .into_iter()
                .map(Into::into)
                .map(|s: String| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
        }
    }

    /// Parse a comma-separated list of speaker identifiers.
    pub fn from_csv(s: &str) -> Self {
        Self::new(s.split(','))
    }

    /// Whether `speaker` may contribute to bounded windows.
    pub fn allows(&self, speaker: &str) -> bool {
        self.participants.is_empty() || self.participants.contains(speaker)
    }

    /// Allowed speakers, sorted.
    pub fn participants(&self) -> impl Iterator<Item = &str> {
        self.participants.iter().map(String::as_str)
    }
}

/// Match counts for one speaker in one window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindowTally {
    pub window: Window,
    pub speaker: String,
    /// Only categories with at least one match; absent means zero
    pub counts: BTreeMap<String, u64>,
    /// Set for the tally standing in for a silent window
    #[serde(default)]
    pub placeholder: bool,
}

impl WindowTally {
    /// Tally for a window with no eligible speaker.
    pub fn placeholder(window: Window) -> Self {
        Self {
            window,
            speaker: NO_SPEAKER.to_string(),
            counts: BTreeMap::new(),
            placeholder: true,
        }
    }

    /// Whether this tally stands in for a silent window.
    pub fn is_placeholder(&self) -> bool {
        self.placeholder
    }

    /// Matches recorded for `category`, zero when absent.
    pub fn count(&self, category: &str) -> u64 {
        self.counts.get(category).copied().unwrap_or(0)
    }
}

/// Tally every eligible utterance that overlaps `window`.
///
/// A speaker with an overlapping utterance gets a tally even when nothing
/// matched. Under [`OverlapPolicy::Bounded`], only speakers the participant
/// filter allows are considered, and a window with no eligible utterance
/// yields a single [`NO_SPEAKER`] tally.
pub fn match_window(
    window: &Window,
    utterances: &[Utterance],
    lexicon: &Lexicon,
    policy: OverlapPolicy,
    participants: &ParticipantFilter,
) -> Vec<WindowTally> {
    let mut by_speaker: BTreeMap<&str, BTreeMap<String, u64>> = BTreeMap::new();

    for utterance in utterances {
        if !policy.overlaps(utterance, window) {
            continue;
        }
        if policy == OverlapPolicy::Bounded && !participants.allows(&utterance.speaker) {
            continue;
        }

        let counts = by_speaker.entry(utterance.speaker.as_str()).or_default();
        for token in &utterance.tokens {
            lexicon.count_token(token, counts);
        }
    }

    if by_speaker.is_empty() && policy.emits_placeholder() {
        return vec![WindowTally::placeholder(*window)];
    }

    by_speaker
        .into_iter()
        .map(|(speaker, counts)| WindowTally {
            window: *window,
            speaker: speaker.to_string(),
            counts,
            placeholder: false,
        })
        .collect()
}
