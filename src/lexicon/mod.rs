//! Category lexicon built from a categorized word dictionary.
//!
//! Each dictionary entry maps a word (or wildcard pattern) to a category code.
//! Codes starting with [`EXCLUDED_CATEGORY_MARKER`] are negative categories and
//! are dropped entirely: they never produce counts or output columns.

pub mod pattern;

pub use pattern::{WildcardPattern, WordPattern, WILDCARD};

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use thiserror::Error;

/// Category codes starting with this character are excluded.
pub const EXCLUDED_CATEGORY_MARKER: char = 'N';

/// One `(word, category)` pair from the dictionary source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DictionaryEntry {
    pub word: String,
    pub category: String,
}

impl DictionaryEntry {
    /// Pair a dictionary word with its category code.
    pub fn new(word: impl Into<String>, category: impl Into<String>) -> Self {
        Self {
            word: word.into(),
            category: category.into(),
        }
    }
}

/// Lexicon construction errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LexiconError {
    #[error("dictionary entry {index} ({word:?}) has an empty category code")]
    EmptyCategory { index: usize, word: String },
}

/// Per-category literal word sets and wildcard pattern lists.
///
/// Immutable once built. Categories are kept in sorted order so that output
/// columns are deterministic.
#[derive(Debug, Clone, Default)]
pub struct Lexicon {
    literals: BTreeMap<String, HashSet<String>>,
    patterns: BTreeMap<String, Vec<WildcardPattern>>,
}

impl Lexicon {
    /// Build a lexicon from dictionary entries.
    ///
    /// Words are trimmed and lower-cased. Duplicate words accumulate without
    /// error; a duplicated wildcard pattern is kept twice and will count twice.
    pub fn build<I>(entries: I) -> Result<Self, LexiconError>
    where
        I: IntoIterator<Item = DictionaryEntry>,
    {
        let mut lexicon = Lexicon::default();
        let mut skipped_excluded = 0usize;

        for (index, entry) in entries.into_iter().enumerate() {
            let category = entry.category.trim();
            if category.is_empty() {
                return Err(LexiconError::EmptyCategory {
                    index,
                    word: entry.word,
                });
            }
            if category.starts_with(EXCLUDED_CATEGORY_MARKER) {
                skipped_excluded += 1;
                continue;
            }

            let word = entry.word.trim().to_lowercase();
            if word.is_empty() {
                tracing::warn!(index, category, "skipping dictionary entry with empty word");
                continue;
            }

            match WordPattern::compile(&word) {
                WordPattern::Literal(word) => {
                    lexicon
                        .literals
                        .entry(category.to_string())
                        .or_default()
                        .insert(word);
                }
                WordPattern::Prefix(pattern) => {
                    lexicon
                        .patterns
                        .entry(category.to_string())
                        .or_default()
                        .push(pattern);
                }
            }
        }

        tracing::debug!(
            categories = lexicon.categories().len(),
            literals = lexicon.literal_count(),
            patterns = lexicon.pattern_count(),
            skipped_excluded,
            "lexicon built"
        );

        Ok(lexicon)
    }

    /// All categories with at least one literal or pattern, sorted.
    pub fn categories(&self) -> BTreeSet<String> {
        self.literals
            .keys()
            .chain(self.patterns.keys())
            .cloned()
            .collect()
    }

    /// Whether the category's literal set contains `token`.
    pub fn literal_matches(&self, category: &str, token: &str) -> bool {
        self.literals
            .get(category)
            .is_some_and(|words| words.contains(token))
    }

    /// Number of the category's patterns that match `token`.
    pub fn pattern_match_count(&self, category: &str, token: &str) -> u64 {
        self.patterns.get(category).map_or(0, |patterns| {
            patterns.iter().filter(|p| p.matches(token)).count() as u64
        })
    }

    /// Add every match of `token` to `counts`.
    ///
    /// Literal and pattern hits are counted independently, so a token may add
    /// more than one to the same category.
    pub fn count_token(&self, token: &str, counts: &mut BTreeMap<String, u64>) {
        for (category, words) in &self.literals {
            if words.contains(token) {
                *counts.entry(category.clone()).or_insert(0) += 1;
            }
        }
        for (category, patterns) in &self.patterns {
            let hits = patterns.iter().filter(|p| p.matches(token)).count() as u64;
            if hits > 0 {
                *counts.entry(category.clone()).or_insert(0) += hits;
            }
        }
    }

    /// Total number of literal words across categories.
    pub fn literal_count(&self) -> usize {
        self.literals.values().map(HashSet::len).sum()
    }

    /// Total number of wildcard patterns across categories.
    pub fn pattern_count(&self) -> usize {
        self.patterns.values().map(Vec::len).sum()
    }

    /// Whether no category survived building.
    pub fn is_empty(&self) -> bool {
        self.literals.is_empty() && self.patterns.is_empty()
    }
}
