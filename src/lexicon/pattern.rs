//! Compiled dictionary word patterns.
//!
//! A dictionary word is either a literal (whole-token equality) or a
//! wildcard pattern where `*` stands for any run of characters. Wildcard
//! patterns are anchored at the start of the token only, so `art*` matches
//! `artwork` and `a*t` matches `arts` (the `t` may appear anywhere after the
//! prefix).

use serde::{Deserialize, Serialize};

/// The wildcard marker used in dictionary words.
pub const WILDCARD: char = '*';

/// A wildcard pattern split into its fixed fragments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WildcardPattern {
    /// Text before the first wildcard; the token must start with it
    prefix: String,
    /// Fragments between later wildcards, matched in order
    fragments: Vec<String>,
}

impl WildcardPattern {
    /// Compile a normalized dictionary word containing at least one wildcard.
    pub fn compile(word: &str) -> Self {
        let mut parts = word.split(WILDCARD);
        let prefix = parts.next().unwrap_or_default().to_string();
        let fragments = parts
            .filter(|p| !p.is_empty())
            .map(str::to_string)
            .collect();

        Self {
            prefix,
            fragments,
        }
    }

    /// The fixed prefix a matching token must start with.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Check whether the pattern matches from the start of `token`.
    pub fn matches(&self, token: &str) -> bool {
        let Some(mut rest) = token.strip_prefix(self.prefix.as_str()) else {
            return false;
        };

        // Leftmost placement of each fragment leaves the most room for the
        // ones after it, so greedy search is exact here.
        for fragment in &self.fragments {
            match rest.find(fragment.as_str()) {
                Some(pos) => rest = &rest[pos + fragment.len()..],
                None => return false,
            }
        }
        true
    }
}

/// A single compiled dictionary word.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum WordPattern {
    /// Exact, whole-token match
    Literal(String),
    /// Start-anchored wildcard match
    Prefix(WildcardPattern),
}

impl WordPattern {
    /// Compile a normalized dictionary word.
    pub fn compile(word: &str) -> Self {
        if word.contains(WILDCARD) {
            WordPattern::Prefix(WildcardPattern::compile(word))
        } else {
            WordPattern::Literal(word.to_string())
        }
    }

    /// Check whether this word matches a (lower-cased) token.
    pub fn matches(&self, token: &str) -> bool {
        match self {
            WordPattern::Literal(word) => word == token,
            WordPattern::Prefix(pattern) => pattern.matches(token),
        }
    }
}
