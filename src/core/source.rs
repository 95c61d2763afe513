//! Evidence sources gathered by research workers.
//!
//! This type lives in `core` rather than `agent` so the CLI output layer
//! can present and de-duplicate sources without reaching into the
//! pipeline internals.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

/// A piece of evidence backing a finding.
///
/// Sources accumulate in the order workers report them. Duplicates are
/// kept during a run; [`dedup_by_locator`] is applied only when a result is
/// presented.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Source {
    /// URL or other identifier of the source.
    #[serde(alias = "source", alias = "url")]
    pub locator: String,
    /// Short quote or summary taken from the source.
    #[serde(default, alias = "content")]
    pub excerpt: String,
}

impl Source {
    /// Creates a new source.
    #[must_use]
    pub fn new(locator: impl Into<String>, excerpt: impl Into<String>) -> Self {
        Self {
            locator: locator.into(),
            excerpt: excerpt.into(),
        }
    }
}

/// Returns the sources with repeated locators removed.
///
/// The first occurrence of each locator wins and relative order is
/// preserved.
#[must_use]
pub fn dedup_by_locator(sources: &[Source]) -> Vec<&Source> {
    let mut seen = HashSet::with_capacity(sources.len());
    sources
        .iter()
        .filter(|s| seen.insert(s.locator.as_str()))
        .collect()
}
