//! Web search backends used by research workers.
//!
//! A backend turns a query into human-readable result text. Failures are
//! reported *inside* that text ("Error: ...") rather than as `Err`, so a
//! misconfigured or unreachable search service degrades a worker's
//! evidence instead of failing its sub-task.

pub mod exa;

use async_trait::async_trait;

pub use exa::ExaSearch;

/// Default number of results requested per search.
pub const DEFAULT_RESULT_COUNT: usize = 5;

/// Trait for web search backends.
#[async_trait]
pub trait SearchBackend: Send + Sync {
    /// Backend name for logging.
    fn name(&self) -> &'static str;

    /// Searches for `query` and returns up to `result_count` formatted
    /// results, or an error description.
    async fn search(&self, query: &str, result_count: usize) -> String;
}

/// A single search hit, before formatting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchHit {
    /// Page title.
    pub title: String,
    /// Page URL.
    pub url: String,
    /// Short preview of the page text.
    pub preview: String,
}

/// Formats hits as a numbered list the model can cite URLs from.
#[must_use]
pub fn format_hits(hits: &[SearchHit]) -> String {
    if hits.is_empty() {
        return "No results found.".to_string();
    }
    hits.iter()
        .enumerate()
        .map(|(i, hit)| {
            format!(
                "{}. Title: {}\n   URL: {}\n   Preview: {}\n",
                i + 1,
                hit.title,
                hit.url,
                hit.preview
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}
