//! Citation agent: turns the converged draft into the final cited report.

use std::fmt::Write;

use async_trait::async_trait;
use tracing::warn;

use super::config::ResearchConfig;
use super::extract::decode;
use super::finding::{CitationReport, FinalResult, Source};
use super::message::TokenUsage;
use super::prompt::build_citation_prompt;
use super::provider::LlmProvider;
use super::traits::Agent;

/// Agent that inserts citation markers and a references section.
pub struct CitationAgent {
    model: String,
    max_tokens: u32,
    system_prompt: String,
}

/// A finished citation step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Citation {
    /// The final result.
    pub result: FinalResult,
    /// `true` when references were appended mechanically.
    pub fallback: bool,
    /// Tokens spent.
    pub usage: TokenUsage,
}

impl CitationAgent {
    /// Creates a citation agent with the given configuration and system prompt.
    #[must_use]
    pub fn new(config: &ResearchConfig, system_prompt: String) -> Self {
        Self {
            model: config.director_model.clone(),
            max_tokens: config.director_max_tokens,
            system_prompt,
        }
    }

    /// Produces the final result for `report` and all accumulated `sources`.
    ///
    /// Always succeeds; backend and extraction failures fall back to the
    /// mechanical references section.
    pub async fn finalize(
        &self,
        provider: &dyn LlmProvider,
        report: &str,
        sources: &[Source],
    ) -> Citation {
        let (content, usage) = match self
            .execute(provider, &build_citation_prompt(report, sources))
            .await
        {
            Ok(response) => (Some(response.content), response.usage),
            Err(e) => {
                warn!(error = %e, "citation backend call failed");
                (None, TokenUsage::default())
            }
        };

        let cited = content.as_deref().and_then(cited_report);
        let fallback = cited.is_none();
        if fallback {
            warn!(sources = sources.len(), "appending references mechanically");
        }

        Citation {
            result: FinalResult {
                report: cited.unwrap_or_else(|| append_references(report, sources)),
                sources: sources.to_vec(),
            },
            fallback,
            usage,
        }
    }
}

#[async_trait]
impl Agent for CitationAgent {
    fn name(&self) -> &'static str {
        "citation"
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    fn max_tokens(&self) -> u32 {
        self.max_tokens
    }
}

/// Returns the non-blank `cited_report` of a response, if any.
fn cited_report(content: &str) -> Option<String> {
    decode::<CitationReport>(content)
        .ok()?
        .cited_report
        .filter(|r| !r.trim().is_empty())
}

/// Appends a numbered references section, one line per source in order.
///
/// Duplicates are kept. With no sources the report is returned unchanged.
#[must_use]
pub fn append_references(report: &str, sources: &[Source]) -> String {
    if sources.is_empty() {
        return report.to_string();
    }
    let mut cited = format!("{report}\n\n## References\n");
    for (i, source) in sources.iter().enumerate() {
        let _ = writeln!(cited, "[{}] {}", i + 1, source.locator);
    }
    cited
}
