//! Synthesizer agent for merging sub-task results.
//!
//! Produces the draft report, the completeness verdict and the next batch
//! of sub-tasks. When its response cannot be used, the draft is assembled
//! mechanically from the successful findings and the run is marked
//! complete, so an unparseable synthesizer can never keep the loop alive.

use async_trait::async_trait;
use tracing::warn;

use super::config::ResearchConfig;
use super::extract::decode;
use super::finding::{SubTaskResult, SynthesisOutcome, SynthesisReport};
use super::message::TokenUsage;
use super::planner::sanitize_tasks;
use super::prompt::build_synthesizer_prompt;
use super::provider::LlmProvider;
use super::traits::Agent;

/// Agent that synthesizes sub-task results into a draft report.
pub struct SynthesizerAgent {
    model: String,
    max_tokens: u32,
    system_prompt: String,
}

impl SynthesizerAgent {
    /// Creates a new synthesizer agent with the given configuration and system prompt.
    #[must_use]
    pub fn new(config: &ResearchConfig, system_prompt: String) -> Self {
        Self {
            model: config.director_model.clone(),
            max_tokens: config.director_max_tokens,
            system_prompt,
        }
    }

    /// Runs one synthesis cycle over this iteration's results.
    ///
    /// Never fails: a backend error is handled like an unusable response.
    pub async fn synthesize(
        &self,
        provider: &dyn LlmProvider,
        query: &str,
        previous_draft: &str,
        results: &[SubTaskResult],
    ) -> (SynthesisOutcome, TokenUsage) {
        let user_msg = build_synthesizer_prompt(query, previous_draft, results);
        match self.execute(provider, &user_msg).await {
            Ok(response) => (
                interpret_synthesis(query, previous_draft, &response.content, results),
                response.usage,
            ),
            Err(e) => {
                warn!(error = %e, "synthesizer backend call failed, assembling draft mechanically");
                (fallback_outcome(query, results), TokenUsage::default())
            }
        }
    }
}

#[async_trait]
impl Agent for SynthesizerAgent {
    fn name(&self) -> &'static str {
        "synthesizer"
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    fn temperature(&self) -> f32 {
        0.1
    }

    fn max_tokens(&self) -> u32 {
        self.max_tokens
    }
}

/// Turns a synthesis response into an outcome.
///
/// A missing or blank `draft_report` keeps `previous_draft`.
#[must_use]
pub fn interpret_synthesis(
    query: &str,
    previous_draft: &str,
    content: &str,
    results: &[SubTaskResult],
) -> SynthesisOutcome {
    match decode::<SynthesisReport>(content) {
        Ok(report) => SynthesisOutcome {
            is_complete: report.complete(),
            new_tasks: sanitize_tasks(report.tasks()),
            draft_report: report
                .draft_report
                .filter(|d| !d.trim().is_empty())
                .unwrap_or_else(|| previous_draft.to_string()),
            fallback: false,
        },
        Err(e) => {
            warn!(error = %e, "synthesis response unusable, assembling draft mechanically");
            fallback_outcome(query, results)
        }
    }
}

/// Builds a complete, task-free outcome from the successful findings.
#[must_use]
pub fn fallback_outcome(query: &str, results: &[SubTaskResult]) -> SynthesisOutcome {
    SynthesisOutcome {
        draft_report: mechanical_report(query, results),
        is_complete: true,
        new_tasks: Vec::new(),
        fallback: true,
    }
}

/// Concatenates non-empty findings of successful results under a header.
#[must_use]
pub fn mechanical_report(query: &str, results: &[SubTaskResult]) -> String {
    let findings: Vec<&str> = results
        .iter()
        .filter(|r| !r.is_failure())
        .map(|r| r.findings.as_str())
        .filter(|f| !f.trim().is_empty())
        .collect();

    if findings.is_empty() {
        format!(
            "Research was attempted for: {query}\n\
             However, the research agents encountered difficulties in gathering information."
        )
    } else {
        format!("Research Summary for: {query}\n\n{}", findings.join("\n\n"))
    }
}
