//! Planner agent.
//!
//! Decomposes the research query into the first batch of sub-tasks. The
//! plan is never empty: when the model's answer is unusable the planner
//! falls back to templated tasks built from the query's trailing terms,
//! and from there to the query itself.

use async_trait::async_trait;
use serde::Serialize;
use tracing::{debug, warn};

use super::config::ResearchConfig;
use super::extract::decode;
use super::finding::ResearchPlan;
use super::message::TokenUsage;
use super::prompt::build_planner_prompt;
use super::provider::LlmProvider;
use super::traits::Agent;

/// Upper bound on sub-tasks accepted from one model response.
pub const MAX_TASKS: usize = 10;

/// Words with at most this many characters are not significant.
const MIN_TERM_CHARS: usize = 3;

/// Number of trailing significant terms used by the templated fallback.
const SUBJECT_TERMS: usize = 3;

/// Where a plan's tasks came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanSource {
    /// Decoded from the model's response.
    Model,
    /// Templated from the query's trailing terms.
    Templated,
    /// The query itself, as a single task.
    Verbatim,
}

/// The initial sub-task set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Plan {
    /// Sub-tasks to dispatch; never empty.
    pub tasks: Vec<String>,
    /// Which tier produced the tasks.
    pub source: PlanSource,
    /// Tokens spent planning.
    pub usage: TokenUsage,
}

/// Agent that plans the first research iteration.
pub struct PlannerAgent {
    model: String,
    max_tokens: u32,
    system_prompt: String,
}

impl PlannerAgent {
    /// Creates a planner with the given configuration and system prompt.
    #[must_use]
    pub fn new(config: &ResearchConfig, system_prompt: String) -> Self {
        Self {
            model: config.director_model.clone(),
            max_tokens: config.director_max_tokens,
            system_prompt,
        }
    }

    /// Plans `query`. Backend and extraction failures fall through to the
    /// deterministic tiers, so this never fails.
    pub async fn plan(&self, provider: &dyn LlmProvider, query: &str) -> Plan {
        let (tasks, usage) = match self.execute(provider, &build_planner_prompt(query)).await {
            Ok(response) => match decode::<ResearchPlan>(&response.content) {
                Ok(plan) => (sanitize_tasks(plan.tasks()), response.usage),
                Err(e) => {
                    warn!(error = %e, "plan response unusable, using fallback tasks");
                    (Vec::new(), response.usage)
                }
            },
            Err(e) => {
                warn!(error = %e, "planner backend call failed, using fallback tasks");
                (Vec::new(), TokenUsage::default())
            }
        };

        let plan = resolve_plan(query, tasks, usage);
        debug!(source = ?plan.source, tasks = plan.tasks.len(), "plan ready");
        plan
    }
}

#[async_trait]
impl Agent for PlannerAgent {
    fn name(&self) -> &'static str {
        "planner"
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

/// Picks the first non-empty tier: model tasks, templated tasks, the query.
fn resolve_plan(query: &str, model_tasks: Vec<String>, usage: TokenUsage) -> Plan {
    if !model_tasks.is_empty() {
        return Plan {
            tasks: model_tasks,
            source: PlanSource::Model,
            usage,
        };
    }

    let templated = fallback_tasks(query);
    if !templated.is_empty() {
        return Plan {
            tasks: templated,
            source: PlanSource::Templated,
            usage,
        };
    }

    Plan {
        tasks: vec![query.to_string()],
        source: PlanSource::Verbatim,
        usage,
    }
}

/// Builds three generic sub-tasks about the query's last significant terms.
///
/// Returns an empty list when the query has no word longer than three
/// characters.
#[must_use]
pub fn fallback_tasks(query: &str) -> Vec<String> {
    let terms: Vec<&str> = query
        .split_whitespace()
        .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()))
        .filter(|w| w.chars().count() > MIN_TERM_CHARS)
        .collect();
    if terms.is_empty() {
        return Vec::new();
    }

    let subject = terms[terms.len().saturating_sub(SUBJECT_TERMS)..].join(" ");
    vec![
        format!("Research the main benefits and advantages of {subject}"),
        format!("Investigate the risks and challenges associated with {subject}"),
        format!("Analyze the implications and considerations of {subject}"),
    ]
}

/// Trims tasks, drops blank ones and caps the count at [`MAX_TASKS`].
#[must_use]
pub fn sanitize_tasks(tasks: Vec<String>) -> Vec<String> {
    tasks
        .into_iter()
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .take(MAX_TASKS)
        .collect()
}
