//! Data types flowing through a research run.
//!
//! Two groups live here: the pipeline's own records ([`SubTaskResult`],
//! [`IterationState`], [`FinalResult`]) and the typed shapes decoded from
//! model responses ([`ResearchPlan`], [`WorkerReport`], [`SynthesisReport`],
//! [`CitationReport`]). Every response field is optional so a partially
//! conforming response still decodes.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::message::TokenUsage;
use super::transcript::ResearchLog;
pub use crate::core::Source;

/// Outcome of one sub-task.
///
/// When `error` is set the task counts as failed for synthesis, even if
/// `findings` holds salvaged text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubTaskResult {
    /// The sub-task exactly as dispatched.
    pub task: String,
    /// Findings text (possibly empty).
    pub findings: String,
    /// Evidence reported by the worker.
    pub sources: Vec<Source>,
    /// Failure description, if the task failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Tokens spent on this task.
    #[serde(default)]
    pub usage: TokenUsage,
}

impl SubTaskResult {
    /// Creates a successful result.
    #[must_use]
    pub fn succeeded(
        task: impl Into<String>,
        findings: impl Into<String>,
        sources: Vec<Source>,
        usage: TokenUsage,
    ) -> Self {
        Self {
            task: task.into(),
            findings: findings.into(),
            sources,
            error: None,
            usage,
        }
    }

    /// Creates a failed result with no findings or sources.
    #[must_use]
    pub fn failed(task: impl Into<String>, error: impl Into<String>, usage: TokenUsage) -> Self {
        Self {
            task: task.into(),
            findings: String::new(),
            sources: Vec::new(),
            error: Some(error.into()),
            usage,
        }
    }

    /// Returns `true` if the task failed.
    #[must_use]
    pub const fn is_failure(&self) -> bool {
        self.error.is_some()
    }
}

/// Verdict of one synthesis cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SynthesisOutcome {
    /// Current draft of the report.
    pub draft_report: String,
    /// Whether the draft answers the query.
    pub is_complete: bool,
    /// Sub-tasks for the next iteration.
    pub new_tasks: Vec<String>,
    /// `true` when the draft was assembled mechanically because the
    /// synthesis response could not be used.
    pub fallback: bool,
}

/// The controller's belief state between iterations.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IterationState {
    /// Number of completed synthesis cycles.
    pub iteration_index: usize,
    /// Sub-tasks to dispatch next.
    pub current_tasks: Vec<String>,
    /// Latest draft report.
    pub draft_report: String,
    /// Latest completeness verdict.
    pub is_complete: bool,
    /// Every source reported so far, in arrival order. Only ever grows.
    pub accumulated_sources: Vec<Source>,
}

impl IterationState {
    /// Creates the initial state for a planned task set.
    #[must_use]
    pub fn new(tasks: Vec<String>) -> Self {
        Self {
            current_tasks: tasks,
            ..Self::default()
        }
    }

    /// Appends the sources of a finished batch.
    pub fn absorb_sources(&mut self, results: &[SubTaskResult]) {
        self.accumulated_sources
            .extend(results.iter().flat_map(|r| r.sources.iter().cloned()));
    }

    /// Replaces the draft, verdict and task list with a synthesis outcome
    /// and counts the cycle.
    pub fn apply(&mut self, outcome: SynthesisOutcome) {
        self.iteration_index += 1;
        self.draft_report = outcome.draft_report;
        self.is_complete = outcome.is_complete;
        self.current_tasks = outcome.new_tasks;
    }

    /// Returns `true` if another iteration should run.
    ///
    /// The run stops once the draft is complete, no new tasks remain, or
    /// `max_iterations` cycles have run.
    #[must_use]
    pub fn should_continue(&self, max_iterations: usize) -> bool {
        !self.is_complete
            && !self.current_tasks.is_empty()
            && self.iteration_index < max_iterations
    }
}

/// The terminal product of a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinalResult {
    /// Cited report.
    pub report: String,
    /// All sources in accumulation order, duplicates included.
    pub sources: Vec<Source>,
}

/// A finished run with its audit trail and accounting.
#[derive(Debug, Clone, Serialize)]
pub struct ResearchRun {
    /// The research question.
    pub query: String,
    /// Final cited report and sources.
    pub result: FinalResult,
    /// Synthesis cycles executed.
    pub iterations: usize,
    /// Sub-tasks dispatched across all iterations.
    pub tasks_dispatched: usize,
    /// Sub-tasks that failed.
    pub tasks_failed: usize,
    /// Total tokens consumed.
    pub total_tokens: u32,
    /// Total elapsed time.
    #[serde(serialize_with = "serialize_duration")]
    pub elapsed: Duration,
    /// Ordered record of every phase.
    pub log: ResearchLog,
}

#[allow(clippy::trivially_copy_pass_by_ref)]
fn serialize_duration<S>(d: &Duration, s: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    s.serialize_f64(d.as_secs_f64())
}

/// Planner response.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResearchPlan {
    /// Proposed sub-tasks, as strings or `{"task": ...}` objects; read
    /// through [`ResearchPlan::tasks`].
    #[serde(default, alias = "tasks", alias = "subtasks")]
    pub sub_tasks: Option<Vec<Value>>,
}

impl ResearchPlan {
    /// The proposed task texts; empty when the list is null or absent.
    #[must_use]
    pub fn tasks(&self) -> Vec<String> {
        task_texts(self.sub_tasks.as_deref())
    }
}

/// Keeps string entries and the `task` field of object entries.
fn task_texts(entries: Option<&[Value]>) -> Vec<String> {
    entries
        .unwrap_or_default()
        .iter()
        .filter_map(|entry| match entry {
            Value::String(task) => Some(task.clone()),
            Value::Object(fields) => {
                fields.get("task").and_then(Value::as_str).map(str::to_string)
            }
            _ => None,
        })
        .collect()
}

/// Worker response.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WorkerReport {
    /// Findings, normally a string; a list of strings is also accepted.
    #[serde(default)]
    pub findings: Option<Value>,
    /// Reported sources; malformed entries are dropped by
    /// [`WorkerReport::sources`].
    #[serde(default)]
    pub sources: Vec<Value>,
}

impl WorkerReport {
    /// Returns the findings as text, or `None` if the field is absent or
    /// not textual.
    #[must_use]
    pub fn findings_text(&self) -> Option<String> {
        match self.findings.as_ref()? {
            Value::String(s) => Some(s.clone()),
            Value::Array(items) => {
                let lines: Vec<&str> = items.iter().filter_map(Value::as_str).collect();
                (!lines.is_empty()).then(|| lines.join("\n"))
            }
            _ => None,
        }
    }

    /// Converts the reported sources, skipping entries without a locator.
    #[must_use]
    pub fn sources(&self) -> Vec<Source> {
        self.sources
            .iter()
            .filter_map(|value| match value {
                Value::String(locator) if !locator.trim().is_empty() => {
                    Some(Source::new(locator.as_str(), ""))
                }
                Value::Object(_) => serde_json::from_value::<Source>(value.clone())
                    .ok()
                    .filter(|s| !s.locator.trim().is_empty()),
                _ => None,
            })
            .collect()
    }
}

/// Synthesizer response.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SynthesisReport {
    /// Updated draft; when absent the previous draft is kept.
    #[serde(default)]
    pub draft_report: Option<String>,
    /// Whether the draft answers the query; null reads as false.
    #[serde(default)]
    pub is_complete: Option<bool>,
    /// Follow-up sub-tasks, as strings or `{"task": ...}` objects.
    #[serde(default)]
    pub new_tasks: Option<Vec<Value>>,
}

impl SynthesisReport {
    /// Whether the synthesizer declared the research done.
    #[must_use]
    pub fn complete(&self) -> bool {
        self.is_complete.unwrap_or(false)
    }

    /// The follow-up task texts; empty when the list is null or absent.
    #[must_use]
    pub fn tasks(&self) -> Vec<String> {
        task_texts(self.new_tasks.as_deref())
    }
}

/// Citation agent response.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CitationReport {
    /// Report with citation markers and a references section.
    #[serde(default)]
    pub cited_report: Option<String>,
}
