//! Research worker: runs one sub-task to a [`SubTaskResult`].
//!
//! A worker calls the model with the `web_search` tool, then decodes the
//! final answer into a [`WorkerReport`]. When the answer is not a usable
//! JSON object the worker salvages what it can from the raw text with a
//! second, looser parser chain before giving the task up as failed.

use std::sync::{Arc, LazyLock};

use async_trait::async_trait;
use regex::Regex;
use tracing::{debug, warn};

use super::config::ResearchConfig;
use super::executor::ToolExecutor;
use super::extract::{Parser, decode, first_success};
use super::fanout::TaskRunner;
use super::finding::{Source, SubTaskResult, WorkerReport};
use super::message::TokenUsage;
use super::prompt::build_worker_prompt;
use super::provider::LlmProvider;
use super::tool::{ToolDefinition, ToolSet};
use super::traits::{Agent, execute_with_tools};

/// Error recorded when neither decoding nor salvage found any findings.
pub const EXTRACTION_FAILED: &str = "extraction failed";

/// Complete `"findings": "..."` string, escapes included.
static QUOTED_FINDINGS: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r#"(?s)"findings"\s*:\s*"((?:[^"\\]|\\.)*)""#).ok());

/// `"findings": "...` cut off before its closing quote.
static TRUNCATED_FINDINGS: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r#"(?s)"findings"\s*:\s*"((?:[^"\\]|\\.)*)\\?$"#).ok());

static SOURCE_FIELD: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r#""source"\s*:\s*"([^"]*)""#).ok());

const FINDINGS_SALVAGERS: &[(&str, Parser<String>)] = &[
    ("quoted_findings", salvage_quoted_findings),
    ("truncated_findings", salvage_truncated_findings),
];

/// Agent that researches a single sub-task.
pub struct WorkerAgent {
    model: String,
    max_tokens: u32,
    max_tool_iterations: usize,
    system_prompt: String,
}

impl WorkerAgent {
    /// Creates a worker with the given configuration and system prompt.
    #[must_use]
    pub fn new(config: &ResearchConfig, system_prompt: String) -> Self {
        Self {
            model: config.worker_model.clone(),
            max_tokens: config.worker_max_tokens,
            max_tool_iterations: config.max_tool_iterations,
            system_prompt,
        }
    }

    /// Runs `task` and returns exactly one result for it.
    ///
    /// Backend failures are captured into the result's `error`; this never
    /// fails.
    pub async fn run_subtask(
        &self,
        provider: &dyn LlmProvider,
        executor: &ToolExecutor,
        task: &str,
    ) -> SubTaskResult {
        debug!(task, "worker started");
        match execute_with_tools(self, provider, &build_worker_prompt(task), executor).await {
            Ok(response) => interpret_response(task, &response.content, response.usage),
            Err(e) => {
                warn!(task, error = %e, "worker backend call failed");
                SubTaskResult::failed(task, e.to_string(), TokenUsage::default())
            }
        }
    }
}

#[async_trait]
impl Agent for WorkerAgent {
    fn name(&self) -> &'static str {
        "worker"
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

    fn tools(&self) -> Vec<ToolDefinition> {
        ToolSet::worker_tools().definitions().to_vec()
    }

    fn max_tool_iterations(&self) -> usize {
        self.max_tool_iterations
    }
}

/// A worker bound to its backends, as handed to the fan-out.
pub struct BoundWorker {
    agent: WorkerAgent,
    provider: Arc<dyn LlmProvider>,
    executor: ToolExecutor,
}

impl BoundWorker {
    /// Binds `agent` to a provider and tool executor.
    #[must_use]
    pub fn new(agent: WorkerAgent, provider: Arc<dyn LlmProvider>, executor: ToolExecutor) -> Self {
        Self {
            agent,
            provider,
            executor,
        }
    }
}

#[async_trait]
impl TaskRunner for BoundWorker {
    async fn run(&self, task: &str) -> SubTaskResult {
        self.agent
            .run_subtask(self.provider.as_ref(), &self.executor, task)
            .await
    }
}

/// Turns a worker's final text into a result.
///
/// A decoded report with a `findings` field wins. Otherwise the raw text is
/// salvaged; if no findings can be recovered the task fails with
/// [`EXTRACTION_FAILED`].
#[must_use]
pub fn interpret_response(task: &str, content: &str, usage: TokenUsage) -> SubTaskResult {
    if let Ok(report) = decode::<WorkerReport>(content)
        && let Some(findings) = report.findings_text()
    {
        return SubTaskResult::succeeded(task, findings, report.sources(), usage);
    }

    match salvage(task, content) {
        Some((findings, sources)) => {
            warn!(task, sources = sources.len(), "worker response salvaged from raw text");
            SubTaskResult::succeeded(task, findings, sources, usage)
        }
        None => {
            warn!(task, bytes = content.len(), "worker response unusable");
            SubTaskResult::failed(task, EXTRACTION_FAILED, usage)
        }
    }
}

/// Recovers findings and source locators from text that did not decode.
fn salvage(task: &str, content: &str) -> Option<(String, Vec<Source>)> {
    let (strategy, findings) = first_success(content, FINDINGS_SALVAGERS)?;
    debug!(task, strategy, "salvaged findings");

    let sources = SOURCE_FIELD
        .as_ref()
        .map(|re| {
            re.captures_iter(content)
                .filter_map(|c| c.get(1))
                .map(|m| m.as_str().trim())
                .filter(|locator| !locator.is_empty())
                .enumerate()
                .map(|(i, locator)| {
                    Source::new(locator, format!("Source {} from research on {task}", i + 1))
                })
                .collect()
        })
        .unwrap_or_default();

    Some((findings, sources))
}

fn capture_findings(re: &LazyLock<Option<Regex>>, content: &str) -> Option<String> {
    let raw = re.as_ref()?.captures(content)?.get(1)?.as_str();
    let text = unescape(raw);
    (!text.trim().is_empty()).then_some(text)
}

fn salvage_quoted_findings(content: &str) -> Option<String> {
    capture_findings(&QUOTED_FINDINGS, content)
}

fn salvage_truncated_findings(content: &str) -> Option<String> {
    capture_findings(&TRUNCATED_FINDINGS, content)
}

/// Decodes JSON string escapes, keeping the raw text if they are invalid.
fn unescape(raw: &str) -> String {
    serde_json::from_str::<String>(&format!("\"{raw}\"")).unwrap_or_else(|_| raw.to_string())
}
