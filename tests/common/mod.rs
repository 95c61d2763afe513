//! Scripted backends for pipeline integration tests.
//!
//! [`ScriptedProvider`] routes each request to a per-agent script by
//! matching the request's system prompt against the default prompts, and
//! records every call so tests can inspect what each agent was sent.

#![allow(dead_code, clippy::panic)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use research_rs::agent::prompt::{
    CITATION_SYSTEM_PROMPT, PLANNER_SYSTEM_PROMPT, SYNTHESIZER_SYSTEM_PROMPT,
    WORKER_SYSTEM_PROMPT,
};
use research_rs::agent::{
    ChatRequest, ChatResponse, LlmProvider, Orchestrator, PromptSet, ResearchConfig, Role,
    TokenUsage, ToolCall,
};
use research_rs::error::AgentError;
use research_rs::search::SearchBackend;

/// Tokens reported for every scripted call.
pub const TOKENS_PER_CALL: u32 = 15;

/// Which agent a request came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Planner,
    Worker,
    Synthesizer,
    Citation,
}

/// What a script sees for one call.
#[derive(Debug, Clone)]
pub struct Call {
    /// Zero-based index of this call among calls to the same stage.
    pub index: usize,
    /// The agent's user message.
    pub user: String,
    /// Worker tool output, when the worker searched first.
    pub tool_output: Option<String>,
}

impl Call {
    /// Text between `<tag>` and `</tag>` in the user message.
    pub fn tagged(&self, tag: &str) -> String {
        let open = format!("<{tag}>");
        let close = format!("</{tag}>");
        self.user
            .split_once(&open)
            .and_then(|(_, rest)| rest.split_once(&close))
            .map(|(inner, _)| inner.to_string())
            .unwrap_or_default()
    }

    /// The worker's task.
    pub fn task(&self) -> String {
        self.tagged("task")
    }
}

type Script = Box<dyn Fn(&Call) -> Result<String, AgentError> + Send + Sync>;

/// An [`LlmProvider`] driven by one script per agent.
pub struct ScriptedProvider {
    planner: Script,
    worker: Script,
    synthesizer: Script,
    citation: Script,
    search_first: bool,
    calls: Mutex<Vec<(Stage, Call)>>,
}

impl ScriptedProvider {
    /// Well-behaved scripts: three planned tasks, one source per task, and
    /// a synthesizer that is satisfied on the first iteration.
    pub fn new() -> Self {
        Self {
            planner: Box::new(|_| {
                Ok(r#"{"sub_tasks": ["task one", "task two", "task three"]}"#.to_string())
            }),
            worker: Box::new(|call| Ok(worker_json(&call.task()))),
            synthesizer: Box::new(|call| {
                Ok(synthesis_json(&format!("Draft {}", call.index + 1), true, &[]))
            }),
            citation: Box::new(|_| Ok(r#"{"cited_report": "Cited report"}"#.to_string())),
            search_first: false,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn planner(
        mut self,
        f: impl Fn(&Call) -> Result<String, AgentError> + Send + Sync + 'static,
    ) -> Self {
        self.planner = Box::new(f);
        self
    }

    pub fn worker(
        mut self,
        f: impl Fn(&Call) -> Result<String, AgentError> + Send + Sync + 'static,
    ) -> Self {
        self.worker = Box::new(f);
        self
    }

    pub fn synthesizer(
        mut self,
        f: impl Fn(&Call) -> Result<String, AgentError> + Send + Sync + 'static,
    ) -> Self {
        self.synthesizer = Box::new(f);
        self
    }

    pub fn citation(
        mut self,
        f: impl Fn(&Call) -> Result<String, AgentError> + Send + Sync + 'static,
    ) -> Self {
        self.citation = Box::new(f);
        self
    }

    /// Makes every worker call `web_search` with its task before answering.
    pub fn searching(mut self) -> Self {
        self.search_first = true;
        self
    }

    /// User messages sent to `stage`, in call order.
    pub fn calls(&self, stage: Stage) -> Vec<Call> {
        self.calls
            .lock()
            .map(|calls| {
                calls
                    .iter()
                    .filter(|(s, _)| *s == stage)
                    .map(|(_, c)| c.clone())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Total number of backend calls.
    pub fn call_count(&self) -> usize {
        self.calls.lock().map(|c| c.len()).unwrap_or_default()
    }

    fn record(&self, stage: Stage, user: &str, tool_output: Option<String>) -> Call {
        let mut calls = self.calls.lock().unwrap_or_else(|e| e.into_inner());
        let call = Call {
            index: calls.iter().filter(|(s, _)| *s == stage).count(),
            user: user.to_string(),
            tool_output,
        };
        calls.push((stage, call.clone()));
        call
    }
}

fn stage_of(request: &ChatRequest) -> Stage {
    match request.system_prompt() {
        Some(p) if p == PLANNER_SYSTEM_PROMPT => Stage::Planner,
        Some(p) if p == WORKER_SYSTEM_PROMPT => Stage::Worker,
        Some(p) if p == SYNTHESIZER_SYSTEM_PROMPT => Stage::Synthesizer,
        Some(p) if p == CITATION_SYSTEM_PROMPT => Stage::Citation,
        other => panic!("unexpected system prompt: {other:?}"),
    }
}

fn response(content: String, tool_calls: Vec<ToolCall>) -> ChatResponse {
    ChatResponse {
        content,
        usage: TokenUsage {
            prompt_tokens: 10,
            completion_tokens: TOKENS_PER_CALL - 10,
            total_tokens: TOKENS_PER_CALL,
        },
        tool_calls,
        finish_reason: Some("stop".to_string()),
    }
}

#[async_trait]
impl LlmProvider for ScriptedProvider {
    fn name(&self) -> &'static str {
        "scripted"
    }

    async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse, AgentError> {
        let stage = stage_of(request);
        let user = request.last_user_message().unwrap_or_default().to_string();

        let tool_output = request
            .messages
            .iter()
            .rev()
            .find(|m| m.role == Role::Tool)
            .map(|m| m.content.clone());

        if stage == Stage::Worker && self.search_first && tool_output.is_none() {
            let task = Call {
                index: 0,
                user: user.clone(),
                tool_output: None,
            }
            .task();
            let arguments = serde_json::json!({ "query": task }).to_string();
            return Ok(response(
                String::new(),
                vec![ToolCall {
                    id: "call_1".to_string(),
                    name: "web_search".to_string(),
                    arguments,
                }],
            ));
        }

        let call = self.record(stage, &user, tool_output);
        let script = match stage {
            Stage::Planner => &self.planner,
            Stage::Worker => &self.worker,
            Stage::Synthesizer => &self.synthesizer,
            Stage::Citation => &self.citation,
        };
        script(&call).map(|content| response(content, Vec::new()))
    }
}

/// A worker answer with one source derived from the task.
pub fn worker_json(task: &str) -> String {
    serde_json::json!({
        "findings": format!("Findings for {task}"),
        "sources": [{"source": source_url(task), "content": format!("Evidence for {task}")}]
    })
    .to_string()
}

/// The source locator [`worker_json`] reports for `task`.
pub fn source_url(task: &str) -> String {
    format!("https://example.com/{}", task.replace(' ', "-"))
}

/// A synthesizer answer.
pub fn synthesis_json(draft: &str, is_complete: bool, new_tasks: &[&str]) -> String {
    serde_json::json!({
        "draft_report": draft,
        "is_complete": is_complete,
        "new_tasks": new_tasks,
    })
    .to_string()
}

/// A backend failure as a transport would report it.
pub fn network_error() -> AgentError {
    AgentError::ApiRequest {
        message: "connection refused".to_string(),
        status: None,
    }
}

/// A [`SearchBackend`] that records queries and returns canned results.
#[derive(Default)]
pub struct RecordingSearch {
    queries: Mutex<Vec<String>>,
}

impl RecordingSearch {
    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().map(|q| q.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl SearchBackend for RecordingSearch {
    fn name(&self) -> &'static str {
        "recording"
    }

    async fn search(&self, query: &str, result_count: usize) -> String {
        if let Ok(mut queries) = self.queries.lock() {
            queries.push(query.to_string());
        }
        format!(
            "1. Title: About {query}\n   URL: https://search.example/1\n   Preview: {result_count} results requested"
        )
    }
}

/// Test configuration with the given loop budget.
pub fn config(max_iterations: usize, max_workers: usize) -> ResearchConfig {
    ResearchConfig::builder()
        .api_key("test")
        .max_iterations(max_iterations)
        .max_workers(max_workers)
        .build()
        .unwrap_or_else(|e| panic!("config: {e}"))
}

/// An orchestrator using the default prompts, so scripts can be routed.
pub fn orchestrator(
    provider: &Arc<ScriptedProvider>,
    search: &Arc<RecordingSearch>,
    config: ResearchConfig,
) -> Orchestrator {
    let provider: Arc<dyn LlmProvider> = Arc::clone(provider) as Arc<dyn LlmProvider>;
    let search: Arc<dyn SearchBackend> = Arc::clone(search) as Arc<dyn SearchBackend>;
    Orchestrator::with_prompts(provider, search, config, PromptSet::defaults())
}
