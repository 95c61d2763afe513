//! Multi-agent research pipeline.
//!
//! A director model plans and synthesizes while worker models research
//! sub-tasks concurrently with a web search tool. Uses a pluggable provider
//! abstraction backed by OpenAI-compatible APIs.
//!
//! # Architecture
//!
//! ```text
//! Research query → Orchestrator
//!   ├── PlannerAgent (query → 3-5 sub-tasks, with fallbacks)
//!   ├── loop, at most max_iterations times:
//!   │   ├── Fan-out → up to max_workers concurrent WorkerAgents
//!   │   │   └── web_search tool calls → findings + sources
//!   │   └── SynthesizerAgent → draft report, is_complete, new tasks
//!   └── CitationAgent → cited report + references
//! ```
//!
//! Model responses are read through [`extract`], which recovers JSON from
//! free text. A response that cannot be used triggers the owning
//! component's fallback; nothing inside a run aborts it.

pub mod agentic_loop;
pub mod citation;
pub mod client;
pub mod config;
pub mod executor;
pub mod extract;
pub mod fanout;
pub mod finding;
pub mod message;
pub mod orchestrator;
pub mod planner;
pub mod prompt;
pub mod provider;
pub mod providers;
pub mod synthesizer;
pub mod tool;
pub mod traits;
pub mod transcript;
pub mod worker;

// Re-export key types
pub use citation::CitationAgent;
pub use client::{create_provider, create_search_backend};
pub use config::{ResearchConfig, ResearchConfigBuilder};
pub use executor::ToolExecutor;
pub use extract::{ExtractionFailure, decode, extract};
pub use fanout::{TaskRunner, dispatch};
pub use finding::{FinalResult, IterationState, ResearchRun, Source, SubTaskResult};
pub use message::{ChatMessage, ChatRequest, ChatResponse, Role, TokenUsage};
pub use orchestrator::Orchestrator;
pub use planner::{Plan, PlanSource, PlannerAgent};
pub use prompt::PromptSet;
pub use provider::LlmProvider;
pub use synthesizer::SynthesizerAgent;
pub use tool::{ToolCall, ToolDefinition, ToolResult, ToolSet};
pub use traits::{Agent, execute_with_tools};
pub use transcript::{Actor, LogEntry, Phase, ResearchLog};
pub use worker::{BoundWorker, WorkerAgent};
