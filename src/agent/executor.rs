//! Tool executor that dispatches worker tool calls to a search backend.

use std::sync::Arc;

use serde::Deserialize;
use tracing::debug;

use crate::error::AgentError;
use crate::search::SearchBackend;

use super::tool::{ToolCall, ToolResult, WEB_SEARCH};

/// Maximum raw byte length of tool argument JSON from the LLM.
const MAX_TOOL_ARGS_LEN: usize = 10_000;
/// Maximum results per `web_search` call.
const MAX_SEARCH_RESULTS: usize = 20;

/// Executes tool calls requested by research workers.
///
/// Cloning is cheap; every worker gets its own handle onto the shared
/// backend.
#[derive(Clone)]
pub struct ToolExecutor {
    search: Arc<dyn SearchBackend>,
    default_results: usize,
}

#[derive(Debug, Deserialize)]
struct WebSearchParams {
    query: String,
    #[serde(default)]
    num_results: Option<usize>,
}

impl ToolExecutor {
    /// Creates an executor over the given search backend.
    #[must_use]
    pub fn new(search: Arc<dyn SearchBackend>, default_results: usize) -> Self {
        Self {
            search,
            default_results: default_results.clamp(1, MAX_SEARCH_RESULTS),
        }
    }

    /// Dispatches a tool call. Failures are returned as error results for
    /// the model to read, never as `Err`.
    pub async fn execute(&self, call: &ToolCall) -> ToolResult {
        let result = if call.arguments.len() > MAX_TOOL_ARGS_LEN {
            Err(AgentError::ToolExecution {
                name: call.name.clone(),
                message: format!(
                    "tool arguments too large ({} bytes, max {MAX_TOOL_ARGS_LEN})",
                    call.arguments.len()
                ),
            })
        } else {
            match call.name.as_str() {
                WEB_SEARCH => self.tool_web_search(&call.arguments).await,
                other => Err(AgentError::ToolExecution {
                    name: other.to_string(),
                    message: "unknown tool".to_string(),
                }),
            }
        };

        match result {
            Ok(content) => ToolResult {
                tool_call_id: call.id.clone(),
                content,
                is_error: false,
            },
            Err(e) => ToolResult {
                tool_call_id: call.id.clone(),
                content: e.to_string(),
                is_error: true,
            },
        }
    }

    async fn tool_web_search(&self, arguments: &str) -> Result<String, AgentError> {
        let params: WebSearchParams =
            serde_json::from_str(arguments).map_err(|e| AgentError::ToolExecution {
                name: WEB_SEARCH.to_string(),
                message: format!("invalid arguments: {e}"),
            })?;
        let query = params.query.trim();
        if query.is_empty() {
            return Err(AgentError::ToolExecution {
                name: WEB_SEARCH.to_string(),
                message: "query must not be empty".to_string(),
            });
        }
        let count = params
            .num_results
            .unwrap_or(self.default_results)
            .clamp(1, MAX_SEARCH_RESULTS);

        debug!(backend = self.search.name(), query, count, "web search");
        Ok(self.search.search(query, count).await)
    }
}

impl std::fmt::Debug for ToolExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolExecutor")
            .field("search", &self.search.name())
            .field("default_results", &self.default_results)
            .finish()
    }
}
