//! Agent trait definition.
//!
//! The planner, workers, synthesizer and citation agent all implement this
//! trait, which gives the orchestrator a uniform way to call them.

use async_trait::async_trait;

use super::executor::ToolExecutor;
use super::message::{ChatRequest, TokenUsage, system_message, user_message};
use super::provider::LlmProvider;
use super::tool::ToolDefinition;
use crate::error::AgentError;

/// Response from an agent execution.
#[derive(Debug, Clone)]
pub struct AgentResponse {
    /// The agent's text output.
    pub content: String,
    /// Token usage, summed over every call the agent made.
    pub usage: TokenUsage,
    /// Why the model stopped generating (e.g. `"stop"`, `"length"`).
    pub finish_reason: Option<String>,
}

/// Trait implemented by all agents in the system.
///
/// Agents encapsulate a role with a fixed system prompt and model
/// configuration. Agents that use tools override [`Agent::tools`] and are
/// run through [`execute_with_tools`].
#[async_trait]
pub trait Agent: Send + Sync {
    /// Agent name for logging and identification.
    fn name(&self) -> &'static str;

    /// Model identifier to use for this agent.
    fn model(&self) -> &str;

    /// System prompt that defines the agent's role and behavior.
    fn system_prompt(&self) -> &str;

    /// Whether to request JSON-formatted output.
    fn json_mode(&self) -> bool {
        true
    }

    /// Sampling temperature.
    fn temperature(&self) -> f32 {
        0.0
    }

    /// Maximum tokens for the response.
    fn max_tokens(&self) -> u32 {
        4096
    }

    /// Tool definitions available to this agent. None by default.
    fn tools(&self) -> Vec<ToolDefinition> {
        Vec::new()
    }

    /// Tool rounds allowed before the agent must answer.
    fn max_tool_iterations(&self) -> usize {
        3
    }

    /// Builds the request for a user message, with this agent's tools.
    fn request(&self, user_msg: &str) -> ChatRequest {
        ChatRequest {
            model: self.model().to_string(),
            messages: vec![system_message(self.system_prompt()), user_message(user_msg)],
            temperature: Some(self.temperature()),
            max_tokens: Some(self.max_tokens()),
            json_mode: self.json_mode(),
            tools: self.tools(),
        }
    }

    /// Executes the agent with the given user message (no tools).
    ///
    /// # Errors
    ///
    /// Returns [`AgentError`] on backend failures.
    async fn execute(
        &self,
        provider: &dyn LlmProvider,
        user_msg: &str,
    ) -> Result<AgentResponse, AgentError> {
        let mut request = self.request(user_msg);
        request.tools.clear();
        let response = provider.chat(&request).await?;

        Ok(AgentResponse {
            content: response.content,
            usage: response.usage,
            finish_reason: response.finish_reason,
        })
    }
}

/// Executes an agent with tool-calling support.
///
/// Falls through to [`Agent::execute`] when the agent has no tools.
///
/// # Errors
///
/// Returns [`AgentError`] on backend failures.
pub async fn execute_with_tools(
    agent: &dyn Agent,
    provider: &dyn LlmProvider,
    user_msg: &str,
    executor: &ToolExecutor,
) -> Result<AgentResponse, AgentError> {
    let mut request = agent.request(user_msg);
    if request.tools.is_empty() {
        return agent.execute(provider, user_msg).await;
    }

    let response = super::agentic_loop::agentic_loop(
        provider,
        &mut request,
        executor,
        agent.max_tool_iterations(),
    )
    .await?;

    Ok(AgentResponse {
        content: response.content,
        usage: response.usage,
        finish_reason: response.finish_reason,
    })
}
