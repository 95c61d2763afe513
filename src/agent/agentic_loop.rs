//! Agentic tool-calling loop.
//!
//! Drives the LLM ↔ tool execution round-trip: sends a request to the model,
//! executes any tool calls in the response, appends results, and repeats
//! until the model produces a final text response. Once the tool budget is
//! spent the tools are withdrawn and the model is asked one last time, so a
//! worker always ends with an answer rather than an error.

use tracing::debug;

use super::executor::ToolExecutor;
use super::message::{
    ChatRequest, ChatResponse, TokenUsage, assistant_tool_calls_message, tool_message,
    user_message,
};
use super::provider::LlmProvider;
use crate::error::AgentError;

/// Appended when the tool budget is exhausted.
const FINAL_ANSWER_NUDGE: &str =
    "Tool budget exhausted. Write your final answer now from the results you already have.";

/// Runs an agentic loop: model → tool calls → tool results → model → …
///
/// # Arguments
///
/// * `provider` - LLM provider to call.
/// * `request` - Initial chat request (mutated in-place with tool messages).
/// * `executor` - Dispatches tool calls.
/// * `max_iterations` - Number of tool rounds allowed before the final
///   tool-free request.
///
/// # Returns
///
/// The final [`ChatResponse`], with `usage` summed over every call made.
///
/// # Errors
///
/// Propagates provider errors.
pub async fn agentic_loop(
    provider: &dyn LlmProvider,
    request: &mut ChatRequest,
    executor: &ToolExecutor,
    max_iterations: usize,
) -> Result<ChatResponse, AgentError> {
    let mut usage = TokenUsage::default();

    for iteration in 0..max_iterations {
        let mut response = provider.chat(request).await?;
        usage.accumulate(response.usage);

        if response.tool_calls.is_empty() {
            debug!(iteration, "agentic loop completed with final text response");
            response.usage = usage;
            return Ok(response);
        }

        debug!(
            iteration,
            tool_count = response.tool_calls.len(),
            "executing tool calls"
        );

        request
            .messages
            .push(assistant_tool_calls_message(response.tool_calls.clone()));

        for call in &response.tool_calls {
            let result = executor.execute(call).await;
            debug!(
                tool = call.name,
                call_id = call.id,
                is_error = result.is_error,
                "tool execution complete"
            );
            request
                .messages
                .push(tool_message(&result.tool_call_id, &result.content));
        }
    }

    debug!(max_iterations, "tool budget exhausted, requesting final answer");
    request.tools.clear();
    request.messages.push(user_message(FINAL_ANSWER_NUDGE));
    let mut response = provider.chat(request).await?;
    usage.accumulate(response.usage);
    response.usage = usage;
    Ok(response)
}
