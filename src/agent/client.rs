//! Backend registry and factories.
//!
//! Maps configured names to concrete [`LlmProvider`] and [`SearchBackend`]
//! implementations.

use std::sync::Arc;

use crate::agent::config::ResearchConfig;
use crate::agent::provider::LlmProvider;
use crate::agent::providers::OpenAiProvider;
use crate::error::AgentError;
use crate::search::{ExaSearch, SearchBackend};

/// Creates an [`LlmProvider`] based on the configured provider name.
///
/// # Supported Providers
///
/// - `"openai"` (default): OpenAI-compatible APIs via `async-openai`
///
/// # Errors
///
/// Returns [`AgentError::UnsupportedProvider`] for unknown provider names.
pub fn create_provider(config: &ResearchConfig) -> Result<Arc<dyn LlmProvider>, AgentError> {
    match config.provider.as_str() {
        "openai" => Ok(Arc::new(OpenAiProvider::new(config))),
        other => Err(AgentError::UnsupportedProvider {
            name: other.to_string(),
        }),
    }
}

/// Creates the web search backend workers use.
///
/// Without a search key the backend still exists and answers every search
/// with an explanatory error string.
///
/// # Errors
///
/// Returns [`AgentError::ApiRequest`] if the HTTP client cannot be built.
pub fn create_search_backend(
    config: &ResearchConfig,
) -> Result<Arc<dyn SearchBackend>, AgentError> {
    let search = ExaSearch::new(
        config.search_api_key.clone(),
        config.search_url.clone(),
        config.timeout,
    )?;
    Ok(Arc::new(search))
}
