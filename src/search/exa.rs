//! [Exa](https://exa.ai) search backend.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::{SearchBackend, SearchHit, format_hits};
use crate::error::AgentError;

/// Default Exa search endpoint.
pub const DEFAULT_EXA_URL: &str = "https://api.exa.ai/search";

/// Maximum preview characters requested per result.
const PREVIEW_CHARS: usize = 200;

/// Search backend backed by the Exa search API.
///
/// Constructed without a key, every search returns an explanatory error
/// string instead of calling the API.
pub struct ExaSearch {
    client: reqwest::Client,
    api_key: Option<String>,
    endpoint: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ExaRequest<'a> {
    query: &'a str,
    use_autoprompt: bool,
    num_results: usize,
    contents: ExaContents,
}

#[derive(Serialize)]
struct ExaContents {
    text: ExaTextOptions,
    highlights: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ExaTextOptions {
    max_characters: usize,
}

#[derive(Debug, Deserialize)]
struct ExaResponse {
    #[serde(default)]
    results: Vec<ExaResult>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ExaResult {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    text: Option<String>,
}

impl ExaSearch {
    /// Creates a backend with the given key, endpoint and HTTP timeout.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::ApiRequest`] if the HTTP client cannot be
    /// built, for example when the TLS backend fails to initialize.
    pub fn new(
        api_key: Option<String>,
        endpoint: Option<String>,
        timeout: Duration,
    ) -> Result<Self, AgentError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AgentError::ApiRequest {
                message: format!("failed to build search HTTP client: {e}"),
                status: None,
            })?;
        Ok(Self {
            client,
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            endpoint: endpoint.unwrap_or_else(|| DEFAULT_EXA_URL.to_string()),
        })
    }

    async fn request(
        &self,
        api_key: &str,
        query: &str,
        result_count: usize,
    ) -> Result<String, String> {
        let body = ExaRequest {
            query,
            use_autoprompt: true,
            num_results: result_count,
            contents: ExaContents {
                text: ExaTextOptions {
                    max_characters: PREVIEW_CHARS,
                },
                highlights: true,
            },
        };

        let response = self
            .client
            .post(&self.endpoint)
            .header("x-api-key", api_key)
            .json(&body)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|e| format!("Error during web search: {e}"))?;

        let parsed: ExaResponse = response
            .json()
            .await
            .map_err(|e| format!("Error during web search: invalid response: {e}"))?;

        if let Some(error) = parsed.error {
            return Err(format!("Error: {error}"));
        }

        let hits: Vec<SearchHit> = parsed
            .results
            .into_iter()
            .map(|r| SearchHit {
                title: r.title.unwrap_or_else(|| "No Title".to_string()),
                url: r.url.unwrap_or_else(|| "No URL".to_string()),
                preview: r
                    .text
                    .unwrap_or_else(|| "No content preview available.".to_string()),
            })
            .collect();

        Ok(format_hits(&hits))
    }
}

#[async_trait]
impl SearchBackend for ExaSearch {
    fn name(&self) -> &'static str {
        "exa"
    }

    async fn search(&self, query: &str, result_count: usize) -> String {
        let Some(api_key) = self.api_key.as_deref() else {
            return "Error: EXA_API_KEY environment variable not set.".to_string();
        };

        match self.request(api_key, query, result_count.max(1)).await {
            Ok(text) => text,
            Err(message) => {
                warn!(backend = "exa", query, error = %message, "web search failed");
                message
            }
        }
    }
}

impl std::fmt::Debug for ExaSearch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExaSearch")
            .field("endpoint", &self.endpoint)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .finish_non_exhaustive()
    }
}
