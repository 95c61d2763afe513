//! Research configuration with builder pattern and environment variable support.
//!
//! Configuration is resolved in order: explicit values → environment variables → defaults.

use std::path::PathBuf;
use std::time::Duration;

use crate::error::AgentError;

/// Default director (planner, synthesizer, citation) model.
const DEFAULT_DIRECTOR_MODEL: &str = "gpt-4o";
/// Default worker model.
const DEFAULT_WORKER_MODEL: &str = "gpt-4o-mini";
/// Default cap on synthesis cycles.
const DEFAULT_MAX_ITERATIONS: usize = 3;
/// Default fan-out pool size.
const DEFAULT_MAX_WORKERS: usize = 4;
/// Default director max tokens. Synthesis rewrites the whole report each cycle.
const DEFAULT_DIRECTOR_MAX_TOKENS: u32 = 8192;
/// Default worker max tokens.
const DEFAULT_WORKER_MAX_TOKENS: u32 = 4096;
/// Default tool rounds a worker may spend before it must answer.
const DEFAULT_MAX_TOOL_ITERATIONS: usize = 3;
/// Default results per web search.
const DEFAULT_SEARCH_RESULTS: usize = crate::search::DEFAULT_RESULT_COUNT;
/// Default request timeout in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Configuration for a research run.
#[derive(Debug, Clone)]
pub struct ResearchConfig {
    /// LLM provider name (e.g., "openai").
    pub provider: String,
    /// API key for the provider.
    pub api_key: String,
    /// Optional base URL override (for proxies or compatible APIs).
    pub base_url: Option<String>,
    /// Model for the planner, synthesizer and citation agents.
    pub director_model: String,
    /// Model for research workers.
    pub worker_model: String,
    /// Maximum synthesis cycles per run (at least 1).
    pub max_iterations: usize,
    /// Maximum concurrently running workers (at least 1).
    pub max_workers: usize,
    /// Maximum tokens for director responses.
    pub director_max_tokens: u32,
    /// Maximum tokens for worker responses.
    pub worker_max_tokens: u32,
    /// Tool-calling rounds a worker may use before it must answer.
    pub max_tool_iterations: usize,
    /// Results requested per web search when the model does not say.
    pub search_results: usize,
    /// API key for the web search backend.
    ///
    /// When absent, searches return an explanatory error string and
    /// workers fall back to the model's own knowledge.
    pub search_api_key: Option<String>,
    /// Search endpoint override.
    pub search_url: Option<String>,
    /// Timeout applied to every backend call.
    pub timeout: Duration,
    /// Directory containing prompt template files.
    ///
    /// When set, system prompts are loaded from markdown files in this
    /// directory, falling back to compiled-in defaults for any missing
    /// files.
    pub prompt_dir: Option<PathBuf>,
    /// Minimum delay before each worker starts, after acquiring its pool
    /// slot.
    pub request_delay: Duration,
}

impl ResearchConfig {
    /// Creates a new builder for `ResearchConfig`.
    #[must_use]
    pub fn builder() -> ResearchConfigBuilder {
        ResearchConfigBuilder::default()
    }

    /// Creates configuration from environment variables with defaults.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::ApiKeyMissing`] if no API key is found.
    pub fn from_env() -> Result<Self, AgentError> {
        Self::builder().from_env().build()
    }
}

/// Builder for [`ResearchConfig`].
#[derive(Debug, Clone, Default)]
pub struct ResearchConfigBuilder {
    provider: Option<String>,
    api_key: Option<String>,
    base_url: Option<String>,
    director_model: Option<String>,
    worker_model: Option<String>,
    max_iterations: Option<usize>,
    max_workers: Option<usize>,
    director_max_tokens: Option<u32>,
    worker_max_tokens: Option<u32>,
    max_tool_iterations: Option<usize>,
    search_results: Option<usize>,
    search_api_key: Option<String>,
    search_url: Option<String>,
    timeout: Option<Duration>,
    prompt_dir: Option<PathBuf>,
    request_delay: Option<Duration>,
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.trim().parse().ok())
}

impl ResearchConfigBuilder {
    /// Populates unset fields from environment variables.
    #[must_use]
    pub fn from_env(mut self) -> Self {
        if self.provider.is_none() {
            self.provider = std::env::var("RESEARCH_PROVIDER").ok();
        }
        if self.api_key.is_none() {
            self.api_key = std::env::var("OPENAI_API_KEY")
                .or_else(|_| std::env::var("RESEARCH_API_KEY"))
                .ok();
        }
        if self.base_url.is_none() {
            self.base_url = std::env::var("OPENAI_BASE_URL")
                .or_else(|_| std::env::var("RESEARCH_BASE_URL"))
                .ok();
        }
        if self.director_model.is_none() {
            self.director_model = std::env::var("RESEARCH_DIRECTOR_MODEL").ok();
        }
        if self.worker_model.is_none() {
            self.worker_model = std::env::var("RESEARCH_WORKER_MODEL").ok();
        }
        if self.max_iterations.is_none() {
            self.max_iterations = env_parse("RESEARCH_MAX_ITERATIONS");
        }
        if self.max_workers.is_none() {
            self.max_workers = env_parse("RESEARCH_MAX_WORKERS");
        }
        if self.search_results.is_none() {
            self.search_results = env_parse("RESEARCH_SEARCH_RESULTS");
        }
        if self.search_api_key.is_none() {
            self.search_api_key = std::env::var("EXA_API_KEY").ok();
        }
        if self.prompt_dir.is_none() {
            self.prompt_dir = std::env::var("RESEARCH_PROMPT_DIR").ok().map(PathBuf::from);
        }
        self
    }

    /// Sets the LLM provider name.
    #[must_use]
    pub fn provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = Some(provider.into());
        self
    }

    /// Sets the API key.
    #[must_use]
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Sets the base URL override.
    #[must_use]
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Sets the director model.
    #[must_use]
    pub fn director_model(mut self, model: impl Into<String>) -> Self {
        self.director_model = Some(model.into());
        self
    }

    /// Sets the worker model.
    #[must_use]
    pub fn worker_model(mut self, model: impl Into<String>) -> Self {
        self.worker_model = Some(model.into());
        self
    }

    /// Sets the maximum number of synthesis cycles.
    #[must_use]
    pub const fn max_iterations(mut self, n: usize) -> Self {
        self.max_iterations = Some(n);
        self
    }

    /// Sets the worker pool size.
    #[must_use]
    pub const fn max_workers(mut self, n: usize) -> Self {
        self.max_workers = Some(n);
        self
    }

    /// Sets the director max tokens.
    #[must_use]
    pub const fn director_max_tokens(mut self, n: u32) -> Self {
        self.director_max_tokens = Some(n);
        self
    }

    /// Sets the worker max tokens.
    #[must_use]
    pub const fn worker_max_tokens(mut self, n: u32) -> Self {
        self.worker_max_tokens = Some(n);
        self
    }

    /// Sets the worker tool-calling budget.
    #[must_use]
    pub const fn max_tool_iterations(mut self, n: usize) -> Self {
        self.max_tool_iterations = Some(n);
        self
    }

    /// Sets the default number of results per web search.
    #[must_use]
    pub const fn search_results(mut self, n: usize) -> Self {
        self.search_results = Some(n);
        self
    }

    /// Sets the web search API key.
    #[must_use]
    pub fn search_api_key(mut self, key: impl Into<String>) -> Self {
        self.search_api_key = Some(key.into());
        self
    }

    /// Sets the web search endpoint.
    #[must_use]
    pub fn search_url(mut self, url: impl Into<String>) -> Self {
        self.search_url = Some(url.into());
        self
    }

    /// Sets the per-call timeout.
    #[must_use]
    pub const fn timeout(mut self, duration: Duration) -> Self {
        self.timeout = Some(duration);
        self
    }

    /// Sets the prompt template directory.
    #[must_use]
    pub fn prompt_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.prompt_dir = Some(dir.into());
        self
    }

    /// Sets the delay applied before each worker starts.
    #[must_use]
    pub const fn request_delay(mut self, delay: Duration) -> Self {
        self.request_delay = Some(delay);
        self
    }

    /// Builds the [`ResearchConfig`].
    ///
    /// Zero iteration and worker counts are raised to 1.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::ApiKeyMissing`] if no API key was set.
    pub fn build(self) -> Result<ResearchConfig, AgentError> {
        let api_key = self.api_key.ok_or(AgentError::ApiKeyMissing)?;

        Ok(ResearchConfig {
            provider: self.provider.unwrap_or_else(|| "openai".to_string()),
            api_key,
            base_url: self.base_url,
            director_model: self
                .director_model
                .unwrap_or_else(|| DEFAULT_DIRECTOR_MODEL.to_string()),
            worker_model: self
                .worker_model
                .unwrap_or_else(|| DEFAULT_WORKER_MODEL.to_string()),
            max_iterations: self
                .max_iterations
                .unwrap_or(DEFAULT_MAX_ITERATIONS)
                .max(1),
            max_workers: self.max_workers.unwrap_or(DEFAULT_MAX_WORKERS).max(1),
            director_max_tokens: self
                .director_max_tokens
                .unwrap_or(DEFAULT_DIRECTOR_MAX_TOKENS),
            worker_max_tokens: self
                .worker_max_tokens
                .unwrap_or(DEFAULT_WORKER_MAX_TOKENS),
            max_tool_iterations: self
                .max_tool_iterations
                .unwrap_or(DEFAULT_MAX_TOOL_ITERATIONS),
            search_results: self
                .search_results
                .unwrap_or(DEFAULT_SEARCH_RESULTS)
                .max(1),
            search_api_key: self.search_api_key,
            search_url: self.search_url,
            timeout: self
                .timeout
                .unwrap_or(Duration::from_secs(DEFAULT_TIMEOUT_SECS)),
            prompt_dir: self.prompt_dir,
            request_delay: self.request_delay.unwrap_or(Duration::ZERO),
        })
    }
}
