//! Error types for research-rs.
//!
//! Errors are split by layer: [`AgentError`] covers the research pipeline
//! and its backends, [`CommandError`] covers the CLI surface, and [`Error`]
//! unifies both for callers that only need a single type.

use thiserror::Error as ThisError;

/// Result type alias using the crate-level [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error type.
#[derive(Debug, ThisError)]
pub enum Error {
    /// Research pipeline or backend error.
    #[error(transparent)]
    Agent(#[from] AgentError),

    /// CLI command error.
    #[error(transparent)]
    Command(#[from] CommandError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised by the research pipeline and its collaborators.
///
/// Most of these never escape a run: the orchestrator converts backend
/// failures into fallback behavior. They surface to callers only from
/// configuration, provider construction, and query validation.
#[derive(Debug, ThisError)]
pub enum AgentError {
    /// No API key was configured for the text-generation backend.
    #[error("API key not found. Set OPENAI_API_KEY or RESEARCH_API_KEY")]
    ApiKeyMissing,

    /// The configured provider name is not known.
    #[error("unsupported provider: {name}")]
    UnsupportedProvider {
        /// Provider name as configured.
        name: String,
    },

    /// The backend request failed (network, HTTP status, SDK error).
    #[error("API request failed: {message}")]
    ApiRequest {
        /// Error description from the transport or SDK.
        message: String,
        /// HTTP status code, when known.
        status: Option<u16>,
    },

    /// The backend call exceeded the configured timeout.
    #[error("request timed out after {seconds}s")]
    Timeout {
        /// Timeout that elapsed, in seconds.
        seconds: u64,
    },

    /// A response could not be decoded into the expected record.
    #[error("failed to parse response: {message}")]
    ResponseParse {
        /// Diagnostic message.
        message: String,
        /// Raw response content.
        content: String,
    },

    /// A tool call could not be executed.
    #[error("tool '{name}' failed: {message}")]
    ToolExecution {
        /// Tool name.
        name: String,
        /// Failure description.
        message: String,
    },

    /// The research query was rejected before the run started.
    #[error("invalid query: {message}")]
    InvalidQuery {
        /// Reason for rejection.
        message: String,
    },

    /// Internal orchestration failure.
    #[error("orchestration error: {message}")]
    Orchestration {
        /// Failure description.
        message: String,
    },
}

/// Errors raised by CLI commands.
#[derive(Debug, ThisError)]
pub enum CommandError {
    /// The command could not complete.
    #[error("command failed: {0}")]
    ExecutionFailed(String),

    /// Output could not be formatted.
    #[error("output formatting failed: {0}")]
    OutputFormat(String),

    /// A command argument was invalid.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}
