//! Error types for newsdesk.
//!
//! One unified enum covers build-time, query-time, and synthesis failures
//! together with the ambient categories (configuration, I/O, storage, LLM
//! transport, prompts, serialization).

use thiserror::Error;

/// Unified error type for newsdesk.
///
/// All fallible functions return `Result<T, AppError>`.
/// We never panic: errors are represented and propagated.
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O and filesystem errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Article store and artifact persistence errors
    #[error("Storage error: {0}")]
    Storage(String),

    /// Transient LLM or embedding transport failure (retryable)
    #[error("LLM error: {0}")]
    Llm(String),

    /// The LLM refused the request (content policy or a request it will
    /// never accept); never retried
    #[error("LLM rejected request: {0}")]
    LlmRejected(String),

    /// Index build failed; the previously active version keeps serving
    #[error("Build error: {0}")]
    Build(String),

    /// Promotion protocol violation
    #[error("Catalog error: {0}")]
    Catalog(String),

    /// No index version has been promoted yet
    #[error("No active index version yet; the first build has not completed")]
    EmptyIndex,

    /// Requested lookup has no entry (e.g. no trending bucket)
    #[error("Not found: {0}")]
    NotFound(String),

    /// Unrecognized or inconsistent filter value supplied by the caller
    #[error("Invalid filter: {0}")]
    InvalidFilter(String),

    /// Query embedding does not match the metric the active version was built with
    #[error("Embedding mismatch: {0}")]
    EmbeddingMismatch(String),

    /// Report synthesis failed (caller degrades to citation-only output)
    #[error("Synthesis error: {0}")]
    Synthesis(String),

    /// Operation exceeded its deadline
    #[error("Timed out: {0}")]
    Timeout(String),

    /// Prompt system errors
    #[error("Prompt error: {0}")]
    Prompt(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic errors
    #[error("{0}")]
    Other(String),
}

impl AppError {
    /// Stable, machine-readable error code for the request layer.
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::Config(_) => "config",
            AppError::Io(_) => "io",
            AppError::Storage(_) => "storage",
            AppError::Llm(_) => "llm",
            AppError::LlmRejected(_) => "llm_rejected",
            AppError::Build(_) => "build",
            AppError::Catalog(_) => "catalog",
            AppError::EmptyIndex => "empty_index",
            AppError::NotFound(_) => "not_found",
            AppError::InvalidFilter(_) => "invalid_filter",
            AppError::EmbeddingMismatch(_) => "embedding_mismatch",
            AppError::Synthesis(_) => "synthesis",
            AppError::Timeout(_) => "timeout",
            AppError::Prompt(_) => "prompt",
            AppError::Serialization(_) => "serialization",
            AppError::Other(_) => "other",
        }
    }

    /// True for query-time errors caused by the caller or by the absence of
    /// data, as opposed to internal faults.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            AppError::EmptyIndex | AppError::NotFound(_) | AppError::InvalidFilter(_)
        )
    }

    /// True when retrying the same call may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, AppError::Llm(_) | AppError::Timeout(_) | AppError::Io(_))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

impl From<serde_yaml::Error> for AppError {
    fn from(err: serde_yaml::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

/// Convenience type alias for Results with AppError.
pub type AppResult<T> = Result<T, AppError>;
