//! LLM provider selection and retry policy types.

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use newsdesk_core::AppError;

/// Provider type enum for matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderType {
    Ollama,
    Gemini,
}

impl ProviderType {
    /// Parse provider type from string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "ollama" => Some(Self::Ollama),
            "gemini" | "google" => Some(Self::Gemini),
            _ => None,
        }
    }

    /// Get the canonical provider name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ollama => "ollama",
            Self::Gemini => "gemini",
        }
    }
}

/// How many times, and how patiently, a transient failure is retried.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Total attempts including the first one
    pub max_attempts: u32,

    /// Backoff before the second attempt; doubles afterwards
    pub initial_backoff_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff_ms: 200,
        }
    }
}

impl RetryPolicy {
    /// Backoff to wait after `attempt` failed attempts (1-based).
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 2_u64.saturating_pow(attempt.saturating_sub(1));
        Duration::from_millis(self.initial_backoff_ms.saturating_mul(factor))
    }
}

/// Map an unsuccessful HTTP status to the error taxonomy.
///
/// Timeouts, rate limiting, and server errors are transient; any other
/// client error is final.
pub(crate) fn status_error(provider: &str, status: StatusCode, body: &str) -> AppError {
    let message = format!("{} API error ({}): {}", provider, status, body);
    if status.is_server_error()
        || status == StatusCode::TOO_MANY_REQUESTS
        || status == StatusCode::REQUEST_TIMEOUT
    {
        AppError::Llm(message)
    } else {
        AppError::LlmRejected(message)
    }
}
