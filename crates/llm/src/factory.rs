//! LLM provider factory.
//!
//! Builds the configured client and wraps it in a [`RetryingClient`] so
//! every caller gets the same transient-failure handling.

use crate::client::LlmClient;
use crate::providers::{GeminiClient, OllamaClient};
use crate::retry::RetryingClient;
use crate::types::{ProviderType, RetryPolicy};
use newsdesk_core::{AppError, AppResult};
use std::sync::Arc;

/// Create an LLM client based on the provider name.
///
/// # Arguments
/// * `provider` - Provider identifier ("ollama", "gemini")
/// * `endpoint` - Optional custom endpoint URL
/// * `api_key` - API key (required for Gemini)
/// * `policy` - Retry policy applied around the provider
///
/// # Errors
/// Returns `AppError::Config` if the provider is unknown, disabled
/// (`"none"`), or missing a required secret.
pub fn create_client(
    provider: &str,
    endpoint: Option<&str>,
    api_key: Option<&str>,
    policy: RetryPolicy,
) -> AppResult<Arc<dyn LlmClient>> {
    if provider.eq_ignore_ascii_case("none") {
        return Err(AppError::Config("LLM provider is disabled".to_string()));
    }

    let provider_type = ProviderType::parse(provider)
        .ok_or_else(|| AppError::Config(format!("Unknown provider: {}", provider)))?;

    let inner: Arc<dyn LlmClient> = match provider_type {
        ProviderType::Ollama => Arc::new(OllamaClient::with_base_url(
            endpoint.unwrap_or(crate::providers::ollama::DEFAULT_OLLAMA_URL),
        )),
        ProviderType::Gemini => {
            let key = api_key.ok_or_else(|| {
                AppError::Config("Gemini provider requires API key".to_string())
            })?;
            Arc::new(GeminiClient::with_base_url(
                endpoint.unwrap_or(crate::providers::gemini::DEFAULT_GEMINI_URL),
                key,
            ))
        }
    };

    tracing::debug!(provider = provider_type.as_str(), "Created LLM client");

    Ok(Arc::new(RetryingClient::new(inner, policy)))
}
