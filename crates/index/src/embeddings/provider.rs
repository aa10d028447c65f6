//! Embedding provider trait and factory.

use crate::config::EmbeddingConfig;
use newsdesk_core::{AppError, AppResult};
use std::sync::Arc;

/// Trait for embedding providers.
///
/// Implementations must be deterministic for identical input.
#[async_trait::async_trait]
pub trait EmbeddingProvider: Send + Sync + std::fmt::Debug {
    /// Get provider name (e.g., "trigram", "ollama")
    fn provider_name(&self) -> &str;

    /// Get model identifier
    fn model_name(&self) -> &str;

    /// Get embedding dimensions
    fn dimensions(&self) -> usize;

    /// Generate embeddings for multiple texts in a batch.
    ///
    /// The result has one vector per input, in input order.
    async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>>;

    /// Generate embedding for a single text (convenience method).
    async fn embed(&self, text: &str) -> AppResult<Vec<f32>> {
        let mut results = self.embed_batch(&[text.to_string()]).await?;
        results
            .pop()
            .ok_or_else(|| AppError::Llm("No embedding returned".to_string()))
    }

    /// Identity of the vector space this provider produces.
    ///
    /// Two providers with equal fingerprints yield comparable vectors.
    fn fingerprint(&self) -> String {
        format!(
            "{}/{}/{}",
            self.provider_name(),
            self.model_name(),
            self.dimensions()
        )
    }
}

/// Create an embedding provider based on configuration.
pub fn create_provider(config: &EmbeddingConfig) -> AppResult<Arc<dyn EmbeddingProvider>> {
    if config.dimensions == 0 {
        return Err(AppError::Config(
            "Embedding dimensions must be greater than zero".to_string(),
        ));
    }

    match config.provider.as_str() {
        "trigram" => Ok(Arc::new(super::providers::TrigramProvider::new(
            config.dimensions,
        ))),

        "ollama" => Ok(Arc::new(super::providers::OllamaEmbeddingProvider::new(
            config.endpoint.as_deref(),
            &config.model,
            config.dimensions,
        )?)),

        _ => Err(AppError::Config(format!(
            "Unknown embedding provider: '{}'. Supported providers: trigram, ollama",
            config.provider
        ))),
    }
}
