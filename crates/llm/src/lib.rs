//! LLM capability for newsdesk.
//!
//! The report synthesizer treats text generation as a black box behind the
//! [`LlmClient`] trait. This crate provides the trait, two providers, a
//! retry decorator that separates transient failures from content-policy
//! rejections, and a factory that builds the configured client.
//!
//! # Providers
//! - **Ollama**: local runtime (default)
//! - **Gemini**: Google Generative Language API
//!
//! # Example
//! ```no_run
//! use newsdesk_llm::{LlmClient, LlmRequest, providers::OllamaClient};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = OllamaClient::new();
//! let request = LlmRequest::new("Summarize today's cricket news", "llama3.2");
//! let response = client.complete(&request).await?;
//! println!("{}", response.content);
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod factory;
pub mod providers;
pub mod retry;
pub mod types;

// Re-export main types
pub use client::{LlmClient, LlmRequest, LlmResponse, LlmUsage};
pub use factory::create_client;
pub use providers::{GeminiClient, OllamaClient};
pub use retry::RetryingClient;
pub use types::{ProviderType, RetryPolicy};
