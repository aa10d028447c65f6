//! Retry decorator for LLM clients.
//!
//! Transient failures (`AppError::is_transient`) are retried with
//! exponential backoff. Rejections and other final errors are returned
//! immediately.

use crate::client::{LlmClient, LlmRequest, LlmResponse};
use crate::types::RetryPolicy;
use newsdesk_core::AppResult;
use std::sync::Arc;

/// Wraps another client and retries transient failures.
pub struct RetryingClient {
    inner: Arc<dyn LlmClient>,
    policy: RetryPolicy,
}

impl RetryingClient {
    pub fn new(inner: Arc<dyn LlmClient>, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }
}

#[async_trait::async_trait]
impl LlmClient for RetryingClient {
    fn provider_name(&self) -> &str {
        self.inner.provider_name()
    }

    async fn complete(&self, request: &LlmRequest) -> AppResult<LlmResponse> {
        let max_attempts = self.policy.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            match self.inner.complete(request).await {
                Ok(response) => return Ok(response),
                Err(err) if err.is_transient() && attempt < max_attempts => {
                    let backoff = self.policy.backoff(attempt);
                    tracing::warn!(
                        provider = self.inner.provider_name(),
                        attempt,
                        max_attempts,
                        backoff_ms = backoff.as_millis() as u64,
                        "LLM call failed, retrying: {}",
                        err
                    );
                    tokio::time::sleep(backoff).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::LlmUsage;
    use newsdesk_core::AppError;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Fails with the configured error until `fail_times` calls have been made.
    struct FlakyClient {
        calls: AtomicU32,
        fail_times: u32,
        rejected: bool,
    }

    impl FlakyClient {
        fn new(fail_times: u32, rejected: bool) -> Self {
            Self {
                calls: AtomicU32::new(0),
                fail_times,
                rejected,
            }
        }
    }

    #[async_trait::async_trait]
    impl LlmClient for FlakyClient {
        fn provider_name(&self) -> &str {
            "flaky"
        }

        async fn complete(&self, request: &LlmRequest) -> AppResult<LlmResponse> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if call <= self.fail_times {
                return Err(if self.rejected {
                    AppError::LlmRejected("SAFETY".to_string())
                } else {
                    AppError::Llm("503".to_string())
                });
            }
            Ok(LlmResponse {
                content: "ok".to_string(),
                model: request.model.clone(),
                usage: LlmUsage::default(),
            })
        }
    }

    fn fast_policy() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 3,
            initial_backoff_ms: 1,
        }
    }

    #[tokio::test]
    async fn test_transient_failure_is_retried() {
        let inner = Arc::new(FlakyClient::new(2, false));
        let client = RetryingClient::new(inner.clone(), fast_policy());

        let response = client.complete(&LlmRequest::new("p", "m")).await.unwrap();
        assert_eq!(response.content, "ok");
        assert_eq!(inner.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_attempts() {
        let inner = Arc::new(FlakyClient::new(10, false));
        let client = RetryingClient::new(inner.clone(), fast_policy());

        let result = client.complete(&LlmRequest::new("p", "m")).await;
        assert!(matches!(result, Err(AppError::Llm(_))));
        assert_eq!(inner.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_rejection_is_not_retried() {
        let inner = Arc::new(FlakyClient::new(1, true));
        let client = RetryingClient::new(inner.clone(), fast_policy());

        let result = client.complete(&LlmRequest::new("p", "m")).await;
        assert!(matches!(result, Err(AppError::LlmRejected(_))));
        assert_eq!(inner.calls.load(Ordering::SeqCst), 1);
    }
}
