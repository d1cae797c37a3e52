use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use tracing::warn;

use doclens_core::ai::AiClient;
use doclens_core::error::AiError;

/// Bounds every call on the inner client by a fixed deadline.
///
/// A call that overruns is dropped and reported as [`AiError::Timeout`].
pub struct TimedClient<C> {
    inner: C,
    limit: Duration,
}

impl<C: AiClient> TimedClient<C> {
    pub fn new(inner: C, limit: Duration) -> Self {
        Self { inner, limit }
    }

    async fn guard<T, F>(&self, op: &'static str, fut: F) -> Result<T, AiError>
    where
        F: Future<Output = Result<T, AiError>> + Send,
    {
        match tokio::time::timeout(self.limit, fut).await {
            Ok(result) => result,
            Err(_) => {
                warn!(
                    provider = self.inner.name(),
                    op,
                    timeout_ms = self.limit.as_millis() as u64,
                    "AI call timed out"
                );
                Err(AiError::Timeout(self.limit.as_secs()))
            }
        }
    }
}

#[async_trait]
impl<C: AiClient> AiClient for TimedClient<C> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn summarize(&self, text: &str) -> Result<String, AiError> {
        self.guard("summarize", self.inner.summarize(text)).await
    }

    async fn extract_tags(&self, text: &str) -> Result<Vec<String>, AiError> {
        self.guard("extract_tags", self.inner.extract_tags(text)).await
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, AiError> {
        self.guard("embed", self.inner.embed(text)).await
    }

    async fn answer(&self, prompt: &str) -> Result<String, AiError> {
        self.guard("answer", self.inner.answer(prompt)).await
    }
}
