use async_trait::async_trait;

use doclens_core::ai::AiClient;
use doclens_core::error::AiError;

use super::embed_offline;
use crate::config::EmbeddingSource;

/// Client used when no provider is configured.
///
/// Summaries, tags, and answers always fail with [`AiError::Disabled`],
/// which the core turns into "no enrichment" and "Unable to answer.".
pub struct DisabledClient {
    embedding: EmbeddingSource,
}

impl DisabledClient {
    pub fn new(embedding: EmbeddingSource) -> Self {
        Self { embedding }
    }
}

#[async_trait]
impl AiClient for DisabledClient {
    fn name(&self) -> &str {
        "disabled"
    }

    async fn summarize(&self, _text: &str) -> Result<String, AiError> {
        Err(AiError::Disabled)
    }

    async fn extract_tags(&self, _text: &str) -> Result<Vec<String>, AiError> {
        Err(AiError::Disabled)
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, AiError> {
        embed_offline(self.embedding, text).unwrap_or(Err(AiError::Disabled))
    }

    async fn answer(&self, _prompt: &str) -> Result<String, AiError> {
        Err(AiError::Disabled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use doclens_core::embedding::LOCAL_EMBEDDING_DIMS;

    #[tokio::test]
    async fn test_generation_disabled() {
        let client = DisabledClient::new(EmbeddingSource::Local);
        assert!(matches!(client.extract_tags("x").await, Err(AiError::Disabled)));
        assert!(matches!(client.answer("x").await, Err(AiError::Disabled)));
        assert_eq!(client.embed("x").await.unwrap().len(), LOCAL_EMBEDDING_DIMS);
    }

    #[tokio::test]
    async fn test_embedding_disabled() {
        let client = DisabledClient::new(EmbeddingSource::Disabled);
        assert!(matches!(client.embed("x").await, Err(AiError::Disabled)));
    }
}
