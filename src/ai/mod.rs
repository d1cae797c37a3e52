//! Concrete [`AiClient`] implementations.
//!
//! # Clients
//!
//! - **[`GeminiClient`]** calls a Gemini-style `generateContent` endpoint
//!   for summaries, tags, and answers, and optionally an `embedContent`
//!   endpoint for remote embeddings.
//! - **[`DisabledClient`]** refuses every generation call. Embeddings still
//!   work when they are computed locally.
//! - **[`TimedClient`]** wraps either of the above and bounds every call by
//!   `ai.timeout_secs`.
//!
//! # Embedding source
//!
//! `ai.embedding` decides where vectors come from, independently of the
//! provider: `local` uses [`local_embed`], `remote` uses the provider,
//! `disabled` fails every embed call so semantic search degrades to text.

pub mod disabled;
pub mod gemini;
pub mod timed;

pub use disabled::DisabledClient;
pub use gemini::GeminiClient;
pub use timed::TimedClient;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Result};

use doclens_core::ai::AiClient;
use doclens_core::embedding::local_embed;
use doclens_core::error::AiError;

use crate::config::{AiConfig, EmbeddingSource};

/// Build the configured client, wrapped in a [`TimedClient`].
pub fn create_client(config: &AiConfig) -> Result<Arc<dyn AiClient>> {
    let limit = Duration::from_secs(config.timeout_secs);
    match config.provider.as_str() {
        "disabled" => Ok(Arc::new(TimedClient::new(
            DisabledClient::new(config.embedding),
            limit,
        ))),
        "gemini" => Ok(Arc::new(TimedClient::new(GeminiClient::new(config)?, limit))),
        other => bail!("Unknown AI provider: {}", other),
    }
}

/// Embed `text` without a provider, or report why that is not possible.
///
/// Returns `None` when the source is [`EmbeddingSource::Remote`] and the
/// caller has to go to the network.
pub(crate) fn embed_offline(source: EmbeddingSource, text: &str) -> Option<Result<Vec<f32>, AiError>> {
    match source {
        EmbeddingSource::Local => Some(Ok(local_embed(text))),
        EmbeddingSource::Disabled => Some(Err(AiError::Disabled)),
        EmbeddingSource::Remote => None,
    }
}
