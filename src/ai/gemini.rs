//! Gemini-style generation and embedding client.
//!
//! Generation: `POST {generate_url}?key=…` with
//! `{"contents":[{"parts":[{"text": prompt}]}]}`; the reply must carry
//! `candidates[0].content.parts[0].text`.
//!
//! Remote embedding: `POST {embed_url}?key=…` with
//! `{"content":{"parts":[{"text": text}]}}`; the reply must carry
//! `embedding.values`.
//!
//! Any other reply shape is [`AiError::MalformedResponse`].
//!
//! Retry strategy:
//! - HTTP 429 or 5xx → retry with exponential backoff
//! - HTTP 4xx (not 429) → fail immediately
//! - Network error → retry

use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use doclens_core::ai::AiClient;
use doclens_core::error::AiError;
use doclens_core::models::normalize_tags;

use super::embed_offline;
use crate::config::{AiConfig, EmbeddingSource};

const SUMMARY_PROMPT: &str = "Summarize the following in 3-4 sentences:";
const TAGS_PROMPT: &str = "Extract 5-7 keywords as tags from this document:";

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
}

#[derive(Serialize)]
struct EmbedRequest<'a> {
    content: Content<'a>,
}

#[derive(Deserialize)]
struct GenerateResponse {
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: CandidateContent,
}

#[derive(Deserialize)]
struct CandidateContent {
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    text: String,
}

#[derive(Deserialize)]
struct EmbedResponse {
    embedding: EmbeddingValues,
}

#[derive(Deserialize)]
struct EmbeddingValues {
    values: Vec<f32>,
}

/// Client for a Gemini-compatible API.
pub struct GeminiClient {
    http: reqwest::Client,
    generate_url: String,
    embed_url: Option<String>,
    api_key: String,
    embedding: EmbeddingSource,
    max_retries: u32,
    backoff: Duration,
}

impl GeminiClient {
    pub fn new(config: &AiConfig) -> Result<Self> {
        let generate_url = config
            .generate_url
            .clone()
            .ok_or_else(|| anyhow!("ai.generate_url required for gemini"))?;
        let api_key = config
            .api_key
            .clone()
            .ok_or_else(|| anyhow!("no API key for gemini (set {})", config.api_key_env))?;

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            http,
            generate_url,
            embed_url: config.embed_url.clone(),
            api_key,
            embedding: config.embedding,
            max_retries: config.max_retries,
            backoff: Duration::from_secs(1),
        })
    }

    /// Override the base backoff delay (doubles on each retry).
    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }

    async fn post_json<B, T>(&self, url: &str, body: &B) -> Result<T, AiError>
    where
        B: Serialize + Sync,
        T: DeserializeOwned,
    {
        let mut last_err = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let delay = self.backoff * (1u32 << (attempt - 1).min(5));
                tokio::time::sleep(delay).await;
            }

            let resp = self
                .http
                .post(url)
                .query(&[("key", self.api_key.as_str())])
                .json(body)
                .send()
                .await;

            match resp {
                Ok(response) => {
                    let status = response.status();

                    if status.is_success() {
                        let bytes = response
                            .bytes()
                            .await
                            .map_err(|e| AiError::Transport(e.to_string()))?;
                        return serde_json::from_slice(&bytes)
                            .map_err(|e| AiError::MalformedResponse(e.to_string()));
                    }

                    let body_text = response.text().await.unwrap_or_default();
                    let err = AiError::Status {
                        status: status.as_u16(),
                        body: body_text,
                    };

                    if status.as_u16() == 429 || status.is_server_error() {
                        debug!(attempt, status = status.as_u16(), "retryable AI provider error");
                        last_err = Some(err);
                        continue;
                    }
                    return Err(err);
                }
                Err(e) => {
                    debug!(attempt, error = %e, "AI provider request failed");
                    last_err = Some(AiError::Transport(e.to_string()));
                    continue;
                }
            }
        }

        let err = last_err.unwrap_or_else(|| AiError::Transport("request failed after retries".into()));
        warn!(retries = self.max_retries, error = %err, "AI provider retries exhausted");
        Err(err)
    }

    async fn generate(&self, prompt: &str) -> Result<String, AiError> {
        let request = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part { text: prompt }],
            }],
        };
        let response: GenerateResponse = self.post_json(&self.generate_url, &request).await?;
        first_text(response)
    }
}

fn first_text(response: GenerateResponse) -> Result<String, AiError> {
    response
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content.parts.into_iter().next())
        .map(|p| p.text)
        .ok_or_else(|| AiError::MalformedResponse("no candidate text".into()))
}

/// Split a model's free-form tag list into clean tags.
///
/// Accepts comma- or newline-separated output, with or without list
/// bullets, numbering, `#` prefixes, or quotes.
pub fn parse_tags(raw: &str) -> Vec<String> {
    let cleaned = raw.split([',', '\n']).map(|piece| {
        let mut t = piece.trim();
        t = t.trim_start_matches(|c: char| matches!(c, '-' | '*' | '•'));
        let numbered = t.trim_start_matches(|c: char| c.is_ascii_digit());
        if numbered.len() < t.len() {
            if let Some(rest) = numbered.strip_prefix(['.', ')']) {
                t = rest;
            }
        }
        t.trim()
            .trim_start_matches('#')
            .trim_matches(|c: char| matches!(c, '"' | '\'' | '`') || c.is_whitespace())
            .to_string()
    });
    normalize_tags(cleaned)
}

#[async_trait]
impl AiClient for GeminiClient {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn summarize(&self, text: &str) -> Result<String, AiError> {
        self.generate(&format!("{}\n\n{}", SUMMARY_PROMPT, text)).await
    }

    async fn extract_tags(&self, text: &str) -> Result<Vec<String>, AiError> {
        let raw = self.generate(&format!("{}\n\n{}", TAGS_PROMPT, text)).await?;
        Ok(parse_tags(&raw))
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, AiError> {
        if let Some(offline) = embed_offline(self.embedding, text) {
            return offline;
        }
        let url = self
            .embed_url
            .as_deref()
            .ok_or_else(|| AiError::Transport("ai.embed_url is not configured".into()))?;
        let request = EmbedRequest {
            content: Content {
                parts: vec![Part { text }],
            },
        };
        let response: EmbedResponse = self.post_json(url, &request).await?;
        Ok(response.embedding.values)
    }

    async fn answer(&self, prompt: &str) -> Result<String, AiError> {
        self.generate(prompt).await
    }
}
