//! Hybrid search: keyword substring matching plus vector-similarity ranking.
//!
//! The search algorithm operates entirely through the [`DocumentStore`]
//! and [`AiClient`] traits, with no database or configuration dependencies.
//!
//! # Modes
//!
//! - **text**: case-insensitive substring match of the query against title,
//!   content, summary, and tags. Store-native order, no score, capped at
//!   [`SearchParams::text_match_limit`].
//! - **semantic**:
//!   1. Embed the query through the AI client.
//!   2. Load every document that carries an embedding.
//!   3. Score each by cosine similarity against the query vector.
//!   4. Sort by score (desc), then id (asc); keep `top_k`.
//!   5. Attach the first `top_k` text matches as fallback data.
//!
//! Semantic mode degrades to the text result set when no document has an
//! embedding or when the query cannot be embedded. Degradation is reported
//! in [`SearchResponse::degraded`], never as an error.

use std::fmt;
use std::str::FromStr;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::ai::AiClient;
use crate::error::ServiceError;
use crate::models::Document;
use crate::similarity::cosine_similarity;
use crate::store::{DocumentFilter, DocumentStore, SortOrder};

/// Maximum number of text-mode matches returned.
pub const DEFAULT_TEXT_MATCH_LIMIT: usize = 50;

/// `top_k` used when the caller gives none, zero, or a negative value.
pub const DEFAULT_TOP_K: usize = 5;

/// Retrieval strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchMode {
    Text,
    Semantic,
}

impl FromStr for SearchMode {
    type Err = ServiceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" => Ok(SearchMode::Text),
            "semantic" => Ok(SearchMode::Semantic),
            other => Err(ServiceError::validation(format!(
                "unknown search mode: {}. Use text or semantic.",
                other
            ))),
        }
    }
}

impl fmt::Display for SearchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SearchMode::Text => f.write_str("text"),
            SearchMode::Semantic => f.write_str("semantic"),
        }
    }
}

/// Retrieval tuning parameters, decoupled from application config.
#[derive(Debug, Clone)]
pub struct SearchParams {
    /// Cap on text-mode matches.
    pub text_match_limit: usize,
    /// `top_k` used when the request does not carry a positive one.
    pub default_top_k: usize,
}

impl Default for SearchParams {
    fn default() -> Self {
        Self {
            text_match_limit: DEFAULT_TEXT_MATCH_LIMIT,
            default_top_k: DEFAULT_TOP_K,
        }
    }
}

/// Bundles all inputs for a single search invocation.
#[derive(Debug, Clone)]
pub struct SearchRequest<'a> {
    pub query: &'a str,
    pub mode: SearchMode,
    /// Requested result count for semantic mode. Non-positive means default.
    pub top_k: Option<i64>,
}

/// One ranked result: the document plus its relevance in semantic mode.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchHit {
    #[serde(flatten)]
    pub document: Document,
    /// Cosine similarity to the query; absent in text mode.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub relevance: Option<f32>,
}

impl SearchHit {
    fn unscored(document: Document) -> Self {
        Self {
            document,
            relevance: None,
        }
    }
}

/// Why a semantic request was served from text matches instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Degradation {
    NoEmbeddings,
    QueryEmbeddingFailed,
}

/// Search output.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponse {
    /// The mode actually served.
    pub mode: SearchMode,
    pub results: Vec<SearchHit>,
    /// First `top_k` text matches, attached to every ranked semantic response.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback_text_matches: Option<Vec<Document>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub degraded: Option<Degradation>,
}

impl SearchResponse {
    fn empty(mode: SearchMode) -> Self {
        Self {
            mode,
            results: Vec::new(),
            fallback_text_matches: None,
            degraded: None,
        }
    }

    fn text(matches: Vec<Document>, degraded: Option<Degradation>) -> Self {
        Self {
            mode: SearchMode::Text,
            results: matches.into_iter().map(SearchHit::unscored).collect(),
            fallback_text_matches: None,
            degraded,
        }
    }
}

/// Clamp a requested `top_k` to a positive count.
pub fn resolve_top_k(top_k: Option<i64>, default: usize) -> usize {
    match top_k {
        Some(k) if k > 0 => usize::try_from(k).unwrap_or(default),
        _ => default,
    }
}

/// Case-insensitive substring matches in store-native order.
pub async fn text_matches<S>(store: &S, query: &str, limit: usize) -> Result<Vec<Document>>
where
    S: DocumentStore + ?Sized,
{
    store
        .find(&DocumentFilter {
            text: Some(query.to_string()),
            match_tags: true,
            limit: Some(limit),
            sort: SortOrder::Insertion,
            ..Default::default()
        })
        .await
}

/// Score `candidates` against `query_vec` and keep the best `top_k`.
///
/// Ordering is by score descending, then document id ascending, so equal
/// scores rank the same way on every run.
pub fn rank_by_similarity(query_vec: &[f32], candidates: Vec<Document>, top_k: usize) -> Vec<SearchHit> {
    let mut scored: Vec<SearchHit> = candidates
        .into_iter()
        .map(|doc| {
            let score = doc
                .embedding
                .as_deref()
                .map(|e| cosine_similarity(query_vec, e))
                .unwrap_or(0.0);
            SearchHit {
                document: doc,
                relevance: Some(score),
            }
        })
        .collect();

    scored.sort_by(|a, b| {
        let sa = a.relevance.unwrap_or(0.0);
        let sb = b.relevance.unwrap_or(0.0);
        sb.partial_cmp(&sa)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.document.id.cmp(&b.document.id))
    });
    scored.truncate(top_k);
    scored
}

/// Run a search against a [`DocumentStore`] backend.
///
/// This is the core search function that all frontends (CLI, HTTP) delegate
/// to. Only store failures are errors; AI failures degrade.
pub async fn search<S, A>(
    store: &S,
    ai: &A,
    req: &SearchRequest<'_>,
    params: &SearchParams,
) -> Result<SearchResponse>
where
    S: DocumentStore + ?Sized,
    A: AiClient + ?Sized,
{
    let query = req.query.trim();
    if query.is_empty() {
        return Ok(SearchResponse::empty(req.mode));
    }

    let text_results = text_matches(store, query, params.text_match_limit).await?;

    if req.mode == SearchMode::Text {
        return Ok(SearchResponse::text(text_results, None));
    }

    let top_k = resolve_top_k(req.top_k, params.default_top_k);

    let query_vec = match ai.embed(query).await {
        Ok(v) if !v.is_empty() => v,
        Ok(_) => {
            warn!(provider = ai.name(), "query embedding was empty; serving text matches");
            return Ok(SearchResponse::text(
                text_results,
                Some(Degradation::QueryEmbeddingFailed),
            ));
        }
        Err(e) => {
            warn!(provider = ai.name(), error = %e, "query embedding failed; serving text matches");
            return Ok(SearchResponse::text(
                text_results,
                Some(Degradation::QueryEmbeddingFailed),
            ));
        }
    };

    let candidates = store
        .find(&DocumentFilter {
            has_embedding: true,
            ..Default::default()
        })
        .await?;

    if candidates.is_empty() {
        info!("no documents have embeddings; serving text matches");
        return Ok(SearchResponse::text(text_results, Some(Degradation::NoEmbeddings)));
    }

    let mismatched = candidates
        .iter()
        .filter(|d| d.embedding.as_ref().map(Vec::len) != Some(query_vec.len()))
        .count();
    if mismatched > 0 {
        warn!(
            mismatched,
            query_dims = query_vec.len(),
            "embedding dimensionality differs from query; comparing overlapping prefix"
        );
    }

    let results = rank_by_similarity(&query_vec, candidates, top_k);
    let fallback: Vec<Document> = text_results.into_iter().take(top_k).collect();

    Ok(SearchResponse {
        mode: SearchMode::Semantic,
        results,
        fallback_text_matches: Some(fallback),
        degraded: None,
    })
}
