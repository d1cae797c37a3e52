//! Best-effort document augmentation.
//!
//! [`augment`] runs summarize, extract-tags, and (optionally) embed
//! concurrently against a document's content. Each step fails on its own:
//! a failing step is logged and contributes nothing, the others still land.
//!
//! [`apply_enrichment`] writes the result back. It re-reads the latest
//! persisted document and merges against that, so tags added by a
//! concurrent write are kept. Summary and embedding are last-write-wins.

use anyhow::Result;
use futures_util::future::join3;
use tracing::{debug, warn};

use crate::ai::AiClient;
use crate::error::AiError;
use crate::models::{merge_tags, normalize_tags, Document, DocumentUpdate};
use crate::store::DocumentStore;

/// Tuning for a single augmentation run.
#[derive(Debug, Clone)]
pub struct AugmentOptions {
    /// Request an embedding alongside summary and tags.
    pub embed: bool,
    /// Discard embeddings whose length differs from this.
    pub expected_dims: Option<usize>,
}

impl Default for AugmentOptions {
    fn default() -> Self {
        Self {
            embed: true,
            expected_dims: None,
        }
    }
}

/// Fields produced by a successful augmentation step. `None` = no result.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Enrichment {
    pub summary: Option<String>,
    pub tags: Option<Vec<String>>,
    pub embedding: Option<Vec<f32>>,
}

impl Enrichment {
    pub fn is_empty(&self) -> bool {
        self.summary.is_none() && self.tags.is_none() && self.embedding.is_none()
    }
}

/// What happened when an enrichment was written back.
#[derive(Debug, Clone, PartialEq)]
pub enum EnrichmentOutcome {
    /// New field values were written; carries the persisted document.
    Applied(Document),
    /// Nothing to write: every step failed or changed nothing.
    Unchanged,
    /// The document was deleted before the write.
    Deleted,
    /// The write itself failed.
    StoreFailed(String),
}

/// Run the augmentation steps for `doc` concurrently.
///
/// Never fails: provider errors are logged and the step yields `None`.
pub async fn augment<A>(ai: &A, doc: &Document, opts: &AugmentOptions) -> Enrichment
where
    A: AiClient + ?Sized,
{
    let text = doc.content.as_str();

    let embed_step = async {
        if opts.embed {
            Some(ai.embed(text).await)
        } else {
            None
        }
    };

    let (summary, tags, embedding) =
        join3(ai.summarize(text), ai.extract_tags(text), embed_step).await;

    let summary = match summary {
        Ok(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Ok(_) => {
            debug!(doc_id = %doc.id, "summarize returned empty text");
            None
        }
        Err(e) => step_failed(ai, doc, "summarize", &e),
    };

    let tags = match tags {
        Ok(raw) => {
            let tags = normalize_tags(raw);
            if tags.is_empty() {
                debug!(doc_id = %doc.id, "extract_tags returned no tags");
                None
            } else {
                Some(tags)
            }
        }
        Err(e) => step_failed(ai, doc, "extract_tags", &e),
    };

    let embedding = match embedding {
        None => None,
        Some(Ok(v)) if v.is_empty() => {
            debug!(doc_id = %doc.id, "embed returned an empty vector");
            None
        }
        Some(Ok(v)) => match opts.expected_dims {
            Some(dims) if v.len() != dims => {
                warn!(
                    doc_id = %doc.id,
                    provider = ai.name(),
                    expected = dims,
                    actual = v.len(),
                    "discarding embedding with unexpected dimensionality"
                );
                None
            }
            _ => Some(v),
        },
        Some(Err(e)) => step_failed(ai, doc, "embed", &e),
    };

    Enrichment {
        summary,
        tags,
        embedding,
    }
}

fn step_failed<A, T>(ai: &A, doc: &Document, step: &str, err: &AiError) -> Option<T>
where
    A: AiClient + ?Sized,
{
    warn!(
        doc_id = %doc.id,
        step,
        provider = ai.name(),
        error = %err,
        "augmentation step failed"
    );
    None
}

/// Merge `enrichment` into the latest persisted state of document `id`.
///
/// Only fields that actually change are written.
pub async fn apply_enrichment<S>(
    store: &S,
    id: &str,
    enrichment: &Enrichment,
) -> Result<EnrichmentOutcome>
where
    S: DocumentStore + ?Sized,
{
    if enrichment.is_empty() {
        return Ok(EnrichmentOutcome::Unchanged);
    }

    let Some(latest) = store.get(id).await? else {
        debug!(doc_id = id, "document deleted before enrichment was applied");
        return Ok(EnrichmentOutcome::Deleted);
    };

    let mut update = DocumentUpdate::default();

    if let Some(summary) = &enrichment.summary {
        if latest.summary.as_ref() != Some(summary) {
            update.summary = Some(summary.clone());
        }
    }
    if let Some(tags) = &enrichment.tags {
        let merged = merge_tags(&latest.tags, tags);
        if merged != latest.tags {
            update.tags = Some(merged);
        }
    }
    if let Some(embedding) = &enrichment.embedding {
        update.embedding = Some(embedding.clone());
    }

    if update.is_empty() {
        return Ok(EnrichmentOutcome::Unchanged);
    }

    match store.update_fields(id, &update).await? {
        Some(doc) => Ok(EnrichmentOutcome::Applied(doc)),
        None => Ok(EnrichmentOutcome::Deleted),
    }
}

/// Augment `doc` and write the result back, absorbing every failure.
pub async fn enrich_document<S, A>(
    store: &S,
    ai: &A,
    doc: &Document,
    opts: &AugmentOptions,
) -> EnrichmentOutcome
where
    S: DocumentStore + ?Sized,
    A: AiClient + ?Sized,
{
    let enrichment = augment(ai, doc, opts).await;
    match apply_enrichment(store, &doc.id, &enrichment).await {
        Ok(outcome) => {
            debug!(doc_id = %doc.id, outcome = outcome_label(&outcome), "enrichment finished");
            outcome
        }
        Err(e) => {
            warn!(doc_id = %doc.id, error = %e, "failed to persist enrichment");
            EnrichmentOutcome::StoreFailed(e.to_string())
        }
    }
}

fn outcome_label(outcome: &EnrichmentOutcome) -> &'static str {
    match outcome {
        EnrichmentOutcome::Applied(_) => "applied",
        EnrichmentOutcome::Unchanged => "unchanged",
        EnrichmentOutcome::Deleted => "deleted",
        EnrichmentOutcome::StoreFailed(_) => "store_failed",
    }
}
