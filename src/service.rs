//! Document operations shared by the CLI and the HTTP server.
//!
//! [`DocumentService`] owns the store and the AI client. Writes that change
//! a document's content spawn a detached enrichment task; callers get an
//! [`EnrichmentTask`] handle they can await or drop. Dropping it does not
//! cancel the enrichment.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use doclens_core::ai::AiClient;
use doclens_core::augment::{enrich_document, AugmentOptions, EnrichmentOutcome};
use doclens_core::error::{ServiceError, ServiceResult};
use doclens_core::models::{
    merge_tags, normalize_tags, Actor, Document, DocumentPatch, DocumentUpdate, NewDocument,
};
use doclens_core::qa;
use doclens_core::search::{self, SearchParams, SearchRequest, SearchResponse};
use doclens_core::store::{DocumentFilter, DocumentStore, SortOrder};

use crate::config::{Config, EmbeddingSource};
use crate::sqlite_store::SqliteStore;
use crate::{ai, db, migrate};

pub const DEFAULT_PAGE_SIZE: usize = 20;
pub const MAX_PAGE_SIZE: usize = 100;

/// Behavior switches for [`DocumentService`].
#[derive(Debug, Clone)]
pub struct ServiceOptions {
    /// Spawn enrichment after create and content-changing update.
    pub augment_enabled: bool,
    pub augment: AugmentOptions,
    pub search: SearchParams,
}

impl Default for ServiceOptions {
    fn default() -> Self {
        Self {
            augment_enabled: true,
            augment: AugmentOptions::default(),
            search: SearchParams::default(),
        }
    }
}

impl ServiceOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            augment_enabled: config.augment.enabled,
            augment: AugmentOptions {
                embed: config.ai.embedding != EmbeddingSource::Disabled,
                expected_dims: config.ai.embedding_dims,
            },
            search: config.search.params(),
        }
    }
}

/// Handle to a detached enrichment run.
#[derive(Debug)]
pub struct EnrichmentTask {
    handle: Option<JoinHandle<EnrichmentOutcome>>,
}

impl EnrichmentTask {
    /// A task that was never started.
    pub fn skipped() -> Self {
        Self { handle: None }
    }

    pub fn is_scheduled(&self) -> bool {
        self.handle.is_some()
    }

    /// Wait for the enrichment to finish. A skipped task is `Unchanged`.
    pub async fn wait(self) -> EnrichmentOutcome {
        match self.handle {
            None => EnrichmentOutcome::Unchanged,
            Some(handle) => match handle.await {
                Ok(outcome) => outcome,
                Err(e) => {
                    warn!(error = %e, "enrichment task did not complete");
                    EnrichmentOutcome::StoreFailed(e.to_string())
                }
            },
        }
    }
}

/// Listing parameters for [`DocumentService::list`].
#[derive(Debug, Clone, Default)]
pub struct ListQuery {
    /// Exact tag.
    pub tag: Option<String>,
    /// Case-insensitive substring of title, content, or summary.
    pub text: Option<String>,
    /// 1-based page number.
    pub page: Option<usize>,
    pub limit: Option<usize>,
}

#[derive(Clone)]
pub struct DocumentService {
    store: Arc<dyn DocumentStore>,
    ai: Arc<dyn AiClient>,
    options: ServiceOptions,
}

fn require_text(field: &str, value: &str) -> ServiceResult<()> {
    if value.trim().is_empty() {
        return Err(ServiceError::validation(format!("{} is required", field)));
    }
    Ok(())
}

impl DocumentService {
    pub fn new(store: Arc<dyn DocumentStore>, ai: Arc<dyn AiClient>, options: ServiceOptions) -> Self {
        Self { store, ai, options }
    }

    /// Connect to the configured database, apply migrations, and build the
    /// configured AI client.
    pub async fn open(config: &Config) -> anyhow::Result<Self> {
        let pool = db::connect(config).await?;
        migrate::migrate_pool(&pool).await?;
        let ai = ai::create_client(&config.ai)?;
        debug!(
            db = %config.db.path.display(),
            provider = ai.name(),
            embedding = ?config.ai.embedding,
            "document service ready"
        );
        Ok(Self::new(
            Arc::new(SqliteStore::new(pool)),
            ai,
            ServiceOptions::from_config(config),
        ))
    }

    fn spawn_enrichment(&self, doc: &Document) -> EnrichmentTask {
        if !self.options.augment_enabled {
            return EnrichmentTask::skipped();
        }
        let store = Arc::clone(&self.store);
        let ai = Arc::clone(&self.ai);
        let opts = self.options.augment.clone();
        let doc = doc.clone();
        debug!(doc_id = %doc.id, "scheduling enrichment");
        let handle = tokio::spawn(async move {
            enrich_document(store.as_ref(), ai.as_ref(), &doc, &opts).await
        });
        EnrichmentTask {
            handle: Some(handle),
        }
    }

    async fn load(&self, id: &str) -> ServiceResult<Document> {
        self.store
            .get(id)
            .await?
            .ok_or_else(|| ServiceError::not_found(id))
    }

    /// Validate and store a new document, then schedule its enrichment.
    pub async fn create(
        &self,
        actor: &Actor,
        input: NewDocument,
    ) -> ServiceResult<(Document, EnrichmentTask)> {
        require_text("title", &input.title)?;
        require_text("content", &input.content)?;

        let doc = Document::new(input, actor.id.clone());
        self.store.insert(&doc).await?;
        info!(doc_id = %doc.id, owner = %doc.owner, "document created");

        let task = self.spawn_enrichment(&doc);
        Ok((doc, task))
    }

    pub async fn get(&self, id: &str) -> ServiceResult<Document> {
        self.load(id).await
    }

    /// Most recently updated first.
    pub async fn list(&self, query: &ListQuery) -> ServiceResult<Vec<Document>> {
        let limit = query
            .limit
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .clamp(1, MAX_PAGE_SIZE);
        let page = query.page.unwrap_or(1).max(1);

        let filter = DocumentFilter {
            text: query
                .text
                .as_deref()
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(String::from),
            tag: query
                .tag
                .as_deref()
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(String::from),
            skip: (page - 1) * limit,
            limit: Some(limit),
            sort: SortOrder::UpdatedDesc,
            ..Default::default()
        };
        Ok(self.store.find(&filter).await?)
    }

    /// Apply a partial update. Only the owner or an admin may update.
    ///
    /// Enrichment is re-run only when the content actually changed.
    pub async fn update(
        &self,
        actor: &Actor,
        id: &str,
        patch: DocumentPatch,
    ) -> ServiceResult<(Document, EnrichmentTask)> {
        let existing = self.load(id).await?;
        if !actor.can_modify(&existing) {
            return Err(ServiceError::Forbidden);
        }

        if let Some(title) = &patch.title {
            require_text("title", title)?;
        }
        if let Some(content) = &patch.content {
            require_text("content", content)?;
        }

        let content_changed = patch
            .content
            .as_ref()
            .map(|c| *c != existing.content)
            .unwrap_or(false);

        let update = DocumentUpdate {
            title: patch.title,
            content: patch.content,
            tags: patch.tags.map(normalize_tags),
            ..Default::default()
        };
        if update.is_empty() {
            return Ok((existing, EnrichmentTask::skipped()));
        }

        let doc = self
            .store
            .update_fields(id, &update)
            .await?
            .ok_or_else(|| ServiceError::not_found(id))?;
        info!(doc_id = %doc.id, content_changed, "document updated");

        let task = if content_changed {
            self.spawn_enrichment(&doc)
        } else {
            EnrichmentTask::skipped()
        };
        Ok((doc, task))
    }

    /// Hard delete. Only the owner or an admin may delete.
    pub async fn delete(&self, actor: &Actor, id: &str) -> ServiceResult<()> {
        let existing = self.load(id).await?;
        if !actor.can_modify(&existing) {
            return Err(ServiceError::Forbidden);
        }
        if !self.store.delete(id).await? {
            return Err(ServiceError::not_found(id));
        }
        info!(doc_id = id, "document deleted");
        Ok(())
    }

    /// Regenerate the summary now. A failing provider leaves the document as is.
    pub async fn summarize_now(&self, id: &str) -> ServiceResult<Document> {
        let doc = self.load(id).await?;
        let summary = match self.ai.summarize(&doc.content).await {
            Ok(s) if !s.trim().is_empty() => s.trim().to_string(),
            Ok(_) => return Ok(doc),
            Err(e) => {
                warn!(doc_id = id, provider = self.ai.name(), error = %e, "summarize failed");
                return Ok(doc);
            }
        };
        let update = DocumentUpdate {
            summary: Some(summary),
            ..Default::default()
        };
        Ok(self.store.update_fields(id, &update).await?.unwrap_or(doc))
    }

    /// Extract tags now and merge them into the existing tags.
    pub async fn generate_tags_now(&self, id: &str) -> ServiceResult<Document> {
        let doc = self.load(id).await?;
        let extracted = match self.ai.extract_tags(&doc.content).await {
            Ok(tags) => normalize_tags(tags),
            Err(e) => {
                warn!(doc_id = id, provider = self.ai.name(), error = %e, "tag extraction failed");
                return Ok(doc);
            }
        };
        let merged = merge_tags(&doc.tags, &extracted);
        if merged == doc.tags {
            return Ok(doc);
        }
        let update = DocumentUpdate {
            tags: Some(merged),
            ..Default::default()
        };
        Ok(self.store.update_fields(id, &update).await?.unwrap_or(doc))
    }

    pub async fn search(&self, request: &SearchRequest<'_>) -> ServiceResult<SearchResponse> {
        Ok(search::search(
            self.store.as_ref(),
            self.ai.as_ref(),
            request,
            &self.options.search,
        )
        .await?)
    }

    /// Answer a question over the whole corpus.
    pub async fn answer(&self, question: &str) -> ServiceResult<String> {
        require_text("question", question)?;
        let corpus = self.store.find(&DocumentFilter::all()).await?;
        Ok(qa::answer(self.ai.as_ref(), question.trim(), &corpus).await)
    }
}
