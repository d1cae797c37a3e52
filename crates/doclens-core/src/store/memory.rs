//! In-memory [`DocumentStore`] implementation for tests and embedding.
//!
//! Documents live in a `Vec` behind a `std::sync::RwLock`, so native order
//! is insertion order. Filtering is a linear scan using
//! [`DocumentFilter::matches`].

use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use chrono::Utc;

use crate::models::{Document, DocumentUpdate};

use super::{DocumentFilter, DocumentStore, SortOrder};

/// In-memory document store.
pub struct InMemoryStore {
    docs: RwLock<Vec<Document>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            docs: RwLock::new(Vec::new()),
        }
    }

    /// Number of stored documents.
    pub fn len(&self) -> usize {
        self.docs.read().map(|d| d.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Vec<Document>>> {
        self.docs
            .read()
            .map_err(|_| anyhow!("in-memory store lock poisoned"))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Vec<Document>>> {
        self.docs
            .write()
            .map_err(|_| anyhow!("in-memory store lock poisoned"))
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DocumentStore for InMemoryStore {
    async fn insert(&self, doc: &Document) -> Result<()> {
        let mut docs = self.write()?;
        if docs.iter().any(|d| d.id == doc.id) {
            bail!("document {} already exists", doc.id);
        }
        docs.push(doc.clone());
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Option<Document>> {
        Ok(self.read()?.iter().find(|d| d.id == id).cloned())
    }

    async fn find(&self, filter: &DocumentFilter) -> Result<Vec<Document>> {
        let docs = self.read()?;
        let mut matched: Vec<Document> = docs.iter().filter(|d| filter.matches(d)).cloned().collect();

        if filter.sort == SortOrder::UpdatedDesc {
            matched.sort_by(|a, b| b.updated_at.cmp(&a.updated_at).then(a.id.cmp(&b.id)));
        }

        let limit = filter.limit.unwrap_or(usize::MAX);
        Ok(matched.into_iter().skip(filter.skip).take(limit).collect())
    }

    async fn update_fields(&self, id: &str, update: &DocumentUpdate) -> Result<Option<Document>> {
        let mut docs = self.write()?;
        let Some(doc) = docs.iter_mut().find(|d| d.id == id) else {
            return Ok(None);
        };
        if !update.is_empty() {
            update.apply_to(doc);
            doc.updated_at = Utc::now();
        }
        Ok(Some(doc.clone()))
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        let mut docs = self.write()?;
        let before = docs.len();
        docs.retain(|d| d.id != id);
        Ok(docs.len() != before)
    }
}
