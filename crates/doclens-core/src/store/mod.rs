//! Storage abstraction for DocLens.
//!
//! The [`DocumentStore`] trait is the minimal query contract the core needs:
//! insert, find-by-id, filtered find, field update, and delete. It enables
//! pluggable backends (SQLite in the app crate, in-memory here).
//!
//! Implementations must be `Send + Sync` to work with async runtimes.

pub mod memory;

use anyhow::Result;
use async_trait::async_trait;

use crate::models::{Document, DocumentUpdate};

/// Result ordering for [`DocumentStore::find`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    /// The store's native order (insertion order).
    #[default]
    Insertion,
    /// Most recently updated first; ties broken by id ascending.
    UpdatedDesc,
}

/// Filter for [`DocumentStore::find`]. All set conditions must hold.
#[derive(Debug, Clone, Default)]
pub struct DocumentFilter {
    /// Case-insensitive substring matched against title, content, and
    /// summary (and tags, when `match_tags` is set).
    pub text: Option<String>,
    /// Also match `text` against each tag.
    pub match_tags: bool,
    /// Exact tag equality.
    pub tag: Option<String>,
    /// Only documents that carry an embedding.
    pub has_embedding: bool,
    /// Number of matching documents to skip.
    pub skip: usize,
    /// Maximum number of documents to return.
    pub limit: Option<usize>,
    pub sort: SortOrder,
}

impl DocumentFilter {
    /// Filter matching every document, in native order.
    pub fn all() -> Self {
        Self::default()
    }

    /// Whether `doc` satisfies the predicate part of this filter
    /// (ignores skip, limit, and sort).
    pub fn matches(&self, doc: &Document) -> bool {
        if self.has_embedding && doc.embedding.is_none() {
            return false;
        }
        if let Some(tag) = &self.tag {
            if !doc.tags.iter().any(|t| t == tag) {
                return false;
            }
        }
        if let Some(text) = &self.text {
            let needle = text.to_lowercase();
            let contains = |s: &str| s.to_lowercase().contains(&needle);
            let hit = contains(&doc.title)
                || contains(&doc.content)
                || doc.summary.as_deref().map(contains).unwrap_or(false)
                || (self.match_tags && doc.tags.iter().any(|t| contains(t)));
            if !hit {
                return false;
            }
        }
        true
    }
}

/// Abstract document storage backend.
///
/// # Operations
///
/// | Method | Purpose |
/// |--------|---------|
/// | [`insert`](DocumentStore::insert) | Persist a new document |
/// | [`get`](DocumentStore::get) | Fetch a document by id |
/// | [`find`](DocumentStore::find) | Filtered, paginated, sorted listing |
/// | [`update_fields`](DocumentStore::update_fields) | Write selected fields |
/// | [`delete`](DocumentStore::delete) | Hard delete by id |
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Persist a new document.
    async fn insert(&self, doc: &Document) -> Result<()>;

    /// Fetch a document by id.
    async fn get(&self, id: &str) -> Result<Option<Document>>;

    /// List documents matching `filter`.
    async fn find(&self, filter: &DocumentFilter) -> Result<Vec<Document>>;

    /// Write the `Some` fields of `update` and bump `updated_at`.
    ///
    /// Returns the updated document, or `None` if it does not exist.
    async fn update_fields(&self, id: &str, update: &DocumentUpdate) -> Result<Option<Document>>;

    /// Delete a document. Returns whether it existed.
    async fn delete(&self, id: &str) -> Result<bool>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NewDocument;

    fn doc(title: &str, content: &str, tags: &[&str]) -> Document {
        Document::new(
            NewDocument {
                title: title.into(),
                content: content.into(),
                tags: tags.iter().map(|t| t.to_string()).collect(),
            },
            "u",
        )
    }

    #[test]
    fn test_filter_text_case_insensitive() {
        let d = doc("Alpha Release", "notes", &[]);
        let f = DocumentFilter {
            text: Some("aLpHa".into()),
            ..Default::default()
        };
        assert!(f.matches(&d));
    }

    #[test]
    fn test_filter_text_tags_only_when_enabled() {
        let d = doc("t", "c", &["kubernetes"]);
        let mut f = DocumentFilter {
            text: Some("kube".into()),
            ..Default::default()
        };
        assert!(!f.matches(&d));
        f.match_tags = true;
        assert!(f.matches(&d));
    }

    #[test]
    fn test_filter_tag_equality() {
        let d = doc("t", "c", &["rust"]);
        let f = DocumentFilter {
            tag: Some("rus".into()),
            ..Default::default()
        };
        assert!(!f.matches(&d));
    }

    #[test]
    fn test_filter_summary_and_embedding() {
        let mut d = doc("t", "c", &[]);
        d.summary = Some("Mentions Deployment".into());
        let f = DocumentFilter {
            text: Some("deploy".into()),
            has_embedding: true,
            ..Default::default()
        };
        assert!(!f.matches(&d));
        d.embedding = Some(vec![1.0]);
        assert!(f.matches(&d));
    }
}
