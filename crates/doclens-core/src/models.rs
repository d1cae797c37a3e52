//! Core data models used throughout DocLens.
//!
//! A [`Document`] is created from raw caller input ([`NewDocument`]) and is
//! valid from the moment it is persisted. Enrichment later fills in
//! `summary`, extends `tags`, and attaches an `embedding`, but none of those
//! fields are ever required for the document to be served.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A stored document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    /// Document UUID.
    pub id: String,
    pub title: String,
    pub content: String,
    /// Deduplicated, order-preserving tag list.
    #[serde(default)]
    pub tags: Vec<String>,
    /// AI-generated summary, absent until enrichment succeeds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    /// Embedding vector, absent until enrichment succeeds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,
    /// Id of the user that created the document.
    pub owner: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Document {
    /// Build a fresh document with a new id and both timestamps set to now.
    ///
    /// Tags are normalized; title and content are stored as given and are
    /// expected to have been validated by the caller.
    pub fn new(input: NewDocument, owner: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            title: input.title,
            content: input.content,
            tags: normalize_tags(input.tags),
            summary: None,
            embedding: None,
            owner: owner.into(),
            created_at: now,
            updated_at: now,
        }
    }
}

/// Caller input for creating a document.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewDocument {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Caller input for updating a document. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DocumentPatch {
    pub title: Option<String>,
    pub content: Option<String>,
    pub tags: Option<Vec<String>>,
}

/// Field-level update handed to a store.
///
/// Only `Some` fields are written. Stores also bump `updated_at` on every
/// non-empty update.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DocumentUpdate {
    pub title: Option<String>,
    pub content: Option<String>,
    pub tags: Option<Vec<String>>,
    pub summary: Option<String>,
    pub embedding: Option<Vec<f32>>,
}

impl DocumentUpdate {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.content.is_none()
            && self.tags.is_none()
            && self.summary.is_none()
            && self.embedding.is_none()
    }

    /// Apply this update to an in-memory document.
    pub fn apply_to(&self, doc: &mut Document) {
        if let Some(title) = &self.title {
            doc.title = title.clone();
        }
        if let Some(content) = &self.content {
            doc.content = content.clone();
        }
        if let Some(tags) = &self.tags {
            doc.tags = tags.clone();
        }
        if let Some(summary) = &self.summary {
            doc.summary = Some(summary.clone());
        }
        if let Some(embedding) = &self.embedding {
            doc.embedding = Some(embedding.clone());
        }
    }
}

/// Role of the caller performing a write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    User,
    Admin,
}

/// Identity of the caller, as asserted by the outer layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub id: String,
    pub role: Role,
}

impl Actor {
    pub fn user(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            role: Role::User,
        }
    }

    pub fn admin(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            role: Role::Admin,
        }
    }

    /// Owners may modify their own documents; admins may modify any.
    pub fn can_modify(&self, doc: &Document) -> bool {
        self.role == Role::Admin || self.id == doc.owner
    }
}

/// Trim tags, drop blanks, and remove duplicates keeping first occurrences.
pub fn normalize_tags<I, S>(tags: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut out: Vec<String> = Vec::new();
    for tag in tags {
        let tag = tag.as_ref().trim();
        if tag.is_empty() || out.iter().any(|t| t == tag) {
            continue;
        }
        out.push(tag.to_string());
    }
    out
}

/// Union of `existing` and `extracted`, existing tags first.
pub fn merge_tags(existing: &[String], extracted: &[String]) -> Vec<String> {
    normalize_tags(existing.iter().chain(extracted.iter()))
}
