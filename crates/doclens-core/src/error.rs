//! Error types shared by the core and its callers.
//!
//! [`ServiceError`] is what callers of the document service see. Recoverable
//! provider faults are [`AiError`]s; the augmentation, search, and Q&A paths
//! absorb them and never turn them into a [`ServiceError`].

use thiserror::Error;

/// Errors surfaced to callers of document operations.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// A required field is missing or blank, or a parameter is malformed.
    #[error("invalid request: {0}")]
    Validation(String),

    #[error("not found: {0}")]
    NotFound(String),

    /// The actor is neither the owner nor an admin.
    #[error("not allowed")]
    Forbidden,

    /// The store failed.
    #[error("store error: {0}")]
    Store(#[from] anyhow::Error),
}

impl ServiceError {
    pub fn validation(message: impl Into<String>) -> Self {
        ServiceError::Validation(message.into())
    }

    pub fn not_found(id: &str) -> Self {
        ServiceError::NotFound(format!("document {}", id))
    }
}

pub type ServiceResult<T> = std::result::Result<T, ServiceError>;

/// Failure of a single AI provider call.
#[derive(Debug, Error)]
pub enum AiError {
    #[error("AI provider is disabled")]
    Disabled,

    #[error("AI request failed: {0}")]
    Transport(String),

    #[error("AI provider returned {status}: {body}")]
    Status { status: u16, body: String },

    /// The response did not have the expected shape.
    #[error("malformed AI response: {0}")]
    MalformedResponse(String),

    #[error("AI call timed out after {0}s")]
    Timeout(u64),
}
