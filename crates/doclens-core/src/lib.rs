//! # DocLens Core
//!
//! Shared, runtime-agnostic logic for DocLens: document models, the store
//! abstraction, the AI client trait, the augmentation pipeline, the local
//! embedding fallback, cosine similarity, hybrid search, and Q&A.
//!
//! This crate contains no tokio, sqlx, HTTP, or filesystem dependencies.
//! Concrete stores and AI clients live in the `doclens` app crate.

pub mod ai;
pub mod augment;
pub mod embedding;
pub mod error;
pub mod models;
pub mod qa;
pub mod search;
pub mod similarity;
pub mod store;
