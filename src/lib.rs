//! # DocLens
//!
//! A document store that augments every document with an AI summary,
//! keyword tags, and an embedding, and serves text and semantic search plus
//! question answering over the corpus.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌──────────────────┐   ┌──────────┐
//! │ CLI/HTTP │──▶│ DocumentService  │──▶│  SQLite   │
//! └──────────┘   │ augment · search │   └──────────┘
//!                │ qa               │   ┌──────────┐
//!                └────────┬─────────┘──▶│ AiClient │
//!                         │             │ Gemini / │
//!                         ▼             │ disabled │
//!                  tokio::spawn         └──────────┘
//!                  (enrichment)
//! ```
//!
//! The algorithms live in `doclens-core`; this crate supplies storage,
//! provider clients, configuration, and the two frontends.
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema migrations |
//! | [`sqlite_store`] | SQLite `DocumentStore` |
//! | [`ai`] | Gemini, disabled, and timeout-guarded AI clients |
//! | [`service`] | Document operations and background enrichment |
//! | [`server`] | HTTP API |
//! | [`commands`] | CLI command implementations |
//! | [`logging`] | `tracing` subscriber setup |

pub mod ai;
pub mod commands;
pub mod config;
pub mod db;
pub mod logging;
pub mod migrate;
pub mod server;
pub mod service;
pub mod sqlite_store;
