//! CLI command implementations.
//!
//! Each `run_*` function opens the service from config, performs one
//! operation, and prints to stdout. With `json` set the output is the same
//! JSON the HTTP API returns.

use std::path::Path;

use anyhow::{bail, Result};
use serde::Serialize;

use doclens_core::augment::EnrichmentOutcome;
use doclens_core::models::{Actor, Document, NewDocument};
use doclens_core::search::{SearchMode, SearchRequest, SearchResponse};

use crate::config::Config;
use crate::service::{DocumentService, ListQuery};

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_document(doc: &Document) {
    println!("--- Document ---");
    println!("id:         {}", doc.id);
    println!("title:      {}", doc.title);
    println!("owner:      {}", doc.owner);
    println!("tags:       {}", doc.tags.join(", "));
    println!("created_at: {}", doc.created_at.to_rfc3339());
    println!("updated_at: {}", doc.updated_at.to_rfc3339());
    if let Some(embedding) = &doc.embedding {
        println!("embedding:  {} dims", embedding.len());
    }
    if let Some(summary) = &doc.summary {
        println!();
        println!("--- Summary ---");
        println!("{}", summary);
    }
    println!();
    println!("--- Content ---");
    println!("{}", doc.content);
}

/// Parameters for [`run_add`].
pub struct AddArgs<'a> {
    pub title: &'a str,
    pub content: Option<&'a str>,
    pub content_file: Option<&'a Path>,
    pub tags: Vec<String>,
    pub user: &'a str,
    pub json: bool,
}

/// Create a document and wait for its enrichment before exiting.
pub async fn run_add(config: &Config, args: AddArgs<'_>) -> Result<()> {
    let content = match (args.content, args.content_file) {
        (Some(c), None) => c.to_string(),
        (None, Some(path)) => std::fs::read_to_string(path)?,
        (Some(_), Some(_)) => bail!("pass either --content or --content-file, not both"),
        (None, None) => bail!("one of --content or --content-file is required"),
    };

    let service = DocumentService::open(config).await?;
    let (doc, task) = service
        .create(
            &Actor::user(args.user),
            NewDocument {
                title: args.title.to_string(),
                content,
                tags: args.tags,
            },
        )
        .await?;

    // The process exits after this command, so the enrichment is awaited.
    let doc = match task.wait().await {
        EnrichmentOutcome::Applied(enriched) => enriched,
        _ => doc,
    };

    if args.json {
        return print_json(&doc);
    }
    println!("Created document {}", doc.id);
    if !doc.tags.is_empty() {
        println!("tags: {}", doc.tags.join(", "));
    }
    if let Some(summary) = &doc.summary {
        println!("summary: {}", summary);
    }
    Ok(())
}

pub async fn run_get(config: &Config, id: &str, json: bool) -> Result<()> {
    let service = DocumentService::open(config).await?;
    let doc = service.get(id).await?;
    if json {
        return print_json(&doc);
    }
    print_document(&doc);
    Ok(())
}

pub async fn run_list(config: &Config, query: ListQuery, json: bool) -> Result<()> {
    let service = DocumentService::open(config).await?;
    let docs = service.list(&query).await?;
    if json {
        return print_json(&docs);
    }
    if docs.is_empty() {
        println!("No documents.");
        return Ok(());
    }
    for doc in &docs {
        println!(
            "{}  {}  [{}]  {}",
            doc.id,
            doc.updated_at.format("%Y-%m-%d %H:%M"),
            doc.tags.join(", "),
            doc.title
        );
    }
    Ok(())
}

fn print_search(resp: &SearchResponse) {
    if let Some(reason) = resp.degraded {
        println!("(semantic search unavailable: {:?}; showing text matches)", reason);
    }
    if resp.results.is_empty() {
        println!("No results.");
        return;
    }
    for (i, hit) in resp.results.iter().enumerate() {
        match hit.relevance {
            Some(score) => println!("{}. [{:.4}] {}", i + 1, score, hit.document.title),
            None => println!("{}. {}", i + 1, hit.document.title),
        }
        if let Some(summary) = &hit.document.summary {
            println!("    {}", summary);
        }
        println!("    id: {}", hit.document.id);
    }
    if let Some(fallback) = &resp.fallback_text_matches {
        if !fallback.is_empty() {
            println!();
            println!("Text matches:");
            for doc in fallback {
                println!("  - {} ({})", doc.title, doc.id);
            }
        }
    }
}

pub async fn run_search(
    config: &Config,
    query: &str,
    mode: &str,
    top_k: Option<i64>,
    json: bool,
) -> Result<()> {
    let mode: SearchMode = mode.parse()?;
    let service = DocumentService::open(config).await?;
    let resp = service
        .search(&SearchRequest { query, mode, top_k })
        .await?;
    if json {
        return print_json(&resp);
    }
    print_search(&resp);
    Ok(())
}

pub async fn run_ask(config: &Config, question: &str) -> Result<()> {
    let service = DocumentService::open(config).await?;
    println!("{}", service.answer(question).await?);
    Ok(())
}

pub async fn run_delete(config: &Config, id: &str, actor: &Actor) -> Result<()> {
    let service = DocumentService::open(config).await?;
    service.delete(actor, id).await?;
    println!("Deleted document {}", id);
    Ok(())
}
