//! End-to-end tests for the HTTP API: a real server on an ephemeral port,
//! a temp SQLite database, and a deterministic in-process AI client.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use tempfile::TempDir;

use doclens::config::Config;
use doclens::service::{DocumentService, ServiceOptions};
use doclens::sqlite_store::SqliteStore;
use doclens::{db, migrate, server};
use doclens_core::ai::AiClient;
use doclens_core::embedding::local_embed;
use doclens_core::error::AiError;

/// Summaries echo the first words; tags are the capitalized words.
struct EchoAi;

#[async_trait]
impl AiClient for EchoAi {
    fn name(&self) -> &str {
        "echo"
    }

    async fn summarize(&self, text: &str) -> Result<String, AiError> {
        let head: Vec<&str> = text.split_whitespace().take(3).collect();
        Ok(format!("About: {}", head.join(" ")))
    }

    async fn extract_tags(&self, text: &str) -> Result<Vec<String>, AiError> {
        Ok(text
            .split_whitespace()
            .filter(|w| w.chars().next().map(char::is_uppercase).unwrap_or(false))
            .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()).to_lowercase())
            .collect())
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, AiError> {
        Ok(local_embed(text))
    }

    async fn answer(&self, prompt: &str) -> Result<String, AiError> {
        let docs = prompt.matches("\n\n").count();
        Ok(format!("answered with {} blocks", docs))
    }
}

struct TestServer {
    _tmp: TempDir,
    base: String,
    http: reqwest::Client,
}

impl TestServer {
    async fn start() -> Self {
        let tmp = TempDir::new().unwrap();
        let config = Config::minimal(tmp.path().join("http.sqlite"));
        let pool = db::connect(&config).await.unwrap();
        migrate::migrate_pool(&pool).await.unwrap();

        let service = DocumentService::new(
            Arc::new(SqliteStore::new(pool)),
            Arc::new(EchoAi),
            ServiceOptions::from_config(&config),
        );

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        tokio::spawn(async move {
            server::serve(listener, service).await.unwrap();
        });

        Self {
            _tmp: tmp,
            base,
            http: reqwest::Client::new(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    async fn create(&self, user: &str, body: Value) -> reqwest::Response {
        self.http
            .post(self.url("/docs"))
            .header("x-user-id", user)
            .json(&body)
            .send()
            .await
            .unwrap()
    }

    async fn get_doc(&self, id: &str) -> reqwest::Response {
        self.http
            .get(self.url(&format!("/docs/{}", id)))
            .send()
            .await
            .unwrap()
    }

    /// Poll until background enrichment has written an embedding.
    async fn wait_enriched(&self, id: &str) -> Value {
        for _ in 0..100 {
            let doc: Value = self.get_doc(id).await.json().await.unwrap();
            if doc.get("embedding").is_some() && doc.get("summary").is_some() {
                return doc;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        panic!("document {} was never enriched", id);
    }
}

#[tokio::test]
async fn test_health() {
    let srv = TestServer::start().await;
    let resp = srv.http.get(srv.url("/health")).send().await.unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_create_then_enriched_in_background() {
    let srv = TestServer::start().await;
    let resp = srv
        .create(
            "alice",
            json!({"title": "Rust", "content": "Ownership in Rust and Cargo", "tags": ["manual"]}),
        )
        .await;
    assert_eq!(resp.status(), 201);
    let created: Value = resp.json().await.unwrap();
    assert_eq!(created["owner"], "alice");
    let id = created["id"].as_str().unwrap().to_string();

    let doc = srv.wait_enriched(&id).await;
    assert_eq!(doc["summary"], "About: Ownership in Rust");
    assert_eq!(doc["tags"], json!(["manual", "ownership", "rust", "cargo"]));
    assert_eq!(doc["embedding"].as_array().unwrap().len(), 64);
}

#[tokio::test]
async fn test_error_contract() {
    let srv = TestServer::start().await;

    let resp = srv.create("alice", json!({"content": "no title"})).await;
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "bad_request");

    let resp = srv
        .http
        .post(srv.url("/docs"))
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);

    let resp = srv.get_doc("does-not-exist").await;
    assert_eq!(resp.status(), 404);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "not_found");
}

#[tokio::test]
async fn test_update_delete_ownership() {
    let srv = TestServer::start().await;
    let created: Value = srv
        .create("alice", json!({"title": "Mine", "content": "body"}))
        .await
        .json()
        .await
        .unwrap();
    let id = created["id"].as_str().unwrap();
    let path = srv.url(&format!("/docs/{}", id));

    let resp = srv
        .http
        .put(&path)
        .header("x-user-id", "mallory")
        .json(&json!({"title": "Stolen"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 403);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "forbidden");

    let resp = srv
        .http
        .put(&path)
        .header("x-user-id", "root")
        .header("x-user-role", "admin")
        .json(&json!({"title": "Renamed"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["title"], "Renamed");

    let resp = srv
        .http
        .delete(&path)
        .header("x-user-id", "mallory")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 403);

    let resp = srv
        .http
        .delete(&path)
        .header("x-user-id", "alice")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["success"], true);

    assert_eq!(srv.get_doc(id).await.status(), 404);
}

#[tokio::test]
async fn test_list_filters() {
    let srv = TestServer::start().await;
    srv.create("a", json!({"title": "One", "content": "first", "tags": ["x"]}))
        .await;
    srv.create("a", json!({"title": "Two", "content": "second", "tags": ["y"]}))
        .await;

    let docs: Vec<Value> = srv
        .http
        .get(srv.url("/docs?tag=x"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(docs.len(), 1);
    assert_eq!(docs[0]["title"], "One");

    let docs: Vec<Value> = srv
        .http
        .get(srv.url("/docs?text=SECOND&limit=5&page=1"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(docs.len(), 1);
    assert_eq!(docs[0]["title"], "Two");

    let resp = srv.http.get(srv.url("/docs?page=abc")).send().await.unwrap();
    assert_eq!(resp.status(), 400);
}

#[tokio::test]
async fn test_search_get_and_post() {
    let srv = TestServer::start().await;
    let mut ids = Vec::new();
    for (title, content) in [
        ("Rust", "Rust ownership and borrowing"),
        ("Python", "Python machine learning"),
    ] {
        let created: Value = srv
            .create("a", json!({"title": title, "content": content}))
            .await
            .json()
            .await
            .unwrap();
        ids.push(created["id"].as_str().unwrap().to_string());
    }
    for id in &ids {
        srv.wait_enriched(id).await;
    }

    let resp: Value = srv
        .http
        .get(srv.url("/search?query=ownership"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(resp["mode"], "text");
    assert_eq!(resp["results"].as_array().unwrap().len(), 1);

    let resp: Value = srv
        .http
        .post(srv.url("/search"))
        .json(&json!({"query": "Rust ownership and borrowing", "topK": 1}))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(resp["mode"], "semantic");
    let results = resp["results"].as_array().unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0]["title"], "Rust");
    assert!(results[0]["relevance"].as_f64().unwrap() > 0.99);
    assert_eq!(resp["fallbackTextMatches"].as_array().unwrap().len(), 1);

    let resp: Value = srv
        .http
        .get(srv.url("/search?query="))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(resp["results"].as_array().unwrap().is_empty());

    let resp = srv
        .http
        .get(srv.url("/search?query=x&mode=fuzzy"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
}

#[tokio::test]
async fn test_utility_endpoints() {
    let srv = TestServer::start().await;
    let created: Value = srv
        .create("a", json!({"title": "T", "content": "Kubernetes Docker notes"}))
        .await
        .json()
        .await
        .unwrap();
    let id = created["id"].as_str().unwrap();

    let doc: Value = srv
        .http
        .post(srv.url(&format!("/docs/{}/summarize", id)))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(doc["summary"], "About: Kubernetes Docker notes");

    let doc: Value = srv
        .http
        .post(srv.url(&format!("/docs/{}/generate-tags", id)))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let tags = doc["tags"].as_array().unwrap();
    assert!(tags.contains(&json!("kubernetes")));
    assert!(tags.contains(&json!("docker")));

    let resp = srv
        .http
        .post(srv.url("/docs/missing/summarize"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
}

#[tokio::test]
async fn test_qa() {
    let srv = TestServer::start().await;
    srv.create("a", json!({"title": "A", "content": "alpha"})).await;
    srv.create("a", json!({"title": "B", "content": "beta"})).await;

    let body: Value = srv
        .http
        .post(srv.url("/qa"))
        .json(&json!({"question": "what?"}))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    // Two documents joined by one blank line, plus the one before "Question:".
    assert_eq!(body["answer"], "answered with 2 blocks");

    let resp = srv
        .http
        .post(srv.url("/qa"))
        .json(&json!({}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
}
