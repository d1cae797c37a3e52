//! JSON HTTP API over the document service.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/health` | Health check (returns version) |
//! | `POST` | `/docs` | Create a document, enrichment runs in the background |
//! | `GET`  | `/docs` | List with `tag`, `text`, `page`, `limit` |
//! | `GET`  | `/docs/{id}` | Fetch one document |
//! | `PUT`  | `/docs/{id}` | Partial update (owner or admin) |
//! | `DELETE` | `/docs/{id}` | Delete (owner or admin) |
//! | `POST` | `/docs/{id}/summarize` | Regenerate the summary now |
//! | `POST` | `/docs/{id}/generate-tags` | Extract and merge tags now |
//! | `GET`  | `/search` | `?query&mode&topK`, mode defaults to `text` |
//! | `POST` | `/search` | `{query, mode, topK}`, mode defaults to `semantic` |
//! | `POST` | `/qa` | `{question}` → `{answer}` |
//!
//! # Caller identity
//!
//! Authentication is handled in front of this server. The caller is taken
//! from `x-user-id` (default `anonymous`) and `x-user-role` (`admin`, or
//! anything else for a regular user).
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "bad_request", "message": "invalid request: title is required" } }
//! ```
//!
//! Error codes: `bad_request` (400), `forbidden` (403), `not_found` (404),
//! `internal` (500).

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use doclens_core::error::ServiceError;
use doclens_core::models::{Actor, Document, DocumentPatch, NewDocument, Role};
use doclens_core::search::{SearchMode, SearchRequest, SearchResponse};

use crate::config::Config;
use crate::service::{DocumentService, ListQuery};

/// Starts the HTTP server on `[server].bind`. Runs until the process exits.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let service = DocumentService::open(config).await?;
    let listener = tokio::net::TcpListener::bind(&config.server.bind).await?;
    serve(listener, service).await
}

/// Serve the API on an already-bound listener.
pub async fn serve(listener: tokio::net::TcpListener, service: DocumentService) -> anyhow::Result<()> {
    info!(addr = %listener.local_addr()?, "doclens server listening");
    axum::serve(listener, router(service)).await?;
    Ok(())
}

/// Build the application router.
pub fn router(service: DocumentService) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handle_health))
        .route("/docs", post(handle_create).get(handle_list))
        .route(
            "/docs/{id}",
            get(handle_get).put(handle_update).delete(handle_delete),
        )
        .route("/docs/{id}/summarize", post(handle_summarize))
        .route("/docs/{id}/generate-tags", post(handle_generate_tags))
        .route("/search", get(handle_search_get).post(handle_search_post))
        .route("/qa", post(handle_qa))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(service)
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

struct AppError {
    status: StatusCode,
    code: &'static str,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code.to_string(),
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "bad_request",
        message: message.into(),
    }
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        let (status, code) = match &err {
            ServiceError::Validation(_) => (StatusCode::BAD_REQUEST, "bad_request"),
            ServiceError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            ServiceError::Forbidden => (StatusCode::FORBIDDEN, "forbidden"),
            ServiceError::Store(e) => {
                error!(error = %e, "store failure");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal")
            }
        };
        AppError {
            status,
            code,
            message: err.to_string(),
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        bad_request(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        bad_request(rejection.body_text())
    }
}

fn actor_from_headers(headers: &HeaderMap) -> Actor {
    let id = headers
        .get("x-user-id")
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .unwrap_or("anonymous");
    let role = match headers.get("x-user-role").and_then(|v| v.to_str().ok()) {
        Some(r) if r.trim().eq_ignore_ascii_case("admin") => Role::Admin,
        _ => Role::User,
    };
    Actor {
        id: id.to_string(),
        role,
    }
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ============ /docs ============

async fn handle_create(
    State(service): State<DocumentService>,
    headers: HeaderMap,
    payload: Result<Json<NewDocument>, JsonRejection>,
) -> Result<(StatusCode, Json<Document>), AppError> {
    let Json(input) = payload?;
    let actor = actor_from_headers(&headers);
    // The enrichment task keeps running after the response is sent.
    let (doc, _task) = service.create(&actor, input).await?;
    Ok((StatusCode::CREATED, Json(doc)))
}

#[derive(Deserialize)]
struct ListParams {
    tag: Option<String>,
    text: Option<String>,
    page: Option<usize>,
    limit: Option<usize>,
}

async fn handle_list(
    State(service): State<DocumentService>,
    params: Result<Query<ListParams>, QueryRejection>,
) -> Result<Json<Vec<Document>>, AppError> {
    let Query(params) = params?;
    let docs = service
        .list(&ListQuery {
            tag: params.tag,
            text: params.text,
            page: params.page,
            limit: params.limit,
        })
        .await?;
    Ok(Json(docs))
}

async fn handle_get(
    State(service): State<DocumentService>,
    Path(id): Path<String>,
) -> Result<Json<Document>, AppError> {
    Ok(Json(service.get(&id).await?))
}

async fn handle_update(
    State(service): State<DocumentService>,
    Path(id): Path<String>,
    headers: HeaderMap,
    payload: Result<Json<DocumentPatch>, JsonRejection>,
) -> Result<Json<Document>, AppError> {
    let Json(patch) = payload?;
    let actor = actor_from_headers(&headers);
    let (doc, _task) = service.update(&actor, &id, patch).await?;
    Ok(Json(doc))
}

#[derive(Serialize)]
struct DeleteResponse {
    success: bool,
}

async fn handle_delete(
    State(service): State<DocumentService>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<DeleteResponse>, AppError> {
    let actor = actor_from_headers(&headers);
    service.delete(&actor, &id).await?;
    Ok(Json(DeleteResponse { success: true }))
}

async fn handle_summarize(
    State(service): State<DocumentService>,
    Path(id): Path<String>,
) -> Result<Json<Document>, AppError> {
    Ok(Json(service.summarize_now(&id).await?))
}

async fn handle_generate_tags(
    State(service): State<DocumentService>,
    Path(id): Path<String>,
) -> Result<Json<Document>, AppError> {
    Ok(Json(service.generate_tags_now(&id).await?))
}

// ============ /search ============

#[derive(Deserialize)]
struct SearchQueryParams {
    query: Option<String>,
    mode: Option<String>,
    #[serde(rename = "topK")]
    top_k: Option<String>,
}

#[derive(Deserialize)]
struct SearchBody {
    query: Option<String>,
    mode: Option<String>,
    #[serde(rename = "topK")]
    top_k: Option<i64>,
}

async fn run_search(
    service: &DocumentService,
    query: Option<String>,
    mode: Option<String>,
    default_mode: SearchMode,
    top_k: Option<i64>,
) -> Result<Json<SearchResponse>, AppError> {
    let mode = match mode.as_deref().map(str::trim).filter(|m| !m.is_empty()) {
        Some(m) => m.parse::<SearchMode>()?,
        None => default_mode,
    };
    let query = query.unwrap_or_default();
    let resp = service
        .search(&SearchRequest {
            query: &query,
            mode,
            top_k,
        })
        .await?;
    Ok(Json(resp))
}

async fn handle_search_get(
    State(service): State<DocumentService>,
    params: Result<Query<SearchQueryParams>, QueryRejection>,
) -> Result<Json<SearchResponse>, AppError> {
    let Query(params) = params?;
    // Non-numeric topK falls back to the default.
    let top_k = params.top_k.and_then(|k| k.trim().parse::<i64>().ok());
    run_search(&service, params.query, params.mode, SearchMode::Text, top_k).await
}

async fn handle_search_post(
    State(service): State<DocumentService>,
    payload: Result<Json<SearchBody>, JsonRejection>,
) -> Result<Json<SearchResponse>, AppError> {
    let Json(body) = payload?;
    run_search(&service, body.query, body.mode, SearchMode::Semantic, body.top_k).await
}

// ============ POST /qa ============

#[derive(Deserialize)]
struct QaBody {
    #[serde(default)]
    question: String,
}

#[derive(Serialize)]
struct QaResponse {
    answer: String,
}

async fn handle_qa(
    State(service): State<DocumentService>,
    payload: Result<Json<QaBody>, JsonRejection>,
) -> Result<Json<QaResponse>, AppError> {
    let Json(body) = payload?;
    let answer = service.answer(&body.question).await?;
    Ok(Json(QaResponse { answer }))
}
