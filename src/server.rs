//! JSON HTTP API.
//!
//! Serves the full document lifecycle: upload, background ingestion
//! tracking, retrieval with grounded synthesis, and the derived
//! timeline / graph / consolidation views.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/api/v1/upload` | Upload a PDF; ingestion runs in the background |
//! | `GET`  | `/api/v1/jobs/{id}` | Status of one ingestion job |
//! | `POST` | `/api/v1/query` | Semantic retrieval plus optional answer synthesis |
//! | `GET`  | `/api/v1/timeline` | Chronological events from stored metadata |
//! | `GET`  | `/api/v1/semantic_graph` | Cytoscape-style node/edge view |
//! | `POST` | `/api/v1/consolidate` | Per-document consolidation summaries |
//! | `GET`  | `/health` | Health check (returns version) |
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "bad_request", "message": "query must not be empty" } }
//! ```
//!
//! Error codes: `bad_request` (400), `not_found` (404),
//! `embeddings_disabled` (400), `internal` (500).
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted to support
//! browser-based clients.

use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info};
use uuid::Uuid;

use crate::consolidate::consolidate;
use crate::context::AppContext;
use crate::graph::{build_graph, GraphElement};
use crate::ingest::run_background_ingest;
use crate::models::{ConsolidatedGroup, SourceCitation, TimelineEvent};
use crate::retrieve::retrieve;
use crate::store::{IngestJob, MemoryStore};
use crate::synthesize::synthesize_answer;
use crate::timeline::build_timeline;

/// Starts the HTTP server on `[server].bind`. Runs until the process
/// is terminated.
pub async fn run_server(ctx: Arc<AppContext>) -> anyhow::Result<()> {
    let bind_addr = ctx.config.server.bind.clone();

    std::fs::create_dir_all(&ctx.config.ingest.upload_dir)?;

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = router(ctx);
    let app = app.layer(cors);

    println!("casefile server listening on http://{}", bind_addr);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Route table without middleware.
pub fn router(ctx: Arc<AppContext>) -> Router {
    Router::new()
        .route("/api/v1/upload", post(handle_upload))
        .route("/api/v1/jobs/{id}", get(handle_job_status))
        .route("/api/v1/query", post(handle_query))
        .route("/api/v1/timeline", get(handle_timeline))
        .route("/api/v1/semantic_graph", get(handle_semantic_graph))
        .route("/api/v1/consolidate", post(handle_consolidate))
        .route("/health", get(handle_health))
        .with_state(ctx)
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

/// Internal error type that converts into an Axum HTTP response.
struct AppError {
    status: StatusCode,
    code: String,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code,
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "bad_request".to_string(),
        message: message.into(),
    }
}

fn not_found(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::NOT_FOUND,
        code: "not_found".to_string(),
        message: message.into(),
    }
}

fn internal(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        code: "internal".to_string(),
        message: message.into(),
    }
}

/// Maps pipeline errors to HTTP responses. A disabled embedding
/// provider is a client-visible configuration error, not a 500.
fn classify_error(err: anyhow::Error) -> AppError {
    let msg = err.to_string();

    if msg.contains("embeddings are disabled") {
        let mut e = bad_request(msg);
        e.code = "embeddings_disabled".to_string();
        e
    } else {
        error!(error = %err, "request failed");
        internal(msg)
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

// ============ POST /api/v1/upload ============

#[derive(Serialize)]
struct UploadResponse {
    message: String,
    document_id: String,
    job_id: String,
}

/// Accepts a multipart PDF upload, stages it on disk, and spawns the
/// ingestion pipeline as a detached task. The response returns before
/// any extraction work happens; progress is tracked via the job.
async fn handle_upload(
    State(ctx): State<Arc<AppContext>>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, AppError> {
    let mut saved: Option<(String, Vec<u8>)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| bad_request(format!("malformed multipart body: {}", e)))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let filename = field
            .file_name()
            .ok_or_else(|| bad_request("file field must carry a filename"))?
            .to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| bad_request(format!("failed to read upload: {}", e)))?;
        saved = Some((filename, bytes.to_vec()));
    }

    let (filename, bytes) = saved.ok_or_else(|| bad_request("missing 'file' field"))?;

    // File-type check is synchronous; everything past this point is
    // the caller's receipt, not a processing result.
    if !filename.to_lowercase().ends_with(".pdf") {
        return Err(bad_request("Only PDF files are supported."));
    }

    let document_id = Uuid::new_v4().to_string();
    let staged_name = format!("{}_{}", document_id, filename);
    let staged_path = ctx.config.ingest.upload_dir.join(&staged_name);

    std::fs::create_dir_all(&ctx.config.ingest.upload_dir)
        .and_then(|_| std::fs::write(&staged_path, &bytes))
        .map_err(|e| internal(format!("failed to stage upload: {}", e)))?;

    let job = IngestJob::queued(Uuid::new_v4().to_string(), filename.clone());
    let job_id = job.id.clone();
    ctx.store
        .create_job(&job)
        .await
        .map_err(classify_error)?;

    info!(file = %filename, job = %job_id, "upload accepted");
    tokio::spawn(run_background_ingest(
        ctx.clone(),
        staged_path,
        filename,
        job_id.clone(),
    ));

    Ok(Json(UploadResponse {
        message: "File uploaded. Processing in background.".to_string(),
        document_id,
        job_id,
    }))
}

// ============ GET /api/v1/jobs/{id} ============

async fn handle_job_status(
    State(ctx): State<Arc<AppContext>>,
    Path(id): Path<String>,
) -> Result<Json<IngestJob>, AppError> {
    let job = ctx
        .store
        .get_job(&id)
        .await
        .map_err(classify_error)?
        .ok_or_else(|| not_found(format!("no job with id: {}", id)))?;
    Ok(Json(job))
}

// ============ POST /api/v1/query ============

#[derive(Deserialize)]
struct QueryRequest {
    query: String,
    /// Accepted for API compatibility; not applied to retrieval.
    #[serde(default)]
    #[allow(dead_code)]
    filters: Option<serde_json::Value>,
    #[serde(default = "default_synthesize")]
    synthesize: bool,
}

fn default_synthesize() -> bool {
    true
}

#[derive(Serialize)]
struct QueryResponse {
    answer: String,
    sources: Vec<SourceCitation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    created_memory_id: Option<String>,
}

async fn handle_query(
    State(ctx): State<Arc<AppContext>>,
    Json(req): Json<QueryRequest>,
) -> Result<Json<QueryResponse>, AppError> {
    if req.query.trim().is_empty() {
        return Err(bad_request("query must not be empty"));
    }

    let embedder = ctx.require_embedder().map_err(classify_error)?;
    let sources = retrieve(
        ctx.store.as_ref(),
        embedder,
        &req.query,
        ctx.config.retrieval.top_k,
    )
    .await
    .map_err(classify_error)?;

    let (answer, created_memory_id) = if req.synthesize {
        let answer = synthesize_answer(ctx.llm.as_deref(), &req.query, &sources).await;
        (answer, Some(format!("interaction_{}", Uuid::new_v4())))
    } else {
        (String::new(), None)
    };

    Ok(Json(QueryResponse {
        answer,
        sources,
        created_memory_id,
    }))
}

// ============ GET /api/v1/timeline ============

#[derive(Serialize)]
struct TimelineResponse {
    timeline: Vec<TimelineEvent>,
}

async fn handle_timeline(
    State(ctx): State<Arc<AppContext>>,
) -> Result<Json<TimelineResponse>, AppError> {
    let timeline = build_timeline(ctx.store.as_ref(), ctx.config.retrieval.scan_limit)
        .await
        .map_err(classify_error)?;
    Ok(Json(TimelineResponse { timeline }))
}

// ============ GET /api/v1/semantic_graph ============

#[derive(Deserialize)]
struct GraphParams {
    #[serde(default)]
    query: Option<String>,
}

#[derive(Serialize)]
struct GraphResponse {
    elements: Vec<GraphElement>,
}

async fn handle_semantic_graph(
    State(ctx): State<Arc<AppContext>>,
    Query(params): Query<GraphParams>,
) -> Result<Json<GraphResponse>, AppError> {
    let query = params.query.as_deref().filter(|q| !q.trim().is_empty());
    let elements = build_graph(
        ctx.store.as_ref(),
        ctx.embedder.as_deref(),
        query,
        ctx.config.retrieval.graph_limit,
    )
    .await
    .map_err(classify_error)?;
    Ok(Json(GraphResponse { elements }))
}

// ============ POST /api/v1/consolidate ============

#[derive(Deserialize)]
struct ConsolidateRequest {
    #[serde(default = "default_threshold")]
    threshold: f64,
}

fn default_threshold() -> f64 {
    0.75
}

#[derive(Serialize)]
struct ConsolidateResponse {
    message: String,
    consolidated_groups: Vec<ConsolidatedGroup>,
}

async fn handle_consolidate(
    State(ctx): State<Arc<AppContext>>,
    Json(req): Json<ConsolidateRequest>,
) -> Result<Json<ConsolidateResponse>, AppError> {
    let groups = consolidate(
        ctx.store.as_ref(),
        ctx.config.retrieval.scan_limit,
        req.threshold,
    )
    .await
    .map_err(classify_error)?;

    Ok(Json(ConsolidateResponse {
        message: format!("Consolidated {} groups.", groups.len()),
        consolidated_groups: groups,
    }))
}
