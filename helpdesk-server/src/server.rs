use std::{net::SocketAddr, sync::Arc};

use anyhow::Context;
use axum::{
    Json, Router,
    body::Bytes,
    extract::{DefaultBodyLimit, Query, State, rejection::JsonRejection},
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{delete, get, post},
};
use helpdesk_rag::{
    ChatResponse, FileUpload, HttpFetcher, InMemoryVectorStore, IngestReport, RagPipeline, Stats,
    VectorStore,
    gemini::{GeminiEmbeddingProvider, GeminiModel},
    metadata_from_json,
};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{error, info};

use crate::{config::ServerConfig, error::ApiError};

/// Largest accepted request body (file uploads included).
const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<RagPipeline>,
}

impl AppState {
    pub fn new(pipeline: RagPipeline) -> Self {
        Self { pipeline: Arc::new(pipeline) }
    }
}

#[derive(Debug, Deserialize)]
pub struct IngestTextRequest {
    pub text: String,
    #[serde(default)]
    pub metadata: Value,
}

#[derive(Debug, Deserialize)]
pub struct IngestUrlRequest {
    pub url: String,
    #[serde(default)]
    pub metadata: Value,
}

#[derive(Debug, Deserialize)]
pub struct FileParams {
    pub filename: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    #[serde(default)]
    pub conversation_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct IngestResponse {
    pub message: String,
    #[serde(flatten)]
    pub report: IngestReport,
}

impl From<IngestReport> for IngestResponse {
    fn from(report: IngestReport) -> Self {
        Self {
            message: format!("Ingested {} chunk(s)", report.chunks_added),
            report,
        }
    }
}

pub fn app_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(index))
        .route("/health", get(health))
        .route("/api/ingest/text", post(ingest_text))
        .route("/api/ingest/url", post(ingest_url))
        .route("/api/ingest/file", post(ingest_file))
        .route("/api/chat", post(chat))
        .route("/api/stats", get(stats))
        .route("/api/clear", delete(clear))
        .with_state(state)
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

/// Assemble the production pipeline: Gemini for embeddings and answers, an
/// HTTP fetcher for URLs, and Qdrant or in-memory storage.
pub fn build_pipeline(config: &ServerConfig) -> anyhow::Result<RagPipeline> {
    let mut embedder = GeminiEmbeddingProvider::new(&config.gemini_api_key)?;
    if let Some(model) = &config.embedding_model {
        embedder = embedder.with_model(model);
    }

    let mut model = GeminiModel::new(&config.gemini_api_key)?;
    if let Some(name) = &config.generation_model {
        model = model.with_model(name);
    }

    let pipeline = RagPipeline::builder()
        .config(config.rag.clone())
        .embedding_provider(Arc::new(embedder))
        .vector_store(vector_store(config)?)
        .model(Arc::new(model))
        .fetcher(Arc::new(HttpFetcher::with_timeout(config.fetch_timeout)?))
        .build()?;
    Ok(pipeline)
}

#[cfg(feature = "qdrant")]
fn vector_store(config: &ServerConfig) -> anyhow::Result<Arc<dyn VectorStore>> {
    match &config.qdrant_url {
        Some(url) => {
            info!(%url, "using qdrant vector store");
            Ok(Arc::new(helpdesk_rag::qdrant::QdrantVectorStore::new(url)?))
        }
        None => Ok(Arc::new(InMemoryVectorStore::new())),
    }
}

#[cfg(not(feature = "qdrant"))]
fn vector_store(config: &ServerConfig) -> anyhow::Result<Arc<dyn VectorStore>> {
    if let Some(url) = &config.qdrant_url {
        anyhow::bail!("QDRANT_URL is set to {url} but the server was built without the `qdrant` feature");
    }
    Ok(Arc::new(InMemoryVectorStore::new()))
}

pub async fn run_server(config: ServerConfig) -> anyhow::Result<()> {
    let pipeline = build_pipeline(&config)?;
    pipeline
        .create_collection()
        .await
        .with_context(|| format!("failed to prepare collection '{}'", config.rag.collection))?;

    let app = app_router(AppState::new(pipeline));
    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .with_context(|| "invalid host/port for helpdesk server")?;

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(collection = %config.rag.collection, "helpdesk server listening on http://{}", addr);
    axum::serve(listener, app).await?;
    Ok(())
}

fn parse_json<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    payload
        .map(|Json(body)| body)
        .map_err(|rejection| ApiError::BadRequest(rejection.body_text()))
}

async fn index() -> impl IntoResponse {
    Json(json!({
        "message": "Customer support knowledge base API",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn health(State(state): State<AppState>) -> Response {
    match state.pipeline.stats().await {
        Ok(stats) => Json(json!({
            "status": "healthy",
            "service": "helpdesk-server",
            "collection": stats.collection_name,
            "total_documents": stats.total_documents,
        }))
        .into_response(),
        Err(err) => {
            error!(error = %err, "health check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({"status": "unhealthy", "detail": ApiError::from(err).public_detail()})),
            )
                .into_response()
        }
    }
}

async fn ingest_text(
    State(state): State<AppState>,
    payload: Result<Json<IngestTextRequest>, JsonRejection>,
) -> Result<Json<IngestResponse>, ApiError> {
    let request = parse_json(payload)?;
    let metadata = metadata_from_json(&request.metadata)?;
    let report = state.pipeline.ingest_text(&request.text, metadata).await?;
    Ok(Json(report.into()))
}

async fn ingest_url(
    State(state): State<AppState>,
    payload: Result<Json<IngestUrlRequest>, JsonRejection>,
) -> Result<Json<IngestResponse>, ApiError> {
    let request = parse_json(payload)?;
    let metadata = metadata_from_json(&request.metadata)?;
    let report = state.pipeline.ingest_url(&request.url, metadata).await?;
    Ok(Json(report.into()))
}

async fn ingest_file(
    State(state): State<AppState>,
    Query(params): Query<FileParams>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<IngestResponse>, ApiError> {
    let mut upload = FileUpload::new(body.to_vec());
    if let Some(content_type) = headers.get(header::CONTENT_TYPE).and_then(|v| v.to_str().ok()) {
        upload = upload.with_content_type(content_type);
    }
    if let Some(filename) = params.filename {
        upload = upload.with_filename(filename);
    }

    let report = state.pipeline.ingest_file(&upload, Default::default()).await?;
    Ok(Json(report.into()))
}

async fn chat(
    State(state): State<AppState>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatResponse>, ApiError> {
    let request = parse_json(payload)?;
    let response = state
        .pipeline
        .chat(&request.message, request.conversation_id.as_deref())
        .await?;
    Ok(Json(response))
}

async fn stats(State(state): State<AppState>) -> Result<Json<Stats>, ApiError> {
    Ok(Json(state.pipeline.stats().await?))
}

async fn clear(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    state.pipeline.clear().await?;
    Ok(Json(json!({"message": "Knowledge base cleared successfully"})))
}
