//! Gemini embedding provider and generative model over the Gemini REST API.
//!
//! This module is only available when the `gemini` feature is enabled.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, error};

use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::generation::GenerativeModel;

/// The default Gemini API base URL.
const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// The default embedding model.
const DEFAULT_EMBEDDING_MODEL: &str = "gemini-embedding-001";

/// The default generation model.
const DEFAULT_GENERATION_MODEL: &str = "gemma-3-27b-it";

/// Default embedding dimensions for `gemini-embedding-001`.
const DEFAULT_DIMENSIONS: usize = 3072;

/// Most requests `batchEmbedContents` accepts in one call.
pub const MAX_BATCH_SIZE: usize = 100;

const PROVIDER: &str = "Gemini";

/// The purpose an embedding is computed for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskType {
    /// Embeddings of stored passages.
    RetrievalDocument,
    /// Embeddings of search queries.
    RetrievalQuery,
    /// Embeddings compared symmetrically.
    SemanticSimilarity,
}

fn api_key_from_env() -> Result<String> {
    std::env::var("GEMINI_API_KEY").map_err(|_| RagError::InvalidConfiguration(
        "GEMINI_API_KEY environment variable not set".into(),
    ))
}

fn require_key(api_key: String) -> Result<String> {
    if api_key.trim().is_empty() {
        return Err(RagError::InvalidConfiguration("Gemini API key must not be empty".into()));
    }
    Ok(api_key)
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Deserialize)]
struct ErrorDetail {
    message: String,
}

/// Read a non-success response into a readable message.
async fn error_detail(response: reqwest::Response) -> String {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    let detail =
        serde_json::from_str::<ErrorResponse>(&body).map(|e| e.error.message).unwrap_or(body);
    format!("API returned {status}: {detail}")
}

// ── Embeddings ─────────────────────────────────────────────────────

/// An [`EmbeddingProvider`] backed by the Gemini embedding API.
///
/// # Configuration
///
/// - `model` – defaults to `gemini-embedding-001`.
/// - `task_type` – defaults to [`TaskType::RetrievalDocument`].
/// - `output_dimensionality` – optional truncation of the output vector.
///
/// # Example
///
/// ```rust,ignore
/// use helpdesk_rag::gemini::GeminiEmbeddingProvider;
///
/// let provider = GeminiEmbeddingProvider::new("your-api-key")?;
/// let embedding = provider.embed("hello world").await?;
/// ```
pub struct GeminiEmbeddingProvider {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
    task_type: TaskType,
    output_dimensionality: Option<usize>,
    dimensions: usize,
}

impl GeminiEmbeddingProvider {
    /// Create a new provider using the given API key and the default model.
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        Ok(Self {
            client: reqwest::Client::new(),
            api_key: require_key(api_key.into())?,
            base_url: GEMINI_BASE_URL.into(),
            model: DEFAULT_EMBEDDING_MODEL.into(),
            task_type: TaskType::RetrievalDocument,
            output_dimensionality: None,
            dimensions: DEFAULT_DIMENSIONS,
        })
    }

    /// Create a new provider using the `GEMINI_API_KEY` environment variable.
    pub fn from_env() -> Result<Self> {
        Self::new(api_key_from_env()?)
    }

    /// Set the model name.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Set the API base URL (for proxies and tests).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Set the task type used for embedding requests.
    pub fn with_task_type(mut self, task_type: TaskType) -> Self {
        self.task_type = task_type;
        self
    }

    /// Set the output dimensionality (truncates the embedding vector).
    pub fn with_output_dimensionality(mut self, dims: usize) -> Self {
        self.output_dimensionality = Some(dims);
        self.dimensions = dims;
        self
    }

    fn request(&self, text: &str) -> serde_json::Value {
        let mut request = json!({
            "model": format!("models/{}", self.model),
            "content": { "parts": [{ "text": text }] },
            "taskType": self.task_type,
        });
        if let Some(dims) = self.output_dimensionality {
            request["outputDimensionality"] = json!(dims);
        }
        request
    }

    fn embedding_error(message: impl Into<String>) -> RagError {
        RagError::EmbeddingError { provider: PROVIDER.into(), message: message.into() }
    }

    /// Embed at most [`MAX_BATCH_SIZE`] texts with one `batchEmbedContents` call.
    async fn embed_slice(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        debug!(provider = PROVIDER, batch_size = texts.len(), "embedding batch");

        let url = format!("{}/models/{}:batchEmbedContents", self.base_url, self.model);
        let requests: Vec<_> = texts.iter().map(|t| self.request(t)).collect();
        let response = self
            .client
            .post(url)
            .header("x-goog-api-key", &self.api_key)
            .json(&json!({ "requests": requests }))
            .send()
            .await
            .map_err(|e| {
                error!(provider = PROVIDER, error = %e, "batch embedding request failed");
                Self::embedding_error(format!("request failed: {e}"))
            })?;

        if !response.status().is_success() {
            let detail = error_detail(response).await;
            error!(provider = PROVIDER, %detail, "API error");
            return Err(Self::embedding_error(detail));
        }

        let parsed: BatchEmbedResponse = response.json().await.map_err(|e| {
            error!(provider = PROVIDER, error = %e, "failed to parse response");
            Self::embedding_error(format!("failed to parse response: {e}"))
        })?;

        if parsed.embeddings.len() != texts.len() {
            return Err(Self::embedding_error(format!(
                "expected {} embeddings, received {}",
                texts.len(),
                parsed.embeddings.len()
            )));
        }
        Ok(parsed.embeddings.into_iter().map(|e| e.values).collect())
    }
}

#[derive(Deserialize)]
struct EmbedResponse {
    embedding: EmbeddingValues,
}

#[derive(Deserialize)]
struct BatchEmbedResponse {
    #[serde(default)]
    embeddings: Vec<EmbeddingValues>,
}

#[derive(Deserialize)]
struct EmbeddingValues {
    values: Vec<f32>,
}

#[async_trait]
impl EmbeddingProvider for GeminiEmbeddingProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        debug!(provider = PROVIDER, text_len = text.len(), "embedding single text");

        let url = format!("{}/models/{}:embedContent", self.base_url, self.model);
        let response = self
            .client
            .post(url)
            .header("x-goog-api-key", &self.api_key)
            .json(&self.request(text))
            .send()
            .await
            .map_err(|e| {
                error!(provider = PROVIDER, error = %e, "embedding request failed");
                Self::embedding_error(format!("request failed: {e}"))
            })?;

        if !response.status().is_success() {
            let detail = error_detail(response).await;
            error!(provider = PROVIDER, %detail, "API error");
            return Err(Self::embedding_error(detail));
        }

        let parsed: EmbedResponse = response.json().await.map_err(|e| {
            error!(provider = PROVIDER, error = %e, "failed to parse response");
            Self::embedding_error(format!("failed to parse response: {e}"))
        })?;

        Ok(parsed.embedding.values)
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        let mut results = Vec::with_capacity(texts.len());
        for slice in texts.chunks(MAX_BATCH_SIZE) {
            results.extend(self.embed_slice(slice).await?);
        }
        Ok(results)
    }

    fn max_batch_size(&self) -> usize {
        MAX_BATCH_SIZE
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn name(&self) -> &str {
        PROVIDER
    }
}

// ── Generation ─────────────────────────────────────────────────────

/// A [`GenerativeModel`] backed by the Gemini `generateContent` API.
///
/// # Example
///
/// ```rust,ignore
/// use helpdesk_rag::gemini::GeminiModel;
///
/// let model = GeminiModel::new("your-api-key")?.with_model("gemini-2.0-flash");
/// let answer = model.generate("Say hello").await?;
/// ```
pub struct GeminiModel {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl GeminiModel {
    /// Create a new model client using the given API key and the default model.
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        Ok(Self {
            client: reqwest::Client::new(),
            api_key: require_key(api_key.into())?,
            base_url: GEMINI_BASE_URL.into(),
            model: DEFAULT_GENERATION_MODEL.into(),
        })
    }

    /// Create a new model client using the `GEMINI_API_KEY` environment variable.
    pub fn from_env() -> Result<Self> {
        Self::new(api_key_from_env()?)
    }

    /// Set the model name.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Set the API base URL (for proxies and tests).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn generation_error(&self, message: impl Into<String>) -> RagError {
        RagError::GenerationError { provider: format!("{PROVIDER}/{}", self.model), message: message.into() }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<CandidateContent>,
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Deserialize)]
struct Part {
    text: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

#[async_trait]
impl GenerativeModel for GeminiModel {
    async fn generate(&self, prompt: &str) -> Result<String> {
        debug!(provider = PROVIDER, model = %self.model, prompt_len = prompt.len(), "generating answer");

        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);
        let body = json!({
            "contents": [{ "role": "user", "parts": [{ "text": prompt }] }],
        });

        let response = self
            .client
            .post(url)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                error!(provider = PROVIDER, error = %e, "generation request failed");
                self.generation_error(format!("request failed: {e}"))
            })?;

        if !response.status().is_success() {
            let detail = error_detail(response).await;
            error!(provider = PROVIDER, %detail, "API error");
            return Err(self.generation_error(detail));
        }

        let parsed: GenerateResponse = response.json().await.map_err(|e| {
            error!(provider = PROVIDER, error = %e, "failed to parse response");
            self.generation_error(format!("failed to parse response: {e}"))
        })?;

        if let Some(reason) = parsed.prompt_feedback.and_then(|f| f.block_reason) {
            return Err(self.generation_error(format!("prompt blocked: {reason}")));
        }

        let candidate = parsed
            .candidates
            .into_iter()
            .next()
            .ok_or_else(|| self.generation_error("response contained no candidates"))?;

        let text: String = candidate
            .content
            .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
            .unwrap_or_default();

        if text.trim().is_empty() {
            let reason = candidate.finish_reason.unwrap_or_else(|| "unknown".into());
            return Err(self.generation_error(format!("empty answer (finish reason: {reason})")));
        }

        Ok(text)
    }

    fn name(&self) -> &str {
        &self.model
    }
}
