//! Test doubles shared by the integration tests.

#![allow(dead_code)]

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use helpdesk_rag::{
    Chunk, EmbeddingProvider, GenerativeModel, InMemoryVectorStore, RagConfig, RagError,
    RagPipeline, Result, SearchResult, UrlFetcher, VectorStore,
};

pub const DIM: usize = 64;

// ---------------------------------------------------------------------------
// HashEmbedder — deterministic hash-based embeddings
// ---------------------------------------------------------------------------

pub struct HashEmbedder {
    dimensions: usize,
}

impl HashEmbedder {
    pub fn new(dimensions: usize) -> Self {
        Self { dimensions }
    }
}

#[async_trait]
impl EmbeddingProvider for HashEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let hash = text.bytes().fold(0u64, |acc, b| acc.wrapping_mul(31).wrapping_add(b as u64));
        let mut emb = vec![0.0f32; self.dimensions];
        for (i, v) in emb.iter_mut().enumerate() {
            *v = ((hash.wrapping_add(i as u64)) as f32).sin();
        }
        let norm: f32 = emb.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            emb.iter_mut().for_each(|x| *x /= norm);
        }
        Ok(emb)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn name(&self) -> &str {
        "hash"
    }
}

/// An embedder whose calls never complete.
pub struct StalledEmbedder;

#[async_trait]
impl EmbeddingProvider for StalledEmbedder {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        Ok(vec![0.0; DIM])
    }

    fn dimensions(&self) -> usize {
        DIM
    }
}

/// Embeds like [`HashEmbedder`] for the first `succeed` calls, then fails.
pub struct FailingEmbedder {
    inner: HashEmbedder,
    succeed: usize,
    calls: AtomicUsize,
}

impl FailingEmbedder {
    pub fn after(succeed: usize) -> Self {
        Self { inner: HashEmbedder::new(DIM), succeed, calls: AtomicUsize::new(0) }
    }
}

#[async_trait]
impl EmbeddingProvider for FailingEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        if self.calls.fetch_add(1, Ordering::SeqCst) >= self.succeed {
            return Err(RagError::EmbeddingError {
                provider: "failing".into(),
                message: "input rejected".into(),
            });
        }
        self.inner.embed(text).await
    }

    fn dimensions(&self) -> usize {
        DIM
    }

    fn name(&self) -> &str {
        "failing"
    }
}

/// A batching embedder that records the size of every batch it is given and
/// takes `delay` per batch.
pub struct BatchingEmbedder {
    inner: HashEmbedder,
    batch_size: usize,
    delay: Duration,
    batches: Mutex<Vec<usize>>,
}

impl BatchingEmbedder {
    pub fn new(batch_size: usize, delay: Duration) -> Self {
        Self { inner: HashEmbedder::new(DIM), batch_size, delay, batches: Mutex::new(Vec::new()) }
    }

    pub fn batches(&self) -> Vec<usize> {
        self.batches.lock().unwrap().clone()
    }
}

#[async_trait]
impl EmbeddingProvider for BatchingEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.inner.embed(text).await
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        self.batches.lock().unwrap().push(texts.len());
        tokio::time::sleep(self.delay).await;
        let mut out = Vec::with_capacity(texts.len());
        for text in texts {
            out.push(self.inner.embed(text).await?);
        }
        Ok(out)
    }

    fn max_batch_size(&self) -> usize {
        self.batch_size
    }

    fn dimensions(&self) -> usize {
        DIM
    }
}

// ---------------------------------------------------------------------------
// ScriptedModel — records prompts and answers from a script
// ---------------------------------------------------------------------------

enum Script {
    Reply(String),
    Fail,
    Blank,
    Stall,
}

pub struct ScriptedModel {
    script: Script,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedModel {
    fn with_script(script: Script) -> Self {
        Self { script, prompts: Mutex::new(Vec::new()) }
    }

    pub fn replying(answer: &str) -> Self {
        Self::with_script(Script::Reply(answer.to_string()))
    }

    pub fn failing() -> Self {
        Self::with_script(Script::Fail)
    }

    pub fn blank() -> Self {
        Self::with_script(Script::Blank)
    }

    pub fn stalled() -> Self {
        Self::with_script(Script::Stall)
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }

    pub fn calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }
}

#[async_trait]
impl GenerativeModel for ScriptedModel {
    async fn generate(&self, prompt: &str) -> Result<String> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        match &self.script {
            Script::Reply(answer) => Ok(answer.clone()),
            Script::Fail => Err(RagError::GenerationError {
                provider: "scripted".into(),
                message: "quota exceeded".into(),
            }),
            Script::Blank => Ok("   ".into()),
            Script::Stall => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok("too late".into())
            }
        }
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

// ---------------------------------------------------------------------------
// FlakyStore — in-memory store with switchable failures
// ---------------------------------------------------------------------------

/// Wraps [`InMemoryVectorStore`]. With `fail_after_upsert` set, upserts are
/// applied and then reported as failed, like a write that timed out.
#[derive(Default)]
pub struct FlakyStore {
    inner: InMemoryVectorStore,
    pub fail_after_upsert: AtomicBool,
    pub fail_delete: AtomicBool,
    pub fail_search: AtomicBool,
    pub upsert_calls: AtomicUsize,
}

impl FlakyStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn failure(message: &str) -> RagError {
        RagError::VectorStoreError { backend: "flaky".into(), message: message.into() }
    }
}

#[async_trait]
impl VectorStore for FlakyStore {
    async fn create_collection(&self, name: &str, dimensions: usize) -> Result<()> {
        self.inner.create_collection(name, dimensions).await
    }

    async fn delete_collection(&self, name: &str) -> Result<()> {
        self.inner.delete_collection(name).await
    }

    async fn upsert(&self, collection: &str, chunks: &[Chunk]) -> Result<()> {
        self.upsert_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.upsert(collection, chunks).await?;
        if self.fail_after_upsert.load(Ordering::SeqCst) {
            return Err(Self::failure("connection reset after write"));
        }
        Ok(())
    }

    async fn delete(&self, collection: &str, ids: &[&str]) -> Result<()> {
        if self.fail_delete.load(Ordering::SeqCst) {
            return Err(Self::failure("delete rejected"));
        }
        self.inner.delete(collection, ids).await
    }

    async fn search(
        &self,
        collection: &str,
        embedding: &[f32],
        top_k: usize,
    ) -> Result<Vec<SearchResult>> {
        if self.fail_search.load(Ordering::SeqCst) {
            return Err(Self::failure("search unavailable"));
        }
        self.inner.search(collection, embedding, top_k).await
    }

    async fn count(&self, collection: &str) -> Result<usize> {
        self.inner.count(collection).await
    }

    fn backend(&self) -> &str {
        "flaky"
    }
}

/// A store that answers every search with a fixed, possibly unsorted, result list.
pub struct CannedStore {
    pub results: Vec<SearchResult>,
}

#[async_trait]
impl VectorStore for CannedStore {
    async fn create_collection(&self, _name: &str, _dimensions: usize) -> Result<()> {
        Ok(())
    }

    async fn delete_collection(&self, _name: &str) -> Result<()> {
        Ok(())
    }

    async fn upsert(&self, _collection: &str, _chunks: &[Chunk]) -> Result<()> {
        Ok(())
    }

    async fn delete(&self, _collection: &str, _ids: &[&str]) -> Result<()> {
        Ok(())
    }

    async fn search(
        &self,
        _collection: &str,
        _embedding: &[f32],
        _top_k: usize,
    ) -> Result<Vec<SearchResult>> {
        Ok(self.results.clone())
    }

    async fn count(&self, _collection: &str) -> Result<usize> {
        Ok(self.results.len())
    }
}

// ---------------------------------------------------------------------------
// StaticFetcher — serves one body for every URL
// ---------------------------------------------------------------------------

pub struct StaticFetcher {
    pub body: Option<String>,
}

#[async_trait]
impl UrlFetcher for StaticFetcher {
    async fn fetch(&self, url: &str) -> Result<String> {
        self.body.clone().ok_or_else(|| RagError::Fetch {
            url: url.to_string(),
            message: "HTTP status 404 Not Found".into(),
        })
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

pub fn chunk(id: &str, text: &str, score: f32) -> SearchResult {
    SearchResult {
        chunk: Chunk {
            id: id.to_string(),
            text: text.to_string(),
            embedding: vec![],
            metadata: Default::default(),
            document_id: "doc_1".to_string(),
        },
        score,
    }
}

/// Build a pipeline over `store` and `model` with `config`, then create its collection.
pub async fn pipeline_with(
    config: RagConfig,
    store: Arc<dyn VectorStore>,
    model: Arc<dyn GenerativeModel>,
) -> RagPipeline {
    pipeline_embedding_with(config, Arc::new(HashEmbedder::new(DIM)), store, model).await
}

/// As [`pipeline_with`], embedding with `embedder`.
pub async fn pipeline_embedding_with(
    config: RagConfig,
    embedder: Arc<dyn EmbeddingProvider>,
    store: Arc<dyn VectorStore>,
    model: Arc<dyn GenerativeModel>,
) -> RagPipeline {
    let pipeline = RagPipeline::builder()
        .config(config)
        .embedding_provider(embedder)
        .vector_store(store)
        .model(model)
        .build()
        .unwrap();
    pipeline.create_collection().await.unwrap();
    pipeline
}

/// Build a pipeline with the default config.
pub async fn pipeline(store: Arc<dyn VectorStore>, model: Arc<dyn GenerativeModel>) -> RagPipeline {
    pipeline_with(RagConfig::default(), store, model).await
}
