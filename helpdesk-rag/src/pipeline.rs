//! Knowledge-base pipeline orchestrator.
//!
//! The [`RagPipeline`] is the explicit handle over the knowledge base. It
//! composes an [`EmbeddingProvider`], a [`VectorStore`], a [`GenerativeModel`],
//! a [`Chunker`], an optional [`UrlFetcher`], and a [`ConversationTracker`],
//! and exposes the four produced operations: ingest, chat, stats, and clear.
//!
//! # Example
//!
//! ```rust,ignore
//! use helpdesk_rag::{InMemoryVectorStore, Metadata, RagConfig, RagPipeline};
//!
//! let pipeline = RagPipeline::builder()
//!     .config(RagConfig::default())
//!     .embedding_provider(Arc::new(my_embedder))
//!     .vector_store(Arc::new(InMemoryVectorStore::new()))
//!     .model(Arc::new(my_model))
//!     .build()?;
//!
//! pipeline.create_collection().await?;
//! pipeline.ingest_text("We are open Monday to Friday.", Metadata::new()).await?;
//! let answer = pipeline.chat("When are you open?", None).await?;
//! ```

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::chunking::{Chunker, FixedSizeChunker};
use crate::config::RagConfig;
use crate::context::ContextAssembler;
use crate::conversation::ConversationTracker;
use crate::document::{Chunk, Document, Metadata, MetadataValue, SearchResult};
use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::fetch::{UrlFetcher, parse_http_url};
use crate::generation::GenerativeModel;
use crate::ingest::{FileUpload, IngestReport, SourceType, decode_file};
use crate::retriever::Retriever;
use crate::synthesis::{AnswerSynthesizer, ChatResponse};
use crate::upstream::bounded;
use crate::vectorstore::VectorStore;

/// Knowledge-base statistics.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Stats {
    /// Number of stored entries.
    pub total_documents: usize,
    /// Name of the backing collection.
    pub collection_name: String,
    /// Always `"active"` when the store answered.
    pub status: String,
}

/// The knowledge-base pipeline orchestrator.
///
/// Coordinates ingestion (normalize → chunk → embed → store) and chat
/// (retrieve → assemble → synthesize). Construct one via
/// [`RagPipeline::builder()`].
pub struct RagPipeline {
    config: RagConfig,
    embedding_provider: Arc<dyn EmbeddingProvider>,
    vector_store: Arc<dyn VectorStore>,
    chunker: Arc<dyn Chunker>,
    fetcher: Option<Arc<dyn UrlFetcher>>,
    conversations: ConversationTracker,
    retriever: Retriever,
    assembler: ContextAssembler,
    synthesizer: AnswerSynthesizer,
}

impl RagPipeline {
    /// Create a new [`RagPipelineBuilder`].
    pub fn builder() -> RagPipelineBuilder {
        RagPipelineBuilder::default()
    }

    /// Return a reference to the pipeline configuration.
    pub fn config(&self) -> &RagConfig {
        &self.config
    }

    /// Return a reference to the vector store.
    pub fn vector_store(&self) -> &Arc<dyn VectorStore> {
        &self.vector_store
    }

    /// Return the conversation tracker.
    pub fn conversations(&self) -> &ConversationTracker {
        &self.conversations
    }

    fn store_error(&self) -> impl FnOnce(String) -> RagError + use<> {
        let backend = self.vector_store.backend().to_string();
        move |message| RagError::VectorStoreError { backend, message }
    }

    /// Create the knowledge-base collection in the vector store.
    ///
    /// The collection is created with the dimensionality reported by the
    /// configured [`EmbeddingProvider`]. Calling this on an existing
    /// collection is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::VectorStoreError`] if the vector store operation fails.
    pub async fn create_collection(&self) -> Result<()> {
        let name = &self.config.collection;
        let dimensions = self.embedding_provider.dimensions();
        bounded(
            self.config.upstream_timeout(),
            "create collection",
            self.vector_store.create_collection(name, dimensions),
            self.store_error(),
        )
        .await
        .inspect_err(|e| error!(collection = %name, error = %e, "failed to create collection"))
    }

    /// Ingest content with caller metadata: chunk → embed → store.
    ///
    /// Blank content stores nothing and reports `chunks_added = 0` with the
    /// current total.
    ///
    /// # Errors
    ///
    /// Returns the embedding or vector store error that stopped ingestion.
    /// Chunks already stored by the call are removed again first; if that
    /// removal also fails, [`RagError::PartialIngestion`] lists the affected ids.
    pub async fn ingest(&self, content: &str, metadata: Metadata) -> Result<IngestReport> {
        self.ingest_document(Document::new(content, metadata)).await
    }

    /// Ingest free-form text, tagged with `source_type = "text"`.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Validation`] for blank text, otherwise as [`ingest`](Self::ingest).
    pub async fn ingest_text(&self, text: &str, metadata: Metadata) -> Result<IngestReport> {
        require_content(text, "text")?;
        let mut metadata = metadata;
        tag(&mut metadata, "source_type", SourceType::Text.as_str());
        self.ingest_document(Document::new(text, metadata)).await
    }

    /// Fetch `url` and ingest its text, tagged with `url` and `source_type = "url"`.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Validation`] for a non-HTTP(S) URL or an empty body,
    /// [`RagError::Fetch`] if the fetch fails or no fetcher is configured,
    /// otherwise as [`ingest`](Self::ingest).
    pub async fn ingest_url(&self, url: &str, metadata: Metadata) -> Result<IngestReport> {
        let url = url.trim();
        parse_http_url(url)?;

        let fetcher = self.fetcher.as_ref().ok_or_else(|| RagError::Fetch {
            url: url.to_string(),
            message: "no URL fetcher is configured".into(),
        })?;

        let body = bounded(self.config.upstream_timeout(), "url fetch", fetcher.fetch(url), {
            let url = url.to_string();
            move |message| RagError::Fetch { url, message }
        })
        .await?;
        require_content(&body, "fetched page")?;

        let mut metadata = metadata;
        tag(&mut metadata, "url", url);
        tag(&mut metadata, "source_type", SourceType::Url.as_str());
        self.ingest_document(Document::new(body, metadata).with_source_uri(url)).await
    }

    /// Decode an uploaded file and ingest it, tagged with `filename`,
    /// `content_type`, and `source_type = "file"`.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::UnsupportedContent`] if the file is not text,
    /// [`RagError::Validation`] if it is empty, otherwise as [`ingest`](Self::ingest).
    pub async fn ingest_file(&self, upload: &FileUpload, metadata: Metadata) -> Result<IngestReport> {
        let text = decode_file(upload)?;
        require_content(&text, "file")?;

        let mut metadata = metadata;
        if let Some(filename) = &upload.filename {
            tag(&mut metadata, "filename", filename.as_str());
        }
        if let Some(content_type) = &upload.content_type {
            tag(&mut metadata, "content_type", content_type.as_str());
        }
        tag(&mut metadata, "source_type", SourceType::File.as_str());
        self.ingest_document(Document::new(text, metadata)).await
    }

    async fn ingest_document(&self, document: Document) -> Result<IngestReport> {
        let timeout = self.config.upstream_timeout();
        let collection = self.config.collection.as_str();

        // 1. Chunk the document
        let mut chunks =
            if document.text.trim().is_empty() { Vec::new() } else { self.chunker.chunk(&document) };

        if chunks.is_empty() {
            let total_documents = self.total_documents().await?;
            info!(document.id = %document.id, chunk_count = 0, "ingested document (empty)");
            return Ok(IngestReport { document_id: document.id, chunks_added: 0, total_documents });
        }

        // 2. Embed every chunk before anything is stored
        let embeddings = self.embed_chunks(&chunks).await.inspect_err(|e| {
            error!(document.id = %document.id, error = %e, "embedding failed during ingestion")
        })?;

        for (chunk, embedding) in chunks.iter_mut().zip(embeddings) {
            chunk.embedding = embedding;
        }

        // 3. Store, then read back the new total; undo the call on failure
        let stored = async {
            bounded(timeout, "upsert", self.vector_store.upsert(collection, &chunks), self.store_error())
                .await?;
            self.total_documents().await
        }
        .await;

        let total_documents = match stored {
            Ok(total) => total,
            Err(e) => {
                error!(document.id = %document.id, error = %e, "storage failed during ingestion, rolling back");
                let ids: Vec<&str> = chunks.iter().map(|c| c.id.as_str()).collect();
                return Err(self.roll_back(&document.id, &ids, e).await);
            }
        };

        let chunk_count = chunks.len();
        info!(document.id = %document.id, chunk_count, total_documents, "ingested document");

        Ok(IngestReport { document_id: document.id, chunks_added: chunk_count, total_documents })
    }

    /// Embed chunk texts in slices of the provider's batch size, each slice
    /// under its own timeout.
    async fn embed_chunks(&self, chunks: &[Chunk]) -> Result<Vec<Vec<f32>>> {
        let provider = self.embedding_provider.name().to_string();
        let batch_size = self.embedding_provider.max_batch_size().max(1);
        let texts: Vec<&str> = chunks.iter().map(|c| c.text.as_str()).collect();

        let mut embeddings = Vec::with_capacity(texts.len());
        for slice in texts.chunks(batch_size) {
            let batch = bounded(
                self.config.upstream_timeout(),
                "chunk embedding",
                self.embedding_provider.embed_batch(slice),
                {
                    let provider = provider.clone();
                    move |message| RagError::EmbeddingError { provider, message }
                },
            )
            .await?;

            if batch.len() != slice.len() {
                return Err(RagError::EmbeddingError {
                    provider,
                    message: format!("expected {} embeddings, received {}", slice.len(), batch.len()),
                });
            }
            embeddings.extend(batch);
        }
        Ok(embeddings)
    }

    /// Remove the entries written by a failed ingestion and return the error to report.
    async fn roll_back(&self, document_id: &str, ids: &[&str], cause: RagError) -> RagError {
        let removed = bounded(
            self.config.upstream_timeout(),
            "rollback delete",
            self.vector_store.delete(&self.config.collection, ids),
            self.store_error(),
        )
        .await;

        match removed {
            Ok(()) => {
                warn!(document.id = %document_id, chunk_count = ids.len(), "rolled back partial ingestion");
                cause
            }
            Err(rollback) => {
                error!(document.id = %document_id, error = %rollback, "rollback failed");
                RagError::PartialIngestion {
                    document_id: document_id.to_string(),
                    stored_ids: ids.iter().map(|id| id.to_string()).collect(),
                    message: format!("{cause}; rollback failed: {rollback}"),
                }
            }
        }
    }

    /// Retrieve matches for `question` using the configured `top_k` and threshold.
    ///
    /// # Errors
    ///
    /// As [`Retriever::retrieve`].
    pub async fn query(&self, question: &str) -> Result<Vec<SearchResult>> {
        self.retriever
            .retrieve(question, self.config.top_k, self.config.similarity_threshold)
            .await
    }

    /// Answer `message` from the knowledge base.
    ///
    /// A missing `conversation_id` starts a new conversation with a fresh UUID.
    /// When nothing relevant is retrieved the model is still asked, so it can
    /// say the information is unavailable, and no sources are returned.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Validation`] for a blank message, otherwise the
    /// embedding, vector store, or generation error that stopped the request.
    pub async fn chat(&self, message: &str, conversation_id: Option<&str>) -> Result<ChatResponse> {
        require_content(message, "message")?;

        let conversation_id = match conversation_id.map(str::trim).filter(|id| !id.is_empty()) {
            Some(id) => id.to_string(),
            None => Uuid::new_v4().to_string(),
        };

        let history = self.conversations.get_history(&conversation_id).await;
        let matches = self.query(message).await?;
        let context = self.assembler.assemble(&matches);

        info!(
            conversation_id = %conversation_id,
            retrieved = matches.len(),
            cited = context.sources.len(),
            history_turns = history.len(),
            "answering chat message"
        );

        self.synthesizer.synthesize(message, &context, &history, &conversation_id).await
    }

    /// Report the number of stored entries.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::VectorStoreError`] if the store cannot be counted.
    pub async fn stats(&self) -> Result<Stats> {
        Ok(Stats {
            total_documents: self.total_documents().await?,
            collection_name: self.config.collection.clone(),
            status: "active".to_string(),
        })
    }

    /// Delete every stored entry by dropping and recreating the collection.
    ///
    /// Conversation histories are kept. An ingestion running concurrently may
    /// interleave with the clear.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::VectorStoreError`] if either step fails.
    pub async fn clear(&self) -> Result<()> {
        let name = &self.config.collection;
        bounded(
            self.config.upstream_timeout(),
            "delete collection",
            self.vector_store.delete_collection(name),
            self.store_error(),
        )
        .await
        .inspect_err(|e| error!(collection = %name, error = %e, "failed to delete collection"))?;

        self.create_collection().await?;
        info!(collection = %name, "knowledge base cleared");
        Ok(())
    }

    async fn total_documents(&self) -> Result<usize> {
        bounded(
            self.config.upstream_timeout(),
            "count",
            self.vector_store.count(&self.config.collection),
            self.store_error(),
        )
        .await
    }
}

fn require_content(content: &str, what: &str) -> Result<()> {
    if content.trim().is_empty() {
        return Err(RagError::Validation(format!("{what} must not be empty")));
    }
    Ok(())
}

/// Set a system metadata key, overriding any caller value.
fn tag(metadata: &mut Metadata, key: &str, value: &str) {
    metadata.insert(key.to_string(), MetadataValue::from(value));
}

/// Builder for constructing a [`RagPipeline`].
///
/// `config`, `embedding_provider`, `vector_store`, and `model` are required.
/// Without a chunker, a [`FixedSizeChunker`] sized from the config is used;
/// without a conversation tracker, one bounded by the config is created.
///
/// # Example
///
/// ```rust,ignore
/// let pipeline = RagPipeline::builder()
///     .config(RagConfig::default())
///     .embedding_provider(Arc::new(embedder))
///     .vector_store(Arc::new(store))
///     .model(Arc::new(model))
///     .fetcher(Arc::new(HttpFetcher::new()?))  // optional
///     .build()?;
/// ```
#[derive(Default)]
pub struct RagPipelineBuilder {
    config: Option<RagConfig>,
    embedding_provider: Option<Arc<dyn EmbeddingProvider>>,
    vector_store: Option<Arc<dyn VectorStore>>,
    model: Option<Arc<dyn GenerativeModel>>,
    chunker: Option<Arc<dyn Chunker>>,
    fetcher: Option<Arc<dyn UrlFetcher>>,
    conversations: Option<ConversationTracker>,
}

impl RagPipelineBuilder {
    /// Set the pipeline configuration.
    pub fn config(mut self, config: RagConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the embedding provider.
    pub fn embedding_provider(mut self, provider: Arc<dyn EmbeddingProvider>) -> Self {
        self.embedding_provider = Some(provider);
        self
    }

    /// Set the vector store backend.
    pub fn vector_store(mut self, store: Arc<dyn VectorStore>) -> Self {
        self.vector_store = Some(store);
        self
    }

    /// Set the generative model.
    pub fn model(mut self, model: Arc<dyn GenerativeModel>) -> Self {
        self.model = Some(model);
        self
    }

    /// Replace the default fixed-size chunker.
    pub fn chunker(mut self, chunker: Arc<dyn Chunker>) -> Self {
        self.chunker = Some(chunker);
        self
    }

    /// Set the fetcher used by [`RagPipeline::ingest_url`].
    pub fn fetcher(mut self, fetcher: Arc<dyn UrlFetcher>) -> Self {
        self.fetcher = Some(fetcher);
        self
    }

    /// Share an existing conversation tracker.
    pub fn conversations(mut self, conversations: ConversationTracker) -> Self {
        self.conversations = Some(conversations);
        self
    }

    /// Build the [`RagPipeline`], validating the config and required fields.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::InvalidConfiguration`] if any required field is
    /// missing or the config is inconsistent.
    pub fn build(self) -> Result<RagPipeline> {
        let config = self
            .config
            .ok_or_else(|| RagError::InvalidConfiguration("config is required".to_string()))?;
        config.validate()?;

        let embedding_provider = self.embedding_provider.ok_or_else(|| {
            RagError::InvalidConfiguration("embedding_provider is required".to_string())
        })?;
        let vector_store = self
            .vector_store
            .ok_or_else(|| RagError::InvalidConfiguration("vector_store is required".to_string()))?;
        let model = self
            .model
            .ok_or_else(|| RagError::InvalidConfiguration("model is required".to_string()))?;

        let chunker: Arc<dyn Chunker> = match self.chunker {
            Some(chunker) => chunker,
            None => Arc::new(FixedSizeChunker::new(config.chunk_size, config.chunk_overlap)?),
        };
        let conversations =
            self.conversations.unwrap_or_else(|| ConversationTracker::from_config(&config));

        let timeout = config.upstream_timeout();
        let retriever = Retriever::new(
            embedding_provider.clone(),
            vector_store.clone(),
            config.collection.clone(),
            timeout,
        );
        let assembler = ContextAssembler::new(config.max_context_chars);
        let synthesizer = AnswerSynthesizer::new(model, conversations.clone(), timeout);

        Ok(RagPipeline {
            config,
            embedding_provider,
            vector_store,
            chunker,
            fetcher: self.fetcher,
            conversations,
            retriever,
            assembler,
            synthesizer,
        })
    }
}
