//! Similarity retrieval over the knowledge base.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};

use crate::document::SearchResult;
use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::upstream::bounded;
use crate::vectorstore::VectorStore;

/// Embeds questions and fetches the most similar stored chunks.
///
/// Results are ordered by descending score and never contain a match scoring
/// below the requested floor. An empty knowledge base, or one with nothing
/// above the floor, yields an empty result rather than an error.
pub struct Retriever {
    embedding_provider: Arc<dyn EmbeddingProvider>,
    vector_store: Arc<dyn VectorStore>,
    collection: String,
    timeout: Duration,
}

impl Retriever {
    /// Create a retriever over `collection`, bounding each collaborator call by `timeout`.
    pub fn new(
        embedding_provider: Arc<dyn EmbeddingProvider>,
        vector_store: Arc<dyn VectorStore>,
        collection: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self { embedding_provider, vector_store, collection: collection.into(), timeout }
    }

    /// Return up to `k` matches for `question` scoring at least `min_score`.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Validation`] for a blank question,
    /// [`RagError::EmbeddingError`] if the question cannot be embedded, and
    /// [`RagError::VectorStoreError`] if the search fails.
    pub async fn retrieve(
        &self,
        question: &str,
        k: usize,
        min_score: f32,
    ) -> Result<Vec<SearchResult>> {
        if question.trim().is_empty() {
            return Err(RagError::Validation("question must not be empty".into()));
        }
        if k == 0 {
            return Ok(Vec::new());
        }

        let provider = self.embedding_provider.name().to_string();
        let query_embedding = bounded(
            self.timeout,
            "question embedding",
            self.embedding_provider.embed(question),
            |message| RagError::EmbeddingError { provider, message },
        )
        .await?;

        let backend = self.vector_store.backend().to_string();
        let mut results = bounded(
            self.timeout,
            "vector search",
            self.vector_store.search(&self.collection, &query_embedding, k),
            |message| RagError::VectorStoreError { backend, message },
        )
        .await?;

        let candidates = results.len();
        results.retain(|r| r.score >= min_score);
        results.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        results.truncate(k);

        debug!(candidates, min_score, "filtered search results by similarity floor");
        info!(collection = %self.collection, result_count = results.len(), "retrieval completed");

        Ok(results)
    }
}
