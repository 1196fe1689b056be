//! In-memory vector store using cosine similarity.
//!
//! [`InMemoryVectorStore`] is the server's default store when no Qdrant URL is
//! configured. Entries live for the lifetime of the process.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::document::{Chunk, SearchResult};
use crate::error::{RagError, Result};
use crate::vectorstore::VectorStore;

const BACKEND: &str = "InMemory";

/// An in-memory vector store using cosine similarity for search.
///
/// Each collection remembers the dimensionality it was created with and
/// rejects embeddings of any other length, so a misconfigured embedder fails
/// loudly instead of scoring zero against every entry. Ties in score are
/// broken by chunk id, which keeps search results deterministic.
///
/// # Example
///
/// ```rust,ignore
/// use helpdesk_rag::{InMemoryVectorStore, VectorStore};
///
/// let store = InMemoryVectorStore::new();
/// store.create_collection("customer_support_kb", 3072).await?;
/// ```
#[derive(Debug, Default)]
pub struct InMemoryVectorStore {
    collections: RwLock<HashMap<String, Collection>>,
}

#[derive(Debug)]
struct Collection {
    dimensions: usize,
    entries: HashMap<String, Chunk>,
}

impl Collection {
    fn check_dimensions(&self, name: &str, len: usize) -> Result<()> {
        if len != self.dimensions {
            return Err(store_error(format!(
                "collection '{name}' expects {}-dimensional vectors, got {len}",
                self.dimensions
            )));
        }
        Ok(())
    }
}

impl InMemoryVectorStore {
    /// Create a new empty in-memory vector store.
    pub fn new() -> Self {
        Self::default()
    }
}

fn store_error(message: String) -> RagError {
    RagError::VectorStoreError { backend: BACKEND.to_string(), message }
}

fn missing_collection(collection: &str) -> RagError {
    store_error(format!("collection '{collection}' does not exist"))
}

/// Compute cosine similarity between two vectors, clamped into `[0, 1]`.
///
/// Opposite directions score 0. Returns 0.0 if either vector has zero
/// magnitude or the lengths differ.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }
    let (dot, norm_a, norm_b) = a
        .iter()
        .zip(b)
        .fold((0.0f32, 0.0f32, 0.0f32), |(dot, na, nb), (x, y)| (dot + x * y, na + x * x, nb + y * y));
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    (dot / (norm_a.sqrt() * norm_b.sqrt())).clamp(0.0, 1.0)
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    /// Idempotent for an existing collection of the same dimensionality.
    async fn create_collection(&self, name: &str, dimensions: usize) -> Result<()> {
        let mut collections = self.collections.write().await;
        match collections.get(name) {
            Some(existing) if existing.dimensions != dimensions => Err(store_error(format!(
                "collection '{name}' already exists with {} dimensions",
                existing.dimensions
            ))),
            Some(_) => Ok(()),
            None => {
                collections
                    .insert(name.to_string(), Collection { dimensions, entries: HashMap::new() });
                Ok(())
            }
        }
    }

    async fn delete_collection(&self, name: &str) -> Result<()> {
        self.collections.write().await.remove(name);
        Ok(())
    }

    /// All-or-nothing: a batch with any mis-sized embedding stores nothing.
    async fn upsert(&self, collection: &str, chunks: &[Chunk]) -> Result<()> {
        let mut collections = self.collections.write().await;
        let target =
            collections.get_mut(collection).ok_or_else(|| missing_collection(collection))?;

        for chunk in chunks {
            target.check_dimensions(collection, chunk.embedding.len())?;
        }
        target.entries.extend(chunks.iter().map(|chunk| (chunk.id.clone(), chunk.clone())));
        Ok(())
    }

    async fn delete(&self, collection: &str, ids: &[&str]) -> Result<()> {
        let mut collections = self.collections.write().await;
        let target =
            collections.get_mut(collection).ok_or_else(|| missing_collection(collection))?;
        target.entries.retain(|id, _| !ids.contains(&id.as_str()));
        Ok(())
    }

    async fn search(
        &self,
        collection: &str,
        embedding: &[f32],
        top_k: usize,
    ) -> Result<Vec<SearchResult>> {
        let collections = self.collections.read().await;
        let source = collections.get(collection).ok_or_else(|| missing_collection(collection))?;
        source.check_dimensions(collection, embedding.len())?;
        if top_k == 0 {
            return Ok(Vec::new());
        }

        let mut scored: Vec<(f32, &Chunk)> = source
            .entries
            .values()
            .map(|chunk| (cosine_similarity(&chunk.embedding, embedding), chunk))
            .collect();
        scored.sort_by(|(sa, a), (sb, b)| sb.total_cmp(sa).then_with(|| a.id.cmp(&b.id)));

        Ok(scored
            .into_iter()
            .take(top_k)
            .map(|(score, chunk)| SearchResult { chunk: chunk.clone(), score })
            .collect())
    }

    async fn count(&self, collection: &str) -> Result<usize> {
        let collections = self.collections.read().await;
        collections
            .get(collection)
            .map(|c| c.entries.len())
            .ok_or_else(|| missing_collection(collection))
    }

    fn backend(&self) -> &str {
        BACKEND
    }
}
