//! Qdrant vector store backend.
//!
//! Provides [`QdrantVectorStore`] which implements [`VectorStore`] using
//! the [qdrant-client](https://docs.rs/qdrant-client) crate over gRPC.
//!
//! # Example
//!
//! ```rust,ignore
//! use helpdesk_rag::qdrant::QdrantVectorStore;
//!
//! let store = QdrantVectorStore::new("http://localhost:6334")?;
//! store.create_collection("customer_support_kb", 3072).await?;
//! store.upsert("customer_support_kb", &chunks).await?;
//! let results = store.search("customer_support_kb", &query_embedding, 5).await?;
//! ```

use async_trait::async_trait;
use qdrant_client::qdrant::point_id::PointIdOptions;
use qdrant_client::qdrant::value::Kind;
use qdrant_client::qdrant::{
    CountPointsBuilder, CreateCollectionBuilder, DeletePointsBuilder, Distance, PointStruct,
    PointsIdsList, ScoredPoint, SearchPointsBuilder, UpsertPointsBuilder, Value as QdrantValue,
    VectorParamsBuilder,
};
use qdrant_client::{Payload, Qdrant};
use serde_json::{Map, Value};
use tracing::debug;

use crate::document::{Chunk, Metadata, MetadataValue, SearchResult};
use crate::error::{RagError, Result};
use crate::vectorstore::VectorStore;

const BACKEND: &str = "qdrant";

/// A [`VectorStore`] backed by [Qdrant](https://qdrant.tech/).
///
/// Wraps a [`qdrant_client::Qdrant`] client and maps collections to Qdrant
/// collections with cosine distance. Chunk metadata is stored as a typed
/// Qdrant payload and read back with the same scalar types.
pub struct QdrantVectorStore {
    client: Qdrant,
}

impl QdrantVectorStore {
    /// Create a new Qdrant vector store connecting to the given URL.
    pub fn new(url: &str) -> Result<Self> {
        let client = Qdrant::from_url(url).build().map_err(Self::map_err)?;
        Ok(Self { client })
    }

    /// Create a new Qdrant vector store with default URL (`http://localhost:6334`).
    pub fn default_url() -> Result<Self> {
        Self::new("http://localhost:6334")
    }

    /// Create a new Qdrant vector store from an existing client.
    pub fn from_client(client: Qdrant) -> Self {
        Self { client }
    }

    fn map_err(e: qdrant_client::QdrantError) -> RagError {
        RagError::VectorStoreError { backend: BACKEND.to_string(), message: e.to_string() }
    }

    fn payload(chunk: &Chunk) -> Result<Payload> {
        let metadata: Map<String, Value> =
            chunk.metadata.iter().map(|(k, v)| (k.clone(), v.to_json())).collect();

        let mut payload = Map::new();
        payload.insert("text".to_string(), Value::String(chunk.text.clone()));
        payload.insert("document_id".to_string(), Value::String(chunk.document_id.clone()));
        payload.insert("metadata".to_string(), Value::Object(metadata));

        Payload::try_from(Value::Object(payload)).map_err(Self::map_err)
    }

    /// Extract a string from a Qdrant payload value.
    fn extract_string(value: &QdrantValue) -> Option<String> {
        match &value.kind {
            Some(Kind::StringValue(s)) => Some(s.clone()),
            _ => None,
        }
    }

    /// Convert a scalar payload value back into metadata. Other kinds are dropped.
    fn extract_metadata_value(value: &QdrantValue) -> Option<MetadataValue> {
        match &value.kind {
            Some(Kind::StringValue(s)) => Some(MetadataValue::String(s.clone())),
            Some(Kind::IntegerValue(n)) => Some(MetadataValue::Integer(*n)),
            Some(Kind::DoubleValue(x)) => Some(MetadataValue::Float(*x)),
            Some(Kind::BoolValue(b)) => Some(MetadataValue::Bool(*b)),
            _ => None,
        }
    }

    fn to_search_result(scored: ScoredPoint) -> SearchResult {
        let id = scored
            .id
            .as_ref()
            .and_then(|pid| match &pid.point_id_options {
                Some(PointIdOptions::Uuid(s)) => Some(s.clone()),
                Some(PointIdOptions::Num(n)) => Some(n.to_string()),
                None => None,
            })
            .unwrap_or_default();

        let text = scored.payload.get("text").and_then(Self::extract_string).unwrap_or_default();
        let document_id =
            scored.payload.get("document_id").and_then(Self::extract_string).unwrap_or_default();

        let metadata: Metadata = scored
            .payload
            .get("metadata")
            .and_then(|v| match &v.kind {
                Some(Kind::StructValue(s)) => Some(
                    s.fields
                        .iter()
                        .filter_map(|(k, v)| {
                            Self::extract_metadata_value(v).map(|value| (k.clone(), value))
                        })
                        .collect(),
                ),
                _ => None,
            })
            .unwrap_or_default();

        SearchResult {
            chunk: Chunk { id, text, embedding: vec![], metadata, document_id },
            // cosine scores from qdrant range over [-1, 1]
            score: scored.score.clamp(0.0, 1.0),
        }
    }
}

#[async_trait]
impl VectorStore for QdrantVectorStore {
    async fn create_collection(&self, name: &str, dimensions: usize) -> Result<()> {
        let exists = self.client.collection_exists(name).await.map_err(Self::map_err)?;
        if exists {
            debug!(collection = name, "qdrant collection already exists, skipping creation");
            return Ok(());
        }

        self.client
            .create_collection(
                CreateCollectionBuilder::new(name)
                    .vectors_config(VectorParamsBuilder::new(dimensions as u64, Distance::Cosine)),
            )
            .await
            .map_err(Self::map_err)?;

        debug!(collection = name, dimensions, "created qdrant collection");
        Ok(())
    }

    async fn delete_collection(&self, name: &str) -> Result<()> {
        self.client.delete_collection(name).await.map_err(Self::map_err)?;
        debug!(collection = name, "deleted qdrant collection");
        Ok(())
    }

    async fn upsert(&self, collection: &str, chunks: &[Chunk]) -> Result<()> {
        if chunks.is_empty() {
            return Ok(());
        }

        let points = chunks
            .iter()
            .map(|chunk| {
                Ok(PointStruct::new(chunk.id.clone(), chunk.embedding.clone(), Self::payload(chunk)?))
            })
            .collect::<Result<Vec<PointStruct>>>()?;

        self.client
            .upsert_points(UpsertPointsBuilder::new(collection, points).wait(true))
            .await
            .map_err(Self::map_err)?;

        debug!(collection, count = chunks.len(), "upserted chunks to qdrant");
        Ok(())
    }

    async fn delete(&self, collection: &str, ids: &[&str]) -> Result<()> {
        if ids.is_empty() {
            return Ok(());
        }

        let point_ids: Vec<qdrant_client::qdrant::PointId> =
            ids.iter().map(|id| (*id).into()).collect();

        self.client
            .delete_points(
                DeletePointsBuilder::new(collection)
                    .points(PointsIdsList { ids: point_ids })
                    .wait(true),
            )
            .await
            .map_err(Self::map_err)?;

        debug!(collection, count = ids.len(), "deleted points from qdrant");
        Ok(())
    }

    async fn search(
        &self,
        collection: &str,
        embedding: &[f32],
        top_k: usize,
    ) -> Result<Vec<SearchResult>> {
        if top_k == 0 {
            return Ok(Vec::new());
        }

        let response = self
            .client
            .search_points(
                SearchPointsBuilder::new(collection, embedding.to_vec(), top_k as u64)
                    .with_payload(true),
            )
            .await
            .map_err(Self::map_err)?;

        Ok(response.result.into_iter().map(Self::to_search_result).collect())
    }

    async fn count(&self, collection: &str) -> Result<usize> {
        let response = self
            .client
            .count(CountPointsBuilder::new(collection).exact(true))
            .await
            .map_err(Self::map_err)?;

        Ok(response.result.map(|r| r.count as usize).unwrap_or(0))
    }

    fn backend(&self) -> &str {
        BACKEND
    }
}
