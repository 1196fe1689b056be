//! Error types for the `helpdesk-rag` crate.

use thiserror::Error;

/// Errors that can occur in knowledge-base operations.
///
/// Every collaborator failure reaches the caller as one of these kinds.
/// Timeouts are reported as the error kind of the collaborator that timed out.
#[derive(Debug, Error)]
pub enum RagError {
    /// Empty or malformed input supplied by the caller.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Uploaded content that cannot be decoded as text.
    #[error("Unsupported content: {0}")]
    UnsupportedContent(String),

    /// Fetching a URL for ingestion failed.
    #[error("Fetch error ({url}): {message}")]
    Fetch {
        /// The URL that could not be fetched.
        url: String,
        /// A description of the failure.
        message: String,
    },

    /// An error occurred during embedding generation.
    #[error("Embedding error ({provider}): {message}")]
    EmbeddingError {
        /// The embedding provider that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// An error occurred in the vector store backend.
    #[error("Vector store error ({backend}): {message}")]
    VectorStoreError {
        /// The vector store backend that produced the error.
        backend: String,
        /// A description of the failure.
        message: String,
    },

    /// The generative model failed to produce an answer.
    #[error("Generation error ({provider}): {message}")]
    GenerationError {
        /// The model provider that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// Configuration parameters violate an invariant.
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// An ingestion failed and the chunks it had already stored could not be
    /// removed again.
    #[error(
        "Partial ingestion of document '{document_id}': {} chunk(s) may remain stored: {message}",
        stored_ids.len()
    )]
    PartialIngestion {
        /// The document whose ingestion failed.
        document_id: String,
        /// Identifiers of entries that may still be present in the store.
        stored_ids: Vec<String>,
        /// A description of the original failure and the rollback failure.
        message: String,
    },
}

impl RagError {
    /// Whether the error was caused by the caller's input rather than an
    /// upstream collaborator.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::Validation(_) | Self::UnsupportedContent(_))
    }

    /// A short, stable label for the error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation_error",
            Self::UnsupportedContent(_) => "unsupported_content",
            Self::Fetch { .. } => "upstream_fetch_error",
            Self::EmbeddingError { .. } => "embedding_error",
            Self::VectorStoreError { .. } => "vector_store_error",
            Self::GenerationError { .. } => "generation_error",
            Self::InvalidConfiguration(_) => "invalid_configuration",
            Self::PartialIngestion { .. } => "partial_ingestion",
        }
    }
}

/// A convenience result type for knowledge-base operations.
pub type Result<T> = std::result::Result<T, RagError>;
