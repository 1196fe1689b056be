//! # helpdesk-rag
//!
//! A retrieval-augmented customer-support knowledge base.
//!
//! ## Overview
//!
//! Content is ingested as text, fetched URLs, or uploaded files, split into
//! overlapping chunks, embedded, and stored in a vector store. Questions are
//! answered by retrieving the closest chunks, assembling them into a numbered
//! context block, and asking a generative model to answer from that context
//! only, with per-conversation history.
//!
//! - [`RagPipeline`] - the handle over the knowledge base (ingest, chat, stats, clear)
//! - [`FixedSizeChunker`] / [`SentenceChunker`] - text splitting
//! - [`InMemoryVectorStore`] - a vector store with no external dependencies
//! - [`ConversationTracker`] - bounded in-memory conversation history
//!
//! ## Features
//!
//! | Feature | Adds |
//! |---------|------|
//! | `http` | [`HttpFetcher`] for URL ingestion |
//! | `gemini` | `gemini::GeminiEmbeddingProvider`, `gemini::GeminiModel` |
//! | `openai` | `openai::OpenAIEmbeddingProvider`, `openai::OpenAIChatModel` |
//! | `qdrant` | `qdrant::QdrantVectorStore` |

pub mod chunking;
pub mod config;
pub mod context;
pub mod conversation;
pub mod document;
pub mod embedding;
pub mod error;
pub mod fetch;
pub mod generation;
pub mod ingest;
pub mod inmemory;
pub mod pipeline;
pub mod retriever;
pub mod synthesis;
pub mod vectorstore;

mod upstream;

#[cfg(feature = "gemini")]
pub mod gemini;
#[cfg(feature = "openai")]
pub mod openai;
#[cfg(feature = "qdrant")]
pub mod qdrant;

pub use chunking::{Chunker, FixedSizeChunker, SentenceChunker, chunk_text};
pub use config::{RagConfig, RagConfigBuilder};
pub use context::{AssembledContext, ContextAssembler, assemble};
pub use conversation::{ConversationTracker, Turn};
pub use document::{Chunk, Document, Metadata, MetadataValue, SearchResult, metadata_from_json};
pub use embedding::EmbeddingProvider;
pub use error::{RagError, Result};
#[cfg(feature = "http")]
pub use fetch::HttpFetcher;
pub use fetch::{UrlFetcher, extract_text, parse_http_url};
pub use generation::GenerativeModel;
pub use ingest::{FileUpload, IngestReport, SourceType, decode_file};
pub use inmemory::{InMemoryVectorStore, cosine_similarity};
pub use pipeline::{RagPipeline, RagPipelineBuilder, Stats};
pub use retriever::Retriever;
pub use synthesis::{AnswerSynthesizer, ChatResponse, Source, build_prompt};
pub use vectorstore::VectorStore;
