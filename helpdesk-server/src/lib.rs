//! `helpdesk-server` exposes the helpdesk knowledge base over HTTP.
//! Content is ingested through `/api/ingest/*` and questions are answered by
//! `/api/chat`, backed by Gemini and an in-memory or Qdrant vector store.

pub mod config;
pub mod error;
pub mod server;

pub use config::ServerConfig;
pub use error::ApiError;
pub use server::{AppState, app_router, build_pipeline, run_server};
