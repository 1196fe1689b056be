//! Server configuration read from the environment.

use std::fmt::Display;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, anyhow};
use helpdesk_rag::RagConfig;

/// Everything needed to start the server.
#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub gemini_api_key: String,
    /// Overrides the Gemini embedding model.
    pub embedding_model: Option<String>,
    /// Overrides the Gemini generation model.
    pub generation_model: Option<String>,
    /// When set, chunks are stored in Qdrant instead of in memory.
    pub qdrant_url: Option<String>,
    pub fetch_timeout: Duration,
    pub rag: RagConfig,
}

impl ServerConfig {
    /// Read the configuration from process environment variables.
    ///
    /// | Variable | Default |
    /// |----------|---------|
    /// | `HOST` | `0.0.0.0` |
    /// | `PORT` | `8000` |
    /// | `GEMINI_API_KEY` | required |
    /// | `GEMINI_EMBEDDING_MODEL` | provider default |
    /// | `GEMINI_GENERATION_MODEL` | provider default |
    /// | `QDRANT_URL` | unset (in-memory store) |
    /// | `FETCH_TIMEOUT_SECS` | `10` |
    /// | `RAG_CHUNK_SIZE`, `RAG_CHUNK_OVERLAP`, `RAG_TOP_K`, `RAG_SIMILARITY_THRESHOLD`, `RAG_MAX_CONTEXT_CHARS` | [`RagConfig::default`] |
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary variable source.
    ///
    /// Blank values count as unset. Malformed numbers and inconsistent
    /// knowledge-base parameters are errors.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let var = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let gemini_api_key =
            var("GEMINI_API_KEY").ok_or_else(|| anyhow!("GEMINI_API_KEY must be set"))?;

        let mut rag = RagConfig::builder();
        if let Some(size) = parse(var("RAG_CHUNK_SIZE"), "RAG_CHUNK_SIZE")? {
            rag = rag.chunk_size(size);
        }
        if let Some(overlap) = parse(var("RAG_CHUNK_OVERLAP"), "RAG_CHUNK_OVERLAP")? {
            rag = rag.chunk_overlap(overlap);
        }
        if let Some(k) = parse(var("RAG_TOP_K"), "RAG_TOP_K")? {
            rag = rag.top_k(k);
        }
        if let Some(threshold) = parse(var("RAG_SIMILARITY_THRESHOLD"), "RAG_SIMILARITY_THRESHOLD")? {
            rag = rag.similarity_threshold(threshold);
        }
        if let Some(max_chars) = parse(var("RAG_MAX_CONTEXT_CHARS"), "RAG_MAX_CONTEXT_CHARS")? {
            rag = rag.max_context_chars(max_chars);
        }
        let rag = rag.build().context("invalid knowledge-base configuration")?;

        let fetch_timeout_secs: u64 =
            parse(var("FETCH_TIMEOUT_SECS"), "FETCH_TIMEOUT_SECS")?.unwrap_or(10);
        if fetch_timeout_secs == 0 {
            return Err(anyhow!("FETCH_TIMEOUT_SECS must be greater than zero"));
        }

        Ok(Self {
            host: var("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port: parse(var("PORT"), "PORT")?.unwrap_or(8000),
            gemini_api_key,
            embedding_model: var("GEMINI_EMBEDDING_MODEL"),
            generation_model: var("GEMINI_GENERATION_MODEL"),
            qdrant_url: var("QDRANT_URL"),
            fetch_timeout: Duration::from_secs(fetch_timeout_secs),
            rag,
        })
    }
}

fn parse<T>(value: Option<String>, key: &str) -> anyhow::Result<Option<T>>
where
    T: FromStr,
    T::Err: Display,
{
    value
        .map(|raw| raw.parse::<T>().map_err(|e| anyhow!("{key}={raw:?} is not valid: {e}")))
        .transpose()
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config(vars: &[(&str, &str)]) -> anyhow::Result<ServerConfig> {
        let vars: HashMap<String, String> =
            vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        ServerConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_apply_when_only_the_key_is_set() {
        let config = config(&[("GEMINI_API_KEY", "key")]).unwrap();
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 8000);
        assert_eq!(config.fetch_timeout, Duration::from_secs(10));
        assert!(config.qdrant_url.is_none());
        assert_eq!(config.rag, RagConfig::default());
    }

    #[test]
    fn api_key_is_required() {
        assert!(config(&[]).is_err());
        assert!(config(&[("GEMINI_API_KEY", "  ")]).is_err());
    }

    #[test]
    fn overrides_are_applied() {
        let config = config(&[
            ("GEMINI_API_KEY", "key"),
            ("PORT", "9001"),
            ("QDRANT_URL", "http://qdrant:6334"),
            ("RAG_CHUNK_SIZE", "500"),
            ("RAG_CHUNK_OVERLAP", "50"),
            ("RAG_TOP_K", "3"),
            ("RAG_SIMILARITY_THRESHOLD", "0.25"),
        ])
        .unwrap();

        assert_eq!(config.port, 9001);
        assert_eq!(config.qdrant_url.as_deref(), Some("http://qdrant:6334"));
        assert_eq!(config.rag.chunk_size, 500);
        assert_eq!(config.rag.chunk_overlap, 50);
        assert_eq!(config.rag.top_k, 3);
        assert_eq!(config.rag.similarity_threshold, 0.25);
    }

    #[test]
    fn malformed_values_fail_startup() {
        assert!(config(&[("GEMINI_API_KEY", "key"), ("PORT", "eighty")]).is_err());
        assert!(config(&[("GEMINI_API_KEY", "key"), ("RAG_TOP_K", "-1")]).is_err());
        assert!(config(&[("GEMINI_API_KEY", "key"), ("RAG_CHUNK_OVERLAP", "1000")]).is_err());
        assert!(config(&[("GEMINI_API_KEY", "key"), ("FETCH_TIMEOUT_SECS", "0")]).is_err());
    }
}
