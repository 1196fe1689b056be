//! Configuration for the knowledge-base pipeline.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{RagError, Result};

/// Configuration parameters for the knowledge-base pipeline.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RagConfig {
    /// Maximum chunk size in characters.
    pub chunk_size: usize,
    /// Number of overlapping characters between consecutive chunks.
    pub chunk_overlap: usize,
    /// Number of top results to return from vector search.
    pub top_k: usize,
    /// Minimum similarity score for results (results below this are filtered out).
    pub similarity_threshold: f32,
    /// Maximum length of the assembled context block in characters.
    pub max_context_chars: usize,
    /// Number of question/answer turns kept per conversation.
    pub max_history_turns: usize,
    /// Number of conversations kept in memory before the least recently used is evicted.
    pub max_conversations: usize,
    /// Seconds of inactivity after which a conversation expires.
    pub conversation_idle_ttl_secs: u64,
    /// Upper bound in seconds on any single embedding, vector store, or generation call.
    pub upstream_timeout_secs: u64,
    /// Name of the vector store collection backing the knowledge base.
    pub collection: String,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 200,
            top_k: 5,
            similarity_threshold: 0.0,
            max_context_chars: 4000,
            max_history_turns: 10,
            max_conversations: 1000,
            conversation_idle_ttl_secs: 3600,
            upstream_timeout_secs: 30,
            collection: "customer_support_kb".to_string(),
        }
    }
}

impl RagConfig {
    /// Create a new builder for constructing a [`RagConfig`].
    pub fn builder() -> RagConfigBuilder {
        RagConfigBuilder::default()
    }

    /// The bound applied to each collaborator call.
    pub fn upstream_timeout(&self) -> Duration {
        Duration::from_secs(self.upstream_timeout_secs)
    }

    /// The idle period after which a conversation is dropped.
    pub fn conversation_idle_ttl(&self) -> Duration {
        Duration::from_secs(self.conversation_idle_ttl_secs)
    }

    /// Check that the parameters are consistent.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::InvalidConfiguration`] describing the first violated
    /// constraint.
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(invalid("chunk_size must be greater than zero"));
        }
        if self.chunk_overlap >= self.chunk_size {
            return Err(RagError::InvalidConfiguration(format!(
                "chunk_overlap ({}) must be less than chunk_size ({})",
                self.chunk_overlap, self.chunk_size
            )));
        }
        if self.top_k == 0 {
            return Err(invalid("top_k must be greater than zero"));
        }
        if !(0.0..=1.0).contains(&self.similarity_threshold) {
            return Err(RagError::InvalidConfiguration(format!(
                "similarity_threshold ({}) must be within [0, 1]",
                self.similarity_threshold
            )));
        }
        if self.max_context_chars == 0 {
            return Err(invalid("max_context_chars must be greater than zero"));
        }
        if self.max_history_turns == 0 {
            return Err(invalid("max_history_turns must be greater than zero"));
        }
        if self.max_conversations == 0 {
            return Err(invalid("max_conversations must be greater than zero"));
        }
        if self.conversation_idle_ttl_secs == 0 {
            return Err(invalid("conversation_idle_ttl_secs must be greater than zero"));
        }
        if self.upstream_timeout_secs == 0 {
            return Err(invalid("upstream_timeout_secs must be greater than zero"));
        }
        if self.collection.trim().is_empty() {
            return Err(invalid("collection must not be empty"));
        }
        Ok(())
    }
}

fn invalid(message: &str) -> RagError {
    RagError::InvalidConfiguration(message.to_string())
}

/// Builder for constructing a validated [`RagConfig`].
#[derive(Debug, Clone, Default)]
pub struct RagConfigBuilder {
    config: RagConfig,
}

impl RagConfigBuilder {
    /// Set the maximum chunk size in characters.
    pub fn chunk_size(mut self, size: usize) -> Self {
        self.config.chunk_size = size;
        self
    }

    /// Set the overlap between consecutive chunks in characters.
    pub fn chunk_overlap(mut self, overlap: usize) -> Self {
        self.config.chunk_overlap = overlap;
        self
    }

    /// Set the number of top results to return from vector search.
    pub fn top_k(mut self, k: usize) -> Self {
        self.config.top_k = k;
        self
    }

    /// Set the minimum similarity threshold for filtering results.
    pub fn similarity_threshold(mut self, threshold: f32) -> Self {
        self.config.similarity_threshold = threshold;
        self
    }

    /// Set the context block budget in characters.
    pub fn max_context_chars(mut self, max_chars: usize) -> Self {
        self.config.max_context_chars = max_chars;
        self
    }

    /// Set the number of turns kept per conversation.
    pub fn max_history_turns(mut self, turns: usize) -> Self {
        self.config.max_history_turns = turns;
        self
    }

    /// Set the number of conversations kept in memory.
    pub fn max_conversations(mut self, conversations: usize) -> Self {
        self.config.max_conversations = conversations;
        self
    }

    /// Set the conversation idle expiry.
    pub fn conversation_idle_ttl(mut self, ttl: Duration) -> Self {
        self.config.conversation_idle_ttl_secs = ttl.as_secs();
        self
    }

    /// Set the timeout applied to each collaborator call.
    pub fn upstream_timeout(mut self, timeout: Duration) -> Self {
        self.config.upstream_timeout_secs = timeout.as_secs();
        self
    }

    /// Set the vector store collection name.
    pub fn collection(mut self, name: impl Into<String>) -> Self {
        self.config.collection = name.into();
        self
    }

    /// Build the [`RagConfig`], validating that parameters are consistent.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::InvalidConfiguration`] if:
    /// - `chunk_size == 0` or `chunk_overlap >= chunk_size`
    /// - `top_k == 0`
    /// - `similarity_threshold` is outside `[0, 1]`
    /// - any budget, cap, or timeout is zero
    pub fn build(self) -> Result<RagConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}
