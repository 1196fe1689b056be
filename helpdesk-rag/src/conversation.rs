//! Rolling per-conversation question/answer history.
//!
//! Memory is bounded three ways: each conversation keeps at most `max_turns`
//! turns (oldest dropped first), conversations idle for longer than
//! `idle_ttl` expire, and once `max_conversations` are held the least recently
//! active one is evicted to make room for a new id.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::debug;

use crate::config::RagConfig;

/// One exchange in a conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    /// The user's question.
    pub question: String,
    /// The answer that was returned.
    pub answer: String,
    /// When the turn was recorded.
    pub created_at: DateTime<Utc>,
}

#[derive(Debug)]
struct Entry {
    turns: VecDeque<Turn>,
    last_active: Instant,
}

impl Entry {
    fn new() -> Self {
        Self { turns: VecDeque::new(), last_active: Instant::now() }
    }
}

/// Tracks conversation histories keyed by an opaque id.
///
/// Cloning is cheap and clones share state. An append evicts, inserts, and
/// pushes under one write lock, so a turn can never land in a conversation
/// that was evicted concurrently. Reads share the lock.
#[derive(Debug, Clone)]
pub struct ConversationTracker {
    conversations: Arc<RwLock<HashMap<String, Entry>>>,
    max_turns: usize,
    max_conversations: usize,
    idle_ttl: Duration,
}

impl ConversationTracker {
    /// Create a tracker with explicit bounds.
    ///
    /// `max_turns` and `max_conversations` are raised to at least one.
    pub fn new(max_turns: usize, max_conversations: usize, idle_ttl: Duration) -> Self {
        Self {
            conversations: Arc::new(RwLock::new(HashMap::new())),
            max_turns: max_turns.max(1),
            max_conversations: max_conversations.max(1),
            idle_ttl,
        }
    }

    /// Create a tracker using the bounds in `config`.
    pub fn from_config(config: &RagConfig) -> Self {
        Self::new(config.max_history_turns, config.max_conversations, config.conversation_idle_ttl())
    }

    /// Return the turns recorded for `id`, oldest first.
    ///
    /// Unknown and expired ids yield an empty history.
    pub async fn get_history(&self, id: &str) -> Vec<Turn> {
        let conversations = self.conversations.read().await;
        match conversations.get(id) {
            Some(entry) if entry.last_active.elapsed() < self.idle_ttl => {
                entry.turns.iter().cloned().collect()
            }
            _ => Vec::new(),
        }
    }

    /// Record a turn for `id`, creating the conversation if needed.
    pub async fn append(&self, id: &str, question: impl Into<String>, answer: impl Into<String>) {
        let turn = Turn { question: question.into(), answer: answer.into(), created_at: Utc::now() };

        let mut conversations = self.conversations.write().await;
        self.evict(&mut conversations, id);

        let entry = conversations.entry(id.to_string()).or_insert_with(Entry::new);
        entry.last_active = Instant::now();
        entry.turns.push_back(turn);
        while entry.turns.len() > self.max_turns {
            entry.turns.pop_front();
        }
    }

    /// Number of conversations currently held, including ones that have
    /// expired but not yet been swept.
    pub async fn len(&self) -> usize {
        self.conversations.read().await.len()
    }

    /// Whether no conversations are held.
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Drop expired conversations and, if a new id would exceed the cap, the
    /// least recently active one.
    fn evict(&self, conversations: &mut HashMap<String, Entry>, incoming: &str) {
        let before = conversations.len();
        conversations.retain(|_, entry| entry.last_active.elapsed() < self.idle_ttl);
        let expired = before - conversations.len();

        if !conversations.contains_key(incoming) {
            while conversations.len() >= self.max_conversations {
                let oldest = conversations
                    .iter()
                    .min_by_key(|(_, entry)| entry.last_active)
                    .map(|(id, _)| id.clone());
                match oldest {
                    Some(oldest) => {
                        debug!(conversation_id = %oldest, "evicting least recently used conversation");
                        conversations.remove(&oldest);
                    }
                    None => break,
                }
            }
        }

        if expired > 0 {
            debug!(expired, "dropped idle conversations");
        }
    }
}

impl Default for ConversationTracker {
    fn default() -> Self {
        Self::from_config(&RagConfig::default())
    }
}
