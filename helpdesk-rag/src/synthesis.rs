//! Grounded answer synthesis.
//!
//! [`build_prompt`] constrains the model to the numbered passages of an
//! [`AssembledContext`]; [`AnswerSynthesizer`] sends that prompt once, records
//! the turn, and returns the answer alongside the passages it was given.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::context::AssembledContext;
use crate::conversation::{ConversationTracker, Turn};
use crate::document::{Metadata, SearchResult};
use crate::error::{RagError, Result};
use crate::generation::GenerativeModel;
use crate::upstream::bounded;

const INSTRUCTIONS: &str = "You are a customer representative. Answer the customer's question \
using only the knowledge base below.

Please:
1. Respond in English
2. Be helpful and professional
3. Only use information from the knowledge base; cite passages by their [number]
4. If the answer is not in the knowledge base, say so and suggest another way to get help
5. Give short and clear answers";

const EMPTY_KNOWLEDGE_BASE: &str = "(no relevant knowledge base entries were found)";

/// A passage cited by an answer, exactly as retrieval produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Source {
    /// The chunk text.
    pub content: String,
    /// The chunk metadata.
    pub metadata: Metadata,
    /// The retrieval similarity score.
    pub similarity_score: f32,
}

impl From<&SearchResult> for Source {
    fn from(result: &SearchResult) -> Self {
        Self {
            content: result.chunk.text.clone(),
            metadata: result.chunk.metadata.clone(),
            similarity_score: result.score,
        }
    }
}

/// The answer to a chat message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatResponse {
    /// The model's answer.
    pub response: String,
    /// The conversation the turn was recorded under.
    pub conversation_id: String,
    /// The passages supplied to the model, in context order.
    pub sources: Vec<Source>,
}

/// Build the prompt for `question`.
///
/// History is rendered oldest turn first, followed by the context block and
/// the question.
pub fn build_prompt(question: &str, context_block: &str, history: &[Turn]) -> String {
    let mut prompt = String::from(INSTRUCTIONS);

    if !history.is_empty() {
        prompt.push_str("\n\nConversation so far:\n");
        for turn in history {
            prompt.push_str(&format!("Customer: {}\nRepresentative: {}\n", turn.question, turn.answer));
        }
    }

    prompt.push_str("\n\nKnowledge Base:\n");
    if context_block.trim().is_empty() {
        prompt.push_str(EMPTY_KNOWLEDGE_BASE);
    } else {
        prompt.push_str(context_block);
    }

    prompt.push_str(&format!("\n\nCustomer Question: {question}\n\nResponse:"));
    prompt
}

/// Composes answers with a [`GenerativeModel`] and records them as turns.
pub struct AnswerSynthesizer {
    model: Arc<dyn GenerativeModel>,
    conversations: ConversationTracker,
    timeout: Duration,
}

impl AnswerSynthesizer {
    /// Create a synthesizer recording turns into `conversations`.
    pub fn new(
        model: Arc<dyn GenerativeModel>,
        conversations: ConversationTracker,
        timeout: Duration,
    ) -> Self {
        Self { model, conversations, timeout }
    }

    /// Answer `question` from `context`, given the prior `history`.
    ///
    /// The model is called exactly once, even when `context` is empty. On
    /// success the turn is appended to `conversation_id` and the response
    /// carries `context.sources` unmodified.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::GenerationError`] if the model fails, times out, or
    /// returns an empty answer. Nothing is recorded in that case.
    pub async fn synthesize(
        &self,
        question: &str,
        context: &AssembledContext,
        history: &[Turn],
        conversation_id: &str,
    ) -> Result<ChatResponse> {
        let prompt = build_prompt(question, &context.block, history);

        let provider = self.model.name().to_string();
        let response = bounded(self.timeout, "answer generation", self.model.generate(&prompt), {
            let provider = provider.clone();
            move |message| RagError::GenerationError { provider, message }
        })
        .await?;

        let response = response.trim().to_string();
        if response.is_empty() {
            error!(model = %provider, conversation_id, "model returned an empty answer");
            return Err(RagError::GenerationError {
                provider,
                message: "model returned an empty response".into(),
            });
        }

        self.conversations.append(conversation_id, question, response.clone()).await;

        let sources: Vec<Source> = context.sources.iter().map(Source::from).collect();
        info!(conversation_id, source_count = sources.len(), "answer synthesized");

        Ok(ChatResponse { response, conversation_id: conversation_id.to_string(), sources })
    }
}
