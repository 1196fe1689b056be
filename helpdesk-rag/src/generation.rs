//! Generative model trait for composing answers from a prompt.

use async_trait::async_trait;

use crate::error::Result;

/// A text generation backend.
///
/// The synthesizer calls [`generate`](GenerativeModel::generate) exactly once
/// per question. Quota, timeout, and content-policy rejections are reported as
/// [`RagError::GenerationError`](crate::RagError::GenerationError).
///
/// # Example
///
/// ```rust,ignore
/// use helpdesk_rag::GenerativeModel;
///
/// let answer = model.generate("Say hello").await?;
/// ```
#[async_trait]
pub trait GenerativeModel: Send + Sync {
    /// Generate a completion for the prompt.
    async fn generate(&self, prompt: &str) -> Result<String>;

    /// A short model name used in logs and error messages.
    fn name(&self) -> &str;
}
