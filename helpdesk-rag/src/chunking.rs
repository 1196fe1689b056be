//! Document chunking strategies.
//!
//! This module provides the [`Chunker`] trait and two implementations:
//!
//! - [`FixedSizeChunker`] — sliding window of `chunk_size` characters with a fixed overlap
//! - [`SentenceChunker`] — the same window, but ends early at a sentence or line break
//!
//! Sizes and overlaps are measured in characters (Unicode scalar values), never
//! bytes, so multi-byte text is never split inside a character.

use uuid::Uuid;

use crate::document::{Chunk, Document, MetadataValue};
use crate::error::{RagError, Result};

/// A strategy for splitting documents into chunks.
///
/// Implementations only decide chunk boundaries via [`split`](Chunker::split).
/// The provided [`chunk`](Chunker::chunk) method turns those pieces into
/// [`Chunk`]s with fresh identifiers, inherited metadata, and no embeddings.
/// Embeddings are attached later by the pipeline.
pub trait Chunker: Send + Sync {
    /// Split text into ordered, possibly overlapping pieces.
    ///
    /// Returns an empty `Vec` for empty text. Identical input always yields
    /// identical boundaries.
    fn split(&self, text: &str) -> Vec<String>;

    /// Split a document into chunks.
    ///
    /// Each chunk inherits the document's metadata plus `chunk_index` and
    /// `total_chunks`.
    fn chunk(&self, document: &Document) -> Vec<Chunk> {
        let pieces = self.split(&document.text);
        let total = pieces.len();

        pieces
            .into_iter()
            .enumerate()
            .map(|(i, text)| {
                let mut metadata = document.metadata.clone();
                metadata.insert("chunk_index".to_string(), MetadataValue::from(i));
                metadata.insert("total_chunks".to_string(), MetadataValue::from(total));
                Chunk {
                    id: Uuid::new_v4().to_string(),
                    text,
                    embedding: Vec::new(),
                    metadata,
                    document_id: document.id.clone(),
                }
            })
            .collect()
    }
}

/// Split `text` into windows of `chunk_size` characters overlapping by `overlap`.
///
/// # Errors
///
/// Returns [`RagError::InvalidConfiguration`] unless `0 <= overlap < chunk_size`.
///
/// # Example
///
/// ```rust
/// use helpdesk_rag::chunk_text;
///
/// let chunks = chunk_text("abcdefghij", 4, 1).unwrap();
/// assert_eq!(chunks, vec!["abcd", "defg", "ghij"]);
/// ```
pub fn chunk_text(text: &str, chunk_size: usize, overlap: usize) -> Result<Vec<String>> {
    validate_window(chunk_size, overlap)?;
    Ok(split_fixed(text, chunk_size, overlap))
}

fn validate_window(chunk_size: usize, overlap: usize) -> Result<()> {
    if overlap >= chunk_size {
        return Err(RagError::InvalidConfiguration(format!(
            "chunk overlap ({overlap}) must be less than chunk size ({chunk_size})"
        )));
    }
    Ok(())
}

/// Byte offset of every character boundary in `text`, including `text.len()`.
fn char_offsets(text: &str) -> Vec<usize> {
    text.char_indices().map(|(i, _)| i).chain(std::iter::once(text.len())).collect()
}

fn split_fixed(text: &str, chunk_size: usize, overlap: usize) -> Vec<String> {
    if text.is_empty() {
        return Vec::new();
    }

    let offsets = char_offsets(text);
    let len = offsets.len() - 1;
    let step = chunk_size - overlap;
    let mut chunks = Vec::new();
    let mut start = 0;

    loop {
        if len - start <= chunk_size {
            chunks.push(text[offsets[start]..].to_string());
            break;
        }
        chunks.push(text[offsets[start]..offsets[start + chunk_size]].to_string());
        start += step;
    }

    chunks
}

/// Splits text into fixed-size chunks by character count with configurable overlap.
///
/// The window advances by `chunk_size - chunk_overlap` characters until the
/// remaining text fits in one window; that remainder becomes the last, possibly
/// shorter, chunk. Consecutive chunks share exactly `chunk_overlap` characters.
///
/// # Example
///
/// ```rust
/// use helpdesk_rag::{Chunker, FixedSizeChunker};
///
/// let chunker = FixedSizeChunker::new(1000, 200).unwrap();
/// assert_eq!(chunker.split("short text").len(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct FixedSizeChunker {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl FixedSizeChunker {
    /// Create a new `FixedSizeChunker`.
    ///
    /// # Arguments
    ///
    /// * `chunk_size` — maximum number of characters per chunk
    /// * `chunk_overlap` — number of overlapping characters between consecutive chunks
    ///
    /// # Errors
    ///
    /// Returns [`RagError::InvalidConfiguration`] unless `chunk_overlap < chunk_size`.
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self> {
        validate_window(chunk_size, chunk_overlap)?;
        Ok(Self { chunk_size, chunk_overlap })
    }

    /// Maximum number of characters per chunk.
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Number of characters shared by consecutive chunks.
    pub fn chunk_overlap(&self) -> usize {
        self.chunk_overlap
    }
}

impl Chunker for FixedSizeChunker {
    fn split(&self, text: &str) -> Vec<String> {
        split_fixed(text, self.chunk_size, self.chunk_overlap)
    }
}

/// Splits text into windows that prefer to end on a sentence or line break.
///
/// Within each `chunk_size` window the last `.` or `\n` past the window's
/// midpoint becomes the chunk end. Windows without such a break are cut at
/// `chunk_size` characters. The next window starts `chunk_overlap` characters
/// before the previous end, so overlap is preserved but chunk lengths vary.
#[derive(Debug, Clone)]
pub struct SentenceChunker {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl SentenceChunker {
    /// Create a new `SentenceChunker`.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::InvalidConfiguration`] unless `chunk_overlap < chunk_size`.
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self> {
        validate_window(chunk_size, chunk_overlap)?;
        Ok(Self { chunk_size, chunk_overlap })
    }
}

impl Chunker for SentenceChunker {
    fn split(&self, text: &str) -> Vec<String> {
        if text.is_empty() {
            return Vec::new();
        }

        let chars: Vec<char> = text.chars().collect();
        let offsets = char_offsets(text);
        let len = chars.len();
        let mut chunks = Vec::new();
        let mut start = 0;

        loop {
            if len - start <= self.chunk_size {
                chunks.push(text[offsets[start]..].to_string());
                break;
            }

            let window = &chars[start..start + self.chunk_size];
            let end = window
                .iter()
                .rposition(|c| *c == '.' || *c == '\n')
                .filter(|pos| *pos > self.chunk_size / 2)
                .map_or(start + self.chunk_size, |pos| start + pos + 1);

            chunks.push(text[offsets[start]..offsets[end]].to_string());

            let next = end.saturating_sub(self.chunk_overlap);
            start = if next > start { next } else { start + self.chunk_size - self.chunk_overlap };
        }

        chunks
    }
}
