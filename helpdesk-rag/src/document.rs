//! Data types for documents, chunks, metadata, and search results.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::error::{RagError, Result};

/// A scalar metadata value.
///
/// Metadata is restricted to a closed set of scalars so that it can be stored
/// by any vector store backend. Nested structures are rejected at the boundary
/// by [`metadata_from_json`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetadataValue {
    /// A boolean flag.
    Bool(bool),
    /// A signed integer.
    Integer(i64),
    /// A floating point number.
    Float(f64),
    /// A text value.
    String(String),
}

impl MetadataValue {
    /// Return the value as a string slice if it is a [`MetadataValue::String`].
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Return the value as an integer if it is a [`MetadataValue::Integer`].
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Integer(n) => Some(*n),
            _ => None,
        }
    }

    /// Convert to a JSON value.
    pub fn to_json(&self) -> Value {
        match self {
            Self::Bool(b) => Value::Bool(*b),
            Self::Integer(n) => Value::from(*n),
            Self::Float(f) => Value::from(*f),
            Self::String(s) => Value::String(s.clone()),
        }
    }
}

impl fmt::Display for MetadataValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{b}"),
            Self::Integer(n) => write!(f, "{n}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::String(s) => f.write_str(s),
        }
    }
}

impl From<&str> for MetadataValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for MetadataValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<bool> for MetadataValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for MetadataValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<usize> for MetadataValue {
    fn from(value: usize) -> Self {
        Self::Integer(value as i64)
    }
}

impl From<f64> for MetadataValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl TryFrom<&Value> for MetadataValue {
    type Error = RagError;

    fn try_from(value: &Value) -> Result<Self> {
        match value {
            Value::Bool(b) => Ok(Self::Bool(*b)),
            Value::Number(n) => match n.as_i64() {
                Some(i) => Ok(Self::Integer(i)),
                None => n.as_f64().map(Self::Float).ok_or_else(|| {
                    RagError::Validation(format!("metadata number {n} is out of range"))
                }),
            },
            Value::String(s) => Ok(Self::String(s.clone())),
            Value::Null => Err(RagError::Validation("metadata values must not be null".into())),
            Value::Array(_) | Value::Object(_) => Err(RagError::Validation(
                "metadata values must be strings, numbers, or booleans".into(),
            )),
        }
    }
}

/// Key-value metadata attached to documents and chunks.
pub type Metadata = HashMap<String, MetadataValue>;

/// Convert a JSON object into [`Metadata`], rejecting nested values.
///
/// `null` is treated as an empty map.
///
/// # Errors
///
/// Returns [`RagError::Validation`] if `value` is not an object or any of its
/// values is an array, an object, or `null`.
pub fn metadata_from_json(value: &Value) -> Result<Metadata> {
    let object = match value {
        Value::Null => return Ok(Metadata::new()),
        Value::Object(object) => object,
        _ => return Err(RagError::Validation("metadata must be a JSON object".into())),
    };

    object
        .iter()
        .map(|(key, value)| {
            MetadataValue::try_from(value)
                .map(|v| (key.clone(), v))
                .map_err(|e| RagError::Validation(format!("metadata key '{key}': {e}")))
        })
        .collect()
}

/// A source document containing text content and metadata.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Document {
    /// Unique identifier for the document.
    pub id: String,
    /// The text content of the document.
    pub text: String,
    /// Key-value metadata associated with the document.
    pub metadata: Metadata,
    /// Optional URI pointing to the original source.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_uri: Option<String>,
}

impl Document {
    /// Create a document with a freshly generated identifier.
    pub fn new(text: impl Into<String>, metadata: Metadata) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            text: text.into(),
            metadata,
            source_uri: None,
        }
    }

    /// Set the source URI.
    pub fn with_source_uri(mut self, uri: impl Into<String>) -> Self {
        self.source_uri = Some(uri.into());
        self
    }
}

/// A segment of a [`Document`] with its vector embedding.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Chunk {
    /// Unique identifier for the chunk.
    pub id: String,
    /// The text content of the chunk.
    pub text: String,
    /// The vector embedding for this chunk's text.
    pub embedding: Vec<f32>,
    /// Key-value metadata inherited from the parent document plus chunk-specific fields.
    pub metadata: Metadata,
    /// The ID of the parent [`Document`].
    pub document_id: String,
}

/// A retrieved [`Chunk`] paired with a similarity score in `[0, 1]`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchResult {
    /// The retrieved chunk.
    pub chunk: Chunk,
    /// The similarity score (higher is more relevant).
    pub score: f32,
}
