//! Normalization of ingestion inputs into plain text.
//!
//! Raw text passes through unchanged, fetched URL bodies arrive already reduced
//! to text by the [`UrlFetcher`](crate::UrlFetcher), and uploaded files are
//! decoded here by [`decode_file`].

use serde::{Deserialize, Serialize};

use crate::error::{RagError, Result};
use crate::fetch::extract_text;

/// Where ingested content came from. Recorded as the `source_type` metadata key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceType {
    /// Free-form text supplied directly.
    Text,
    /// The body of a fetched URL.
    Url,
    /// The decoded content of an uploaded file.
    File,
}

impl SourceType {
    /// The metadata value recorded for this source.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Url => "url",
            Self::File => "file",
        }
    }
}

/// An uploaded file awaiting ingestion.
#[derive(Debug, Clone, Default)]
pub struct FileUpload {
    /// Raw file content.
    pub bytes: Vec<u8>,
    /// Original file name, if the client sent one.
    pub filename: Option<String>,
    /// Declared MIME type, if the client sent one.
    pub content_type: Option<String>,
}

impl FileUpload {
    /// Create an upload from raw bytes.
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self { bytes: bytes.into(), ..Self::default() }
    }

    /// Set the original file name.
    pub fn with_filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = Some(filename.into());
        self
    }

    /// Set the declared MIME type.
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }
}

/// Outcome of a successful ingestion call.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IngestReport {
    /// Identifier assigned to the ingested document.
    pub document_id: String,
    /// Number of chunks stored by this call.
    pub chunks_added: usize,
    /// Number of entries in the knowledge base after this call.
    pub total_documents: usize,
}

/// Decode an uploaded file as text.
///
/// Accepts `text/*` and `application/json` content, or content with no declared
/// type, as UTF-8. `text/html` is reduced to readable text. A `charset`
/// parameter other than UTF-8 or US-ASCII is rejected.
///
/// # Errors
///
/// Returns [`RagError::UnsupportedContent`] for binary types such as
/// `application/pdf`, unsupported charsets, or bytes that are not valid UTF-8.
pub fn decode_file(upload: &FileUpload) -> Result<String> {
    let declared = upload.content_type.as_deref().map(str::trim).filter(|t| !t.is_empty());

    let (essence, charset) = match declared {
        Some(content_type) => parse_content_type(content_type),
        None => (String::new(), None),
    };

    let textual = essence.is_empty() || essence.starts_with("text/") || essence == "application/json";
    if !textual {
        return Err(RagError::UnsupportedContent(format!(
            "content type '{essence}' is not supported; only text files can be ingested"
        )));
    }

    if let Some(charset) = charset.filter(|c| c != "utf-8" && c != "utf8" && c != "us-ascii") {
        return Err(RagError::UnsupportedContent(format!("charset '{charset}' is not supported")));
    }

    let text = std::str::from_utf8(&upload.bytes).map_err(|e| {
        RagError::UnsupportedContent(format!("file is not valid UTF-8 text: {e}"))
    })?;
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);

    if essence == "text/html" { extract_text(text) } else { Ok(text.to_string()) }
}

/// Split a MIME type into its lowercase essence and optional charset.
fn parse_content_type(content_type: &str) -> (String, Option<String>) {
    let mut parts = content_type.split(';');
    let essence = parts.next().unwrap_or_default().trim().to_ascii_lowercase();
    let charset = parts.find_map(|param| {
        let (key, value) = param.split_once('=')?;
        key.trim()
            .eq_ignore_ascii_case("charset")
            .then(|| value.trim().trim_matches('"').to_ascii_lowercase())
    });
    (essence, charset)
}
