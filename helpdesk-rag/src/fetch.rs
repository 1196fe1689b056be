//! Fetching URL content for ingestion.
//!
//! [`UrlFetcher`] is the collaborator seam; [`HttpFetcher`] (feature `http`)
//! is the `reqwest`-backed implementation. HTML bodies are reduced to readable
//! text with [`extract_text`].

use async_trait::async_trait;
use htmd::HtmlToMarkdown;
use url::Url;

use crate::error::{RagError, Result};

/// Retrieves the textual body behind a URL.
///
/// Network and HTTP failures are reported as [`RagError::Fetch`].
#[async_trait]
pub trait UrlFetcher: Send + Sync {
    /// Fetch `url` and return its text body.
    async fn fetch(&self, url: &str) -> Result<String>;
}

/// Reduce an HTML document to readable text.
///
/// The page is converted to Markdown with `htmd`; `<head>`, scripts, styles,
/// and `<noscript>` blocks are dropped.
///
/// # Errors
///
/// Returns [`RagError::UnsupportedContent`] if the document cannot be converted.
pub fn extract_text(html: &str) -> Result<String> {
    let converter = HtmlToMarkdown::builder()
        .skip_tags(vec!["head", "script", "style", "noscript"])
        .build();
    let markdown = converter
        .convert(html)
        .map_err(|e| RagError::UnsupportedContent(format!("failed to convert HTML: {e}")))?;
    Ok(markdown.trim().to_string())
}

/// Parse `url` as an absolute `http` or `https` URL with a host.
///
/// # Errors
///
/// Returns [`RagError::Validation`] for malformed URLs and other schemes.
pub fn parse_http_url(url: &str) -> Result<Url> {
    let parsed = Url::parse(url.trim())
        .map_err(|e| RagError::Validation(format!("'{url}' is not a valid URL: {e}")))?;

    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(RagError::Validation(format!("'{url}' is not an http(s) URL")));
    }
    if parsed.host_str().is_none_or(str::is_empty) {
        return Err(RagError::Validation(format!("'{url}' has no host")));
    }
    Ok(parsed)
}

#[cfg(feature = "http")]
pub use http::HttpFetcher;

#[cfg(feature = "http")]
mod http {
    use std::time::Duration;

    use async_trait::async_trait;
    use tracing::{debug, error};

    use super::{UrlFetcher, extract_text};
    use crate::error::{RagError, Result};

    /// Maximum accepted body size (10MB).
    const MAX_DOWNLOAD_SIZE: usize = 10 * 1024 * 1024;

    /// A [`UrlFetcher`] backed by `reqwest` with a bounded timeout.
    #[derive(Debug, Clone)]
    pub struct HttpFetcher {
        client: reqwest::Client,
    }

    impl HttpFetcher {
        /// Default time allowed for a single fetch.
        pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

        /// Create a fetcher with [`DEFAULT_TIMEOUT`](Self::DEFAULT_TIMEOUT).
        pub fn new() -> Result<Self> {
            Self::with_timeout(Self::DEFAULT_TIMEOUT)
        }

        /// Create a fetcher whose requests fail after `timeout`.
        ///
        /// # Errors
        ///
        /// Returns [`RagError::InvalidConfiguration`] if the HTTP client cannot be built.
        pub fn with_timeout(timeout: Duration) -> Result<Self> {
            let client = reqwest::Client::builder()
                .timeout(timeout)
                .user_agent(concat!("helpdesk-rag/", env!("CARGO_PKG_VERSION")))
                .redirect(reqwest::redirect::Policy::limited(5))
                .build()
                .map_err(|e| {
                    RagError::InvalidConfiguration(format!("failed to build HTTP client: {e}"))
                })?;
            Ok(Self { client })
        }
    }

    fn fetch_error(url: &str, message: impl Into<String>) -> RagError {
        RagError::Fetch { url: url.to_string(), message: message.into() }
    }

    #[async_trait]
    impl UrlFetcher for HttpFetcher {
        async fn fetch(&self, url: &str) -> Result<String> {
            debug!(url, "fetching url");

            let response = self.client.get(url).send().await.map_err(|e| {
                error!(url, error = %e, "url fetch failed");
                fetch_error(url, format!("request failed: {e}"))
            })?;

            let status = response.status();
            if !status.is_success() {
                error!(url, %status, "url fetch returned error status");
                return Err(fetch_error(url, format!("HTTP status {status}")));
            }

            if response.content_length().is_some_and(|len| len > MAX_DOWNLOAD_SIZE as u64) {
                return Err(fetch_error(url, "response body too large"));
            }

            let content_type = response
                .headers()
                .get(reqwest::header::CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .unwrap_or("")
                .to_ascii_lowercase();

            let bytes = response.bytes().await.map_err(|e| {
                error!(url, error = %e, "failed to read response body");
                fetch_error(url, format!("failed to read body: {e}"))
            })?;
            if bytes.len() > MAX_DOWNLOAD_SIZE {
                return Err(fetch_error(url, "response body too large"));
            }

            let body = String::from_utf8_lossy(&bytes).into_owned();
            if content_type.contains("text/html") || content_type.contains("application/xhtml") {
                extract_text(&body).map_err(|e| fetch_error(url, e.to_string()))
            } else {
                Ok(body)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extract_text_drops_scripts_and_styles() {
        let html = "<html><head><title>Hours</title><style>p { color: red; }</style></head>\
                    <body><h1>Opening hours</h1><p>Mon &amp; Tue: 9-5</p>\
                    <script>var tracking = 1;</script></body></html>";

        let text = extract_text(html).unwrap();
        assert!(text.contains("Opening hours"));
        assert!(text.contains("Mon & Tue: 9-5"));
        assert!(!text.contains("tracking"));
        assert!(!text.contains("color: red"));
        assert!(!text.contains("<p>"));
    }

    #[test]
    fn extract_text_keeps_comparisons_in_body_text() {
        let text = extract_text("<p>Discount applies if x < 5 and y > 3.</p>").unwrap();
        assert!(text.contains("5 and y"), "body text was dropped: {text:?}");
    }

    #[test]
    fn extract_text_keeps_plain_text() {
        assert_eq!(extract_text("plain text").unwrap(), "plain text");
        assert_eq!(extract_text("").unwrap(), "");
    }

    #[test]
    fn accepts_http_urls() {
        assert_eq!(parse_http_url("https://example.com/faq").unwrap().host_str(), Some("example.com"));
        assert!(parse_http_url("HTTP://example.com").is_ok());
        assert!(parse_http_url("  http://example.com/a?b=c  ").is_ok());
    }

    #[test]
    fn rejects_other_schemes_and_malformed_urls() {
        for url in [
            "ftp://example.com",
            "https://",
            "example.com",
            "mailto:help@example.com",
            "http://exa mple.com",
            "https://[::1",
            "http://:::",
            "https://a b/c",
        ] {
            assert!(
                matches!(parse_http_url(url), Err(RagError::Validation(_))),
                "{url:?} should be rejected"
            );
        }
    }
}
