//! Mapping of knowledge-base errors onto HTTP responses.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use helpdesk_rag::RagError;
use serde_json::json;
use thiserror::Error;
use tracing::{error, warn};

/// An error returned by an API handler.
///
/// The response body is `{"error": <kind>, "detail": <message>}`.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Core(#[from] RagError),

    /// A request the handler could not parse.
    #[error("{0}")]
    BadRequest(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Core(RagError::UnsupportedContent(_)) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            Self::Core(err) if err.is_client_error() => StatusCode::BAD_REQUEST,
            Self::Core(RagError::PartialIngestion { .. } | RagError::InvalidConfiguration(_)) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            Self::Core(_) => StatusCode::BAD_GATEWAY,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::BadRequest(_) => "validation_error",
            Self::Core(err) => err.kind(),
        }
    }

    /// The detail sent to the client.
    ///
    /// Client errors echo the full message. Server-side failures get a fixed
    /// text per kind; the upstream message is only logged.
    pub fn public_detail(&self) -> String {
        let Self::Core(err) = self else {
            return self.to_string();
        };
        let detail = match err {
            RagError::Validation(_) | RagError::UnsupportedContent(_) => return err.to_string(),
            RagError::Fetch { .. } => "fetching the URL failed",
            RagError::EmbeddingError { .. } => "embedding service request failed",
            RagError::VectorStoreError { .. } => "knowledge base storage request failed",
            RagError::GenerationError { .. } => "answer generation failed",
            RagError::InvalidConfiguration(_) => "server is misconfigured",
            RagError::PartialIngestion { .. } => {
                "ingestion failed and some entries could not be removed"
            }
        };
        detail.to_string()
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let kind = self.kind();

        if status.is_server_error() {
            error!(status = status.as_u16(), error.kind = kind, error = %self, "request failed");
        } else {
            warn!(status = status.as_u16(), error.kind = kind, error = %self, "request rejected");
        }

        (status, Json(json!({ "error": kind, "detail": self.public_detail() }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status(err: RagError) -> StatusCode {
        ApiError::from(err).status()
    }

    #[test]
    fn client_errors_are_4xx() {
        assert_eq!(status(RagError::Validation("empty".into())), StatusCode::BAD_REQUEST);
        assert_eq!(
            status(RagError::UnsupportedContent("pdf".into())),
            StatusCode::UNSUPPORTED_MEDIA_TYPE
        );
        assert_eq!(ApiError::BadRequest("bad json".into()).status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn upstream_errors_are_502() {
        let fetch = RagError::Fetch { url: "https://x".into(), message: "404".into() };
        let generation = RagError::GenerationError { provider: "m".into(), message: "quota".into() };
        assert_eq!(status(fetch), StatusCode::BAD_GATEWAY);
        assert_eq!(status(generation), StatusCode::BAD_GATEWAY);
    }

    #[tokio::test]
    async fn upstream_messages_stay_out_of_the_response() {
        let err = ApiError::from(RagError::GenerationError {
            provider: "Gemini/gemma".into(),
            message: "API returned 403 Forbidden: API key AIzaXXXX project 12345 suspended".into(),
        });

        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["error"], "generation_error");
        assert_eq!(body["detail"], "answer generation failed");

        let raw = String::from_utf8_lossy(&bytes);
        assert!(!raw.contains("AIzaXXXX"));
        assert!(!raw.contains("403"));
        assert!(!raw.contains("Gemini"));
    }

    #[test]
    fn client_errors_keep_their_detail() {
        let err = ApiError::from(RagError::Validation("text must not be empty".into()));
        assert!(err.public_detail().contains("text must not be empty"));
        assert_eq!(
            ApiError::BadRequest("missing field `text`".into()).public_detail(),
            "missing field `text`"
        );
    }

    #[test]
    fn partial_ingestion_is_500() {
        let err = RagError::PartialIngestion {
            document_id: "d".into(),
            stored_ids: vec!["a".into()],
            message: "rollback failed".into(),
        };
        assert_eq!(status(err), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
