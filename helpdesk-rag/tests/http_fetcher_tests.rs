//! HttpFetcher against a local server.

#![cfg(feature = "http")]

use std::net::SocketAddr;
use std::time::Duration;

use axum::Router;
use axum::http::{StatusCode, header};
use axum::response::IntoResponse;
use axum::routing::get;
use helpdesk_rag::{HttpFetcher, RagError, UrlFetcher};
use tokio::net::TcpListener;

async fn spawn_server() -> SocketAddr {
    let app = Router::new()
        .route(
            "/faq",
            get(|| async {
                (
                    [(header::CONTENT_TYPE, "text/html; charset=utf-8")],
                    "<html><body><h1>FAQ</h1><p>Returns within 30 days.</p>\
                     <script>track()</script></body></html>",
                )
            }),
        )
        .route("/plain", get(|| async { "Plain body" }))
        .route("/missing", get(|| async { StatusCode::NOT_FOUND.into_response() }))
        .route(
            "/slow",
            get(|| async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                "late"
            }),
        );

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

#[tokio::test]
async fn html_pages_are_reduced_to_text() {
    let addr = spawn_server().await;
    let fetcher = HttpFetcher::new().unwrap();

    let body = fetcher.fetch(&format!("http://{addr}/faq")).await.unwrap();
    assert!(body.contains("FAQ"));
    assert!(body.contains("Returns within 30 days."));
    assert!(!body.contains("track()"));
    assert!(!body.contains("<p>"));
}

#[tokio::test]
async fn plain_text_is_returned_unchanged() {
    let addr = spawn_server().await;
    let fetcher = HttpFetcher::new().unwrap();

    assert_eq!(fetcher.fetch(&format!("http://{addr}/plain")).await.unwrap(), "Plain body");
}

#[tokio::test]
async fn error_status_is_a_fetch_error() {
    let addr = spawn_server().await;
    let fetcher = HttpFetcher::new().unwrap();

    let err = fetcher.fetch(&format!("http://{addr}/missing")).await.unwrap_err();
    match err {
        RagError::Fetch { message, .. } => assert!(message.contains("404")),
        other => panic!("expected fetch error, got {other:?}"),
    }
}

#[tokio::test]
async fn slow_servers_time_out() {
    let addr = spawn_server().await;
    let fetcher = HttpFetcher::with_timeout(Duration::from_millis(200)).unwrap();

    let err = fetcher.fetch(&format!("http://{addr}/slow")).await.unwrap_err();
    assert!(matches!(err, RagError::Fetch { .. }));
}
