//! Gemini embedding batches against a local stand-in for the REST API.

#![cfg(feature = "gemini")]

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::extract::State;
use axum::{Json, Router};
use helpdesk_rag::EmbeddingProvider;
use helpdesk_rag::gemini::{GeminiEmbeddingProvider, MAX_BATCH_SIZE};
use serde_json::{Value, json};
use tokio::net::TcpListener;

type Batches = Arc<Mutex<Vec<usize>>>;

async fn batch_embed(State(batches): State<Batches>, Json(body): Json<Value>) -> Json<Value> {
    let count = body["requests"].as_array().map_or(0, Vec::len);
    batches.lock().unwrap().push(count);
    let embeddings: Vec<Value> = (0..count).map(|i| json!({ "values": [i as f32, 1.0] })).collect();
    Json(json!({ "embeddings": embeddings }))
}

async fn spawn_server(batches: Batches) -> SocketAddr {
    let app = Router::new().fallback(batch_embed).with_state(batches);
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

#[tokio::test]
async fn large_batches_are_split_into_api_sized_requests() {
    let batches = Batches::default();
    let addr = spawn_server(batches.clone()).await;
    let provider =
        GeminiEmbeddingProvider::new("test-key").unwrap().with_base_url(format!("http://{addr}"));

    let texts: Vec<String> = (0..250).map(|i| format!("passage {i}")).collect();
    let refs: Vec<&str> = texts.iter().map(String::as_str).collect();
    let embeddings = provider.embed_batch(&refs).await.unwrap();

    assert_eq!(embeddings.len(), 250);
    assert_eq!(*batches.lock().unwrap(), vec![100, 100, 50]);
    assert_eq!(embeddings[100], vec![0.0, 1.0]);
}

#[test]
fn advertises_the_api_batch_limit() {
    let provider = GeminiEmbeddingProvider::new("test-key").unwrap();
    assert_eq!(provider.max_batch_size(), MAX_BATCH_SIZE);
    assert_eq!(MAX_BATCH_SIZE, 100);
}
