//! Test utilities for trackify-core
//!
//! A mock Gemini `generateContent` server for backend and integration tests.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde_json::{json, Value};
use tokio::sync::oneshot;

#[derive(Clone)]
struct MockState {
    reply: String,
    fail_with: Option<StatusCode>,
    requests: Arc<Mutex<Vec<Value>>>,
}

/// Mock Gemini server for testing
pub struct MockGeminiServer {
    addr: SocketAddr,
    requests: Arc<Mutex<Vec<Value>>>,
    shutdown_tx: Option<oneshot::Sender<()>>,
}

impl MockGeminiServer {
    /// The only API key the server accepts
    pub const API_KEY: &'static str = "test-key";

    /// Start a server that answers every `generateContent` call with `reply`
    pub async fn start_with_reply(reply: &str) -> Self {
        Self::start(reply.to_string(), None).await
    }

    /// Start a server that answers every call with `status`
    pub async fn start_failing(status: StatusCode) -> Self {
        Self::start(String::new(), Some(status)).await
    }

    async fn start(reply: String, fail_with: Option<StatusCode>) -> Self {
        let requests = Arc::new(Mutex::new(Vec::new()));
        let state = MockState {
            reply,
            fail_with,
            requests: requests.clone(),
        };

        let app = Router::new()
            .route(
                "/v1beta/models/:target",
                get(handle_model).post(handle_generate),
            )
            .with_state(state);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    shutdown_rx.await.ok();
                })
                .await
                .unwrap();
        });

        Self {
            addr,
            requests,
            shutdown_tx: Some(shutdown_tx),
        }
    }

    /// Get the base URL for this mock server
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Request bodies received by `generateContent`, oldest first
    pub fn requests(&self) -> Vec<Value> {
        self.requests.lock().unwrap().clone()
    }

    /// Stop the mock server
    pub fn stop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

impl Drop for MockGeminiServer {
    fn drop(&mut self) {
        self.stop();
    }
}

fn rejection(state: &MockState, headers: &HeaderMap) -> Option<Response> {
    let key = headers
        .get("x-goog-api-key")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    if key != MockGeminiServer::API_KEY {
        return Some(
            (
                StatusCode::FORBIDDEN,
                Json(json!({"error": {"code": 403, "message": "API key not valid", "status": "PERMISSION_DENIED"}})),
            )
                .into_response(),
        );
    }
    state.fail_with.map(|status| {
        (
            status,
            Json(json!({"error": {"code": status.as_u16(), "message": "mock failure"}})),
        )
            .into_response()
    })
}

/// Model metadata endpoint (health check)
async fn handle_model(
    State(state): State<MockState>,
    Path(model): Path<String>,
    headers: HeaderMap,
) -> Response {
    if let Some(rejected) = rejection(&state, &headers) {
        return rejected;
    }
    Json(json!({
        "name": format!("models/{}", model),
        "displayName": model,
        "supportedGenerationMethods": ["generateContent"],
    }))
    .into_response()
}

/// `generateContent` endpoint
async fn handle_generate(
    State(state): State<MockState>,
    Path(target): Path<String>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if let Some(rejected) = rejection(&state, &headers) {
        return rejected;
    }
    if !target.ends_with(":generateContent") {
        return StatusCode::NOT_FOUND.into_response();
    }

    state.requests.lock().unwrap().push(body);

    Json(json!({
        "candidates": [{
            "content": {"role": "model", "parts": [{"text": state.reply}]},
            "finishReason": "STOP",
        }],
    }))
    .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_server_starts() {
        let mut server = MockGeminiServer::start_with_reply("hello").await;
        assert!(server.url().starts_with("http://127.0.0.1:"));
        assert!(server.requests().is_empty());
        server.stop();
    }
}
