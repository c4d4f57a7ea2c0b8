use std::{
    net::SocketAddr,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, RwLock,
    },
};

use axum::{
    extract::{Path, State},
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tracing::debug;

/// Canned reply for the messages endpoint
#[derive(Debug, Clone)]
pub enum MockResponse {
    Json(StatusCode, Value),
    Text(StatusCode, String),
}

/// A request captured by the mock Graph API
#[derive(Debug, Clone)]
pub struct ReceivedMessage {
    pub api_version: String,
    pub phone_number_id: String,
    pub authorization: Option<String>,
    pub body: Value,
}

#[derive(Debug, Default)]
pub struct MockGraphState {
    received_messages: AtomicU64,
    requests: RwLock<Vec<ReceivedMessage>>,
    response_override: RwLock<Option<MockResponse>>,
}

impl MockGraphState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn received_messages(&self) -> u64 {
        self.received_messages.load(Ordering::Relaxed)
    }

    pub fn requests(&self) -> Vec<ReceivedMessage> {
        self.requests.read().unwrap().clone()
    }

    pub fn set_response_override(&self, response: MockResponse) {
        *self.response_override.write().unwrap() = Some(response);
    }

    /// Answer with a Graph API error object
    pub fn set_error_response(
        &self,
        status: StatusCode,
        code: i64,
        subcode: Option<i64>,
        message: &str,
    ) {
        let mut error = json!({
            "message": message,
            "type": "OAuthException",
            "code": code,
            "fbtrace_id": "AbCdEfGh123",
        });
        if let Some(subcode) = subcode {
            error["error_subcode"] = json!(subcode);
        }
        self.set_response_override(MockResponse::Json(status, json!({ "error": error })));
    }
}

/// Bind the mock on an ephemeral local port and serve it in the background
pub async fn start_mock_graph_service(state: Arc<MockGraphState>) -> eyre::Result<SocketAddr> {
    let app = mock_graph_app_router(state);

    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;

    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            tracing::error!("Mock Graph API stopped: {}", e);
        }
    });

    Ok(addr)
}

pub fn mock_graph_app_router(state: Arc<MockGraphState>) -> Router {
    Router::new()
        .route("/{version}/{phone_number_id}/messages", post(handle_send_message))
        .with_state(state)
}

async fn handle_send_message(
    State(state): State<Arc<MockGraphState>>,
    Path((api_version, phone_number_id)): Path<(String, String)>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    state.received_messages.fetch_add(1, Ordering::Relaxed);
    debug!(%phone_number_id, "Mock Graph API received message");

    let authorization =
        headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok()).map(String::from);
    let to = body["to"].as_str().unwrap_or_default().to_string();

    state.requests.write().unwrap().push(ReceivedMessage {
        api_version,
        phone_number_id,
        authorization,
        body,
    });

    if let Some(response) = state.response_override.read().unwrap().as_ref() {
        return match response.clone() {
            MockResponse::Json(status, value) => (status, Json(value)).into_response(),
            MockResponse::Text(status, text) => (status, text).into_response(),
        };
    }

    let response = json!({
        "messaging_product": "whatsapp",
        "contacts": [{ "input": to, "wa_id": to }],
        "messages": [{ "id": "wamid.HBgLMTY1MDUwNzY1MjAVAgARGBI5QTNDQTVCM0Q0Q0Q2RTY3RTcA" }]
    });
    (StatusCode::OK, Json(response)).into_response()
}
