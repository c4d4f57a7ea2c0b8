use axum::{
    body::Bytes,
    extract::{Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{Html, IntoResponse, Response},
    Json,
};
use secrecy::ExposeSecret;
use serde::Serialize;
use tracing::{error, info, warn};
use wab_common::{config::SignatureMode, utils::utc_timestamp};

use crate::{
    challenge::{respond_to_challenge, VerificationParams},
    error::DispatchError,
    metrics::{render_metrics, SIGNATURE_CHECKS, WEBHOOK_REQUESTS},
    signature::{verify_signature, SIGNATURE_HEADER},
};

use super::{server::WEBHOOK_PATH, state::AppState};

/// GET subscription handshake
pub async fn verify_webhook(
    State(state): State<AppState>,
    Query(params): Query<VerificationParams>,
) -> (StatusCode, String) {
    info!(mode = ?params.mode, "Webhook verification request received");

    match respond_to_challenge(&params, state.config.verify_token.expose_secret()) {
        Ok(challenge) => {
            WEBHOOK_REQUESTS.with_label_values(&["GET", "verified"]).inc();
            (StatusCode::OK, challenge)
        }
        Err(e) => {
            WEBHOOK_REQUESTS.with_label_values(&["GET", "rejected"]).inc();
            (e.status_code(), e.to_string())
        }
    }
}

/// POST event delivery
pub async fn receive_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> (StatusCode, String) {
    // A non-ASCII header value becomes empty and fails as malformed
    let signature =
        headers.get(SIGNATURE_HEADER).map(|value| value.to_str().unwrap_or_default());

    match verify_signature(&body, state.config.app_secret.expose_secret().as_bytes(), signature) {
        Ok(()) => {
            SIGNATURE_CHECKS.with_label_values(&["valid"]).inc();
        }
        Err(e) => {
            SIGNATURE_CHECKS.with_label_values(&[e.label()]).inc();
            match state.config.signature_mode {
                SignatureMode::Enforce => {
                    warn!(error = %e, "Rejecting webhook with failed signature check");
                    WEBHOOK_REQUESTS.with_label_values(&["POST", "unauthorized"]).inc();
                    return (StatusCode::UNAUTHORIZED, e.to_string());
                }
                SignatureMode::Advisory => {
                    warn!(error = %e, "Signature check failed, continuing in advisory mode");
                }
            }
        }
    }

    match state.dispatcher.dispatch_bytes(&body) {
        Ok(report) => {
            if report.failures.is_empty() {
                info!(
                    messages = report.messages,
                    statuses = report.statuses,
                    replies = report.replies_queued,
                    "Webhook processed"
                );
            } else {
                warn!(
                    messages = report.messages,
                    statuses = report.statuses,
                    replies = report.replies_queued,
                    failures = report.failures.len(),
                    "Webhook processed with item failures"
                );
            }
            WEBHOOK_REQUESTS.with_label_values(&["POST", "ok"]).inc();
            (StatusCode::OK, "EVENT_RECEIVED".to_string())
        }
        Err(e) => {
            let outcome = match &e {
                DispatchError::InvalidJson(_) => "invalid_json",
                DispatchError::ForeignObject(_) => "not_found",
                DispatchError::MalformedEnvelope(_) => {
                    error!(error = %e, "Error processing webhook");
                    "error"
                }
            };
            WEBHOOK_REQUESTS.with_label_values(&["POST", outcome]).inc();
            (e.status_code(), e.to_string())
        }
    }
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub timestamp: String,
    /// Seconds since the server started
    pub uptime: f64,
}

/// Health check endpoint handler
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        timestamp: utc_timestamp(),
        uptime: state.started_at.elapsed().as_secs_f64(),
    })
}

/// Human-readable status page
pub async fn status_page(State(state): State<AppState>) -> Html<String> {
    Html(format!(
        r#"<html>
  <head><title>WhatsApp Webhook Server</title></head>
  <body style="font-family: Arial; padding: 40px; background: #f5f5f5;">
    <h1>WhatsApp Webhook Server is Running</h1>
    <p><strong>Status:</strong> Active</p>
    <p><strong>Port:</strong> {port}</p>
    <p><strong>Uptime:</strong> {uptime} seconds</p>
    <p><strong>Signature mode:</strong> {mode}</p>
    <hr>
    <h3>Endpoints:</h3>
    <ul>
      <li><code>GET {path}</code> - Webhook verification</li>
      <li><code>POST {path}</code> - Receive messages</li>
      <li><code>GET /health</code> - Health check</li>
      <li><code>GET /metrics</code> - Prometheus metrics</li>
    </ul>
    <p style="color: #666; margin-top: 30px;">Check the console window and logs folder for activity.</p>
  </body>
</html>"#,
        port = state.port,
        uptime = state.started_at.elapsed().as_secs(),
        mode = state.config.signature_mode,
        path = WEBHOOK_PATH,
    ))
}

/// Prometheus text exposition
pub async fn metrics() -> Response {
    match render_metrics() {
        Ok(body) => {
            ([(header::CONTENT_TYPE, "text/plain; version=0.0.4")], body).into_response()
        }
        Err(e) => {
            error!(error = %e, "Failed to render metrics");
            (StatusCode::INTERNAL_SERVER_ERROR, "Failed to render metrics").into_response()
        }
    }
}
