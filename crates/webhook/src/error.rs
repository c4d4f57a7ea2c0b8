use axum::http::StatusCode;
use thiserror::Error;

use crate::reply::api_error::{ApiErrorKind, GraphApiError};

/// Failures of the `x-hub-signature-256` check
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SignatureError {
    #[error("Missing x-hub-signature-256 header")]
    MissingSignature,

    #[error("Malformed signature header: {0}")]
    MalformedSignature(String),

    #[error("Invalid signature")]
    InvalidSignature,
}

impl SignatureError {
    /// Label used for the signature metric
    pub fn label(&self) -> &'static str {
        match self {
            Self::MissingSignature => "missing",
            Self::MalformedSignature(_) => "malformed",
            Self::InvalidSignature => "invalid",
        }
    }
}

/// Failures of the GET subscription handshake
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ChallengeError {
    #[error("Missing hub.mode or hub.verify_token parameter")]
    MissingParameters,

    #[error("Verification failed, mode or token mismatch")]
    VerificationFailed,
}

impl ChallengeError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::MissingParameters => StatusCode::BAD_REQUEST,
            Self::VerificationFailed => StatusCode::FORBIDDEN,
        }
    }
}

/// Envelope-level failures, each mapped to one HTTP status
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("Request body is not valid JSON: {0}")]
    InvalidJson(#[source] serde_json::Error),

    #[error("Received non-WhatsApp event with object {0:?}")]
    ForeignObject(Option<String>),

    #[error("Malformed webhook envelope: {0}")]
    MalformedEnvelope(#[source] serde_json::Error),
}

impl DispatchError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidJson(_) => StatusCode::BAD_REQUEST,
            Self::ForeignObject(_) => StatusCode::NOT_FOUND,
            Self::MalformedEnvelope(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Failure confined to a single change, message or status
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ItemError {
    #[error("Malformed change value: {0}")]
    MalformedChange(String),

    #[error("Malformed {kind}: {reason}")]
    MalformedItem { kind: &'static str, reason: String },

    #[error("Change value carries messages but no metadata")]
    MissingMetadata,

    #[error("Message {message_id} of type '{kind}' has no '{kind}' payload")]
    MissingPayload { message_id: String, kind: String },
}

impl ItemError {
    /// Label used for the item failure metric
    pub fn label(&self) -> &'static str {
        match self {
            Self::MalformedChange(_) => "malformed_change",
            Self::MalformedItem { .. } => "malformed_item",
            Self::MissingMetadata => "missing_metadata",
            Self::MissingPayload { .. } => "missing_payload",
        }
    }
}

/// Outbound send failures. Neither variant is retried.
#[derive(Debug, Error)]
pub enum SendError {
    #[error("{kind}: {}", error.message)]
    Api { kind: ApiErrorKind, error: GraphApiError },

    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),
}

impl SendError {
    /// Label used for the reply metric
    pub fn label(&self) -> &'static str {
        match self {
            Self::Api { .. } => "api_error",
            Self::Transport(_) => "transport_error",
        }
    }
}
