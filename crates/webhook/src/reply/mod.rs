pub mod api_error;

use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;
use tracing::{error, info, warn};
use wab_common::{config::WebhookConfig, utils::pretty_json};

use crate::{
    error::SendError,
    infrastructure::HttpClientFactory,
    types::OutboundMessage,
};

pub use api_error::{ApiErrorKind, GraphApiError};

/// Phone number ids sent by the developer dashboard's test webhooks
pub const TEST_PHONE_NUMBER_IDS: [&str; 2] = ["123456123", "123456789"];

pub fn is_test_phone_number_id(phone_number_id: &str) -> bool {
    TEST_PHONE_NUMBER_IDS.contains(&phone_number_id)
}

/// Result of a send that did not fail
#[derive(Debug, Clone, PartialEq)]
pub enum SendOutcome {
    /// Test phone number id, nothing was sent
    Skipped,
    /// Accepted by the Graph API, carries the response body
    Sent(Value),
}

/// Sends text messages through the Graph API messages endpoint
pub struct ReplyClient {
    client: Client,
    access_token: SecretString,
    base_url: String,
    api_version: String,
}

impl ReplyClient {
    pub fn new(config: &WebhookConfig, http_client_factory: &HttpClientFactory) -> eyre::Result<Self> {
        Ok(Self {
            client: http_client_factory.create_client()?,
            access_token: config.access_token.clone(),
            base_url: config.graph_api_url.trim_end_matches('/').to_string(),
            api_version: config.graph_api_version.clone(),
        })
    }

    pub fn messages_url(&self, phone_number_id: &str) -> String {
        format!("{}/{}/{}/messages", self.base_url, self.api_version, phone_number_id)
    }

    /// Send `text` to `to` from the phone number `phone_number_id`
    pub async fn send(
        &self,
        phone_number_id: &str,
        to: &str,
        text: &str,
    ) -> Result<SendOutcome, SendError> {
        self.send_message(&OutboundMessage::new(phone_number_id, to, text)).await
    }

    pub async fn send_message(&self, message: &OutboundMessage) -> Result<SendOutcome, SendError> {
        if is_test_phone_number_id(&message.phone_number_id) {
            warn!(
                phone_number_id = %message.phone_number_id,
                note = "Real webhooks will use your actual Phone Number ID",
                "Skipping message send, test/placeholder Phone Number ID detected. \
                 This is likely a test webhook from Facebook Developer Dashboard"
            );
            return Ok(SendOutcome::Skipped);
        }

        let url = self.messages_url(&message.phone_number_id);

        let response = self
            .client
            .post(&url)
            .bearer_auth(self.access_token.expose_secret())
            .json(&message.request())
            .send()
            .await
            .inspect_err(|e| log_transport_error(message, e))?;

        let status = response.status();
        let bytes = response.bytes().await.inspect_err(|e| log_transport_error(message, e))?;
        let body = serde_json::from_slice::<Value>(&bytes)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()));

        let api_error = match body.get("error") {
            Some(raw) => Some(GraphApiError::deserialize_or_generic(raw)),
            None if !status.is_success() => {
                Some(GraphApiError::from_status(status.as_u16(), &body_text(&body)))
            }
            None => None,
        };

        match api_error {
            Some(error) => {
                let kind = ApiErrorKind::classify(&error);
                log_api_error(kind, &error, &body, message);
                Err(SendError::Api { kind, error })
            }
            None => {
                info!(
                    to = %message.to,
                    phone_number_id = %message.phone_number_id,
                    response = %pretty_json(&body),
                    "Message sent"
                );
                Ok(SendOutcome::Sent(body))
            }
        }
    }
}

impl GraphApiError {
    fn deserialize_or_generic(raw: &Value) -> Self {
        serde_json::from_value(raw.clone()).unwrap_or_else(|_| Self {
            message: raw.to_string(),
            kind: None,
            code: 0,
            error_subcode: None,
            fbtrace_id: None,
        })
    }
}

fn body_text(body: &Value) -> String {
    match body {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn log_transport_error(message: &OutboundMessage, e: &reqwest::Error) {
    error!(
        to = %message.to,
        phone_number_id = %message.phone_number_id,
        timeout = e.is_timeout(),
        connect = e.is_connect(),
        error = %e,
        "Error sending message"
    );
}

/// One distinct log event per classification, with remediation steps
fn log_api_error(kind: ApiErrorKind, error: &GraphApiError, body: &Value, message: &OutboundMessage) {
    let steps = kind.remediation().join("\n");

    match kind {
        ApiErrorKind::TokenExpired => error!(
            error_code = error.code,
            error_subcode = ?error.error_subcode,
            error = %error.message,
            help = "Your WhatsApp access token has expired. Please:",
            steps = %steps,
            "WhatsApp token expired"
        ),
        ApiErrorKind::InvalidToken => error!(
            error_code = error.code,
            error = %error.message,
            help = "Your WhatsApp access token is invalid. Please:",
            steps = %steps,
            "Invalid WhatsApp token"
        ),
        ApiErrorKind::InvalidPhoneNumberId => error!(
            error_code = error.code,
            error_subcode = ?error.error_subcode,
            phone_number_id = %message.phone_number_id,
            error = %error.message,
            help = "The Phone Number ID in the webhook request is invalid. Please:",
            steps = %steps,
            note = "The Phone Number ID should be a long numeric string, not \"123456123\"",
            "Phone Number ID error"
        ),
        ApiErrorKind::Generic => error!(
            error_code = error.code,
            error_subcode = ?error.error_subcode,
            phone_number_id = %message.phone_number_id,
            response = %pretty_json(body),
            "WhatsApp API error"
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_client(base_url: &str) -> ReplyClient {
        let config = WebhookConfig {
            graph_api_url: base_url.to_string(),
            ..Default::default()
        };
        ReplyClient::new(&config, &HttpClientFactory::new()).unwrap()
    }

    #[test]
    fn test_messages_url() {
        let client = test_client("https://graph.facebook.com/");
        assert_eq!(
            client.messages_url("106540352242922"),
            "https://graph.facebook.com/v18.0/106540352242922/messages"
        );
    }

    #[test]
    fn test_placeholder_ids() {
        assert!(is_test_phone_number_id("123456123"));
        assert!(is_test_phone_number_id("123456789"));
        assert!(!is_test_phone_number_id("106540352242922"));
    }

    #[tokio::test]
    async fn test_placeholder_id_skips_network() {
        // Nothing listens on port 1, a real request would fail
        let client = test_client("http://127.0.0.1:1");

        let outcome = client.send("123456123", "15550001", "hello").await.unwrap();
        assert_eq!(outcome, SendOutcome::Skipped);
    }

    #[tokio::test]
    async fn test_unreachable_api_is_transport_error() {
        let client = test_client("http://127.0.0.1:1");

        let err = client.send("106540352242922", "15550001", "hello").await.unwrap_err();
        assert!(matches!(err, SendError::Transport(_)));
        assert_eq!(err.label(), "transport_error");
    }

    #[test]
    fn test_malformed_error_object_is_generic() {
        let raw = serde_json::json!("something went wrong");
        let error = GraphApiError::deserialize_or_generic(&raw);
        assert_eq!(error.code, 0);
        assert_eq!(ApiErrorKind::classify(&error), ApiErrorKind::Generic);
    }
}
