use std::{net::SocketAddr, sync::Once};

use hmac::{Hmac, Mac};
use secrecy::SecretString;
use sha2::Sha256;
use wab_common::config::{SignatureMode, WebhookConfig};

pub const TEST_VERIFY_TOKEN: &str = "integration-verify-token";
pub const TEST_APP_SECRET: &str = "integration-app-secret";
pub const TEST_ACCESS_TOKEN: &str = "EAAG-integration-token";
pub const TEST_API_VERSION: &str = "v18.0";

static INIT_TRACING: Once = Once::new();

pub fn setup_test_env() {
    INIT_TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt().with_test_writer().with_max_level(tracing::Level::DEBUG).try_init();
    });
}

/// Configuration pointing the reply client at a mock Graph API
pub fn get_webhook_config(graph_addr: SocketAddr) -> WebhookConfig {
    WebhookConfig {
        verify_token: SecretString::new(TEST_VERIFY_TOKEN.to_string()),
        app_secret: SecretString::new(TEST_APP_SECRET.to_string()),
        access_token: SecretString::new(TEST_ACCESS_TOKEN.to_string()),
        signature_mode: SignatureMode::Enforce,
        graph_api_url: format!("http://{graph_addr}"),
        graph_api_version: TEST_API_VERSION.to_string(),
        reply_timeout_secs: 5,
        reply_queue_capacity: 16,
        reply_concurrency: 4,
    }
}

/// `X-Hub-Signature-256` value computed independently of the crate under test
pub fn sign_body(body: &[u8], secret: &str) -> String {
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes()).unwrap();
    mac.update(body);
    format!("sha256={}", hex::encode(mac.finalize().into_bytes()))
}
