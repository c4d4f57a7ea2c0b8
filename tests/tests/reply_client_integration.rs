use std::sync::Arc;

use axum::http::StatusCode;
use eyre::Result;
use serde_json::json;
use wab_tests::{
    mock_graph::MockResponse,
    start_mock_graph_service,
    utils::{get_webhook_config, setup_test_env, TEST_ACCESS_TOKEN, TEST_API_VERSION},
    MockGraphState,
};
use wab_webhook::{
    error::SendError,
    infrastructure::HttpClientFactory,
    reply::{ApiErrorKind, ReplyClient},
    SendOutcome,
};

const PHONE_NUMBER_ID: &str = "106540352242922";
const RECIPIENT: &str = "16315551181";

async fn setup() -> Result<(Arc<MockGraphState>, ReplyClient)> {
    setup_test_env();

    let state = Arc::new(MockGraphState::new());
    let addr = start_mock_graph_service(state.clone()).await?;
    let config = get_webhook_config(addr);
    let client = ReplyClient::new(&config, &HttpClientFactory::new())?;

    Ok((state, client))
}

fn expect_api_error(result: Result<SendOutcome, SendError>) -> ApiErrorKind {
    match result {
        Err(SendError::Api { kind, .. }) => kind,
        other => panic!("expected API error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_send_posts_text_message() -> Result<()> {
    let (state, client) = setup().await?;

    let outcome = client.send(PHONE_NUMBER_ID, RECIPIENT, "Hello! Thank you for contacting us. 👋").await?;
    let SendOutcome::Sent(response) = outcome else { panic!("expected a sent message") };
    assert_eq!(response["messaging_product"], "whatsapp");
    assert_eq!(response["contacts"][0]["wa_id"], RECIPIENT);

    assert_eq!(state.received_messages(), 1);
    let request = &state.requests()[0];
    assert_eq!(request.api_version, TEST_API_VERSION);
    assert_eq!(request.phone_number_id, PHONE_NUMBER_ID);
    assert_eq!(request.authorization.as_deref(), Some(format!("Bearer {TEST_ACCESS_TOKEN}").as_str()));
    assert_eq!(
        request.body,
        json!({
            "messaging_product": "whatsapp",
            "to": RECIPIENT,
            "type": "text",
            "text": { "body": "Hello! Thank you for contacting us. 👋" }
        })
    );

    Ok(())
}

#[tokio::test]
async fn test_expired_token_is_classified() -> Result<()> {
    let (state, client) = setup().await?;
    state.set_error_response(
        StatusCode::UNAUTHORIZED,
        190,
        Some(463),
        "Error validating access token: Session has expired on Tuesday, 17-Jun-25 10:00:00 PDT.",
    );

    let kind = expect_api_error(client.send(PHONE_NUMBER_ID, RECIPIENT, "hi").await);
    assert_eq!(kind, ApiErrorKind::TokenExpired);
    assert!(!kind.remediation().is_empty());

    Ok(())
}

#[tokio::test]
async fn test_invalid_token_is_classified() -> Result<()> {
    let (state, client) = setup().await?;
    state.set_error_response(StatusCode::UNAUTHORIZED, 190, None, "Invalid OAuth access token - Cannot parse access token");

    let kind = expect_api_error(client.send(PHONE_NUMBER_ID, RECIPIENT, "hi").await);
    assert_eq!(kind, ApiErrorKind::InvalidToken);

    Ok(())
}

#[tokio::test]
async fn test_invalid_phone_number_id_is_classified() -> Result<()> {
    let (state, client) = setup().await?;
    state.set_error_response(
        StatusCode::BAD_REQUEST,
        100,
        Some(33),
        "Unsupported post request. Object with ID '106540352242922' does not exist",
    );

    let result = client.send(PHONE_NUMBER_ID, RECIPIENT, "hi").await;
    let Err(SendError::Api { kind, error }) = result else { panic!("expected API error") };
    assert_eq!(kind, ApiErrorKind::InvalidPhoneNumberId);
    assert_eq!(error.fbtrace_id.as_deref(), Some("AbCdEfGh123"));

    Ok(())
}

#[tokio::test]
async fn test_other_api_errors_are_generic() -> Result<()> {
    let (state, client) = setup().await?;
    state.set_error_response(StatusCode::BAD_REQUEST, 131030, None, "Recipient phone number not in allowed list");

    let kind = expect_api_error(client.send(PHONE_NUMBER_ID, RECIPIENT, "hi").await);
    assert_eq!(kind, ApiErrorKind::Generic);

    Ok(())
}

#[tokio::test]
async fn test_non_json_server_error_is_generic() -> Result<()> {
    let (state, client) = setup().await?;
    state.set_response_override(MockResponse::Text(
        StatusCode::BAD_GATEWAY,
        "upstream unavailable".to_string(),
    ));

    let result = client.send(PHONE_NUMBER_ID, RECIPIENT, "hi").await;
    let Err(SendError::Api { kind, error }) = result else { panic!("expected API error") };
    assert_eq!(kind, ApiErrorKind::Generic);
    assert_eq!(error.code, 502);
    assert!(error.message.contains("upstream unavailable"));

    Ok(())
}

#[tokio::test]
async fn test_test_phone_number_ids_are_skipped() -> Result<()> {
    let (state, client) = setup().await?;

    for phone_number_id in ["123456123", "123456789"] {
        let outcome = client.send(phone_number_id, RECIPIENT, "hi").await?;
        assert_eq!(outcome, SendOutcome::Skipped);
    }
    assert_eq!(state.received_messages(), 0);

    Ok(())
}

#[tokio::test]
async fn test_unreachable_api_is_transport_error() -> Result<()> {
    setup_test_env();

    let mut config = get_webhook_config("127.0.0.1:1".parse()?);
    config.reply_timeout_secs = 2;
    let client = ReplyClient::new(&config, &HttpClientFactory::with_timeout(config.reply_timeout()))?;

    let result = client.send(PHONE_NUMBER_ID, RECIPIENT, "hi").await;
    assert!(matches!(result, Err(SendError::Transport(_))));

    Ok(())
}
