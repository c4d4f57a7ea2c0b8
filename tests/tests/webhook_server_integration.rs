use std::{sync::Arc, time::Duration};

use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use eyre::Result;
use serde_json::{json, Value};
use tower::ServiceExt;
use wab_tests::{
    start_mock_graph_service,
    utils::{get_webhook_config, setup_test_env, sign_body, TEST_APP_SECRET},
    MockGraphState,
};
use wab_webhook::{build_app, webhook::WEBHOOK_PATH};

fn text_envelope(phone_number_id: &str, messages: &[(&str, &str)]) -> Value {
    let messages: Vec<Value> = messages
        .iter()
        .enumerate()
        .map(|(i, (from, body))| {
            json!({
                "from": from,
                "id": format!("wamid.{i}"),
                "timestamp": "1750263773",
                "type": "text",
                "text": { "body": body }
            })
        })
        .collect();

    json!({
        "object": "whatsapp_business_account",
        "entry": [{
            "id": "102290129340398",
            "changes": [{
                "field": "messages",
                "value": {
                    "messaging_product": "whatsapp",
                    "metadata": { "display_phone_number": "15550783881", "phone_number_id": phone_number_id },
                    "messages": messages
                }
            }]
        }]
    })
}

fn signed_request(payload: &Value) -> Request<Body> {
    let raw = serde_json::to_vec(payload).unwrap();
    Request::post(WEBHOOK_PATH)
        .header("content-type", "application/json")
        .header("x-hub-signature-256", sign_body(&raw, TEST_APP_SECRET))
        .body(Body::from(raw))
        .unwrap()
}

#[tokio::test]
async fn test_greeting_is_delivered_to_graph_api() -> Result<()> {
    setup_test_env();

    let graph = Arc::new(MockGraphState::new());
    let addr = start_mock_graph_service(graph.clone()).await?;
    let (router, reply_worker) = build_app(Arc::new(get_webhook_config(addr)), 3000)?;

    let payload = text_envelope("106540352242922", &[("16315551181", "hello there"), ("16315551182", "foo")]);
    let response = router.oneshot(signed_request(&payload)).await?;
    assert_eq!(response.status(), StatusCode::OK);

    // Dropping the last router handle closes the queue, the worker drains and exits
    tokio::time::timeout(Duration::from_secs(10), reply_worker).await??;

    assert_eq!(graph.received_messages(), 1);
    let request = &graph.requests()[0];
    assert_eq!(request.phone_number_id, "106540352242922");
    assert_eq!(request.body["to"], "16315551181");
    assert_eq!(request.body["text"]["body"], "Hello! Thank you for contacting us. 👋");

    Ok(())
}

#[tokio::test]
async fn test_replies_for_test_phone_number_are_not_sent() -> Result<()> {
    setup_test_env();

    let graph = Arc::new(MockGraphState::new());
    let addr = start_mock_graph_service(graph.clone()).await?;
    let (router, reply_worker) = build_app(Arc::new(get_webhook_config(addr)), 3000)?;

    let payload = text_envelope("123456123", &[("16315551181", "help please")]);
    let response = router.oneshot(signed_request(&payload)).await?;
    assert_eq!(response.status(), StatusCode::OK);

    tokio::time::timeout(Duration::from_secs(10), reply_worker).await??;
    assert_eq!(graph.received_messages(), 0);

    Ok(())
}

#[tokio::test]
async fn test_unsigned_delivery_sends_nothing() -> Result<()> {
    setup_test_env();

    let graph = Arc::new(MockGraphState::new());
    let addr = start_mock_graph_service(graph.clone()).await?;
    let (router, reply_worker) = build_app(Arc::new(get_webhook_config(addr)), 3000)?;

    let raw = serde_json::to_vec(&text_envelope("106540352242922", &[("16315551181", "hi")]))?;
    let request = Request::post(WEBHOOK_PATH).body(Body::from(raw))?;
    let response = router.oneshot(request).await?;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    tokio::time::timeout(Duration::from_secs(10), reply_worker).await??;
    assert_eq!(graph.received_messages(), 0);

    Ok(())
}

#[tokio::test]
async fn test_failed_send_does_not_change_acknowledgement() -> Result<()> {
    setup_test_env();

    let graph = Arc::new(MockGraphState::new());
    graph.set_error_response(StatusCode::UNAUTHORIZED, 190, Some(463), "Session has expired");
    let addr = start_mock_graph_service(graph.clone()).await?;
    let (router, reply_worker) = build_app(Arc::new(get_webhook_config(addr)), 3000)?;

    let payload = text_envelope("106540352242922", &[("16315551181", "Hi")]);
    let response = router.oneshot(signed_request(&payload)).await?;
    assert_eq!(response.status(), StatusCode::OK);

    tokio::time::timeout(Duration::from_secs(10), reply_worker).await??;
    assert_eq!(graph.received_messages(), 1);

    Ok(())
}
