use lazy_static::lazy_static;
use prometheus::{register_int_counter_vec, Encoder, IntCounterVec, TextEncoder};

lazy_static! {
    /// Webhook requests by method and outcome
    pub static ref WEBHOOK_REQUESTS: IntCounterVec = register_int_counter_vec!(
        "wabridge_webhook_requests_total",
        "Webhook requests handled, by method and outcome",
        &["method", "outcome"]
    )
    .expect("Failed to register webhook requests metric");

    /// Messages and statuses received
    pub static ref EVENTS_RECEIVED: IntCounterVec = register_int_counter_vec!(
        "wabridge_events_received_total",
        "Inbound events dispatched, by kind",
        &["kind"]
    )
    .expect("Failed to register events received metric");

    /// Items that failed without affecting their siblings
    pub static ref ITEM_FAILURES: IntCounterVec = register_int_counter_vec!(
        "wabridge_item_failures_total",
        "Changes, messages or statuses that could not be handled",
        &["reason"]
    )
    .expect("Failed to register item failures metric");

    /// Signature checks by result
    pub static ref SIGNATURE_CHECKS: IntCounterVec = register_int_counter_vec!(
        "wabridge_signature_checks_total",
        "x-hub-signature-256 verification results",
        &["result"]
    )
    .expect("Failed to register signature checks metric");

    /// Outbound replies by outcome
    pub static ref REPLIES: IntCounterVec = register_int_counter_vec!(
        "wabridge_replies_total",
        "Auto-replies by outcome",
        &["outcome"]
    )
    .expect("Failed to register replies metric");
}

/// Render the default registry in the prometheus text format
pub fn render_metrics() -> eyre::Result<String> {
    let mut buffer = Vec::new();
    TextEncoder::new().encode(&prometheus::gather(), &mut buffer)?;
    Ok(String::from_utf8(buffer)?)
}
