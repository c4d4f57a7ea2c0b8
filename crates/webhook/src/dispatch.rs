//! Envelope traversal and per-item routing.
//!
//! The dispatcher walks `entry[].changes[]`, decodes `messages` changes and hands each message
//! and status to its handler. Item failures are recorded in the [`DispatchReport`] and never
//! abort the batch.

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::{
    error::{DispatchError, ItemError},
    message::MessageHandler,
    metrics::{EVENTS_RECEIVED, ITEM_FAILURES},
    status::handle_status,
    types::{
        ChangeValue, InboundMessage, Lenient, OutboundMessage, StatusUpdate, WebhookEnvelope,
        MESSAGES_FIELD, WHATSAPP_OBJECT,
    },
};

/// Receives replies decided during dispatch. Implementations must not block.
pub trait ReplySink: Send + Sync {
    /// Returns whether the reply was accepted for delivery
    fn submit(&self, message: OutboundMessage) -> bool;
}

/// Position of a failed item inside the envelope
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemFailure {
    pub entry: usize,
    /// `None` when the whole entry failed to decode
    pub change: Option<usize>,
    /// Index within `messages` or `statuses`, `None` for a whole entry or change
    pub item: Option<usize>,
    pub error: ItemError,
}

/// What a dispatch cycle did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchReport {
    pub entries: usize,
    pub changes: usize,
    /// Changes whose `field` is not `messages`
    pub skipped_changes: usize,
    pub messages: usize,
    pub statuses: usize,
    pub replies_queued: usize,
    pub failures: Vec<ItemFailure>,
}

impl DispatchReport {
    fn record_failure(
        &mut self,
        entry: usize,
        change: Option<usize>,
        item: Option<usize>,
        error: ItemError,
    ) {
        warn!(entry, change = ?change, item = ?item, error = %error, "Failed to handle webhook item");
        ITEM_FAILURES.with_label_values(&[error.label()]).inc();
        self.failures.push(ItemFailure { entry, change, item, error });
    }
}

pub struct EventDispatcher {
    messages: MessageHandler,
    replies: Arc<dyn ReplySink>,
}

impl EventDispatcher {
    pub fn new(messages: MessageHandler, replies: Arc<dyn ReplySink>) -> Self {
        Self { messages, replies }
    }

    /// Dispatch a raw request body
    pub fn dispatch_bytes(&self, body: &[u8]) -> Result<DispatchReport, DispatchError> {
        let value: Value = serde_json::from_slice(body).map_err(DispatchError::InvalidJson)?;
        self.dispatch_value(value)
    }

    /// Check the `object` discriminator, decode the envelope and dispatch it
    pub fn dispatch_value(&self, value: Value) -> Result<DispatchReport, DispatchError> {
        let object = value.get("object").and_then(Value::as_str);
        if object != Some(WHATSAPP_OBJECT) {
            info!(object = ?object, "Received non-WhatsApp event");
            return Err(DispatchError::ForeignObject(object.map(String::from)));
        }

        let envelope: WebhookEnvelope =
            serde_json::from_value(value).map_err(DispatchError::MalformedEnvelope)?;

        Ok(self.dispatch(&envelope))
    }

    /// Walk a decoded envelope. Every item is handled independently.
    pub fn dispatch(&self, envelope: &WebhookEnvelope) -> DispatchReport {
        let mut report = DispatchReport { entries: envelope.entry.len(), ..Default::default() };

        for (entry_index, entry) in envelope.entry.iter().enumerate() {
            let entry = match entry {
                Lenient::Valid(entry) => entry,
                Lenient::Malformed { reason, .. } => {
                    let error = ItemError::MalformedItem { kind: "entry", reason: reason.clone() };
                    report.record_failure(entry_index, None, None, error);
                    continue;
                }
            };

            for (change_index, change) in entry.changes.iter().enumerate() {
                report.changes += 1;

                let change = match change {
                    Lenient::Valid(change) => change,
                    Lenient::Malformed { reason, .. } => {
                        let error =
                            ItemError::MalformedItem { kind: "change", reason: reason.clone() };
                        report.record_failure(entry_index, Some(change_index), None, error);
                        continue;
                    }
                };

                if change.field != MESSAGES_FIELD {
                    debug!(field = %change.field, entry_id = ?entry.id, "Skipping change");
                    report.skipped_changes += 1;
                    continue;
                }

                match change.messages_value() {
                    Ok(value) => self.dispatch_change(&value, entry_index, change_index, &mut report),
                    Err(e) => report.record_failure(entry_index, Some(change_index), None, e),
                }
            }
        }

        report
    }

    fn dispatch_change(
        &self,
        value: &ChangeValue,
        entry: usize,
        change: usize,
        report: &mut DispatchReport,
    ) {
        if let Some(messages) = &value.messages {
            for (index, item) in messages.iter().enumerate() {
                report.messages += 1;
                match self.dispatch_message(item, value) {
                    Ok(true) => report.replies_queued += 1,
                    Ok(false) => {}
                    Err(e) => report.record_failure(entry, Some(change), Some(index), e),
                }
            }
        }

        if let Some(statuses) = &value.statuses {
            for (index, item) in statuses.iter().enumerate() {
                report.statuses += 1;
                if let Err(e) = dispatch_status(item) {
                    report.record_failure(entry, Some(change), Some(index), e);
                }
            }
        }
    }

    /// Returns whether a reply was queued
    fn dispatch_message(
        &self,
        item: &Lenient<InboundMessage>,
        value: &ChangeValue,
    ) -> Result<bool, ItemError> {
        let message = match item {
            Lenient::Valid(message) => message,
            Lenient::Malformed { reason, .. } => {
                return Err(ItemError::MalformedItem { kind: "message", reason: reason.clone() })
            }
        };

        EVENTS_RECEIVED.with_label_values(&["message"]).inc();
        info!(
            from = %message.from,
            name = ?value.contact_name(&message.from),
            message_type = %message.kind,
            timestamp = %message.timestamp,
            message_id = %message.id,
            "Received message"
        );

        let metadata = value.metadata.as_ref().ok_or(ItemError::MissingMetadata)?;

        Ok(match self.messages.handle(message, metadata)? {
            Some(reply) => self.replies.submit(reply),
            None => false,
        })
    }
}

fn dispatch_status(item: &Lenient<StatusUpdate>) -> Result<(), ItemError> {
    let status = match item {
        Lenient::Valid(status) => status,
        Lenient::Malformed { reason, .. } => {
            return Err(ItemError::MalformedItem { kind: "status", reason: reason.clone() })
        }
    };

    EVENTS_RECEIVED.with_label_values(&["status"]).inc();
    info!(
        message_id = %status.id,
        status = %status.status,
        timestamp = ?status.timestamp,
        "Status update"
    );

    handle_status(status);
    Ok(())
}
