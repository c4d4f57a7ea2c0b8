use tracing::{debug, info, warn};
use wab_common::utils::pretty_json;

use crate::types::{StatusKind, StatusUpdate};

/// Log a delivery status update. Purely observational.
pub fn handle_status(status: &StatusUpdate) -> StatusKind<'_> {
    let kind = status.kind();

    match kind {
        StatusKind::Sent => debug!(message_id = %status.id, "Message sent"),
        StatusKind::Delivered => info!(message_id = %status.id, "Message delivered"),
        StatusKind::Read => info!(message_id = %status.id, "Message read"),
        StatusKind::Failed => {
            warn!(message_id = %status.id, recipient_id = ?status.recipient_id, "Message failed");
            if !status.errors.is_empty() {
                warn!(message_id = %status.id, errors = %pretty_json(&status.errors), "Error details");
            }
        }
        StatusKind::Unknown(other) => {
            warn!(message_id = %status.id, status = other, "Unrecognized status")
        }
    }

    kind
}
