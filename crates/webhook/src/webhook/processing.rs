use std::sync::Arc;

use tokio::{
    sync::mpsc::{self, error::TrySendError},
    task::{JoinError, JoinSet},
};
use tracing::{debug, error, info};

use crate::{
    dispatch::ReplySink,
    metrics::REPLIES,
    reply::{ReplyClient, SendOutcome},
    types::OutboundMessage,
};

/// Bounded queue between request handlers and the reply worker
#[derive(Clone)]
pub struct ReplyQueue {
    sender: mpsc::Sender<OutboundMessage>,
}

impl ReplyQueue {
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<OutboundMessage>) {
        let (sender, receiver) = mpsc::channel(capacity);
        (Self { sender }, receiver)
    }
}

impl ReplySink for ReplyQueue {
    fn submit(&self, message: OutboundMessage) -> bool {
        match self.sender.try_send(message) {
            Ok(()) => {
                REPLIES.with_label_values(&["queued"]).inc();
                true
            }
            Err(TrySendError::Full(message)) => {
                error!(to = %message.to, "Reply queue full, dropping reply");
                REPLIES.with_label_values(&["dropped"]).inc();
                false
            }
            Err(TrySendError::Closed(message)) => {
                error!(to = %message.to, "Reply worker stopped, dropping reply");
                REPLIES.with_label_values(&["dropped"]).inc();
                false
            }
        }
    }
}

/// Background task delivering queued replies.
///
/// Each reply is sent on its own task, at most `max_in_flight` at a time. While that limit is
/// reached the queue is not read, so a full queue drops new replies at submission. When every
/// queue handle is dropped the loop stops receiving and waits for the sends still in flight.
pub async fn process_reply_loop(
    mut rx: mpsc::Receiver<OutboundMessage>,
    client: Arc<ReplyClient>,
    max_in_flight: usize,
) {
    let max_in_flight = max_in_flight.max(1);
    let mut in_flight = JoinSet::new();

    loop {
        tokio::select! {
            received = rx.recv(), if in_flight.len() < max_in_flight => match received {
                Some(message) => {
                    let client = client.clone();
                    in_flight.spawn(async move { deliver_reply(&client, message).await });
                }
                None => break,
            },
            Some(joined) = in_flight.join_next(), if !in_flight.is_empty() => log_join(joined),
        }
    }

    if !in_flight.is_empty() {
        info!(pending = in_flight.len(), "Waiting for in-flight replies");
    }
    while let Some(joined) = in_flight.join_next().await {
        log_join(joined);
    }

    info!("Reply worker stopped");
}

async fn deliver_reply(client: &ReplyClient, message: OutboundMessage) {
    // Failures are already logged by the client with remediation steps
    match client.send_message(&message).await {
        Ok(SendOutcome::Sent(_)) => REPLIES.with_label_values(&["sent"]).inc(),
        Ok(SendOutcome::Skipped) => REPLIES.with_label_values(&["skipped"]).inc(),
        Err(e) => {
            REPLIES.with_label_values(&[e.label()]).inc();
            debug!(to = %message.to, error = %e, "Reply not delivered");
        }
    }
}

fn log_join(result: Result<(), JoinError>) {
    if let Err(e) = result {
        error!(error = %e, "Reply task failed");
    }
}
