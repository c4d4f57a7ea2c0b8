use std::{sync::Arc, time::Instant};

use wab_common::config::WebhookConfig;

use crate::dispatch::EventDispatcher;

/// Application state shared across webhook handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<WebhookConfig>,
    pub dispatcher: Arc<EventDispatcher>,
    pub started_at: Instant,
    /// Port shown on the status page
    pub port: u16,
}

impl AppState {
    /// Create a new AppState instance
    pub fn new(config: Arc<WebhookConfig>, dispatcher: Arc<EventDispatcher>, port: u16) -> Self {
        Self { config, dispatcher, started_at: Instant::now(), port }
    }
}
