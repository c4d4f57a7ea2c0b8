use std::time::Duration;

use eyre::{Result, WrapErr};
use reqwest::{Client, ClientBuilder};

const USER_AGENT: &str = concat!("wabridge/", env!("CARGO_PKG_VERSION"));

/// HTTP client factory with connection pooling and a bounded request timeout
pub struct HttpClientFactory {
    timeout: Duration,
    max_idle_per_host: usize,
}

impl HttpClientFactory {
    /// Create a new HTTP client factory with default settings
    pub fn new() -> Self {
        Self { timeout: Duration::from_secs(10), max_idle_per_host: 10 }
    }

    /// Factory whose clients time out after `timeout`
    pub fn with_timeout(timeout: Duration) -> Self {
        Self { timeout, ..Self::new() }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Create a new HTTP client with connection pooling
    pub fn create_client(&self) -> Result<Client> {
        ClientBuilder::new()
            .user_agent(USER_AGENT)
            .pool_max_idle_per_host(self.max_idle_per_host)
            .timeout(self.timeout)
            .build()
            .wrap_err("Failed to create HTTP client")
    }
}

impl Default for HttpClientFactory {
    fn default() -> Self {
        Self::new()
    }
}
