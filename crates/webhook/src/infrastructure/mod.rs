pub mod http_client;
pub use http_client::HttpClientFactory;

/// Request body size limit (1MB)
pub const MAX_REQUEST_SIZE: usize = 1024 * 1024;
