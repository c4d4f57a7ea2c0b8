// Public exports
pub mod server;
pub use server::{build_app, create_router, start_webhook_server, WEBHOOK_PATH};

pub mod processing;
pub mod state;

// Internal modules
mod handlers;
