pub mod challenge;
pub mod dispatch;
pub mod error;
pub mod infrastructure;
pub mod message;
pub mod metrics;
pub mod reply;
pub mod signature;
pub mod status;
pub mod types;
pub mod webhook;

pub use dispatch::{DispatchReport, EventDispatcher, ReplySink};
pub use reply::{ReplyClient, SendOutcome};
pub use webhook::{build_app, create_router, start_webhook_server};
