use std::{future::Future, sync::Arc};

use axum::{routing::get, Router};
use eyre::WrapErr;
use tokio::{net::TcpListener, task::JoinHandle};
use tower::ServiceBuilder;
use tower_http::{catch_panic::CatchPanicLayer, limit::RequestBodyLimitLayer, trace::TraceLayer};
use tracing::{error, info};
use wab_common::config::WebhookConfig;

use crate::{
    dispatch::EventDispatcher,
    infrastructure::{HttpClientFactory, MAX_REQUEST_SIZE},
    message::MessageHandler,
    reply::ReplyClient,
};

use super::{
    handlers::{health_check, metrics, receive_webhook, status_page, verify_webhook},
    processing::{process_reply_loop, ReplyQueue},
    state::AppState,
};

/// Path of the verification and event delivery endpoints
pub const WEBHOOK_PATH: &str = "/api/webhooks/whatsapp";

/// Wire the reply pipeline and build the router.
///
/// Returns the router and the reply worker handle. The worker stops once the router and all of
/// its clones are dropped, after delivering every queued reply.
pub fn build_app(
    config: Arc<WebhookConfig>,
    port: u16,
) -> eyre::Result<(Router, JoinHandle<()>)> {
    let http_client_factory = HttpClientFactory::with_timeout(config.reply_timeout());
    let reply_client = Arc::new(ReplyClient::new(&config, &http_client_factory)?);

    // Create channel for reply delivery with backpressure
    let (reply_queue, rx) = ReplyQueue::channel(config.reply_queue_capacity);
    let dispatcher = Arc::new(EventDispatcher::new(MessageHandler::default(), Arc::new(reply_queue)));

    // Spawn background reply worker
    let reply_worker =
        tokio::spawn(process_reply_loop(rx, reply_client, config.reply_concurrency));

    let app_state = AppState::new(config, dispatcher, port);

    Ok((create_router(app_state), reply_worker))
}

/// Start the webhook server and serve until `shutdown` resolves
pub async fn start_webhook_server<F>(
    config: WebhookConfig,
    port: u16,
    shutdown: F,
) -> eyre::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let (app, reply_worker) = build_app(Arc::new(config), port)?;

    let addr = format!("0.0.0.0:{port}");
    let listener =
        TcpListener::bind(&addr).await.wrap_err_with(|| format!("Failed to bind {addr}"))?;
    info!("Webhook server listening on {}", addr);

    axum::serve(listener, app).with_graceful_shutdown(shutdown).await?;

    info!("Server stopped, draining reply queue");
    if let Err(e) = reply_worker.await {
        error!("Reply worker failed: {}", e);
    }

    Ok(())
}

/// Create the Axum router with all routes and middleware
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route(WEBHOOK_PATH, get(verify_webhook).post(receive_webhook))
        .route("/health", get(health_check))
        .route("/metrics", get(metrics))
        .route("/", get(status_page))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CatchPanicLayer::new())
                .layer(RequestBodyLimitLayer::new(MAX_REQUEST_SIZE)),
        )
        .with_state(state)
}
