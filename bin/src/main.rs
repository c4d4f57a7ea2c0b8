use std::path::PathBuf;

use clap::Parser;
use eyre::Result;
use tracing::{error, info, warn};
use wab_common::{
    config::{load_config, DEFAULT_CONFIG_FILE},
    logging::{init_logging, install_panic_hook, LogSettings, DEFAULT_LOGS_DIR},
};
use wab_webhook::{start_webhook_server, webhook::WEBHOOK_PATH};

#[derive(Debug, Parser)]
#[command(version, about = "WhatsApp Business webhook receiver")]
struct Cli {
    /// Path to the KEY=value configuration file
    #[arg(long, env = "WABRIDGE_CONFIG", default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    #[arg(long, env = "PORT", default_value_t = 3000)]
    port: u16,

    /// Directory for the daily log files
    #[arg(long, default_value = DEFAULT_LOGS_DIR)]
    logs_dir: PathBuf,

    /// Filter directive used when RUST_LOG is not set
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Emit JSON lines on stdout
    #[arg(long)]
    log_json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Optional .env with PORT, WABRIDGE_CONFIG or RUST_LOG
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let _guard = init_logging(&LogSettings {
        dir: cli.logs_dir.clone(),
        level: cli.log_level.clone(),
        json: cli.log_json,
    })?;
    install_panic_hook();

    info!("Starting WhatsApp webhook server");

    let loaded = load_config(&cli.config)?;
    loaded.config.validate()?;

    let placeholders = loaded.config.placeholder_keys();
    if !placeholders.is_empty() {
        warn!(
            path = %loaded.path.display(),
            keys = ?placeholders,
            "Configuration still contains placeholder values, update them before going live"
        );
    }

    info!(
        port = cli.port,
        webhook_path = WEBHOOK_PATH,
        signature_mode = %loaded.config.signature_mode,
        graph_api_url = %loaded.config.graph_api_url,
        graph_api_version = %loaded.config.graph_api_version,
        logs_dir = %cli.logs_dir.display(),
        "Loaded and validated webhook configuration"
    );
    info!("Webhook URL: http://localhost:{}{}", cli.port, WEBHOOK_PATH);

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for shutdown signal: {}", e);
            return;
        }
        info!("Received shutdown signal, stopping gracefully...");
    };

    start_webhook_server(loaded.config, cli.port, shutdown).await?;

    info!("Webhook server shutdown complete");
    Ok(())
}
