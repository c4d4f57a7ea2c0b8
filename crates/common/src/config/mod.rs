use std::{
    fmt,
    fs,
    path::{Path, PathBuf},
    str::FromStr,
    time::Duration,
};

use eyre::{bail, Result, WrapErr};
use secrecy::{ExposeSecret, SecretString};
use tracing::{info, warn};

mod validation;
pub use validation::validate_config;

pub const DEFAULT_CONFIG_FILE: &str = "config.txt";

pub const PLACEHOLDER_VERIFY_TOKEN: &str = "your_verify_token_here";
pub const PLACEHOLDER_APP_SECRET: &str = "your_app_secret_here";
pub const PLACEHOLDER_WHATSAPP_TOKEN: &str = "your_whatsapp_token_here";

pub const DEFAULT_GRAPH_API_URL: &str = "https://graph.facebook.com";
pub const DEFAULT_GRAPH_API_VERSION: &str = "v18.0";
pub const DEFAULT_REPLY_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_REPLY_QUEUE_CAPACITY: usize = 100;
pub const DEFAULT_REPLY_CONCURRENCY: usize = 8;

/// Template written when no configuration file exists yet
pub const CONFIG_TEMPLATE: &str = "# WhatsApp Webhook Configuration
# Just paste your tokens after the = sign (no quotes needed)

VERIFY_TOKEN=your_verify_token_here
APP_SECRET=your_app_secret_here
WHATSAPP_TOKEN=your_whatsapp_token_here

# Optional settings
# SIGNATURE_MODE=enforce   (enforce or advisory)
# GRAPH_API_URL=https://graph.facebook.com
# GRAPH_API_VERSION=v18.0
# REPLY_TIMEOUT_SECS=10
# REPLY_QUEUE_CAPACITY=100
# REPLY_CONCURRENCY=8
";

/// How the POST endpoint treats a failed `x-hub-signature-256` check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SignatureMode {
    /// Reject the request with 401
    #[default]
    Enforce,
    /// Log a warning and keep processing
    Advisory,
}

impl FromStr for SignatureMode {
    type Err = eyre::Report;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "enforce" => Ok(Self::Enforce),
            "advisory" => Ok(Self::Advisory),
            other => bail!("Unknown signature mode '{other}', expected 'enforce' or 'advisory'"),
        }
    }
}

impl fmt::Display for SignatureMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Enforce => f.write_str("enforce"),
            Self::Advisory => f.write_str("advisory"),
        }
    }
}

/// Immutable runtime configuration, loaded once at startup
#[derive(Debug, Clone)]
pub struct WebhookConfig {
    /// Token echoed back during the GET subscription handshake
    pub verify_token: SecretString,
    /// App secret used to sign webhook payloads
    pub app_secret: SecretString,
    /// Bearer token for the Graph API
    pub access_token: SecretString,
    pub signature_mode: SignatureMode,
    pub graph_api_url: String,
    pub graph_api_version: String,
    pub reply_timeout_secs: u64,
    pub reply_queue_capacity: usize,
    /// Maximum Graph API sends in flight at once
    pub reply_concurrency: usize,
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            verify_token: SecretString::new(PLACEHOLDER_VERIFY_TOKEN.to_string()),
            app_secret: SecretString::new(PLACEHOLDER_APP_SECRET.to_string()),
            access_token: SecretString::new(PLACEHOLDER_WHATSAPP_TOKEN.to_string()),
            signature_mode: SignatureMode::default(),
            graph_api_url: DEFAULT_GRAPH_API_URL.to_string(),
            graph_api_version: DEFAULT_GRAPH_API_VERSION.to_string(),
            reply_timeout_secs: DEFAULT_REPLY_TIMEOUT_SECS,
            reply_queue_capacity: DEFAULT_REPLY_QUEUE_CAPACITY,
            reply_concurrency: DEFAULT_REPLY_CONCURRENCY,
        }
    }
}

impl WebhookConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        validate_config(self)
    }

    pub fn reply_timeout(&self) -> Duration {
        Duration::from_secs(self.reply_timeout_secs)
    }

    /// Keys whose value is still the template placeholder
    pub fn placeholder_keys(&self) -> Vec<&'static str> {
        let mut keys = Vec::new();
        if self.verify_token.expose_secret() == PLACEHOLDER_VERIFY_TOKEN {
            keys.push("VERIFY_TOKEN");
        }
        if self.app_secret.expose_secret() == PLACEHOLDER_APP_SECRET {
            keys.push("APP_SECRET");
        }
        if self.access_token.expose_secret() == PLACEHOLDER_WHATSAPP_TOKEN {
            keys.push("WHATSAPP_TOKEN");
        }
        keys
    }

    /// Apply a single `KEY=value` pair from the config file
    fn apply(&mut self, key: &str, value: String) -> Result<()> {
        match key {
            "VERIFY_TOKEN" => self.verify_token = SecretString::new(value),
            "APP_SECRET" => self.app_secret = SecretString::new(value),
            "WHATSAPP_TOKEN" => self.access_token = SecretString::new(value),
            "SIGNATURE_MODE" => self.signature_mode = value.parse()?,
            "GRAPH_API_URL" => self.graph_api_url = value.trim_end_matches('/').to_string(),
            "GRAPH_API_VERSION" => self.graph_api_version = value,
            "REPLY_TIMEOUT_SECS" => {
                self.reply_timeout_secs =
                    value.parse().wrap_err_with(|| format!("Invalid REPLY_TIMEOUT_SECS '{value}'"))?
            }
            "REPLY_QUEUE_CAPACITY" => {
                self.reply_queue_capacity = value
                    .parse()
                    .wrap_err_with(|| format!("Invalid REPLY_QUEUE_CAPACITY '{value}'"))?
            }
            "REPLY_CONCURRENCY" => {
                self.reply_concurrency = value
                    .parse()
                    .wrap_err_with(|| format!("Invalid REPLY_CONCURRENCY '{value}'"))?
            }
            other => warn!(key = other, "Ignoring unknown configuration key"),
        }
        Ok(())
    }
}

/// Result of [`load_config`]
#[derive(Debug)]
pub struct LoadedConfig {
    pub config: WebhookConfig,
    pub path: PathBuf,
    /// Whether the file was missing and a template was written
    pub created: bool,
}

/// Load the configuration file, writing the placeholder template if it does not exist
pub fn load_config(path: impl AsRef<Path>) -> Result<LoadedConfig> {
    let path = path.as_ref().to_path_buf();

    if !path.exists() {
        fs::write(&path, CONFIG_TEMPLATE)
            .wrap_err_with(|| format!("Failed to create {}", path.display()))?;
        info!(path = %path.display(), "Created configuration file, please update it with your tokens");
        return Ok(LoadedConfig { config: WebhookConfig::default(), path, created: true });
    }

    let config = parse_config_file(&path)?;
    info!(path = %path.display(), "Configuration loaded");

    Ok(LoadedConfig { config, path, created: false })
}

/// Parse a `KEY=value` configuration file on top of the defaults.
///
/// Values are taken literally: everything after the first `=`, trimmed. No quoting, no inline
/// comments and no variable expansion. Lines without `=` are skipped with a warning.
pub fn parse_config_file(path: &Path) -> Result<WebhookConfig> {
    let contents = fs::read_to_string(path)
        .wrap_err_with(|| format!("Failed to read {}", path.display()))?;

    let mut config = WebhookConfig::default();

    for (index, line) in contents.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let Some((key, value)) = line.split_once('=') else {
            warn!(path = %path.display(), line = index + 1, "Skipping configuration line without '='");
            continue;
        };

        // Empty values keep the default
        let value = value.trim();
        if value.is_empty() {
            continue;
        }

        config.apply(key.trim(), value.to_string())?;
    }

    Ok(config)
}
