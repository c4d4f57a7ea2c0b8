use eyre::{bail, Result};
use secrecy::ExposeSecret;

use super::WebhookConfig;

const MAX_REPLY_TIMEOUT_SECS: u64 = 60;
const MAX_REPLY_QUEUE_CAPACITY: usize = 10_000;
const MAX_REPLY_CONCURRENCY: usize = 256;

/// Validate a loaded configuration
pub fn validate_config(config: &WebhookConfig) -> Result<()> {
    for (key, value) in [
        ("VERIFY_TOKEN", config.verify_token.expose_secret()),
        ("APP_SECRET", config.app_secret.expose_secret()),
        ("WHATSAPP_TOKEN", config.access_token.expose_secret()),
    ] {
        if value.chars().any(char::is_whitespace) {
            bail!("{key} must not contain whitespace");
        }
    }

    validate_graph_api_url(&config.graph_api_url)?;
    validate_graph_api_version(&config.graph_api_version)?;

    if config.reply_timeout_secs == 0 || config.reply_timeout_secs > MAX_REPLY_TIMEOUT_SECS {
        bail!("Reply timeout must be between 1 and {MAX_REPLY_TIMEOUT_SECS} seconds");
    }

    if config.reply_queue_capacity == 0 || config.reply_queue_capacity > MAX_REPLY_QUEUE_CAPACITY {
        bail!("Reply queue capacity must be between 1 and {MAX_REPLY_QUEUE_CAPACITY}");
    }

    if config.reply_concurrency == 0 || config.reply_concurrency > MAX_REPLY_CONCURRENCY {
        bail!("Reply concurrency must be between 1 and {MAX_REPLY_CONCURRENCY}");
    }

    Ok(())
}

/// The Graph API base must be an absolute http(s) URL without a path
fn validate_graph_api_url(raw: &str) -> Result<()> {
    let parsed = match url::Url::parse(raw) {
        Ok(url) => url,
        Err(e) => bail!("Invalid GRAPH_API_URL '{raw}': {e}"),
    };

    if !matches!(parsed.scheme(), "http" | "https") {
        bail!("GRAPH_API_URL '{raw}' must use http or https");
    }

    if parsed.host_str().is_none() {
        bail!("GRAPH_API_URL '{raw}' has no host");
    }

    if parsed.path() != "/" {
        bail!("GRAPH_API_URL '{raw}' must not contain a path");
    }

    Ok(())
}

/// Versions look like `v18.0`
fn validate_graph_api_version(version: &str) -> Result<()> {
    let Some(number) = version.strip_prefix('v') else {
        bail!("GRAPH_API_VERSION '{version}' must start with 'v'");
    };

    let mut parts = number.split('.');
    let valid = matches!(
        (parts.next(), parts.next(), parts.next()),
        (Some(major), Some(minor), None)
            if !major.is_empty()
                && !minor.is_empty()
                && major.chars().all(|c| c.is_ascii_digit())
                && minor.chars().all(|c| c.is_ascii_digit())
    );

    if !valid {
        bail!("GRAPH_API_VERSION '{version}' must look like 'v18.0'");
    }

    Ok(())
}
