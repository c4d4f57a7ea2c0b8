use serde::Deserialize;
use tracing::{info, warn};
use wab_common::utils::constant_time_eq;

use crate::error::ChallengeError;

const SUBSCRIBE_MODE: &str = "subscribe";

/// Query parameters of the GET subscription handshake
#[derive(Debug, Clone, Default, Deserialize)]
pub struct VerificationParams {
    #[serde(rename = "hub.mode")]
    pub mode: Option<String>,
    #[serde(rename = "hub.verify_token")]
    pub verify_token: Option<String>,
    #[serde(rename = "hub.challenge")]
    pub challenge: Option<String>,
}

/// Answer the subscription handshake.
///
/// Returns the challenge to echo verbatim when the mode is `subscribe` and the token matches.
pub fn respond_to_challenge(
    params: &VerificationParams,
    expected_token: &str,
) -> Result<String, ChallengeError> {
    // Empty values count as absent
    fn present(value: &Option<String>) -> Option<&str> {
        value.as_deref().filter(|v| !v.is_empty())
    }

    let (Some(mode), Some(token)) = (present(&params.mode), present(&params.verify_token)) else {
        warn!("Missing mode or token parameters");
        return Err(ChallengeError::MissingParameters);
    };

    if mode == SUBSCRIBE_MODE && constant_time_eq(token.as_bytes(), expected_token.as_bytes()) {
        info!("Webhook verified successfully");
        Ok(params.challenge.clone().unwrap_or_default())
    } else {
        warn!(mode, "Verification failed, token mismatch");
        Err(ChallengeError::VerificationFailed)
    }
}
