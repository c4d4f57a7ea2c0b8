use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::error::SignatureError;

type HmacSha256 = Hmac<Sha256>;

/// Header carrying the payload signature
pub const SIGNATURE_HEADER: &str = "x-hub-signature-256";

const SIGNATURE_PREFIX: &str = "sha256=";

/// Verify an `x-hub-signature-256` header against the raw request body.
///
/// The HMAC must be computed over the bytes exactly as received; a re-serialized body is not
/// guaranteed to match. The digest comparison is constant-time.
pub fn verify_signature(
    body: &[u8],
    secret: &[u8],
    header: Option<&str>,
) -> Result<(), SignatureError> {
    let header = header.ok_or(SignatureError::MissingSignature)?;

    let hex_digest = header.trim().strip_prefix(SIGNATURE_PREFIX).ok_or_else(|| {
        SignatureError::MalformedSignature(format!("expected '{SIGNATURE_PREFIX}<hex>' prefix"))
    })?;

    let expected = hex::decode(hex_digest)
        .map_err(|e| SignatureError::MalformedSignature(format!("invalid hex digest: {e}")))?;

    let mut mac = HmacSha256::new_from_slice(secret).map_err(|_| SignatureError::InvalidSignature)?;
    mac.update(body);
    mac.verify_slice(&expected).map_err(|_| SignatureError::InvalidSignature)
}

/// Compute the header value a sender would attach to `body`
pub fn sign_payload(body: &[u8], secret: &[u8]) -> String {
    // HMAC accepts keys of any length
    let mut mac = HmacSha256::new_from_slice(secret).expect("HMAC can take key of any size");
    mac.update(body);
    format!("{SIGNATURE_PREFIX}{}", hex::encode(mac.finalize().into_bytes()))
}
