use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use subtle::ConstantTimeEq;

/// Current UTC time as an RFC 3339 string with millisecond precision
pub fn utc_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Constant-time comparison for security-sensitive operations
#[must_use]
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    a.ct_eq(b).into()
}

/// Pretty-printed JSON for attaching payloads to log events
pub fn pretty_json<T: Serialize + ?Sized>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|e| format!("<unserializable: {e}>"))
}
