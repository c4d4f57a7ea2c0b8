use std::fmt;

use serde::{Deserialize, Serialize};

/// OAuth exception code used for expired and invalid tokens
pub const OAUTH_EXCEPTION_CODE: i64 = 190;
/// Subcode of an expired session
pub const SESSION_EXPIRED_SUBCODE: i64 = 463;
/// Invalid parameter code
pub const INVALID_PARAMETER_CODE: i64 = 100;
/// Subcode for an object that does not exist or lacks permissions
pub const UNSUPPORTED_OBJECT_SUBCODE: i64 = 33;

/// `error` object returned by the Graph API
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphApiError {
    #[serde(default)]
    pub message: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default)]
    pub code: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_subcode: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fbtrace_id: Option<String>,
}

impl GraphApiError {
    /// Error for a failed HTTP status that came without an `error` object
    pub fn from_status(status: u16, body: &str) -> Self {
        Self {
            message: format!("HTTP {status}: {body}"),
            kind: None,
            code: i64::from(status),
            error_subcode: None,
            fbtrace_id: None,
        }
    }
}

/// Operator-actionable category of a Graph API error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ApiErrorKind {
    TokenExpired,
    InvalidToken,
    InvalidPhoneNumberId,
    Generic,
}

impl ApiErrorKind {
    pub fn classify(error: &GraphApiError) -> Self {
        match (error.code, error.error_subcode) {
            (OAUTH_EXCEPTION_CODE, Some(SESSION_EXPIRED_SUBCODE)) => Self::TokenExpired,
            (OAUTH_EXCEPTION_CODE, _) if error.message.contains("Session has expired") => {
                Self::TokenExpired
            }
            (OAUTH_EXCEPTION_CODE, _) if error.message.contains("Invalid OAuth access token") => {
                Self::InvalidToken
            }
            (INVALID_PARAMETER_CODE, Some(UNSUPPORTED_OBJECT_SUBCODE)) => {
                Self::InvalidPhoneNumberId
            }
            _ => Self::Generic,
        }
    }

    /// Steps an operator should follow to fix the error
    pub fn remediation(&self) -> &'static [&'static str] {
        match self {
            Self::TokenExpired => &[
                "1. Go to Facebook Developers Console (developers.facebook.com)",
                "2. Navigate to your WhatsApp Business API app",
                "3. Go to \"WhatsApp\" → \"API Setup\"",
                "4. Generate a new access token",
                "5. Update WHATSAPP_TOKEN in config.txt",
                "6. Restart the server",
            ],
            Self::InvalidToken => &[
                "1. Check if the token in config.txt is correct",
                "2. Generate a new token from Facebook Developers Console",
                "3. Make sure there are no extra spaces or characters",
                "4. Update WHATSAPP_TOKEN in config.txt",
                "5. Restart the server",
            ],
            Self::InvalidPhoneNumberId => &[
                "1. Check your WhatsApp Business API setup",
                "2. Verify the Phone Number ID in your webhook configuration",
                "3. Make sure the phone number is properly verified",
                "4. Check if you have the correct permissions for this phone number",
                "5. Go to Facebook Developers Console → WhatsApp → API Setup",
                "6. Verify your phone number and get the correct Phone Number ID",
            ],
            Self::Generic => &[],
        }
    }
}

impl fmt::Display for ApiErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TokenExpired => f.write_str("WhatsApp token expired"),
            Self::InvalidToken => f.write_str("Invalid WhatsApp token"),
            Self::InvalidPhoneNumberId => f.write_str("Invalid Phone Number ID"),
            Self::Generic => f.write_str("WhatsApp API error"),
        }
    }
}
