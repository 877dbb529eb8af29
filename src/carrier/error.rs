//! Carrier Error Types
//!
//! Provider-reported error codes collapse into this taxonomy. Only
//! `TransientProvider` is retryable; every other send-time error is a
//! terminal rejection and produces no message identifier.

use thiserror::Error;

/// Carrier gateway error taxonomy
#[derive(Error, Debug, Clone)]
pub enum CarrierError {
    #[error("Invalid recipient number: {0}")]
    InvalidRecipient(String),

    #[error("Not authorized to send to this destination")]
    Unauthorized,

    #[error("Recipient has blocked SMS messages")]
    RecipientBlocked,

    #[error("Recipient type cannot receive SMS (landline?)")]
    UnsupportedRecipientType,

    #[error("Transient provider error: {0}")]
    TransientProvider(String),

    #[error("Provider has no record of message {0}")]
    NotFound(String),
}

impl CarrierError {
    /// Get the error code for reports and API responses
    pub fn code(&self) -> &'static str {
        match self {
            CarrierError::InvalidRecipient(_) => "INVALID_RECIPIENT",
            CarrierError::Unauthorized => "UNAUTHORIZED",
            CarrierError::RecipientBlocked => "RECIPIENT_BLOCKED",
            CarrierError::UnsupportedRecipientType => "UNSUPPORTED_RECIPIENT_TYPE",
            CarrierError::TransientProvider(_) => "TRANSIENT_PROVIDER_ERROR",
            CarrierError::NotFound(_) => "NOT_FOUND",
        }
    }

    /// Whether the caller may retry the same call
    pub fn is_retryable(&self) -> bool {
        matches!(self, CarrierError::TransientProvider(_))
    }

    /// Map a provider-reported numeric error code from a send attempt.
    /// Codes outside the known set fall back to an HTTP-status based guess.
    pub fn from_provider_code(code: i64, detail: &str, http_status: u16) -> Self {
        match code {
            21211 => CarrierError::InvalidRecipient(detail.to_string()),
            21408 => CarrierError::Unauthorized,
            21610 => CarrierError::RecipientBlocked,
            21612 => CarrierError::UnsupportedRecipientType,
            20003 => CarrierError::Unauthorized,
            20404 => CarrierError::NotFound(detail.to_string()),
            _ => CarrierError::from_http_status(http_status, detail),
        }
    }

    /// Classify by HTTP status alone (no provider code in the body)
    pub fn from_http_status(status: u16, detail: &str) -> Self {
        match status {
            401 | 403 => CarrierError::Unauthorized,
            404 => CarrierError::NotFound(detail.to_string()),
            400 => CarrierError::InvalidRecipient(detail.to_string()),
            _ => CarrierError::TransientProvider(format!("HTTP {}: {}", status, detail)),
        }
    }
}

impl From<reqwest::Error> for CarrierError {
    fn from(e: reqwest::Error) -> Self {
        CarrierError::TransientProvider(e.to_string())
    }
}
