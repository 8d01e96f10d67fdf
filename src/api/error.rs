//! API error types

use thiserror::Error;

/// API error with classification
#[derive(Debug, Error)]
#[error("{message}")]
pub struct ApiError {
    pub kind: ApiErrorKind,
    pub message: String,
}

impl ApiError {
    pub fn new(kind: ApiErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(ApiErrorKind::Network, message)
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(ApiErrorKind::Timeout, message)
    }

    pub fn decode(message: impl Into<String>) -> Self {
        Self::new(ApiErrorKind::Decode, message)
    }

    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self::new(ApiErrorKind::RateLimited, message)
    }

    /// Classify a non-success HTTP status
    pub fn from_status(status: reqwest::StatusCode, body: &str) -> Self {
        let body = body.trim();
        let detail = if body.is_empty() {
            status.to_string()
        } else {
            format!("{status}: {body}")
        };
        match status.as_u16() {
            429 => Self::rate_limited(format!("Rate limited ({detail})")),
            401 | 403 => Self::new(ApiErrorKind::Unauthorized, format!("Unauthorized ({detail})")),
            code => Self::new(ApiErrorKind::Status(code), format!("Request failed ({detail})")),
        }
    }

    pub fn is_rate_limited(&self) -> bool {
        self.kind == ApiErrorKind::RateLimited
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::timeout(format!("Request timed out: {err}"))
        } else if err.is_decode() {
            Self::decode(format!("Invalid response body: {err}"))
        } else {
            Self::network(format!("Network error: {err}"))
        }
    }
}

/// Error classification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiErrorKind {
    /// HTTP 429
    RateLimited,
    /// Wrong or missing admin password (401, 403)
    Unauthorized,
    /// Any other non-success status
    Status(u16),
    /// Connection failures
    Network,
    /// Client-side timeout elapsed
    Timeout,
    /// Response body did not match the expected shape
    Decode,
}
