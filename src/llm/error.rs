//! Provider error taxonomy.

use std::fmt;
use thiserror::Error;

/// Broad category of a provider failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmErrorKind {
    /// 429 from the provider.
    RateLimited,
    /// 401/403: bad or missing credential.
    Authentication,
    /// Any other 4xx.
    ClientError,
    /// 5xx, or an `error` event in the middle of a stream.
    ServerError,
    /// Connection could not be opened or was interrupted.
    NetworkError,
    /// The provider sent something we could not decode.
    ParseError,
    /// The request was rejected locally before it was sent.
    InvalidRequest,
    /// The caller cancelled the stream.
    Cancelled,
}

impl LlmErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RateLimited => "rate_limited",
            Self::Authentication => "authentication",
            Self::ClientError => "client_error",
            Self::ServerError => "server_error",
            Self::NetworkError => "network_error",
            Self::ParseError => "parse_error",
            Self::InvalidRequest => "invalid_request",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for LlmErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classify an HTTP status code returned by a provider.
pub fn classify_http_status(status: u16) -> LlmErrorKind {
    match status {
        429 => LlmErrorKind::RateLimited,
        401 | 403 => LlmErrorKind::Authentication,
        400..=499 => LlmErrorKind::ClientError,
        _ => LlmErrorKind::ServerError,
    }
}

/// Error raised by a provider adapter while opening or reading a stream.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct LlmError {
    pub kind: LlmErrorKind,
    pub message: String,
    /// HTTP status, when the failure came from a provider response.
    pub status: Option<u16>,
}

impl LlmError {
    fn new(kind: LlmErrorKind, message: impl Into<String>, status: Option<u16>) -> Self {
        Self {
            kind,
            message: message.into(),
            status,
        }
    }

    /// Build an error from a non-success provider response.
    pub fn from_status(status: u16, body: &str) -> Self {
        let kind = classify_http_status(status);
        let message = extract_provider_message(body)
            .map(|m| format!("{} ({}): {}", kind, status, m))
            .unwrap_or_else(|| format!("{} ({}): {}", kind, status, body.trim()));
        Self::new(kind, message, Some(status))
    }

    pub fn network_error(message: impl Into<String>) -> Self {
        Self::new(LlmErrorKind::NetworkError, message, None)
    }

    pub fn parse_error(message: impl Into<String>) -> Self {
        Self::new(LlmErrorKind::ParseError, message, None)
    }

    pub fn server_error(message: impl Into<String>) -> Self {
        Self::new(LlmErrorKind::ServerError, message, None)
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(LlmErrorKind::InvalidRequest, message, None)
    }

    pub fn cancelled() -> Self {
        Self::new(LlmErrorKind::Cancelled, "Request cancelled", None)
    }

    pub fn is_cancelled(&self) -> bool {
        self.kind == LlmErrorKind::Cancelled
    }
}

/// Pull `error.message` out of a JSON error body such as
/// `{"type":"error","error":{"type":"overloaded_error","message":"Overloaded"}}`.
pub(crate) fn extract_provider_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    value
        .get("error")
        .and_then(|e| e.get("message"))
        .and_then(|m| m.as_str())
        .map(|s| s.to_string())
}
