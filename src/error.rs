// src/error.rs

//! Unified error handling for the watcher.
//!
//! Two layers live here: [`AppError`] for run-level failures (configuration,
//! persistence, I/O) and [`FetchFailure`] for the per-target failures that are
//! turned into notification events instead of aborting a cycle.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias for watcher operations.
pub type Result<T> = std::result::Result<T, AppError>;

/// Unified application error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP client could not be built
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing failed
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// URL parsing failed
    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),

    /// Regular expression failed to compile
    #[error("Invalid pattern: {0}")]
    Pattern(#[from] regex::Error),

    /// CSS selector parsing failed
    #[error("Invalid selector '{selector}': {message}")]
    Selector { selector: String, message: String },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Data validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// Notification delivery error
    #[error("Delivery error via {sink}: {message}")]
    Delivery { sink: String, message: String },
}

impl AppError {
    /// Create a selector parsing error.
    pub fn selector(selector: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Selector {
            selector: selector.into(),
            message: message.to_string(),
        }
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create a delivery error for the named sink.
    pub fn delivery(sink: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Delivery {
            sink: sink.into(),
            message: message.to_string(),
        }
    }
}

/// Classification of a failed fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// The server refused access (401, 403, 429).
    Blocked,
    /// DNS, connect, TLS, timeout or a broken body stream.
    Transport,
    /// The response was not decodable text.
    Malformed,
    /// Any other non-success status.
    Status,
}

impl FailureKind {
    /// Short tag used in logs and messages.
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::Blocked => "blocked",
            FailureKind::Transport => "transport",
            FailureKind::Malformed => "malformed",
            FailureKind::Status => "status",
        }
    }

    /// Whether another direct attempt may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, FailureKind::Blocked | FailureKind::Transport)
    }

    /// Whether the fallback path should be tried after direct attempts ran out.
    pub fn allows_fallback(&self) -> bool {
        matches!(self, FailureKind::Blocked | FailureKind::Transport)
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A classified fetch failure with a human-readable reason.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[error("{kind}: {reason}")]
pub struct FetchFailure {
    pub kind: FailureKind,
    pub reason: String,
    /// Set for 5xx responses, which are retried even though they are `Status`.
    #[serde(skip)]
    pub transient: bool,
}

impl FetchFailure {
    pub fn new(kind: FailureKind, reason: impl Into<String>) -> Self {
        Self {
            kind,
            reason: reason.into(),
            transient: false,
        }
    }

    pub fn blocked(reason: impl Into<String>) -> Self {
        Self::new(FailureKind::Blocked, reason)
    }

    pub fn transport(reason: impl Into<String>) -> Self {
        Self::new(FailureKind::Transport, reason)
    }

    pub fn malformed(reason: impl Into<String>) -> Self {
        Self::new(FailureKind::Malformed, reason)
    }

    /// Failure for an unexpected HTTP status; server errors are marked transient.
    pub fn status(code: u16, reason: impl Into<String>) -> Self {
        Self {
            transient: (500..600).contains(&code),
            ..Self::new(FailureKind::Status, reason)
        }
    }

    /// Whether the retry loop should try again.
    pub fn is_retryable(&self) -> bool {
        self.kind.is_retryable() || self.transient
    }

    /// Classify a reqwest error raised while sending or reading a response.
    pub fn from_reqwest(error: &reqwest::Error) -> Self {
        if error.is_decode() {
            return Self::malformed(format!("could not decode response body: {error}"));
        }
        if error.is_timeout() {
            return Self::transport(format!("request timed out: {error}"));
        }
        if error.is_connect() {
            return Self::transport(format!("connection failed: {error}"));
        }
        Self::transport(error.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_kinds() {
        assert!(FetchFailure::blocked("403").is_retryable());
        assert!(FetchFailure::transport("refused").is_retryable());
        assert!(!FetchFailure::malformed("binary").is_retryable());
        assert!(!FetchFailure::status(404, "not found").is_retryable());
        assert!(FetchFailure::status(503, "unavailable").is_retryable());
    }

    #[test]
    fn test_fallback_kinds() {
        assert!(FailureKind::Blocked.allows_fallback());
        assert!(FailureKind::Transport.allows_fallback());
        assert!(!FailureKind::Malformed.allows_fallback());
        assert!(!FailureKind::Status.allows_fallback());
    }

    #[test]
    fn test_failure_display() {
        let failure = FetchFailure::blocked("HTTP 403 Forbidden");
        assert_eq!(failure.to_string(), "blocked: HTTP 403 Forbidden");
    }
}
