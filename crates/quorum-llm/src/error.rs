//! Error types for the provider layer.

use std::time::Duration;
use thiserror::Error;

/// Result type alias using the provider error type.
pub type Result<T> = std::result::Result<T, ProviderError>;

// ─────────────────────────────────────────────────────────────────────────────
// Rate Limit Info
// ─────────────────────────────────────────────────────────────────────────────

/// Information about a rate limit error.
#[derive(Debug, Clone)]
pub struct RateLimitInfo {
    /// The error message from the provider.
    pub message: String,
    /// How long to wait before retrying (if the provider specified).
    pub retry_after: Option<Duration>,
}

impl RateLimitInfo {
    /// Create a new rate limit info with just a message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            retry_after: None,
        }
    }

    /// Create a rate limit info with a retry duration.
    pub fn with_retry_after(message: impl Into<String>, retry_after: Duration) -> Self {
        Self {
            message: message.into(),
            retry_after: Some(retry_after),
        }
    }

    /// Parse rate limit info from a message and an optional `Retry-After` header.
    pub fn from_response(message: &str, retry_after_header: Option<&str>) -> Self {
        Self {
            message: message.to_string(),
            retry_after: retry_after_header.and_then(parse_retry_after_header),
        }
    }
}

impl std::fmt::Display for RateLimitInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)?;
        if let Some(retry_after) = self.retry_after {
            write!(f, " (retry after {:.2}s)", retry_after.as_secs_f64())?;
        }
        Ok(())
    }
}

/// Parse a `Retry-After` header value.
///
/// Supports the seconds (integer) format.
fn parse_retry_after_header(value: &str) -> Option<Duration> {
    value
        .trim()
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}

// ─────────────────────────────────────────────────────────────────────────────
// Provider Error
// ─────────────────────────────────────────────────────────────────────────────

/// Classified error produced by every provider adapter at the boundary.
///
/// The cascade policy branches on these variants; no call site inspects
/// error message text. Each concrete adapter maps its native HTTP/SDK
/// failures into this taxonomy exactly once.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The provider is overloaded (e.g. HTTP 529 / `overloaded_error`).
    /// Triggers immediate fallback when one is configured.
    #[error("Provider overloaded: {0}")]
    Overloaded(String),

    /// Rate limit exceeded (retryable with backoff).
    #[error("Rate limit exceeded: {0}")]
    RateLimited(RateLimitInfo),

    /// Request timed out (retryable).
    #[error("Request timed out: {0}")]
    Timeout(String),

    /// Authentication failed. A configuration problem, never retried.
    #[error("Authentication error: {0}")]
    Auth(String),

    /// Network/connectivity error (retryable).
    #[error("Network error: {0}")]
    Network(String),

    /// Backend/API error from the provider.
    #[error("Backend error: {0}")]
    Backend(String),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Configuration error (API key missing, no fallback configured, etc.).
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ProviderError {
    /// Create a rate limit error from a message string.
    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self::RateLimited(RateLimitInfo::new(message))
    }

    /// Get the retry-after duration if this is a rate limit error.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::RateLimited(info) => info.retry_after,
            _ => None,
        }
    }

    /// Returns true if this error is worth retrying on the same provider.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Network(_) | Self::Timeout(_) | Self::RateLimited(_)
        )
    }

    /// Short class name used in attempt logs and metadata.
    pub fn class(&self) -> &'static str {
        match self {
            Self::Overloaded(_) => "overloaded",
            Self::RateLimited(_) => "rate_limited",
            Self::Timeout(_) => "timeout",
            Self::Auth(_) => "auth",
            Self::Network(_) => "network",
            Self::Backend(_) => "backend",
            Self::Serialization(_) => "serialization",
            Self::Config(_) => "config",
            Self::Internal(_) => "internal",
        }
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ProviderError::Timeout(err.to_string())
        } else if err.is_connect() {
            ProviderError::Network(format!("Connection failed: {}", err))
        } else {
            ProviderError::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for ProviderError {
    fn from(err: serde_json::Error) -> Self {
        ProviderError::Serialization(err.to_string())
    }
}
