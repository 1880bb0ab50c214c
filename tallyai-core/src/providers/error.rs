//! Provider error types and handling

use std::time::Duration;
use thiserror::Error;

/// Result type for provider operations
pub type ProviderResult<T> = Result<T, ProviderError>;

/// Errors returned to the caller of a chat turn.
///
/// No partial [`crate::protocol::ChatResponse`] is ever returned alongside
/// one of these.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The requested model is not served by this provider
    #[error("Model '{0}' is not supported by this provider")]
    UnsupportedModel(String),

    /// Too many inputs for a single request
    #[error("Too many {kind} in one request: {count} (max {max})")]
    RequestTooLarge {
        kind: String,
        count: usize,
        max: usize,
    },

    /// Vendor payload is structurally invalid
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    /// Stream stopped before a finish reason was observed
    #[error("Incomplete stream: {0}")]
    IncompleteStream(IncompleteReason),

    /// Transport failure, surfaced unchanged
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A function result output could not be serialized
    #[error("Function output for call '{call_id}' cannot be serialized: {message}")]
    InvalidFunctionOutput { call_id: String, message: String },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl ProviderError {
    /// Whether this error means the turn was cut short mid-stream
    pub fn is_incomplete(&self) -> bool {
        matches!(self, Self::IncompleteStream(_))
    }
}

impl From<serde_json::Error> for ProviderError {
    fn from(err: serde_json::Error) -> Self {
        ProviderError::MalformedResponse(err.to_string())
    }
}

/// Why a streamed turn never reached its terminal response
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IncompleteReason {
    /// Transport closed the stream without a finish reason
    #[error("stream ended without a finish reason")]
    EndedWithoutFinishReason,

    /// Caller cancelled the turn
    #[error("turn was cancelled")]
    Cancelled,

    /// Transport timed out mid-stream
    #[error("transport timed out mid-stream")]
    TimedOut,

    /// Transport failed after events had started arriving
    #[error("transport interrupted: {0}")]
    TransportInterrupted(String),
}

/// Errors produced by the transport to the vendor
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// Rate limit exceeded, retry after specified duration
    #[error("Rate limit exceeded: {message}")]
    RateLimit {
        message: String,
        retry_after: Option<Duration>,
    },

    /// Request timeout
    #[error("Request timeout")]
    Timeout,

    /// Temporary server error (5xx)
    #[error("Server error ({status_code}): {message}")]
    Server { status_code: u16, message: String },

    /// Invalid request that should not be retried (4xx)
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Authentication failure
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Model not available at the vendor
    #[error("Model '{0}' not available")]
    ModelNotAvailable(String),

    /// Generic network error
    #[error("Network error: {0}")]
    Network(String),

    /// Anything else the vendor or client reported
    #[error("Error [{code}]: {message}")]
    Other { code: String, message: String },
}

impl TransportError {
    /// Whether a caller may reasonably retry the turn
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::RateLimit { .. } => true,
            Self::Timeout => true,
            Self::Server { .. } => true,
            Self::Network(_) => true,
            Self::ModelNotAvailable(_) => false,
            Self::InvalidRequest(_) => false,
            Self::Authentication(_) => false,
            Self::Other { .. } => false,
        }
    }

    /// Suggested delay before a caller-side retry
    pub fn retry_delay(&self) -> Option<Duration> {
        match self {
            Self::RateLimit { retry_after, .. } => *retry_after,
            Self::Timeout => Some(Duration::from_secs(1)),
            Self::Server { .. } => Some(Duration::from_secs(2)),
            Self::Network(_) => Some(Duration::from_secs(1)),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            TransportError::Timeout
        } else if err.is_connect() {
            TransportError::Network(format!("Connection failed: {}", err))
        } else if let Some(status) = err.status() {
            match status.as_u16() {
                401 | 403 => TransportError::Authentication(err.to_string()),
                429 => TransportError::RateLimit {
                    message: "Too many requests".to_string(),
                    retry_after: None,
                },
                500..=599 => TransportError::Server {
                    status_code: status.as_u16(),
                    message: err.to_string(),
                },
                _ => TransportError::Other {
                    code: status.to_string(),
                    message: err.to_string(),
                },
            }
        } else {
            TransportError::Network(err.to_string())
        }
    }
}
