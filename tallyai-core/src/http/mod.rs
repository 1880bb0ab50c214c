//! HTTP transport for OpenAI-compatible APIs
//!
//! This module implements the network layer for Tallyai, handling:
//! - Connection pooling and client management
//! - JSON and server-sent event responses
//! - Error mapping and retry hints
//! - Request ID generation and correlation

pub mod client;
pub mod error;

pub use client::{HttpTransport, DEFAULT_BASE_URL};
pub use error::{map_http_error, parse_retry_after};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Type of API call being made
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CallKind {
    /// Chat completion request
    Chat,
}

impl CallKind {
    /// Get the endpoint path for this call kind
    pub fn endpoint(&self) -> &'static str {
        match self {
            CallKind::Chat => "/chat/completions",
        }
    }
}

/// Per-request options
#[derive(Debug, Clone)]
pub struct RequestOptions {
    /// Type of API call
    pub call_kind: CallKind,

    /// Unique request ID for correlation
    pub request_id: Uuid,

    /// Whether the response is a server-sent event stream
    pub streaming: bool,
}

impl RequestOptions {
    /// Create new request options with a generated request ID
    pub fn new(call_kind: CallKind, streaming: bool) -> Self {
        Self {
            call_kind,
            request_id: Uuid::new_v4(),
            streaming,
        }
    }
}
