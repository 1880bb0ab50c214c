//! Tallyai Core Library
//!
//! This crate adapts a personal-finance assistant to OpenAI-compatible chat
//! completion APIs. It turns a prompt plus tool definitions into a vendor
//! request, and normalizes whatever comes back (a complete completion or a
//! sequence of streamed deltas) into one stable [`protocol::ChatResponse`].

pub mod config;
pub mod http;
pub mod protocol;
pub mod providers;

pub use protocol::{
    ChatFunctionRequest, ChatMessage, ChatResponse, ChatStreamChunk, ChatTurn, ChunkSink,
    FunctionDefinition, FunctionResult,
};
pub use config::AssistantConfig;
pub use providers::{
    ChatTransport, IncompleteReason, OpenAIProvider, ProviderConfig, ProviderError, ProviderResult,
    TraceRecord, TraceSink, TransportError,
};

/// Returns the version of the Tallyai Core library.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!version().is_empty());
    }
}
