//! OpenAI provider implementation
//!
//! This module provides an adapter for the OpenAI Chat Completions API (and
//! OpenAI-compatible vendors), translating between Tallyai's protocol and
//! OpenAI's wire format.

mod client;
pub mod converter;
pub mod streaming;
pub mod types;

pub use client::{OpenAIProvider, ProviderConfig, DEFAULT_MAX_BATCH_SIZE, DEFAULT_MODELS};
pub use converter::DEFAULT_MAX_TOKENS;
pub use streaming::{parse_sse_stream, StreamReassembler, StreamState};
pub use types::{OpenAIMessage, OpenAIRequest, OpenAIRole, OpenAITool};
