//! Protocol module for chat turn structures
//!
//! This module defines the stable internal representation every vendor
//! payload is normalized into. These structures are:
//! - Vendor-agnostic
//! - Identical for streamed and non-streamed turns
//! - Created fresh per turn and owned by the caller afterwards

pub mod types;

pub use types::{
    ChatFunctionRequest, ChatMessage, ChatResponse, ChatStreamChunk, ChatTurn, ChunkSink,
    FunctionDefinition, FunctionResult,
};
