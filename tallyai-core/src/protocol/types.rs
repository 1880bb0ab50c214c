//! Core protocol types for chat turns
//!
//! A turn starts from a [`ChatTurn`] supplied by the caller and ends with
//! exactly one [`ChatResponse`]. Streamed turns additionally deliver
//! [`ChatStreamChunk`]s to a caller-supplied [`ChunkSink`] while the turn is
//! in progress.

use crate::providers::error::{ProviderError, ProviderResult};
use serde::{Deserialize, Serialize};

/// One emitted assistant message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Vendor-assigned identifier (empty when the vendor sent none)
    pub id: String,

    /// Message text, empty rather than absent
    pub output_text: String,
}

/// A tool invocation requested by the model
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatFunctionRequest {
    /// Tool call identifier
    pub id: String,

    /// Correlation id for the function result; equal to `id` for chat completions
    pub call_id: String,

    /// Name of the function to call
    pub function_name: String,

    /// Serialized arguments, passed through undecoded
    pub function_args: String,
}

/// Fully assembled result of one chat turn
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ChatResponse {
    /// Response identifier
    pub id: String,

    /// Model that produced the response
    pub model: String,

    /// Assistant messages (at most one: only the first choice is read)
    pub messages: Vec<ChatMessage>,

    /// Requested tool invocations in vendor order
    pub function_requests: Vec<ChatFunctionRequest>,
}

impl ChatResponse {
    /// All message texts joined by newlines
    pub fn output_text(&self) -> String {
        self.messages
            .iter()
            .map(|m| m.output_text.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Whether the model asked for any tool invocation
    pub fn requests_functions(&self) -> bool {
        !self.function_requests.is_empty()
    }
}

/// Unit delivered to a streaming sink while a turn is in progress
///
/// Zero or more `OutputText` chunks are followed by exactly one `Response`
/// chunk, which is always the last chunk of the turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum ChatStreamChunk {
    /// Text fragment in arrival order
    OutputText(String),
    /// Terminal response for the turn
    Response(ChatResponse),
}

impl ChatStreamChunk {
    /// Wire name of the chunk type
    pub fn kind(&self) -> &'static str {
        match self {
            ChatStreamChunk::OutputText(_) => "output_text",
            ChatStreamChunk::Response(_) => "response",
        }
    }
}

/// Receiver for streamed chunks.
///
/// `emit` is called synchronously, before the next vendor event is read. A
/// slow sink therefore backpressures the stream; sinks that need to do slow
/// work should hand chunks off to a channel instead of blocking here.
pub trait ChunkSink: Send {
    /// Deliver one chunk
    fn emit(&mut self, chunk: ChatStreamChunk);
}

impl<F> ChunkSink for F
where
    F: FnMut(ChatStreamChunk) + Send,
{
    fn emit(&mut self, chunk: ChatStreamChunk) {
        self(chunk)
    }
}

/// Caller-defined function exposed to the model as a tool
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionDefinition {
    /// Function name
    pub name: String,

    /// Human-readable description
    pub description: String,

    /// JSON Schema of the parameters, forwarded unmodified
    pub params_schema: serde_json::Value,

    /// Whether the vendor should enforce the schema strictly
    #[serde(default)]
    pub strict: bool,
}

impl FunctionDefinition {
    /// Create a function definition
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        params_schema: serde_json::Value,
        strict: bool,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            params_schema,
            strict,
        }
    }
}

/// Output of a previously requested function, fed back on the next turn
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionResult {
    /// `call_id` of the [`ChatFunctionRequest`] being answered
    pub call_id: String,

    /// Function output
    pub output: serde_json::Value,
}

impl FunctionResult {
    /// Create a function result from an already-encoded value
    pub fn new(call_id: impl Into<String>, output: serde_json::Value) -> Self {
        Self {
            call_id: call_id.into(),
            output,
        }
    }

    /// Create a function result from any serializable output.
    ///
    /// Outputs that cannot be represented as JSON are rejected here instead
    /// of being sent to the vendor in a degraded form.
    pub fn from_serializable<T: Serialize>(
        call_id: impl Into<String>,
        output: &T,
    ) -> ProviderResult<Self> {
        let call_id = call_id.into();
        let output = serde_json::to_value(output).map_err(|e| {
            ProviderError::InvalidFunctionOutput {
                call_id: call_id.clone(),
                message: e.to_string(),
            }
        })?;

        Ok(Self { call_id, output })
    }
}

/// Caller input for one chat turn
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ChatTurn {
    /// Model identifier
    pub model: String,

    /// User prompt
    pub prompt: String,

    /// Functions the model may call
    pub functions: Vec<FunctionDefinition>,

    /// Results of functions requested on a previous turn
    pub function_results: Vec<FunctionResult>,

    /// Token ceiling override (the provider default applies when unset)
    pub max_tokens: Option<u32>,
}

impl ChatTurn {
    /// Create a turn with model and prompt
    pub fn new(model: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            prompt: prompt.into(),
            ..Default::default()
        }
    }

    /// Set the available functions
    pub fn with_functions(mut self, functions: Vec<FunctionDefinition>) -> Self {
        self.functions = functions;
        self
    }

    /// Set the results of previously requested functions
    pub fn with_function_results(mut self, results: Vec<FunctionResult>) -> Self {
        self.function_results = results;
        self
    }

    /// Override the token ceiling
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}
