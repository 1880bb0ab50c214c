//! Streaming support for OpenAI responses
//!
//! [`parse_sse_stream`] turns the raw server-sent event body into parsed JSON
//! events. [`StreamReassembler`] consumes those events in order, forwards
//! text deltas to the caller's sink, and produces the terminal
//! [`ChatResponse`] once a finish reason arrives.

use super::converter::{
    extract_usage, first_choice, from_openai_response, json_kind, TOOL_FINISH_REASONS,
};
use crate::protocol::{ChatResponse, ChatStreamChunk, ChunkSink};
use crate::providers::error::{IncompleteReason, ProviderError, ProviderResult, TransportError};
use eventsource_stream::{EventStreamError, Eventsource};
use futures::{future, Stream, StreamExt};
use serde_json::{json, Value};
use std::pin::Pin;
use tracing::{debug, trace, warn};
use uuid::Uuid;

/// Parsed stream events in arrival order
pub type EventStream = Pin<Box<dyn Stream<Item = ProviderResult<Value>> + Send>>;

/// Lifecycle of one streamed turn
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    /// No choice-bearing event seen yet
    Idle,
    /// Deltas are arriving
    Streaming,
    /// Terminal response emitted; later events are ignored
    Terminal,
}

/// Reassembles chat completion stream events into one [`ChatResponse`].
///
/// One instance serves exactly one turn. It owns the text buffer for that
/// turn and never re-enters a non-terminal state once terminal.
#[derive(Debug)]
pub struct StreamReassembler {
    state: StreamState,
    buffer: String,
    model: String,
    usage: Option<Value>,
    response: Option<ChatResponse>,
}

impl StreamReassembler {
    /// Create a reassembler; `fallback_model` is used when the stream never names one
    pub fn new(fallback_model: impl Into<String>) -> Self {
        Self {
            state: StreamState::Idle,
            buffer: String::new(),
            model: fallback_model.into(),
            usage: None,
            response: None,
        }
    }

    /// Current state
    pub fn state(&self) -> StreamState {
        self.state
    }

    /// Whether any choice-bearing event has been observed
    pub fn has_started(&self) -> bool {
        self.state != StreamState::Idle
    }

    /// Whether the terminal response has been emitted
    pub fn is_terminal(&self) -> bool {
        self.state == StreamState::Terminal
    }

    /// Usage reported by the stream trailer, if any
    pub fn usage(&self) -> Option<&Value> {
        self.usage.as_ref()
    }

    /// Process one parsed stream event
    pub fn process_event(&mut self, event: &Value, sink: &mut dyn ChunkSink) -> ProviderResult<()> {
        if !event.is_object() {
            return Err(ProviderError::MalformedResponse(format!(
                "expected stream event to be a JSON object, got {}",
                json_kind(event)
            )));
        }

        if let Some(usage) = extract_usage(event) {
            self.usage = Some(usage);
        }

        if self.state == StreamState::Terminal {
            trace!("ignoring stream event after terminal response");
            return Ok(());
        }

        let Some(choice) = first_choice(event)? else {
            trace!(
                has_usage = event.get("usage").is_some(),
                "stream event without choices"
            );
            return Ok(());
        };

        self.state = StreamState::Streaming;

        if let Some(model) = event
            .get("model")
            .and_then(Value::as_str)
            .filter(|m| !m.is_empty())
        {
            if model != self.model {
                self.model = model.to_string();
            }
        }

        let delta = choice.get("delta");
        if let Some(content) = delta.and_then(|d| d.get("content")).and_then(Value::as_str) {
            self.buffer.push_str(content);
            sink.emit(ChatStreamChunk::OutputText(content.to_string()));
        } else if delta.and_then(|d| d.get("tool_calls")).is_some() {
            // Tool call fragments are not merged; the terminal event carries them
            trace!("tool call delta; waiting for finish reason");
        }

        let finish_reason = choice
            .get("finish_reason")
            .and_then(Value::as_str)
            .filter(|reason| !reason.is_empty());

        if let Some(reason) = finish_reason {
            let response = if TOOL_FINISH_REASONS.contains(&reason) {
                self.tool_call_response(event)?
            } else {
                self.text_response(reason)?
            };

            debug!(
                finish_reason = reason,
                messages = response.messages.len(),
                function_requests = response.function_requests.len(),
                "stream reached terminal response"
            );

            self.state = StreamState::Terminal;
            sink.emit(ChatStreamChunk::Response(response.clone()));
            self.response = Some(response);
        }

        Ok(())
    }

    /// Consume the reassembler once the transport has closed the stream
    pub fn finish(self) -> ProviderResult<ChatResponse> {
        match self.response {
            Some(response) => Ok(response),
            None => {
                warn!(
                    buffered_bytes = self.buffer.len(),
                    "stream ended without a finish reason"
                );
                Err(ProviderError::IncompleteStream(
                    IncompleteReason::EndedWithoutFinishReason,
                ))
            }
        }
    }

    /// Discard the turn and report why it is incomplete
    pub fn abort(self, reason: IncompleteReason) -> ProviderError {
        debug!(
            buffered_bytes = self.buffer.len(),
            %reason,
            "discarding incomplete stream"
        );
        ProviderError::IncompleteStream(reason)
    }

    /// Terminal response for a tool-call finish: the triggering event itself
    fn tool_call_response(&self, event: &Value) -> ProviderResult<ChatResponse> {
        let mut event = event.clone();

        // Streamed choices carry their payload in `delta`; read it as the message
        if let Some(choice) = event
            .get_mut("choices")
            .and_then(Value::as_array_mut)
            .and_then(|choices| choices.first_mut())
            .and_then(Value::as_object_mut)
        {
            if !choice.contains_key("message") {
                if let Some(delta) = choice.get("delta").cloned() {
                    choice.insert("message".to_string(), delta);
                }
            }
        }

        let mut response = from_openai_response(&event)?;
        if response.model.is_empty() {
            response.model = self.model.clone();
        }
        Ok(response)
    }

    /// Terminal response for a normal finish: the accumulated text
    fn text_response(&mut self, finish_reason: &str) -> ProviderResult<ChatResponse> {
        let synthesized = json!({
            "id": format!("chatcmpl-{}", Uuid::new_v4().simple()),
            "model": self.model,
            "choices": [{
                "index": 0,
                "message": {
                    "role": "assistant",
                    "content": std::mem::take(&mut self.buffer),
                },
                "finish_reason": finish_reason,
            }],
        });

        from_openai_response(&synthesized)
    }
}

/// Parse a server-sent event body from OpenAI into JSON events.
///
/// The stream ends at the `[DONE]` sentinel or when the body closes. A
/// `data:` payload that is not JSON is reported as malformed.
pub fn parse_sse_stream<S, B, E>(stream: S) -> EventStream
where
    S: Stream<Item = Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: Into<TransportError> + Send + 'static + std::fmt::Display,
{
    let events = stream
        .eventsource()
        .take_while(|result| {
            future::ready(!matches!(result, Ok(event) if event.data.trim() == "[DONE]"))
        })
        .filter_map(|result| async move {
            match result {
                Ok(event) => {
                    let data = event.data.trim();
                    if data.is_empty() {
                        return None;
                    }
                    Some(serde_json::from_str::<Value>(data).map_err(|e| {
                        ProviderError::MalformedResponse(format!("invalid stream event: {}", e))
                    }))
                }
                Err(EventStreamError::Transport(e)) => Some(Err(ProviderError::Transport(e.into()))),
                Err(e) => Some(Err(ProviderError::MalformedResponse(format!(
                    "stream error: {}",
                    e
                )))),
            }
        });

    Box::pin(events)
}
