//! OpenAI client implementation

use super::converter::{extract_usage, from_openai_response, to_openai_request, DEFAULT_MAX_TOKENS};
use super::streaming::StreamReassembler;
use super::types::OpenAIRequest;
use crate::config::AssistantConfig;
use crate::http::HttpTransport;
use crate::protocol::{ChatResponse, ChatTurn, ChunkSink};
use crate::providers::error::{IncompleteReason, ProviderError, ProviderResult, TransportError};
use crate::providers::trace::{record_best_effort, HttpTraceSink, TraceRecord, TraceSink};
use crate::providers::transport::ChatTransport;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Models served when no base URL override is configured
pub const DEFAULT_MODELS: [&str; 1] = ["gpt-4.1"];

/// Largest batch a single business-logic request may carry
pub const DEFAULT_MAX_BATCH_SIZE: usize = 25;

/// How long a finished turn waits on its trace record
pub const DEFAULT_TRACE_TIMEOUT: Duration = Duration::from_secs(5);

/// Provider settings
#[derive(Clone)]
pub struct ProviderConfig {
    /// Override base URL for OpenAI-compatible vendors
    pub base_url: Option<String>,

    /// Models accepted when no override is set
    pub models: Vec<String>,

    /// Default token ceiling for turns that do not set one
    pub max_tokens: u32,

    /// Batch limit enforced by [`OpenAIProvider::ensure_batch_size`]
    pub max_batch_size: usize,

    /// Where completed calls are traced
    pub trace_sink: Option<Arc<dyn TraceSink>>,

    /// Bound on one trace record; a slower sink is abandoned with a warning
    pub trace_timeout: Duration,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            models: DEFAULT_MODELS.iter().map(|m| m.to_string()).collect(),
            max_tokens: DEFAULT_MAX_TOKENS,
            max_batch_size: DEFAULT_MAX_BATCH_SIZE,
            trace_sink: None,
            trace_timeout: DEFAULT_TRACE_TIMEOUT,
        }
    }
}

impl fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("base_url", &self.base_url)
            .field("models", &self.models)
            .field("max_tokens", &self.max_tokens)
            .field("max_batch_size", &self.max_batch_size)
            .field("trace_sink", &self.trace_sink.is_some())
            .field("trace_timeout", &self.trace_timeout)
            .finish()
    }
}

impl ProviderConfig {
    /// Attach a trace sink
    pub fn with_trace_sink(mut self, sink: Arc<dyn TraceSink>) -> Self {
        self.trace_sink = Some(sink);
        self
    }

    /// Bound how long a turn waits on its trace record
    pub fn with_trace_timeout(mut self, timeout: Duration) -> Self {
        self.trace_timeout = timeout;
        self
    }

    /// Set a base URL override
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }
}

/// OpenAI provider implementation.
///
/// Each call to [`OpenAIProvider::chat_response`] is one independent turn;
/// nothing is shared between turns except the transport and trace sink.
pub struct OpenAIProvider {
    config: ProviderConfig,
    transport: Arc<dyn ChatTransport>,
}

impl OpenAIProvider {
    /// Create a provider over an existing transport
    pub fn new(config: ProviderConfig, transport: Arc<dyn ChatTransport>) -> Self {
        Self { config, transport }
    }

    /// Create a provider with the HTTP transport and, when configured, the
    /// HTTP trace sink
    pub fn from_config(config: &AssistantConfig) -> ProviderResult<Self> {
        let transport = HttpTransport::from_config(config)?;

        let (trace_sink, trace_timeout) = match &config.trace {
            Some(trace) if trace.enabled => {
                let sink = HttpTraceSink::from_config(trace)?;
                (Some(Arc::new(sink) as Arc<dyn TraceSink>), trace.timeout())
            }
            _ => (None, DEFAULT_TRACE_TIMEOUT),
        };

        let provider_config = ProviderConfig {
            base_url: config.openai.base_url.clone(),
            models: config.openai.models.clone(),
            max_tokens: config.openai.max_tokens,
            max_batch_size: config.openai.max_batch_size,
            trace_sink,
            trace_timeout,
        };

        debug!(
            base_url = ?provider_config.base_url,
            tracing_enabled = provider_config.trace_sink.is_some(),
            "Initializing OpenAI provider"
        );

        Ok(Self::new(provider_config, Arc::new(transport)))
    }

    /// Provider settings
    pub fn config(&self) -> &ProviderConfig {
        &self.config
    }

    /// Whether `model` may be requested.
    ///
    /// With a base URL override every model is accepted, since the vendor
    /// behind it decides what it serves. A blank override is no override;
    /// the transport falls back to the default endpoint for it too.
    pub fn supports_model(&self, model: &str) -> bool {
        let overridden = self
            .config
            .base_url
            .as_deref()
            .is_some_and(|url| !url.trim().is_empty());
        if overridden {
            return true;
        }
        self.config.models.iter().any(|m| m == model)
    }

    /// Reject batches larger than the configured limit
    pub fn ensure_batch_size(&self, kind: &str, count: usize) -> ProviderResult<()> {
        if count > self.config.max_batch_size {
            return Err(ProviderError::RequestTooLarge {
                kind: kind.to_string(),
                count,
                max: self.config.max_batch_size,
            });
        }
        Ok(())
    }

    /// Run one chat turn.
    ///
    /// Without a sink the turn is a single request/response exchange. With a
    /// sink the response is streamed: text deltas reach the sink as they
    /// arrive and the final `response` chunk carries the same value this
    /// method returns.
    pub async fn chat_response(
        &self,
        turn: &ChatTurn,
        sink: Option<&mut dyn ChunkSink>,
    ) -> ProviderResult<ChatResponse> {
        self.run_turn(turn, sink, None).await
    }

    /// Run one chat turn that stops early when `cancel` fires.
    ///
    /// A cancelled turn returns [`IncompleteReason::Cancelled`] and emits no
    /// `response` chunk, unless the terminal response had already been
    /// delivered.
    pub async fn chat_response_cancellable(
        &self,
        turn: &ChatTurn,
        sink: Option<&mut dyn ChunkSink>,
        cancel: CancellationToken,
    ) -> ProviderResult<ChatResponse> {
        self.run_turn(turn, sink, Some(&cancel)).await
    }

    /// Record a completed call made by a business-logic caller.
    ///
    /// Waits at most [`ProviderConfig::trace_timeout`].
    pub async fn record_trace(&self, record: TraceRecord) {
        let Some(sink) = &self.config.trace_sink else {
            return;
        };

        let name = record.name.clone();
        let recording = record_best_effort(sink.as_ref(), record);
        if tokio::time::timeout(self.config.trace_timeout, recording)
            .await
            .is_err()
        {
            warn!(
                trace = %name,
                timeout_ms = self.config.trace_timeout.as_millis() as u64,
                "Trace logging abandoned after timeout"
            );
        }
    }

    async fn run_turn(
        &self,
        turn: &ChatTurn,
        sink: Option<&mut dyn ChunkSink>,
        cancel: Option<&CancellationToken>,
    ) -> ProviderResult<ChatResponse> {
        if !self.supports_model(&turn.model) {
            return Err(ProviderError::UnsupportedModel(turn.model.clone()));
        }

        let streaming = sink.is_some();
        let request = to_openai_request(turn, self.config.max_tokens, streaming)?;

        info!(
            model = %turn.model,
            streaming,
            functions = turn.functions.len(),
            function_results = turn.function_results.len(),
            "Starting chat turn"
        );

        let (response, usage) = match sink {
            Some(sink) => self.streamed_turn(&request, sink, cancel).await?,
            None => self.complete_turn(&request, cancel).await?,
        };

        info!(
            model = %response.model,
            response_id = %response.id,
            function_requests = response.function_requests.len(),
            "Chat turn completed"
        );

        self.record_trace(TraceRecord {
            name: "chat_response".to_string(),
            model: turn.model.clone(),
            input: serde_json::to_value(&request.messages).unwrap_or_default(),
            output: Value::String(response.output_text()),
            usage,
        })
        .await;

        Ok(response)
    }

    async fn complete_turn(
        &self,
        request: &OpenAIRequest,
        cancel: Option<&CancellationToken>,
    ) -> ProviderResult<(ChatResponse, Option<Value>)> {
        let send = self.transport.send_chat(request);
        let raw = match cancel {
            Some(token) => tokio::select! {
                biased;
                _ = token.cancelled() => {
                    debug!("Chat turn cancelled before a response arrived");
                    return Err(ProviderError::IncompleteStream(IncompleteReason::Cancelled));
                }
                result = send => result?,
            },
            None => send.await?,
        };

        let response = from_openai_response(&raw)?;
        Ok((response, extract_usage(&raw)))
    }

    async fn streamed_turn(
        &self,
        request: &OpenAIRequest,
        sink: &mut dyn ChunkSink,
        cancel: Option<&CancellationToken>,
    ) -> ProviderResult<(ChatResponse, Option<Value>)> {
        let mut reassembler = StreamReassembler::new(request.model.clone());

        let outcome = {
            let mut on_event = |event: Value| reassembler.process_event(&event, &mut *sink);
            let send = self.transport.send_chat_streaming(request, &mut on_event);
            match cancel {
                Some(token) => tokio::select! {
                    biased;
                    _ = token.cancelled() => None,
                    result = send => Some(result),
                },
                None => Some(send.await),
            }
        };

        let usage = reassembler.usage().cloned();

        let response = match outcome {
            None if reassembler.is_terminal() => reassembler.finish(),
            None => Err(reassembler.abort(IncompleteReason::Cancelled)),
            Some(Ok(())) => reassembler.finish(),
            Some(Err(err)) if reassembler.is_terminal() => {
                warn!("Transport failed after the terminal response: {}", err);
                reassembler.finish()
            }
            Some(Err(ProviderError::Transport(err))) if reassembler.has_started() => {
                let reason = match err {
                    TransportError::Timeout => IncompleteReason::TimedOut,
                    other => IncompleteReason::TransportInterrupted(other.to_string()),
                };
                Err(reassembler.abort(reason))
            }
            Some(Err(err)) => Err(err),
        }?;

        Ok((response, usage))
    }
}

impl fmt::Debug for OpenAIProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenAIProvider")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use crate::providers::transport::EventHandler;

    struct NoTransport;

    #[async_trait]
    impl ChatTransport for NoTransport {
        async fn send_chat(&self, _request: &OpenAIRequest) -> ProviderResult<Value> {
            Err(TransportError::Network("offline".to_string()).into())
        }

        async fn send_chat_streaming(
            &self,
            _request: &OpenAIRequest,
            _on_event: &mut EventHandler<'_>,
        ) -> ProviderResult<()> {
            Err(TransportError::Network("offline".to_string()).into())
        }
    }

    fn provider(config: ProviderConfig) -> OpenAIProvider {
        OpenAIProvider::new(config, Arc::new(NoTransport))
    }

    #[test]
    fn test_supports_model() {
        let default = provider(ProviderConfig::default());
        assert!(default.supports_model("gpt-4.1"));
        assert!(!default.supports_model("llama3"));

        let compatible =
            provider(ProviderConfig::default().with_base_url("http://localhost:11434/v1"));
        assert!(compatible.supports_model("llama3"));

        let blank = provider(ProviderConfig::default().with_base_url("  "));
        assert!(!blank.supports_model("llama3"));
        assert!(blank.supports_model("gpt-4.1"));
    }

    #[test]
    fn test_ensure_batch_size() {
        let provider = provider(ProviderConfig::default());
        assert!(provider.ensure_batch_size("transactions", 25).is_ok());

        let err = provider.ensure_batch_size("transactions", 26).unwrap_err();
        assert!(matches!(
            err,
            ProviderError::RequestTooLarge { count: 26, max: 25, .. }
        ));
    }

    #[tokio::test]
    async fn test_transport_error_before_stream_passes_through() {
        let provider = provider(ProviderConfig::default());
        let mut sink = |_chunk: crate::protocol::ChatStreamChunk| {};
        let err = provider
            .chat_response(&ChatTurn::new("gpt-4.1", "hi"), Some(&mut sink))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ProviderError::Transport(TransportError::Network(_))
        ));
    }
}
