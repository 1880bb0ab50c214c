//! Transport boundary between the provider and the network

use crate::providers::error::ProviderResult;
use crate::providers::openai::types::OpenAIRequest;
use async_trait::async_trait;
use serde_json::Value;

/// Per-event callback for streamed requests.
///
/// Returning an error stops the stream; the transport hands that error back
/// to its caller unchanged.
pub type EventHandler<'a> = dyn FnMut(Value) -> ProviderResult<()> + Send + 'a;

/// Sends chat completion requests to a vendor
#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// Send a non-streaming request and return the parsed response body
    async fn send_chat(&self, request: &OpenAIRequest) -> ProviderResult<Value>;

    /// Send a streaming request, invoking `on_event` once per parsed event in
    /// arrival order. Returns once the vendor closes the stream.
    async fn send_chat_streaming(
        &self,
        request: &OpenAIRequest,
        on_event: &mut EventHandler<'_>,
    ) -> ProviderResult<()>;
}
