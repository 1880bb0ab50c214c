//! HTTP transport implementation using reqwest

use crate::config::{AssistantConfig, ConnectionConfig, SecretString};
use crate::http::{error::map_http_error, CallKind, RequestOptions};
use crate::providers::error::{ProviderError, ProviderResult, TransportError};
use crate::providers::openai::streaming::parse_sse_stream;
use crate::providers::openai::types::OpenAIRequest;
use crate::providers::transport::{ChatTransport, EventHandler};
use async_trait::async_trait;
use futures::{Stream, StreamExt};
use reqwest::header::{ACCEPT, CONTENT_TYPE, RETRY_AFTER};
use reqwest::{Client, ClientBuilder, Response};
use serde_json::Value;
use std::fmt;
use std::time::Duration;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Maximum response size (10MB)
const MAX_RESPONSE_SIZE: usize = 10 * 1024 * 1024;

/// Default user agent
const USER_AGENT: &str = concat!("tallyai/", env!("CARGO_PKG_VERSION"));

/// Base URL used when no override is configured
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Chat completion transport over HTTPS with connection pooling
#[derive(Clone)]
pub struct HttpTransport {
    /// The underlying reqwest client
    client: Client,

    /// Base URL including the API version segment
    base_url: String,

    access_token: SecretString,

    /// Maximum response size to prevent OOM
    max_response_size: usize,
}

impl fmt::Debug for HttpTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpTransport")
            .field("base_url", &self.base_url)
            .field("access_token", &self.access_token)
            .field("max_response_size", &self.max_response_size)
            .finish()
    }
}

impl HttpTransport {
    /// Create a transport with custom connection settings
    pub fn new(
        base_url: Option<&str>,
        access_token: SecretString,
        connection: &ConnectionConfig,
    ) -> ProviderResult<Self> {
        let client = ClientBuilder::new()
            .pool_max_idle_per_host(connection.max_idle_per_host)
            .pool_idle_timeout(Duration::from_secs(90))
            .connect_timeout(connection.connect_timeout())
            .timeout(connection.request_timeout())
            .user_agent(USER_AGENT)
            .gzip(true)
            .build()
            .map_err(|e| {
                ProviderError::Configuration(format!("Failed to create HTTP client: {}", e))
            })?;

        let base_url = base_url
            .filter(|url| !url.trim().is_empty())
            .unwrap_or(DEFAULT_BASE_URL)
            .trim_end_matches('/')
            .to_string();

        debug!(base_url = %base_url, "Initializing HTTP transport");

        Ok(Self {
            client,
            base_url,
            access_token,
            max_response_size: MAX_RESPONSE_SIZE,
        })
    }

    /// Create a transport from the loaded configuration
    pub fn from_config(config: &AssistantConfig) -> ProviderResult<Self> {
        Self::new(
            config.openai.base_url.as_deref(),
            config.openai.access_token.clone(),
            &config.connection,
        )
    }

    /// Base URL requests are sent to
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Build the full URL for a call kind
    fn build_url(&self, call_kind: CallKind) -> String {
        format!("{}{}", self.base_url, call_kind.endpoint())
    }

    /// Send the request and map non-success statuses
    async fn send(
        &self,
        request: &OpenAIRequest,
        options: &RequestOptions,
    ) -> ProviderResult<Response> {
        let request_id = options.request_id;
        let url = self.build_url(options.call_kind);

        info!(
            model = %request.model,
            streaming = options.streaming,
            "Executing HTTP request [request_id: {}]",
            request_id
        );
        debug!("Request URL: {}", url);

        let mut req_builder = self
            .client
            .post(&url)
            .bearer_auth(self.access_token.expose_secret())
            .header("X-Request-ID", request_id.to_string())
            .json(request);

        if options.streaming {
            req_builder = req_builder.header(ACCEPT, "text/event-stream");
        }

        let response = req_builder.send().await.map_err(|e| {
            if e.is_timeout() {
                warn!("Request timeout [request_id: {}]", request_id);
                TransportError::Timeout
            } else if e.is_connect() {
                error!("Connection error [request_id: {}]: {}", request_id, e);
                TransportError::Network(format!(
                    "Connection failed: {} [request_id: {}]",
                    e, request_id
                ))
            } else {
                error!("Request error [request_id: {}]: {}", request_id, e);
                TransportError::Network(format!("{} [request_id: {}]", e, request_id))
            }
        })?;

        let status = response.status();
        debug!("Response status: {} [request_id: {}]", status, request_id);

        if !status.is_success() {
            let retry_after = response
                .headers()
                .get(RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string);

            let body = response.text().await.ok();

            warn!(
                "Request failed with status {} [request_id: {}]",
                status, request_id
            );

            return Err(map_http_error(status, retry_after.as_deref(), body, request_id).into());
        }

        Ok(response)
    }

    /// Reject a success response whose body is not `expected`.
    ///
    /// A missing header is tolerated; some OpenAI-compatible servers omit it.
    fn validate_content_type(response: &Response, expected: &str) -> ProviderResult<()> {
        if let Some(content_type) = response.headers().get(CONTENT_TYPE) {
            let content_type_str = content_type.to_str().unwrap_or("").to_lowercase();

            if !content_type_str.contains(expected) {
                return Err(ProviderError::MalformedResponse(format!(
                    "Expected {}, got: {}",
                    expected, content_type_str
                )));
            }
        }

        Ok(())
    }

    /// Check response size to prevent OOM
    fn check_content_length(&self, len: usize, request_id: &Uuid) -> ProviderResult<()> {
        if len > self.max_response_size {
            return Err(response_too_large(len, self.max_response_size, request_id).into());
        }

        Ok(())
    }
}

fn response_too_large(len: usize, max: usize, request_id: &Uuid) -> TransportError {
    TransportError::Other {
        code: "RESPONSE_TOO_LARGE".to_string(),
        message: format!(
            "Response size {} exceeds maximum {} [request_id: {}]",
            len, max, request_id
        ),
    }
}

/// Fail a streamed body once its running size passes `max`.
///
/// The ceiling covers the whole body, not each event.
fn limit_body<S, B, E>(
    body: S,
    max: usize,
    request_id: Uuid,
) -> impl Stream<Item = Result<B, TransportError>> + Send + 'static
where
    S: Stream<Item = Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: Into<TransportError> + Send + 'static,
{
    let mut received = 0usize;
    body.map(move |chunk| -> Result<B, TransportError> {
        let chunk = match chunk {
            Ok(chunk) => chunk,
            Err(e) => return Err(e.into()),
        };
        received += chunk.as_ref().len();
        if received > max {
            return Err(response_too_large(received, max, &request_id));
        }
        Ok(chunk)
    })
}

#[async_trait]
impl ChatTransport for HttpTransport {
    async fn send_chat(&self, request: &OpenAIRequest) -> ProviderResult<Value> {
        let options = RequestOptions::new(CallKind::Chat, false);
        let request_id = options.request_id;
        let response = self.send(request, &options).await?;

        Self::validate_content_type(&response, "application/json")?;

        if let Some(content_length) = response.content_length() {
            self.check_content_length(content_length as usize, &request_id)?;
        }

        let response_text = response.text().await.map_err(|e| {
            TransportError::Network(format!(
                "Failed to read response body: {} [request_id: {}]",
                e, request_id
            ))
        })?;

        self.check_content_length(response_text.len(), &request_id)?;

        let response_json: Value = serde_json::from_str(&response_text).map_err(|e| {
            error!(
                "Failed to parse response [request_id: {}]: {}",
                request_id, e
            );
            ProviderError::MalformedResponse(format!(
                "Invalid response format: {} [request_id: {}]",
                e, request_id
            ))
        })?;

        info!("Request completed successfully [request_id: {}]", request_id);

        Ok(response_json)
    }

    async fn send_chat_streaming(
        &self,
        request: &OpenAIRequest,
        on_event: &mut EventHandler<'_>,
    ) -> ProviderResult<()> {
        let options = RequestOptions::new(CallKind::Chat, true);
        let request_id = options.request_id;
        let response = self.send(request, &options).await?;

        Self::validate_content_type(&response, "text/event-stream")?;

        if let Some(content_length) = response.content_length() {
            self.check_content_length(content_length as usize, &request_id)?;
        }

        let body = limit_body(response.bytes_stream(), self.max_response_size, request_id);
        let mut events = parse_sse_stream(body);
        let mut received = 0usize;

        while let Some(event) = events.next().await {
            let event = event.map_err(|e| {
                debug!("Stream failed after {} events [request_id: {}]: {}", received, request_id, e);
                e
            })?;
            received += 1;
            on_event(event)?;
        }

        info!(
            events = received,
            "Stream closed [request_id: {}]", request_id
        );

        Ok(())
    }
}
