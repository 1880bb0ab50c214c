//! Trace sink for completed LLM calls
//!
//! Every successful turn produces one [`TraceRecord`]. Recording is best
//! effort: a failing sink is logged and never changes the turn's result.

use crate::config::{SecretString, TraceConfig};
use crate::providers::error::{ProviderError, ProviderResult};
use anyhow::{bail, Context};
use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt;
use std::time::Duration;
use tracing::{debug, warn};
use uuid::Uuid;

/// Ingestion endpoint path on the trace host
const INGESTION_PATH: &str = "/api/public/ingestion";

/// One completed LLM call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceRecord {
    /// Operation name, e.g. `chat_response`
    pub name: String,

    /// Model the call was made against
    pub model: String,

    /// Input sent to the vendor
    pub input: Value,

    /// Output returned to the caller
    pub output: Value,

    /// Vendor usage block, when reported
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<Value>,
}

/// Receiver for trace records
#[async_trait]
pub trait TraceSink: Send + Sync {
    /// Record one completed call
    async fn record(&self, record: TraceRecord) -> anyhow::Result<()>;
}

/// Send `record` to `sink`, logging instead of failing
pub async fn record_best_effort(sink: &dyn TraceSink, record: TraceRecord) {
    let name = record.name.clone();
    if let Err(e) = sink.record(record).await {
        warn!(trace = %name, "Trace logging failed: {:#}", e);
    }
}

/// Langfuse-style ingestion client.
///
/// Each record becomes a `trace-create` event named `openai.<name>` and a
/// `generation-create` event attached to it, posted as one batch.
#[derive(Clone)]
pub struct HttpTraceSink {
    client: Client,
    endpoint: String,
    public_key: String,
    secret_key: SecretString,
}

impl fmt::Debug for HttpTraceSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpTraceSink")
            .field("endpoint", &self.endpoint)
            .field("public_key", &self.public_key)
            .field("secret_key", &self.secret_key)
            .finish()
    }
}

impl HttpTraceSink {
    /// Create a sink posting to `host`
    pub fn new(
        host: &str,
        public_key: impl Into<String>,
        secret_key: SecretString,
        timeout: Duration,
    ) -> ProviderResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("tallyai/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| {
                ProviderError::Configuration(format!("Failed to create trace client: {}", e))
            })?;

        Ok(Self {
            client,
            endpoint: format!("{}{}", host.trim_end_matches('/'), INGESTION_PATH),
            public_key: public_key.into(),
            secret_key,
        })
    }

    /// Create a sink from the trace section of the configuration
    pub fn from_config(config: &TraceConfig) -> ProviderResult<Self> {
        Self::new(
            &config.host,
            config.public_key.clone(),
            config.secret_key.clone(),
            config.timeout(),
        )
    }

    /// Ingestion endpoint URL
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn batch(record: &TraceRecord) -> Value {
        let timestamp = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
        let trace_id = Uuid::new_v4().to_string();

        json!({
            "batch": [
                {
                    "id": Uuid::new_v4().to_string(),
                    "timestamp": timestamp,
                    "type": "trace-create",
                    "body": {
                        "id": trace_id,
                        "timestamp": timestamp,
                        "name": format!("openai.{}", record.name),
                        "input": record.input,
                        "output": record.output,
                    },
                },
                {
                    "id": Uuid::new_v4().to_string(),
                    "timestamp": timestamp,
                    "type": "generation-create",
                    "body": {
                        "id": Uuid::new_v4().to_string(),
                        "traceId": trace_id,
                        "name": record.name,
                        "startTime": timestamp,
                        "model": record.model,
                        "input": record.input,
                        "output": record.output,
                        "usage": record.usage,
                    },
                },
            ]
        })
    }
}

#[async_trait]
impl TraceSink for HttpTraceSink {
    async fn record(&self, record: TraceRecord) -> anyhow::Result<()> {
        let response = self
            .client
            .post(&self.endpoint)
            .basic_auth(&self.public_key, Some(self.secret_key.expose_secret()))
            .json(&Self::batch(&record))
            .send()
            .await
            .context("trace ingestion request failed")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            bail!("trace ingestion returned {}: {}", status, body);
        }

        debug!(trace = %record.name, model = %record.model, "Trace recorded");
        Ok(())
    }
}
