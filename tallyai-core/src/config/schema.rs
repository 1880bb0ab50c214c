//! Configuration schema structures with serde support

use super::error::{ValidationError, ValidationErrorKind};
use super::secrets::SecretString;
use crate::providers::openai::{DEFAULT_MAX_BATCH_SIZE, DEFAULT_MAX_TOKENS, DEFAULT_MODELS};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Schema version this crate reads
pub const SUPPORTED_VERSION: &str = "0.1";

/// Trace host used when none is configured
pub const DEFAULT_TRACE_HOST: &str = "https://cloud.langfuse.com";

/// Default bound on one trace ingestion call
pub const DEFAULT_TRACE_TIMEOUT_MS: u64 = 5000;

/// Root configuration structure for Tallyai
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AssistantConfig {
    /// Schema version (required - no default)
    pub version: String,

    /// OpenAI-compatible vendor settings
    pub openai: OpenAIConfig,

    /// Connection settings
    #[serde(default)]
    pub connection: ConnectionConfig,

    /// Trace sink; tracing is off when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trace: Option<TraceConfig>,
}

/// OpenAI-compatible vendor configuration
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct OpenAIConfig {
    /// Bearer token (supports environment variable interpolation)
    pub access_token: SecretString,

    /// Override base URL for OpenAI-compatible APIs such as Ollama
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    /// Models accepted when no base URL override is set
    #[serde(default = "default_models")]
    pub models: Vec<String>,

    /// Default token ceiling per turn
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Largest batch a business-logic request may carry
    #[serde(default = "default_max_batch_size")]
    pub max_batch_size: usize,
}

/// Connection configuration
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ConnectionConfig {
    /// Connection timeout in milliseconds
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_ms: u64,

    /// Request timeout in milliseconds, covering the whole streamed body
    #[serde(default = "default_request_timeout")]
    pub request_timeout_ms: u64,

    /// Maximum idle connections per host
    #[serde(default = "default_max_idle")]
    pub max_idle_per_host: usize,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            connect_timeout_ms: default_connect_timeout(),
            request_timeout_ms: default_request_timeout(),
            max_idle_per_host: default_max_idle(),
        }
    }
}

impl ConnectionConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

/// Trace sink configuration
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TraceConfig {
    /// Ingestion host
    #[serde(default = "default_trace_host")]
    pub host: String,

    /// Public key, sent as the basic-auth user
    pub public_key: String,

    /// Secret key, sent as the basic-auth password
    pub secret_key: SecretString,

    /// Whether records are sent
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Upper bound on one ingestion call, in milliseconds
    #[serde(default = "default_trace_timeout")]
    pub timeout_ms: u64,
}

impl TraceConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

// Default value functions for serde
fn default_true() -> bool {
    true
}
fn default_models() -> Vec<String> {
    DEFAULT_MODELS.iter().map(|m| m.to_string()).collect()
}
fn default_max_tokens() -> u32 {
    DEFAULT_MAX_TOKENS
}
fn default_max_batch_size() -> usize {
    DEFAULT_MAX_BATCH_SIZE
}
fn default_connect_timeout() -> u64 {
    10000
}
fn default_request_timeout() -> u64 {
    60000
}
fn default_max_idle() -> usize {
    10
}
fn default_trace_timeout() -> u64 {
    DEFAULT_TRACE_TIMEOUT_MS
}
fn default_trace_host() -> String {
    DEFAULT_TRACE_HOST.to_string()
}

impl AssistantConfig {
    /// Configuration with defaults for everything but the access token
    pub fn new(access_token: impl Into<SecretString>) -> Self {
        Self {
            version: SUPPORTED_VERSION.to_string(),
            openai: OpenAIConfig {
                access_token: access_token.into(),
                base_url: None,
                models: default_models(),
                max_tokens: default_max_tokens(),
                max_batch_size: default_max_batch_size(),
            },
            connection: ConnectionConfig::default(),
            trace: None,
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.version.is_empty() {
            return Err(ValidationError::missing("version"));
        }

        if self.version != SUPPORTED_VERSION {
            return Err(ValidationError::new(
                "version",
                ValidationErrorKind::UnsupportedVersion {
                    found: self.version.clone(),
                },
            )
            .with_hint(format!("this build reads version {}", SUPPORTED_VERSION)));
        }

        self.openai.validate("openai")?;
        self.connection.validate("connection")?;

        if let Some(trace) = &self.trace {
            trace.validate("trace")?;
        }

        Ok(())
    }
}

impl OpenAIConfig {
    /// Validate vendor configuration
    pub fn validate(&self, path: &str) -> Result<(), ValidationError> {
        if self.access_token.is_empty() {
            return Err(ValidationError::missing(format!("{}.access_token", path)));
        }

        if let Some(base_url) = &self.base_url {
            validate_http_url(&format!("{}.base_url", path), base_url)?;
        } else if self.models.is_empty() {
            return Err(ValidationError::missing(format!("{}.models", path))
                .with_hint("a model list is required unless base_url is set"));
        }

        if self.models.iter().any(|m| m.trim().is_empty()) {
            return Err(ValidationError::missing(format!("{}.models", path))
                .with_hint("model identifiers must not be blank"));
        }

        if self.max_tokens == 0 {
            return Err(ValidationError::not_positive(format!("{}.max_tokens", path)));
        }

        if self.max_batch_size == 0 {
            return Err(ValidationError::not_positive(format!("{}.max_batch_size", path)));
        }

        Ok(())
    }
}

impl ConnectionConfig {
    /// Validate connection settings
    pub fn validate(&self, path: &str) -> Result<(), ValidationError> {
        if self.connect_timeout_ms == 0 {
            return Err(ValidationError::not_positive(format!("{}.connect_timeout_ms", path)));
        }

        if self.request_timeout_ms == 0 {
            return Err(ValidationError::not_positive(format!("{}.request_timeout_ms", path)));
        }

        Ok(())
    }
}

impl TraceConfig {
    /// Validate trace settings
    pub fn validate(&self, path: &str) -> Result<(), ValidationError> {
        validate_http_url(&format!("{}.host", path), &self.host)?;

        if self.timeout_ms == 0 {
            return Err(ValidationError::not_positive(format!("{}.timeout_ms", path)));
        }

        if !self.enabled {
            return Ok(());
        }

        if self.public_key.trim().is_empty() {
            return Err(ValidationError::missing(format!("{}.public_key", path)));
        }

        if self.secret_key.is_empty() {
            return Err(ValidationError::missing(format!("{}.secret_key", path)));
        }

        Ok(())
    }
}

/// Proper URL validation using the url crate
fn validate_http_url(path: &str, value: &str) -> Result<(), ValidationError> {
    match url::Url::parse(value) {
        Ok(url) if url.scheme() == "http" || url.scheme() == "https" => Ok(()),
        Ok(url) => Err(ValidationError::invalid_url(
            path,
            format!("URL scheme must be http or https, got: {}", url.scheme()),
        )),
        Err(e) => Err(ValidationError::invalid_url(path, e.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_minimal_yaml() {
        let yaml = r#"
version: "0.1"
openai:
  access_token: sk-test
"#;
        let config: AssistantConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.openai.models, vec!["gpt-4.1"]);
        assert_eq!(config.openai.max_tokens, 4096);
        assert_eq!(config.openai.max_batch_size, 25);
        assert_eq!(config.connection, ConnectionConfig::default());
        assert!(config.trace.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_rejects_unknown_fields() {
        let yaml = r#"
version: "0.1"
openai:
  access_token: sk-test
  temperature: 0.2
"#;
        assert!(serde_yaml::from_str::<AssistantConfig>(yaml).is_err());
    }

    #[test]
    fn test_empty_models_allowed_with_base_url() {
        let mut config = AssistantConfig::new("sk-test");
        config.openai.models.clear();
        assert!(config.validate().is_err());

        config.openai.base_url = Some("http://localhost:11434/v1".to_string());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_disabled_trace_skips_key_checks() {
        let mut config = AssistantConfig::new("sk-test");
        config.trace = Some(TraceConfig {
            host: DEFAULT_TRACE_HOST.to_string(),
            public_key: String::new(),
            secret_key: SecretString::new(""),
            enabled: false,
            timeout_ms: default_trace_timeout(),
        });
        assert!(config.validate().is_ok());
    }
}
