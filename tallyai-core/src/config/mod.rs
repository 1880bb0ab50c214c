//! Configuration module for Tallyai
//!
//! Configuration comes from a YAML or JSON file (with `${VAR}`
//! interpolation) or directly from the process environment.

mod env;
mod error;
mod schema;
mod secrets;
mod validator;

pub use env::{extract_env_vars, interpolate_env_vars};
pub use error::{ConfigError, ConfigFormat, ConfigResult, ValidationError, ValidationErrorKind};
pub use schema::{
    AssistantConfig, ConnectionConfig, OpenAIConfig, TraceConfig, DEFAULT_TRACE_HOST,
    DEFAULT_TRACE_TIMEOUT_MS, SUPPORTED_VERSION,
};
pub use secrets::SecretString;
pub use validator::ConfigValidator;

use std::fs;
use std::path::Path;

/// Load a configuration from a YAML file
pub fn load_from_yaml<P: AsRef<Path>>(path: P) -> ConfigResult<AssistantConfig> {
    let path = path.as_ref();
    let content = read(path)?;

    // Interpolate environment variables before parsing
    let interpolated = env::interpolate_env_vars(&content)?;

    let config: AssistantConfig =
        serde_yaml::from_str(&interpolated).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            format: ConfigFormat::Yaml,
            line: e.location().map(|l| l.line()),
            column: e.location().map(|l| l.column()),
            message: e.to_string(),
        })?;

    ConfigValidator::new().validate(&config)?;
    Ok(config)
}

/// Load a configuration from a JSON file
pub fn load_from_json<P: AsRef<Path>>(path: P) -> ConfigResult<AssistantConfig> {
    let path = path.as_ref();
    let content = read(path)?;

    // Interpolate environment variables before parsing
    let interpolated = env::interpolate_env_vars(&content)?;

    let config: AssistantConfig =
        serde_json::from_str(&interpolated).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            format: ConfigFormat::Json,
            line: Some(e.line()),
            column: Some(e.column()),
            message: e.to_string(),
        })?;

    ConfigValidator::new().validate(&config)?;
    Ok(config)
}

/// Build a configuration from the process environment.
///
/// Reads `OPENAI_ACCESS_TOKEN` (required), `AI_BASE_URL`, and the
/// `LANGFUSE_PUBLIC_KEY` / `LANGFUSE_SECRET_KEY` / `LANGFUSE_HOST` trio.
/// Tracing is enabled only when both keys are present.
pub fn from_env() -> ConfigResult<AssistantConfig> {
    from_lookup(|name| std::env::var(name).ok())
}

/// Build a configuration from an arbitrary variable source
pub fn from_lookup<F>(lookup: F) -> ConfigResult<AssistantConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let present = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

    let access_token = present("OPENAI_ACCESS_TOKEN").ok_or_else(|| ConfigError::MissingEnvVar {
        var: "OPENAI_ACCESS_TOKEN".to_string(),
    })?;

    let mut config = AssistantConfig::new(access_token);
    config.openai.base_url = present("AI_BASE_URL");

    if let (Some(public_key), Some(secret_key)) =
        (present("LANGFUSE_PUBLIC_KEY"), present("LANGFUSE_SECRET_KEY"))
    {
        config.trace = Some(TraceConfig {
            host: present("LANGFUSE_HOST").unwrap_or_else(|| DEFAULT_TRACE_HOST.to_string()),
            public_key,
            secret_key: SecretString::new(secret_key),
            enabled: true,
            timeout_ms: DEFAULT_TRACE_TIMEOUT_MS,
        });
    }

    ConfigValidator::new().validate(&config)?;
    Ok(config)
}

fn read(path: &Path) -> ConfigResult<String> {
    fs::read_to_string(path).map_err(|e| ConfigError::Read {
        path: path.to_path_buf(),
        source: e,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_from_lookup_minimal() {
        let config = from_lookup(vars(&[("OPENAI_ACCESS_TOKEN", "sk-test")])).unwrap();
        assert_eq!(config.openai.access_token.expose_secret(), "sk-test");
        assert!(config.openai.base_url.is_none());
        assert!(config.trace.is_none());
    }

    #[test]
    fn test_from_lookup_requires_token() {
        let err = from_lookup(vars(&[("AI_BASE_URL", "http://localhost:11434/v1")])).unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvVar { ref var } if var == "OPENAI_ACCESS_TOKEN"));
    }

    #[test]
    fn test_from_lookup_trace_needs_both_keys() {
        let config = from_lookup(vars(&[
            ("OPENAI_ACCESS_TOKEN", "sk-test"),
            ("LANGFUSE_PUBLIC_KEY", "pk-lf"),
        ]))
        .unwrap();
        assert!(config.trace.is_none());

        let config = from_lookup(vars(&[
            ("OPENAI_ACCESS_TOKEN", "sk-test"),
            ("AI_BASE_URL", "http://localhost:11434/v1"),
            ("LANGFUSE_PUBLIC_KEY", "pk-lf"),
            ("LANGFUSE_SECRET_KEY", "sk-lf"),
            ("LANGFUSE_HOST", "https://langfuse.internal"),
        ]))
        .unwrap();
        let trace = config.trace.unwrap();
        assert_eq!(trace.host, "https://langfuse.internal");
        assert!(trace.enabled);
        assert_eq!(
            config.openai.base_url.as_deref(),
            Some("http://localhost:11434/v1")
        );
    }
}
