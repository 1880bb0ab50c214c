//! Errors raised while loading an [`AssistantConfig`](super::AssistantConfig)

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// File format a configuration was read as
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Yaml,
    Json,
}

impl fmt::Display for ConfigFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigFormat::Yaml => f.write_str("YAML"),
            ConfigFormat::Json => f.write_str("JSON"),
        }
    }
}

/// Why a configuration could not be produced
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config file '{}': {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed {format} in '{}'{}: {message}", .path.display(), location(.line, .column))]
    Parse {
        path: PathBuf,
        format: ConfigFormat,
        line: Option<usize>,
        column: Option<usize>,
        message: String,
    },

    /// A `${VAR}` placeholder, or a variable `from_env` requires, is unset
    #[error("environment variable '{var}' is not set")]
    MissingEnvVar { var: String },

    #[error("invalid configuration: {0}")]
    Invalid(#[from] ValidationError),
}

fn location(line: &Option<usize>, column: &Option<usize>) -> String {
    match (line, column) {
        (Some(line), Some(column)) => format!(" at line {}, column {}", line, column),
        (Some(line), None) => format!(" at line {}", line),
        _ => String::new(),
    }
}

/// A field that parsed but holds an unusable value
#[derive(Debug, Error)]
#[error("{field}: {kind}{}", self::hint(.hint))]
pub struct ValidationError {
    /// Dotted path such as `openai.base_url`
    pub field: String,
    pub kind: ValidationErrorKind,
    pub hint: Option<String>,
}

fn hint(hint: &Option<String>) -> String {
    hint.as_deref()
        .map(|h| format!(" ({})", h))
        .unwrap_or_default()
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationErrorKind {
    #[error("must be set")]
    Missing,

    #[error("must be greater than 0")]
    NotPositive,

    #[error("not an http(s) URL: {reason}")]
    InvalidUrl { reason: String },

    #[error("unsupported schema version '{found}'")]
    UnsupportedVersion { found: String },

    #[error("still holds the placeholder ${{{var}}}")]
    UnresolvedPlaceholder { var: String },
}

impl ValidationError {
    pub fn new(field: impl Into<String>, kind: ValidationErrorKind) -> Self {
        Self {
            field: field.into(),
            kind,
            hint: None,
        }
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    pub fn missing(field: impl Into<String>) -> Self {
        Self::new(field, ValidationErrorKind::Missing)
    }

    pub fn not_positive(field: impl Into<String>) -> Self {
        Self::new(field, ValidationErrorKind::NotPositive)
    }

    pub fn invalid_url(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::new(
            field,
            ValidationErrorKind::InvalidUrl {
                reason: reason.into(),
            },
        )
    }
}

pub type ConfigResult<T> = Result<T, ConfigError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_error_message() {
        let err = ConfigError::Parse {
            path: PathBuf::from("tallyai.yaml"),
            format: ConfigFormat::Yaml,
            line: Some(3),
            column: Some(7),
            message: "unexpected end of stream".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "malformed YAML in 'tallyai.yaml' at line 3, column 7: unexpected end of stream"
        );
    }

    #[test]
    fn test_validation_error_message() {
        let err = ValidationError::missing("openai.models")
            .with_hint("a model list is required unless base_url is set");
        assert_eq!(
            err.to_string(),
            "openai.models: must be set (a model list is required unless base_url is set)"
        );

        let err = ValidationError::new(
            "openai.access_token",
            ValidationErrorKind::UnresolvedPlaceholder {
                var: "OPENAI_ACCESS_TOKEN".to_string(),
            },
        );
        assert_eq!(
            err.to_string(),
            "openai.access_token: still holds the placeholder ${OPENAI_ACCESS_TOKEN}"
        );
    }
}
