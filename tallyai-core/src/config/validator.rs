//! Configuration validation utilities

use super::env::extract_env_vars;
use super::error::{ValidationError, ValidationErrorKind};
use super::schema::AssistantConfig;

/// Configuration validator with additional validation rules
#[derive(Debug, Default)]
pub struct ConfigValidator;

impl ConfigValidator {
    /// Create a new validator
    pub fn new() -> Self {
        Self
    }

    /// Validate a configuration with extended rules
    pub fn validate(&self, config: &AssistantConfig) -> Result<(), ValidationError> {
        // First run the built-in validation
        config.validate()?;

        self.validate_env_vars(config)?;

        Ok(())
    }

    /// Reject secrets that still hold a `${VAR}` placeholder.
    ///
    /// File loaders interpolate before parsing, so this only fires for
    /// configurations assembled in code.
    fn validate_env_vars(&self, config: &AssistantConfig) -> Result<(), ValidationError> {
        let mut secrets = vec![(
            "openai.access_token",
            config.openai.access_token.expose_secret(),
        )];
        if let Some(trace) = &config.trace {
            secrets.push(("trace.secret_key", trace.secret_key.expose_secret()));
        }

        for (field, value) in secrets {
            if let Some(var) = extract_env_vars(value).into_iter().next() {
                return Err(ValidationError::new(
                    field,
                    ValidationErrorKind::UnresolvedPlaceholder { var },
                ));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unresolved_placeholder_rejected() {
        let config = AssistantConfig::new("${OPENAI_ACCESS_TOKEN}");
        let err = ConfigValidator::new().validate(&config).unwrap_err();
        assert_eq!(err.field, "openai.access_token");
        assert!(matches!(
            err.kind,
            ValidationErrorKind::UnresolvedPlaceholder { ref var } if var == "OPENAI_ACCESS_TOKEN"
        ));
    }

    #[test]
    fn test_valid_config_passes() {
        let config = AssistantConfig::new("sk-test");
        assert!(ConfigValidator::new().validate(&config).is_ok());
    }
}
