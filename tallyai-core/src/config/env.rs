//! Environment variable interpolation for configuration

use super::error::ConfigError;
use regex::Regex;
use std::env;
use std::sync::LazyLock;

/// `${VAR}` placeholder syntax
static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}").expect("placeholder pattern is a valid regex")
});

/// Interpolate environment variables in a configuration string
pub fn interpolate_env_vars(content: &str) -> Result<String, ConfigError> {
    interpolate_with(content, |name| env::var(name).ok())
}

/// Interpolate `${VAR}` placeholders using `lookup`; the first missing
/// variable is reported
pub fn interpolate_with<F>(content: &str, lookup: F) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut result = content.to_string();

    for cap in PLACEHOLDER.captures_iter(content) {
        let var_name = &cap[1];
        match lookup(var_name) {
            Some(value) => result = result.replace(&cap[0], &value),
            None => {
                return Err(ConfigError::MissingEnvVar {
                    var: var_name.to_string(),
                })
            }
        }
    }

    Ok(result)
}

/// Names of all `${VAR}` placeholders in `text`
pub fn extract_env_vars(text: &str) -> Vec<String> {
    PLACEHOLDER
        .captures_iter(text)
        .map(|cap| cap[1].to_string())
        .collect()
}
