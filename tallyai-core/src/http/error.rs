//! HTTP error mapping utilities

use crate::providers::error::TransportError;
use crate::providers::openai::types::OpenAIError;
use reqwest::StatusCode;
use serde_json::Value;
use std::time::Duration;
use uuid::Uuid;

/// Map an HTTP status, `Retry-After` header and response body to a
/// [`TransportError`]
pub fn map_http_error(
    status: StatusCode,
    retry_after: Option<&str>,
    body: Option<String>,
    request_id: Uuid,
) -> TransportError {
    let error_details = body.as_deref().and_then(extract_error_details);

    let error_message = error_details
        .as_ref()
        .map(|d| d.message.clone())
        .or_else(|| body.clone().filter(|b| !b.trim().is_empty()))
        .unwrap_or_else(|| format!("HTTP error {}", status.as_u16()));

    let message_with_id = format!("{} [request_id: {}]", error_message, request_id);

    if let Some(code) = error_details.as_ref().and_then(|d| d.code.as_deref()) {
        match code {
            "invalid_api_key" => return TransportError::Authentication(message_with_id),
            "model_not_found" => {
                return TransportError::ModelNotAvailable(
                    extract_model_from_error(&error_message)
                        .unwrap_or_else(|| "unknown".to_string()),
                )
            }
            _ => {}
        }
    }

    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            TransportError::Authentication(message_with_id)
        }

        StatusCode::TOO_MANY_REQUESTS => TransportError::RateLimit {
            message: message_with_id,
            retry_after: retry_after.and_then(parse_retry_after).or_else(|| {
                error_details
                    .and_then(|d| d.retry_after_seconds)
                    .map(Duration::from_secs)
            }),
        },

        StatusCode::BAD_REQUEST => TransportError::InvalidRequest(message_with_id),

        StatusCode::NOT_FOUND => TransportError::ModelNotAvailable(
            extract_model_from_error(&error_message).unwrap_or_else(|| "unknown".to_string()),
        ),

        StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => TransportError::Timeout,

        status if status.is_server_error() => TransportError::Server {
            status_code: status.as_u16(),
            message: message_with_id,
        },

        status if status.is_client_error() => TransportError::InvalidRequest(message_with_id),

        _ => TransportError::Other {
            code: format!("HTTP_{}", status.as_u16()),
            message: message_with_id,
        },
    }
}

/// Error details extracted from response body
struct ErrorDetails {
    message: String,
    code: Option<String>,
    retry_after_seconds: Option<u64>,
}

/// Extract error details from a JSON error body
fn extract_error_details(body: &str) -> Option<ErrorDetails> {
    // OpenAI format: { "error": { "message": "...", "type": "...", "code": "..." } }
    if let Ok(envelope) = serde_json::from_str::<OpenAIError>(body) {
        let code = envelope
            .error
            .code
            .as_ref()
            .and_then(Value::as_str)
            .map(str::to_string)
            .or(envelope.error.error_type);
        return Some(ErrorDetails {
            message: envelope.error.message,
            code,
            retry_after_seconds: None,
        });
    }

    let json = serde_json::from_str::<Value>(body).ok()?;

    // Generic format: { "message": "...", "retry_after": 3 }
    if let Some(message) = json.get("message").and_then(Value::as_str) {
        return Some(ErrorDetails {
            message: message.to_string(),
            code: None,
            retry_after_seconds: json.get("retry_after").and_then(Value::as_u64),
        });
    }

    // Ollama format: { "error": "..." }
    if let Some(error) = json.get("error").and_then(Value::as_str) {
        return Some(ErrorDetails {
            message: error.to_string(),
            code: None,
            retry_after_seconds: None,
        });
    }

    None
}

/// Try to extract model name from error message
fn extract_model_from_error(message: &str) -> Option<String> {
    // Look for common patterns like "model 'gpt-4' not found" or
    // "The model `gpt-5` does not exist"
    for (open, close) in [("model '", '\''), ("model \"", '"'), ("model `", '`')] {
        if let Some(start) = message.find(open) {
            let start = start + open.len();
            if let Some(end) = message[start..].find(close) {
                return Some(message[start..start + end].to_string());
            }
        }
    }

    None
}

/// Parse Retry-After header value
pub fn parse_retry_after(header_value: &str) -> Option<Duration> {
    // Only the delay-seconds form; HTTP dates are ignored
    header_value
        .trim()
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}
