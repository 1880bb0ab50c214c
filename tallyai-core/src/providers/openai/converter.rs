//! Conversion between Tallyai protocol and OpenAI format
//!
//! Outbound, a [`ChatTurn`] becomes an [`OpenAIRequest`]. Inbound, a complete
//! chat completion (or a terminal stream event) becomes a [`ChatResponse`].
//! Inbound reads never fail on a missing key: every nested lookup falls back
//! to a default, and only a payload whose top-level shape is wrong is
//! reported as [`ProviderError::MalformedResponse`].

use super::types::*;
use crate::protocol::{
    ChatFunctionRequest, ChatMessage, ChatResponse, ChatTurn, FunctionDefinition, FunctionResult,
};
use crate::providers::error::{ProviderError, ProviderResult};
use serde_json::Value;

/// Token ceiling sent when neither the turn nor the configuration sets one
pub const DEFAULT_MAX_TOKENS: u32 = 4096;

/// Finish reasons that mean the model is waiting on tool output
pub(crate) const TOOL_FINISH_REASONS: [&str; 2] = ["tool_calls", "function_call"];

/// Convert a turn to an OpenAI chat completion request
pub fn to_openai_request(
    turn: &ChatTurn,
    default_max_tokens: u32,
    stream: bool,
) -> ProviderResult<OpenAIRequest> {
    let messages = build_messages(&turn.prompt, &turn.function_results)?;
    let tools = build_tools(&turn.functions);

    // Vendors treat an empty tools array differently from no tools at all
    let (tools, tool_choice) = if tools.is_empty() {
        (None, None)
    } else {
        (Some(tools), Some("auto".to_string()))
    };

    Ok(OpenAIRequest {
        model: turn.model.clone(),
        messages,
        tools,
        tool_choice,
        max_tokens: Some(turn.max_tokens.unwrap_or(default_max_tokens)),
        stream: stream.then_some(true),
        stream_options: stream.then_some(OpenAIStreamOptions {
            include_usage: Some(true),
        }),
    })
}

/// Build the message sequence: the prompt, then one tool message per result
pub fn build_messages(
    prompt: &str,
    function_results: &[FunctionResult],
) -> ProviderResult<Vec<OpenAIMessage>> {
    let mut messages = Vec::with_capacity(function_results.len() + 1);
    messages.push(OpenAIMessage::user(prompt));

    for result in function_results {
        let content = serde_json::to_string(&result.output).map_err(|e| {
            ProviderError::InvalidFunctionOutput {
                call_id: result.call_id.clone(),
                message: e.to_string(),
            }
        })?;
        messages.push(OpenAIMessage::tool(result.call_id.clone(), content));
    }

    Ok(messages)
}

/// Build one tool entry per function definition, in input order
pub fn build_tools(functions: &[FunctionDefinition]) -> Vec<OpenAITool> {
    functions.iter().map(to_openai_tool).collect()
}

fn to_openai_tool(function: &FunctionDefinition) -> OpenAITool {
    OpenAITool {
        tool_type: "function".to_string(),
        function: OpenAIFunction {
            name: function.name.clone(),
            description: function.description.clone(),
            parameters: function.params_schema.clone(),
            strict: function.strict,
        },
    }
}

/// Convert a complete OpenAI chat completion to Tallyai format
pub fn from_openai_response(response: &Value) -> ProviderResult<ChatResponse> {
    if !response.is_object() {
        return Err(ProviderError::MalformedResponse(format!(
            "expected a JSON object, got {}",
            json_kind(response)
        )));
    }

    let id = str_field(response, "id");
    let model = str_field(response, "model");

    let message = first_choice(response)?
        .and_then(|choice| choice.get("message"))
        .filter(|message| message.is_object());

    let Some(message) = message else {
        // Filtered or empty completions carry no choice; that is not an error
        return Ok(ChatResponse {
            id,
            model,
            messages: Vec::new(),
            function_requests: Vec::new(),
        });
    };

    let messages = vec![ChatMessage {
        id: id.clone(),
        output_text: message_text(message.get("content")),
    }];

    let function_requests = message
        .get("tool_calls")
        .and_then(Value::as_array)
        .map(|calls| calls.iter().map(from_openai_tool_call).collect())
        .unwrap_or_default();

    Ok(ChatResponse {
        id,
        model,
        messages,
        function_requests,
    })
}

/// Convert an OpenAI tool call to a function request
fn from_openai_tool_call(tool_call: &Value) -> ChatFunctionRequest {
    let id = str_field(tool_call, "id");
    let function = tool_call.get("function");

    ChatFunctionRequest {
        call_id: id.clone(),
        id,
        function_name: function.map(|f| str_field(f, "name")).unwrap_or_default(),
        function_args: function
            .and_then(|f| f.get("arguments"))
            .map(arguments_text)
            .unwrap_or_default(),
    }
}

/// Usage block of a completion or stream trailer, if any
pub fn extract_usage(response: &Value) -> Option<Value> {
    response
        .get("usage")
        .filter(|usage| usage.is_object())
        .cloned()
}

/// First element of `choices`.
///
/// A missing or null `choices` is `None`; a `choices` that is present but
/// not a list is malformed.
pub(crate) fn first_choice(response: &Value) -> ProviderResult<Option<&Value>> {
    match response.get("choices") {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Array(choices)) => Ok(choices.first().filter(|c| c.is_object())),
        Some(other) => Err(ProviderError::MalformedResponse(format!(
            "expected `choices` to be a list, got {}",
            json_kind(other)
        ))),
    }
}

/// String field with an empty default
pub(crate) fn str_field(value: &Value, key: &str) -> String {
    value
        .get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

/// Message content as text.
///
/// Plain strings pass through; content-part arrays contribute their text
/// parts; anything else is empty.
fn message_text(content: Option<&Value>) -> String {
    match content {
        Some(Value::String(text)) => text.clone(),
        Some(Value::Array(parts)) => parts
            .iter()
            .filter_map(|part| part.get("text").and_then(Value::as_str))
            .collect(),
        _ => String::new(),
    }
}

/// Arguments stay opaque; vendors that send an object get its JSON text
fn arguments_text(arguments: &Value) -> String {
    match arguments {
        Value::String(text) => text.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

pub(crate) fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "an object",
    }
}
