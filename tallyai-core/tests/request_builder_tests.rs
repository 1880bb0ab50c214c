//! Integration tests for building chat completion requests

use serde_json::json;
use tallyai_core::providers::openai::converter::{
    build_messages, build_tools, to_openai_request, DEFAULT_MAX_TOKENS,
};
use tallyai_core::providers::openai::OpenAIRole;
use tallyai_core::{ChatTurn, FunctionDefinition, FunctionResult};

fn lookup_function() -> FunctionDefinition {
    FunctionDefinition::new("lookup", "d", json!({}), true)
}

#[test]
fn test_prompt_is_first_message() {
    let messages = build_messages("What did I spend on groceries?", &[]).unwrap();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].role, OpenAIRole::User);
    assert_eq!(messages[0].content, "What did I spend on groceries?");
    assert!(messages[0].tool_call_id.is_none());
}

#[test]
fn test_function_results_follow_prompt_in_order() {
    let results = vec![
        FunctionResult::new("call_1", json!({"total": 42.5})),
        FunctionResult::new("call_2", json!(["a", "b"])),
    ];
    let messages = build_messages("hi", &results).unwrap();

    assert_eq!(messages.len(), 3);
    assert_eq!(messages[1].role, OpenAIRole::Tool);
    assert_eq!(messages[1].tool_call_id.as_deref(), Some("call_1"));
    assert_eq!(messages[1].content, r#"{"total":42.5}"#);
    assert_eq!(messages[2].tool_call_id.as_deref(), Some("call_2"));
    assert_eq!(messages[2].content, r#"["a","b"]"#);
}

#[test]
fn test_tool_message_wire_shape() {
    let turn = ChatTurn::new("gpt-4.1", "hi")
        .with_function_results(vec![FunctionResult::new("call_1", json!("done"))]);
    let request = to_openai_request(&turn, DEFAULT_MAX_TOKENS, false).unwrap();
    let body = serde_json::to_value(&request).unwrap();

    assert_eq!(
        body["messages"],
        json!([
            {"role": "user", "content": "hi"},
            {"role": "tool", "content": "\"done\"", "tool_call_id": "call_1"}
        ])
    );
}

#[test]
fn test_empty_function_list_omits_tools() {
    let turn = ChatTurn::new("gpt-4.1", "hi");
    let request = to_openai_request(&turn, DEFAULT_MAX_TOKENS, false).unwrap();
    let body = serde_json::to_value(&request).unwrap();

    assert!(body.get("tools").is_none());
    assert!(body.get("tool_choice").is_none());
    assert!(body.get("stream").is_none());
    assert_eq!(body["max_tokens"], 4096);
}

#[test]
fn test_single_function_builds_one_tool() {
    let turn = ChatTurn::new("gpt-4.1", "hi").with_functions(vec![lookup_function()]);
    let request = to_openai_request(&turn, DEFAULT_MAX_TOKENS, false).unwrap();
    let body = serde_json::to_value(&request).unwrap();

    let tools = body["tools"].as_array().unwrap();
    assert_eq!(tools.len(), 1);
    assert_eq!(tools[0]["type"], "function");
    assert_eq!(tools[0]["function"]["name"], "lookup");
    assert_eq!(tools[0]["function"]["description"], "d");
    assert_eq!(tools[0]["function"]["parameters"], json!({}));
    assert_eq!(tools[0]["function"]["strict"], true);
    assert_eq!(body["tool_choice"], "auto");
    assert_eq!(body["max_tokens"], 4096);
}

#[test]
fn test_params_schema_passes_through_unmodified() {
    let schema = json!({
        "type": "object",
        "properties": {"merchant": {"type": "string", "enum": ["A", "B"]}},
        "required": ["merchant"],
        "additionalProperties": false
    });
    let tools = build_tools(&[
        FunctionDefinition::new("first", "1", schema.clone(), false),
        FunctionDefinition::new("second", "2", json!({}), true),
    ]);

    assert_eq!(tools.len(), 2);
    assert_eq!(tools[0].function.name, "first");
    assert_eq!(tools[0].function.parameters, schema);
    assert!(!tools[0].function.strict);
    assert_eq!(tools[1].function.name, "second");
}

#[test]
fn test_streaming_request_asks_for_usage() {
    let turn = ChatTurn::new("gpt-4.1", "hi").with_max_tokens(512);
    let request = to_openai_request(&turn, DEFAULT_MAX_TOKENS, true).unwrap();
    let body = serde_json::to_value(&request).unwrap();

    assert_eq!(body["stream"], true);
    assert_eq!(body["stream_options"], json!({"include_usage": true}));
    assert_eq!(body["max_tokens"], 512);
}

#[test]
fn test_configured_default_max_tokens() {
    let turn = ChatTurn::new("gpt-4.1", "hi");
    let request = to_openai_request(&turn, 1024, false).unwrap();
    assert_eq!(request.max_tokens, Some(1024));
}
