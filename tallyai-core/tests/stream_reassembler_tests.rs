//! Integration tests for reassembling streamed chat completions

use proptest::prelude::*;
use serde_json::{json, Value};
use tallyai_core::providers::openai::{StreamReassembler, StreamState};
use tallyai_core::{ChatStreamChunk, IncompleteReason, ProviderError};
use test_case::test_case;

/// Feed `events` through a fresh reassembler, collecting every chunk
fn run(events: &[Value]) -> (StreamReassembler, Vec<ChatStreamChunk>) {
    let mut reassembler = StreamReassembler::new("gpt-4.1");
    let mut chunks = Vec::new();
    {
        let mut sink = |chunk: ChatStreamChunk| chunks.push(chunk);
        for event in events {
            reassembler.process_event(event, &mut sink).unwrap();
        }
    }
    (reassembler, chunks)
}

fn text(content: &str) -> Value {
    json!({"choices": [{"delta": {"content": content}}]})
}

fn stop() -> Value {
    json!({"choices": [{"delta": {}, "finish_reason": "stop"}]})
}

#[test]
fn test_hello_scenario() {
    let (reassembler, chunks) = run(&[text("Hel"), text("lo"), stop()]);

    assert_eq!(chunks.len(), 3);
    assert_eq!(chunks[0], ChatStreamChunk::OutputText("Hel".to_string()));
    assert_eq!(chunks[1], ChatStreamChunk::OutputText("lo".to_string()));

    let ChatStreamChunk::Response(response) = &chunks[2] else {
        panic!("expected a response chunk, got {:?}", chunks[2]);
    };
    assert_eq!(response.messages.len(), 1);
    assert_eq!(response.messages[0].output_text, "Hello");
    assert!(response.function_requests.is_empty());
    assert_eq!(response.model, "gpt-4.1");

    assert_eq!(reassembler.state(), StreamState::Terminal);
    assert_eq!(&reassembler.finish().unwrap(), response);
}

#[test]
fn test_empty_content_is_emitted() {
    let (_, chunks) = run(&[text(""), text("ok"), stop()]);
    assert_eq!(chunks[0], ChatStreamChunk::OutputText(String::new()));
    assert_eq!(chunks.len(), 3);
}

#[test_case(json!({"choices": []}) ; "empty choices heartbeat")]
#[test_case(json!({"id": "chatcmpl-1", "object": "chat.completion.chunk"}) ; "no choices key")]
#[test_case(json!({"choices": [{"delta": {"role": "assistant"}}]}) ; "role-only delta")]
#[test_case(json!({"choices": [{"delta": {"content": null}}]}) ; "null content")]
fn test_frames_that_emit_nothing(event: Value) {
    let (reassembler, chunks) = run(&[event]);
    assert!(chunks.is_empty());
    assert_ne!(reassembler.state(), StreamState::Terminal);
}

#[test]
fn test_heartbeats_between_deltas_are_ignored() {
    let (_, chunks) = run(&[
        json!({"choices": []}),
        text("a"),
        json!({"choices": []}),
        text("b"),
        stop(),
    ]);
    assert_eq!(chunks.len(), 3);
    let ChatStreamChunk::Response(response) = &chunks[2] else {
        panic!("expected response chunk");
    };
    assert_eq!(response.output_text(), "ab");
}

#[test]
fn test_tool_call_stream() {
    let (reassembler, chunks) = run(&[
        json!({"model": "gpt-4.1-2025-04-14", "choices": [{"delta": {"role": "assistant", "tool_calls": [
            {"index": 0, "id": "call_1", "type": "function", "function": {"name": "get_accounts", "arguments": ""}}
        ]}}]}),
        json!({"choices": [{"delta": {"tool_calls": [{"index": 0, "function": {"arguments": "{}"}}]}}]}),
        json!({"id": "chatcmpl-tc", "model": "gpt-4.1-2025-04-14", "choices": [{
            "delta": {},
            "message": {"tool_calls": [
                {"id": "call_1", "type": "function", "function": {"name": "get_accounts", "arguments": "{}"}}
            ]},
            "finish_reason": "tool_calls"
        }]}),
    ]);

    assert_eq!(chunks.len(), 1);
    let ChatStreamChunk::Response(response) = &chunks[0] else {
        panic!("expected response chunk");
    };
    assert_eq!(response.id, "chatcmpl-tc");
    assert_eq!(response.function_requests.len(), 1);
    assert_eq!(response.function_requests[0].call_id, "call_1");
    assert_eq!(response.function_requests[0].function_name, "get_accounts");
    assert_eq!(response.function_requests[0].function_args, "{}");
    assert!(reassembler.finish().is_ok());
}

#[test]
fn test_tool_call_finish_reads_delta_as_message() {
    let (_, chunks) = run(&[json!({
        "id": "chatcmpl-d",
        "choices": [{
            "delta": {"tool_calls": [
                {"id": "call_9", "function": {"name": "lookup", "arguments": "{\"q\":1}"}}
            ]},
            "finish_reason": "tool_calls"
        }]
    })]);

    let ChatStreamChunk::Response(response) = &chunks[0] else {
        panic!("expected response chunk");
    };
    assert_eq!(response.function_requests[0].id, "call_9");
    assert_eq!(response.function_requests[0].function_args, "{\"q\":1}");
    assert_eq!(response.model, "gpt-4.1");
}

#[test]
fn test_legacy_function_call_finish_reason() {
    let (reassembler, chunks) = run(&[json!({
        "choices": [{"message": {"content": ""}, "delta": {}, "finish_reason": "function_call"}]
    })]);
    assert_eq!(chunks.len(), 1);
    assert!(matches!(chunks[0], ChatStreamChunk::Response(_)));
    assert!(reassembler.is_terminal());
}

#[test]
fn test_events_after_terminal_are_ignored_but_usage_is_kept() {
    let (reassembler, chunks) = run(&[
        text("done"),
        stop(),
        text("late"),
        json!({"choices": [], "usage": {"prompt_tokens": 3, "completion_tokens": 1, "total_tokens": 4}}),
    ]);

    assert_eq!(chunks.len(), 2);
    assert!(matches!(chunks.last(), Some(ChatStreamChunk::Response(_))));
    assert_eq!(reassembler.usage().unwrap()["total_tokens"], 4);
    assert_eq!(reassembler.finish().unwrap().output_text(), "done");
}

#[test]
fn test_usage_trailer_before_finish_is_captured() {
    let (reassembler, chunks) = run(&[
        text("x"),
        json!({"choices": [], "usage": {"total_tokens": 9}}),
    ]);
    assert_eq!(chunks.len(), 1);
    assert_eq!(reassembler.state(), StreamState::Streaming);
    assert_eq!(reassembler.usage().unwrap()["total_tokens"], 9);
}

#[test]
fn test_stream_without_finish_reason_is_incomplete() {
    let (reassembler, chunks) = run(&[text("Hel"), text("lo")]);

    assert!(chunks
        .iter()
        .all(|c| matches!(c, ChatStreamChunk::OutputText(_))));

    let err = reassembler.finish().unwrap_err();
    assert!(matches!(
        err,
        ProviderError::IncompleteStream(IncompleteReason::EndedWithoutFinishReason)
    ));
}

#[test]
fn test_empty_stream_is_incomplete() {
    let (reassembler, chunks) = run(&[]);
    assert!(chunks.is_empty());
    assert_eq!(reassembler.state(), StreamState::Idle);
    assert!(reassembler.finish().unwrap_err().is_incomplete());
}

#[test]
fn test_abort_reports_reason() {
    let (reassembler, _) = run(&[text("partial")]);
    let err = reassembler.abort(IncompleteReason::TimedOut);
    assert!(matches!(
        err,
        ProviderError::IncompleteStream(IncompleteReason::TimedOut)
    ));
}

#[test]
fn test_malformed_choices_is_an_error() {
    let mut reassembler = StreamReassembler::new("gpt-4.1");
    let mut sink = |_: ChatStreamChunk| {};
    let err = reassembler
        .process_event(&json!({"choices": "oops"}), &mut sink)
        .unwrap_err();
    assert!(matches!(err, ProviderError::MalformedResponse(_)));
}

#[test]
fn test_synthesized_ids_are_unique() {
    let (first, _) = run(&[text("a"), stop()]);
    let (second, _) = run(&[text("a"), stop()]);
    let first = first.finish().unwrap();
    let second = second.finish().unwrap();
    assert!(first.id.starts_with("chatcmpl-"));
    assert_ne!(first.id, second.id);
    assert_eq!(first.messages[0].id, first.id);
}

proptest! {
    #[test]
    fn prop_response_text_is_concatenation_of_chunks(
        fragments in prop::collection::vec(".{0,12}", 0..20),
        heartbeat_every in 1usize..5,
    ) {
        let mut events = Vec::new();
        for (i, fragment) in fragments.iter().enumerate() {
            if i % heartbeat_every == 0 {
                events.push(json!({"choices": []}));
            }
            events.push(text(fragment));
        }
        events.push(stop());

        let (_, chunks) = run(&events);

        prop_assert_eq!(chunks.len(), fragments.len() + 1);

        let streamed: String = chunks
            .iter()
            .filter_map(|c| match c {
                ChatStreamChunk::OutputText(t) => Some(t.as_str()),
                ChatStreamChunk::Response(_) => None,
            })
            .collect();

        let responses: Vec<_> = chunks
            .iter()
            .filter(|c| matches!(c, ChatStreamChunk::Response(_)))
            .collect();
        prop_assert_eq!(responses.len(), 1);

        match chunks.last() {
            Some(ChatStreamChunk::Response(response)) => {
                prop_assert_eq!(&response.messages[0].output_text, &streamed);
                prop_assert_eq!(streamed, fragments.concat());
            }
            other => prop_assert!(false, "last chunk was {:?}", other),
        }
    }
}
