//! Tests for streaming response aggregation.

use ocore::{StreamEvent, ToolResult};
use runtime::Aggregator;
use serde_json::{Map, Value, json};
use tokio_util::sync::CancellationToken;

fn params(value: Value) -> Map<String, Value> {
    value.as_object().cloned().unwrap()
}

#[test]
fn progress_is_cumulative() {
    let mut aggregator = Aggregator::new();
    let mut seen = Vec::new();

    for delta in ["Hel", "lo"] {
        if aggregator.apply(StreamEvent::ContentBlockDelta {
            content: delta.into(),
        }) {
            seen.push(aggregator.content().to_owned());
        }
    }

    assert_eq!(seen, vec!["Hel", "Hello"]);
}

#[test]
fn tool_call_arguments_merge_last_write_wins() {
    let mut aggregator = Aggregator::new();
    aggregator.apply(StreamEvent::ToolUseStart {
        tool_id: "1".into(),
        tool_name: "x".into(),
    });
    aggregator.apply(StreamEvent::ToolUseDelta {
        tool_id: "1".into(),
        parameters: params(json!({"a": 1})),
    });
    aggregator.apply(StreamEvent::ToolUseDelta {
        tool_id: "1".into(),
        parameters: params(json!({"b": 2})),
    });
    aggregator.apply(StreamEvent::ToolUseStop { tool_id: "1".into() });
    aggregator.apply(StreamEvent::Done);

    let turn = aggregator.finish().unwrap();
    assert_eq!(turn.message.tool_calls.len(), 1);
    let call = &turn.message.tool_calls[0];
    assert_eq!(call.function.name, "x");
    let args: Value = serde_json::from_str(&call.function.arguments).unwrap();
    assert_eq!(args, json!({"a": 1, "b": 2}));
}

#[test]
fn resent_full_objects_stay_well_formed() {
    let mut aggregator = Aggregator::new();
    aggregator.apply(StreamEvent::ToolUseStart {
        tool_id: "1".into(),
        tool_name: "x".into(),
    });
    aggregator.apply(StreamEvent::ToolUseDelta {
        tool_id: "1".into(),
        parameters: params(json!({"a": 1})),
    });
    aggregator.apply(StreamEvent::ToolUseDelta {
        tool_id: "1".into(),
        parameters: params(json!({"a": 1, "b": 2})),
    });
    aggregator.apply(StreamEvent::ToolUseStop { tool_id: "1".into() });
    aggregator.apply(StreamEvent::Done);

    let turn = aggregator.finish().unwrap();
    let args: Value = serde_json::from_str(&turn.message.tool_calls[0].function.arguments).unwrap();
    assert_eq!(args, json!({"a": 1, "b": 2}));
}

#[test]
fn orphaned_tool_call_is_dropped() {
    let mut aggregator = Aggregator::new();
    aggregator.apply(StreamEvent::ContentBlockDelta {
        content: "thinking...".into(),
    });
    aggregator.apply(StreamEvent::ToolUseStart {
        tool_id: "1".into(),
        tool_name: "x".into(),
    });
    aggregator.apply(StreamEvent::ToolUseDelta {
        tool_id: "1".into(),
        parameters: params(json!({"a": 1})),
    });
    // No stop before the stream ends.

    let turn = aggregator.finish().unwrap();
    assert!(turn.message.tool_calls.is_empty());
}

#[test]
fn stop_without_start_is_ignored() {
    let mut aggregator = Aggregator::new();
    aggregator.apply(StreamEvent::ContentBlockDelta {
        content: "hi".into(),
    });
    aggregator.apply(StreamEvent::ToolUseStop {
        tool_id: "ghost".into(),
    });
    aggregator.apply(StreamEvent::Done);

    let turn = aggregator.finish().unwrap();
    assert!(turn.message.tool_calls.is_empty());
}

#[test]
fn tool_responses_deduplicate_by_id() {
    let mut aggregator = Aggregator::new();
    let result = ToolResult {
        id: "r1".into(),
        content: "generated".into(),
        status: "success".into(),
        data: None,
    };
    assert!(aggregator.apply(StreamEvent::ToolResponse {
        result: result.clone()
    }));
    assert!(!aggregator.apply(StreamEvent::ToolResponse { result }));
    assert_eq!(aggregator.tool_responses().len(), 1);
}

#[test]
fn truncated_stream_with_content_is_clean() {
    let mut aggregator = Aggregator::new();
    aggregator.apply(StreamEvent::ContentBlockDelta {
        content: "partial".into(),
    });
    // Connection closed without a terminator.
    let turn = aggregator.finish().unwrap();
    assert_eq!(turn.message.content.flatten(), "partial");
}

#[test]
fn truncated_stream_without_content_is_an_error() {
    let aggregator = Aggregator::new();
    assert!(aggregator.finish().is_err());
}

#[test]
fn explicit_done_without_content_is_clean() {
    let mut aggregator = Aggregator::new();
    aggregator.apply(StreamEvent::Done);
    assert!(aggregator.finish().is_ok());
}

#[test]
fn reasoning_accumulates_collapsed() {
    let mut aggregator = Aggregator::new();
    aggregator.apply(StreamEvent::ReasoningDelta {
        content: "step 1. ".into(),
    });
    aggregator.apply(StreamEvent::ReasoningDelta {
        content: "step 2.".into(),
    });
    aggregator.apply(StreamEvent::ContentBlockDelta {
        content: "answer".into(),
    });
    aggregator.apply(StreamEvent::Done);

    let turn = aggregator.finish().unwrap();
    let reasoning = turn.message.reasoning.unwrap();
    assert_eq!(reasoning.content, "step 1. step 2.");
    assert!(reasoning.collapsed);
}

#[tokio::test]
async fn collect_fires_cumulative_progress() {
    let events = vec![
        Ok(StreamEvent::ContentBlockDelta {
            content: "Hel".into(),
        }),
        Ok(StreamEvent::ContentBlockDelta {
            content: "lo".into(),
        }),
        Ok(StreamEvent::Done),
    ];
    let stream = futures_util::stream::iter(events);

    let mut seen = Vec::new();
    let turn = Aggregator::collect(stream, &CancellationToken::new(), |aggregator| {
        seen.push(aggregator.content().to_owned());
    })
    .await
    .unwrap();

    assert_eq!(seen, vec!["Hel", "Hello"]);
    assert_eq!(turn.message.content.flatten(), "Hello");
}

#[tokio::test]
async fn collect_stops_on_cancellation() {
    let cancel = CancellationToken::new();
    cancel.cancel();

    let stream = futures_util::stream::pending::<anyhow::Result<StreamEvent>>();
    let result = Aggregator::collect(stream, &cancel, |_| {}).await;
    assert!(result.is_err());
}

#[test]
fn usage_and_log_id_are_captured() {
    let mut aggregator = Aggregator::new();
    aggregator.apply(StreamEvent::MessageDelta {
        usage: None,
        log_id: Some("chatcmpl-9".into()),
    });
    aggregator.apply(StreamEvent::ContentBlockDelta {
        content: "hi".into(),
    });
    aggregator.apply(StreamEvent::MessageDelta {
        usage: Some(ocore::Usage::new(7, 3)),
        log_id: None,
    });
    aggregator.apply(StreamEvent::Done);

    let turn = aggregator.finish().unwrap();
    assert_eq!(turn.message.log_id, "chatcmpl-9");
    assert_eq!(turn.message.usage.unwrap().total_tokens, 10);
}
