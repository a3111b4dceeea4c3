//! Tests for tool orchestration.

use anyhow::anyhow;
use ocore::{FunctionCall, Role, Tool, ToolCall};
use runtime::{HistoryStore, Orchestrator, ToolOutput};

fn tool(name: &str) -> Tool {
    Tool {
        name: name.into(),
        description: format!("The {name} tool"),
        parameters: schemars::schema_for!(String),
        strict: false,
    }
}

fn call(id: &str, name: &str, arguments: &str) -> ToolCall {
    ToolCall {
        id: id.into(),
        index: 0,
        call_type: "function".into(),
        function: FunctionCall {
            name: name.into(),
            arguments: arguments.into(),
        },
    }
}

fn orchestrator() -> Orchestrator {
    let mut orchestrator = Orchestrator::new();
    orchestrator.register(tool("echo"), |_conversation, args| async move {
        Ok(ToolOutput::text(format!("echo: {}", args["text"].as_str().unwrap_or(""))))
    });
    orchestrator.register(tool("boom"), |_conversation, _args| async move {
        Err::<ToolOutput, _>(anyhow!("exploded"))
    });
    orchestrator
}

#[tokio::test]
async fn marker_message_records_the_request() {
    let orchestrator = orchestrator();
    let store = HistoryStore::new();
    let calls = vec![call("c1", "echo", r#"{"text":"hi"}"#)];

    let appended = orchestrator.run("conv-1", &calls, &store).await.unwrap();

    assert_eq!(appended.len(), 2);
    let marker = &appended[0];
    assert_eq!(marker.role, Role::Assistant);
    assert_eq!(marker.name, "External Functions");
    assert!(marker.content.is_empty());
    assert_eq!(marker.tool_calls.len(), 1);
}

#[tokio::test]
async fn results_follow_in_call_order() {
    let orchestrator = orchestrator();
    let store = HistoryStore::new();
    let calls = vec![
        call("c1", "echo", r#"{"text":"first"}"#),
        call("c2", "echo", r#"{"text":"second"}"#),
    ];

    let appended = orchestrator.run("conv-1", &calls, &store).await.unwrap();

    assert_eq!(appended.len(), 3);
    assert_eq!(appended[1].content.flatten(), "echo: first");
    assert_eq!(appended[1].tool_call_id, "c1");
    assert_eq!(appended[2].content.flatten(), "echo: second");
    assert_eq!(appended[2].tool_call_id, "c2");
}

#[tokio::test]
async fn one_failing_tool_does_not_abort_the_others() {
    let orchestrator = orchestrator();
    let store = HistoryStore::new();
    let calls = vec![
        call("c1", "boom", "{}"),
        call("c2", "echo", r#"{"text":"still here"}"#),
    ];

    let appended = orchestrator.run("conv-1", &calls, &store).await.unwrap();

    let failed = &appended[1];
    assert_eq!(failed.role, Role::Tool);
    assert_eq!(failed.status, "error");
    assert!(failed.content.flatten().contains("exploded"));

    let succeeded = &appended[2];
    assert_eq!(succeeded.status, "success");
    assert_eq!(succeeded.content.flatten(), "echo: still here");
}

#[tokio::test]
async fn unknown_function_becomes_an_error_message() {
    let orchestrator = orchestrator();
    let store = HistoryStore::new();
    let calls = vec![call("c1", "no-such-tool", "{}")];

    let appended = orchestrator.run("conv-1", &calls, &store).await.unwrap();

    assert_eq!(appended[1].status, "error");
    assert!(appended[1].content.flatten().contains("not available"));
    assert_eq!(appended[1].name, "no-such-tool");
}

#[tokio::test]
async fn malformed_arguments_become_an_error_message() {
    let orchestrator = orchestrator();
    let store = HistoryStore::new();
    let calls = vec![call("c1", "echo", "{not json")];

    let appended = orchestrator.run("conv-1", &calls, &store).await.unwrap();
    assert_eq!(appended[1].status, "error");
}

#[tokio::test]
async fn double_encoded_arguments_are_tolerated() {
    let orchestrator = orchestrator();
    let store = HistoryStore::new();
    let calls = vec![call("c1", "echo", "\"{\\\"text\\\":\\\"hi\\\"}\"")];

    let appended = orchestrator.run("conv-1", &calls, &store).await.unwrap();
    assert_eq!(appended[1].status, "success");
    assert_eq!(appended[1].content.flatten(), "echo: hi");
}

#[tokio::test]
async fn everything_is_persisted_to_the_store() {
    let orchestrator = orchestrator();
    let store = HistoryStore::new();
    let calls = vec![call("c1", "echo", r#"{"text":"hi"}"#)];

    orchestrator.run("conv-1", &calls, &store).await.unwrap();

    let messages = store.get("conv-1").await;
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].name, "External Functions");
    assert_eq!(messages[1].role, Role::Tool);
}

#[test]
fn schemas_lists_registered_tools() {
    let orchestrator = orchestrator();
    let names: Vec<_> = orchestrator
        .schemas()
        .iter()
        .map(|t| t.name.clone())
        .collect();
    assert_eq!(names, vec!["boom", "echo"]);
    assert!(orchestrator.contains("echo"));
    assert!(!orchestrator.contains("missing"));
}
