//! End-to-end tests for the orchestration engine.

use anyhow::Result;
use futures_util::StreamExt;
use ocore::{
    Capability, Catalog, Completion, FinishReason, FunctionCall, JobTicket, Registry, Role,
    StreamEvent, Tool, ToolCall,
};
use runtime::testing::ScriptedModel;
use runtime::{
    ChatRequest, Direction, Engine, Guardrail, IncomingMessage, ToolOutput, Verdict,
    WebhookPayload, reconcile,
};
use tokio_util::sync::CancellationToken;

/// Rejects any text containing "forbidden".
#[derive(Clone, Copy)]
struct KeywordGuard;

impl Guardrail for KeywordGuard {
    async fn validate(&self, text: &str, _direction: Direction) -> Result<Verdict> {
        if text.contains("forbidden") {
            Ok(Verdict::reject(vec!["blocked keyword".into()]))
        } else {
            Ok(Verdict::pass())
        }
    }
}

fn catalog() -> Catalog {
    Catalog::new(
        vec![Capability {
            id: "scripted-chat".into(),
            provider: "scripted".into(),
            strengths: vec!["general".into()],
            context_complexity: 3,
            cost_per_1k_input: 0.001,
            cost_per_1k_output: 0.002,
            speed: 2,
            reliability: 0.95,
            multimodal: false,
            supports_functions: true,
        }],
        "scripted-chat",
    )
    .unwrap()
}

fn engine(model: &ScriptedModel) -> Engine<ScriptedModel, KeywordGuard, runtime::NoAugment> {
    let registry = Registry::new("scripted", model.clone());
    Engine::new(registry, catalog(), "analysis-model", KeywordGuard)
}

fn request(text: &str) -> ChatRequest {
    ChatRequest {
        model: Some("scripted-chat".into()),
        messages: vec![IncomingMessage {
            role: Role::User,
            content: text.into(),
            name: None,
            tool_call_id: None,
        }],
        temperature: None,
        top_p: None,
        top_k: None,
        max_tokens: None,
        frequency_penalty: None,
        presence_penalty: None,
        stream: false,
        tools: None,
        chat_id: Some("conv-1".into()),
        use_rag: false,
        rag_options: None,
        budget_constraint: None,
    }
}

#[tokio::test]
async fn happy_path_returns_content_and_persists() {
    let model = ScriptedModel::new();
    model.push_text("hello there");
    let engine = engine(&model);

    let response = engine
        .turn(request("hi"), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(response.content().unwrap(), "hello there");
    assert_eq!(response.reason(), Some(&FinishReason::Stop));

    let messages = engine.store().get("conv-1").await;
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].role, Role::User);
    assert_eq!(messages[1].role, Role::Assistant);
    assert_eq!(messages[1].model, "scripted-chat");
}

#[tokio::test]
async fn rejected_input_never_reaches_a_provider() {
    let model = ScriptedModel::new();
    let engine = engine(&model);

    let response = engine
        .turn(request("something forbidden"), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(response.reason(), Some(&FinishReason::ContentFilter));
    assert_eq!(model.calls(), 0);
    // Nothing was persisted either.
    assert_eq!(engine.store().len("conv-1").await, 0);
}

#[tokio::test]
async fn rejected_output_is_not_persisted() {
    let model = ScriptedModel::new();
    model.push_text("here is something forbidden");
    let engine = engine(&model);

    let response = engine
        .turn(request("hi"), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(response.reason(), Some(&FinishReason::ContentFilter));
    let messages = engine.store().get("conv-1").await;
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].role, Role::User);
}

#[tokio::test]
async fn empty_messages_is_a_params_error() {
    let model = ScriptedModel::new();
    let engine = engine(&model);

    let mut bad = request("hi");
    bad.messages.clear();
    let err = engine
        .turn(bad, &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<ocore::Error>(),
        Some(ocore::Error::Params(_))
    ));
}

#[tokio::test]
async fn server_side_tools_run_one_reentrant_round() {
    let model = ScriptedModel::new();
    model.push_tool_calls(vec![ToolCall {
        id: "c1".into(),
        index: 0,
        call_type: "function".into(),
        function: FunctionCall {
            name: "lookup".into(),
            arguments: r#"{"q":"rust"}"#.into(),
        },
    }]);
    model.push_text("rust is a systems language");

    let mut engine = engine(&model);
    engine.orchestrator_mut().register(
        Tool {
            name: "lookup".into(),
            description: "Look something up".into(),
            parameters: schemars::schema_for!(String),
            strict: false,
        },
        |_conversation, args| async move {
            Ok(ToolOutput::text(format!(
                "result for {}",
                args["q"].as_str().unwrap_or("")
            )))
        },
    );

    let response = engine
        .turn(request("what is rust?"), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(response.content().unwrap(), "rust is a systems language");
    assert_eq!(model.calls(), 2);

    let messages = engine.store().get("conv-1").await;
    let roles: Vec<_> = messages.iter().map(|m| m.role).collect();
    assert_eq!(
        roles,
        vec![Role::User, Role::Assistant, Role::Tool, Role::Assistant]
    );
    assert_eq!(messages[1].name, "External Functions");
    assert_eq!(messages[2].content.flatten(), "result for rust");
}

#[tokio::test]
async fn caller_tools_are_handed_back_unexecuted() {
    let model = ScriptedModel::new();
    model.push_tool_calls(vec![ToolCall {
        id: "c1".into(),
        index: 0,
        call_type: "function".into(),
        function: FunctionCall {
            name: "client_side_fn".into(),
            arguments: "{}".into(),
        },
    }]);
    let engine = engine(&model);

    let mut req = request("call my tool");
    req.tools = Some(vec![runtime::ToolSpec {
        kind: "function".into(),
        function: runtime::FunctionSpec {
            name: "client_side_fn".into(),
            description: "runs on the client".into(),
            parameters: schemars::schema_for!(String),
        },
    }]);

    let response = engine.turn(req, &CancellationToken::new()).await.unwrap();

    assert_eq!(response.reason(), Some(&FinishReason::ToolCalls));
    assert_eq!(response.tool_calls().unwrap().len(), 1);
    // One model call, no re-entrant round.
    assert_eq!(model.calls(), 1);
}

#[tokio::test]
async fn async_submission_stores_the_pending_entry() {
    let model = ScriptedModel::new();
    model.push_completion(Completion::Submitted(JobTicket {
        id: "job-9".into(),
        provider: "replicate".into(),
        status: "starting".into(),
    }));
    let engine = engine(&model);

    let response = engine
        .turn(request("make me a song"), &CancellationToken::new())
        .await
        .unwrap();
    assert!(response.content().unwrap().contains("job-9"));

    let messages = engine.store().get("conv-1").await;
    let pending = &messages[1];
    assert_eq!(pending.status, "submitted");
    assert_eq!(pending.data.as_ref().unwrap()["id"], "job-9");

    // The webhook path finds and completes the very entry the turn
    // stored.
    reconcile(
        engine.store(),
        "conv-1",
        &WebhookPayload {
            id: "job-9".into(),
            status: Some("succeeded".into()),
            output: Some(serde_json::json!("done")),
            error: None,
            logs: None,
        },
    )
    .await
    .unwrap();
    assert_eq!(engine.store().get("conv-1").await[1].status, "succeeded");
}

#[tokio::test]
async fn stream_turn_yields_events_and_persists() {
    let model = ScriptedModel::new();
    model.push_stream(vec![
        StreamEvent::ContentBlockDelta {
            content: "Hel".into(),
        },
        StreamEvent::ContentBlockDelta {
            content: "lo".into(),
        },
        StreamEvent::Done,
    ]);
    let engine = engine(&model);

    let mut req = request("hi");
    req.stream = true;
    let events: Vec<_> = engine
        .turn_stream(req, CancellationToken::new())
        .collect()
        .await;

    let events: Vec<_> = events.into_iter().map(|e| e.unwrap()).collect();
    let text: String = events
        .iter()
        .filter_map(|e| match e {
            StreamEvent::ContentBlockDelta { content } => Some(content.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(text, "Hello");
    assert!(matches!(events.last(), Some(StreamEvent::Done)));

    let messages = engine.store().get("conv-1").await;
    assert_eq!(messages[1].content.flatten(), "Hello");
}

#[tokio::test]
async fn cancelled_stream_commits_no_assistant_content() {
    let model = ScriptedModel::new();
    model.push_stream(vec![
        StreamEvent::ContentBlockDelta {
            content: "partial".into(),
        },
        StreamEvent::Done,
    ]);
    let engine = engine(&model);

    let cancel = CancellationToken::new();
    cancel.cancel();

    let mut req = request("hi");
    req.stream = true;
    let events: Vec<_> = engine.turn_stream(req, cancel).collect().await;
    assert!(events.iter().any(|e| e.is_err()));

    // The user turn may be recorded, but no assistant message is.
    let messages = engine.store().get("conv-1").await;
    assert!(messages.iter().all(|m| m.role != Role::Assistant));
}
