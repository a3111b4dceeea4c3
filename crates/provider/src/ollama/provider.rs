//! Model trait implementation for the Ollama provider.

use super::{Ollama, Request};
use crate::metrics::record_dispatch;
use anyhow::Result;
use async_stream::try_stream;
use compact_str::CompactString;
use futures_core::Stream;
use futures_util::StreamExt;
use ocore::{
    Choice, Completion, CompletionMeta, Delta, FinishReason, FunctionCall, Model, Response, Role,
    StreamEvent, ToolCall, Usage,
};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::time::Instant;

/// Raw Ollama response (shared by sync replies and NDJSON lines).
#[derive(Debug, Deserialize)]
struct RawResponse {
    #[serde(default)]
    message: Option<RawMessage>,
    #[serde(default)]
    done: bool,
    #[serde(default)]
    done_reason: Option<CompactString>,
    #[serde(default)]
    prompt_eval_count: Option<u32>,
    #[serde(default)]
    eval_count: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct RawMessage {
    #[serde(default)]
    content: String,
    #[serde(default)]
    tool_calls: Vec<RawToolCall>,
}

#[derive(Debug, Deserialize)]
struct RawToolCall {
    function: RawFunction,
}

#[derive(Debug, Deserialize)]
struct RawFunction {
    name: CompactString,
    #[serde(default)]
    arguments: Value,
}

impl Model for Ollama {
    async fn send(&self, request: &ocore::Request) -> Result<Completion> {
        let body = Request::from(request);
        let started = Instant::now();
        let text = match self.transport.post(&body).await {
            Ok(text) => text,
            Err(e) => {
                record_dispatch("ollama", &request.model, started, None, false);
                return Err(e);
            }
        };

        let raw: RawResponse = serde_json::from_str(&text)
            .map_err(|e| ocore::Error::provider(None, format!("malformed response: {e}")))?;
        let response = to_response(raw, &request.model);
        record_dispatch(
            "ollama",
            &request.model,
            started,
            response.usage.as_ref(),
            true,
        );
        Ok(Completion::Message(response))
    }

    fn stream(&self, request: ocore::Request) -> impl Stream<Item = Result<StreamEvent>> + Send {
        let body = Request::from(&request).stream();
        let transport = self.transport.clone();
        let model = request.model.clone();

        try_stream! {
            let started = Instant::now();
            let mut usage = None;
            let mut calls = 0u32;
            let inner = transport.stream_lines(&body);
            futures_util::pin_mut!(inner);

            while let Some(next) = inner.next().await {
                if next.is_err() {
                    record_dispatch("ollama", &model, started, None, false);
                }
                let line = next?;
                let chunk = match serde_json::from_str::<RawResponse>(&line) {
                    Ok(chunk) => chunk,
                    Err(e) => {
                        tracing::warn!("failed to parse ollama line: {e}, data: {line}");
                        continue;
                    }
                };

                if let Some(message) = &chunk.message {
                    if !message.content.is_empty() {
                        yield StreamEvent::ContentBlockDelta {
                            content: message.content.clone(),
                        };
                    }
                    for call in &message.tool_calls {
                        calls += 1;
                        let tool_id = CompactString::from(format!("call_{calls}"));
                        yield StreamEvent::ToolUseStart {
                            tool_id: tool_id.clone(),
                            tool_name: call.function.name.clone(),
                        };
                        yield StreamEvent::ToolUseDelta {
                            tool_id: tool_id.clone(),
                            parameters: args_object(call.function.arguments.clone()),
                        };
                        yield StreamEvent::ToolUseStop { tool_id };
                    }
                }

                if chunk.done {
                    usage = Some(Usage::new(
                        chunk.prompt_eval_count.unwrap_or(0),
                        chunk.eval_count.unwrap_or(0),
                    ));
                    yield StreamEvent::MessageDelta {
                        usage: usage.clone(),
                        log_id: None,
                    };
                    break;
                }
            }

            record_dispatch("ollama", &model, started, usage.as_ref(), true);
            yield StreamEvent::Done;
        }
    }
}

/// Convert an Ollama response to the normalized format.
fn to_response(raw: RawResponse, model: &str) -> Response {
    let usage = Some(Usage::new(
        raw.prompt_eval_count.unwrap_or(0),
        raw.eval_count.unwrap_or(0),
    ));

    let (content, tool_calls) = match raw.message {
        Some(message) => {
            let calls = message
                .tool_calls
                .into_iter()
                .enumerate()
                .map(|(index, call)| ToolCall {
                    id: format!("call_{}", index + 1).into(),
                    index: index as u32,
                    call_type: "function".into(),
                    function: FunctionCall {
                        name: call.function.name,
                        arguments: serde_json::to_string(&call.function.arguments)
                            .unwrap_or_default(),
                    },
                })
                .collect::<Vec<_>>();
            (message.content, calls)
        }
        None => (String::new(), Vec::new()),
    };

    let finish_reason = if !tool_calls.is_empty() {
        Some(FinishReason::ToolCalls)
    } else {
        raw.done_reason.as_deref().map(|r| match r {
            "length" => FinishReason::Length,
            _ => FinishReason::Stop,
        })
    };

    Response {
        meta: CompletionMeta {
            id: CompactString::default(),
            object: "chat.completion".into(),
            created: 0,
            model: model.into(),
        },
        choices: vec![Choice {
            index: 0,
            message: Delta {
                role: Some(Role::Assistant),
                content: Some(content),
                reasoning_content: None,
                tool_calls: if tool_calls.is_empty() {
                    None
                } else {
                    Some(tool_calls)
                },
                citations: None,
            },
            finish_reason,
        }],
        usage,
    }
}

/// Coerce tool arguments into an object.
fn args_object(args: Value) -> Map<String, Value> {
    match args {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}
