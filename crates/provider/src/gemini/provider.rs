//! Model trait implementation for the Gemini provider.
//!
//! Gemini sends complete `functionCall` objects (no argument
//! fragments), so every tool call in a stream becomes an immediate
//! start/delta/stop triple. The stream has no `[DONE]` sentinel; end of
//! SSE data is the end of the message.

use super::{Gemini, Request};
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

/// Raw Gemini response (shared by sync and stream chunks).
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    usage_metadata: Option<UsageMetadata>,
    #[serde(default)]
    response_id: Option<CompactString>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
    #[serde(default)]
    finish_reason: Option<CompactString>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Part {
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    function_call: Option<RawFunctionCall>,
}

#[derive(Debug, Deserialize)]
struct RawFunctionCall {
    name: CompactString,
    #[serde(default)]
    args: Value,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    #[serde(default)]
    prompt_token_count: u32,
    #[serde(default)]
    candidates_token_count: u32,
}

impl Model for Gemini {
    async fn send(&self, request: &ocore::Request) -> Result<Completion> {
        let body = Request::from(request);
        let url = self.generate_url(&request.model);
        let started = Instant::now();
        let text = match self.transport.post_url(&url, &body).await {
            Ok(text) => text,
            Err(e) => {
                record_dispatch("gemini", &request.model, started, None, false);
                return Err(e);
            }
        };

        let raw: RawResponse = serde_json::from_str(&text)
            .map_err(|e| ocore::Error::provider(None, format!("malformed response: {e}")))?;
        let response = to_response(raw, &request.model);
        record_dispatch(
            "gemini",
            &request.model,
            started,
            response.usage.as_ref(),
            true,
        );
        Ok(Completion::Message(response))
    }

    fn stream(&self, request: ocore::Request) -> impl Stream<Item = Result<StreamEvent>> + Send {
        let body = Request::from(&request);
        let url = self.stream_url(&request.model);
        let transport = self.transport.clone();
        let model = request.model.clone();

        try_stream! {
            let started = Instant::now();
            let mut usage = None;
            let mut calls = 0u32;
            let inner = transport.stream_sse_url(url, &body);
            futures_util::pin_mut!(inner);

            while let Some(next) = inner.next().await {
                if next.is_err() {
                    record_dispatch("gemini", &model, started, None, false);
                }
                let data = next?;
                let chunk = match serde_json::from_str::<RawResponse>(&data) {
                    Ok(chunk) => chunk,
                    Err(e) => {
                        tracing::warn!("failed to parse gemini chunk: {e}, data: {data}");
                        continue;
                    }
                };

                if let Some(meta) = &chunk.usage_metadata {
                    usage = Some(Usage::new(
                        meta.prompt_token_count,
                        meta.candidates_token_count,
                    ));
                }
                if let Some(id) = &chunk.response_id {
                    yield StreamEvent::MessageDelta {
                        usage: None,
                        log_id: Some(id.clone()),
                    };
                }

                for candidate in chunk.candidates {
                    let Some(content) = candidate.content else {
                        continue;
                    };
                    for part in content.parts {
                        if let Some(text) = part.text
                            && !text.is_empty()
                        {
                            yield StreamEvent::ContentBlockDelta { content: text };
                        }
                        if let Some(call) = part.function_call {
                            calls += 1;
                            let tool_id = CompactString::from(format!("call_{calls}"));
                            yield StreamEvent::ToolUseStart {
                                tool_id: tool_id.clone(),
                                tool_name: call.name,
                            };
                            yield StreamEvent::ToolUseDelta {
                                tool_id: tool_id.clone(),
                                parameters: args_object(call.args),
                            };
                            yield StreamEvent::ToolUseStop { tool_id };
                        }
                    }
                }
            }

            if let Some(usage) = usage.clone() {
                yield StreamEvent::MessageDelta {
                    usage: Some(usage),
                    log_id: None,
                };
            }
            record_dispatch("gemini", &model, started, usage.as_ref(), true);
            yield StreamEvent::Done;
        }
    }
}

/// Convert a Gemini response to the normalized format.
fn to_response(raw: RawResponse, model: &str) -> Response {
    let usage = raw
        .usage_metadata
        .map(|m| Usage::new(m.prompt_token_count, m.candidates_token_count));

    let mut content = String::new();
    let mut tool_calls = Vec::new();
    let mut finish_reason = None;

    if let Some(candidate) = raw.candidates.into_iter().next() {
        finish_reason = candidate.finish_reason.as_deref().map(|r| match r {
            "MAX_TOKENS" => FinishReason::Length,
            "SAFETY" | "PROHIBITED_CONTENT" => FinishReason::ContentFilter,
            _ => FinishReason::Stop,
        });
        for part in candidate.content.map(|c| c.parts).unwrap_or_default() {
            if let Some(text) = part.text {
                content.push_str(&text);
            }
            if let Some(call) = part.function_call {
                tool_calls.push(ToolCall {
                    id: format!("call_{}", tool_calls.len() + 1).into(),
                    index: tool_calls.len() as u32,
                    call_type: "function".into(),
                    function: FunctionCall {
                        name: call.name,
                        arguments: serde_json::to_string(&call.args).unwrap_or_default(),
                    },
                });
            }
        }
    }

    if !tool_calls.is_empty() {
        finish_reason = Some(FinishReason::ToolCalls);
    }

    Response {
        meta: CompletionMeta {
            id: raw.response_id.unwrap_or_default(),
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

/// Coerce function-call args into an object.
fn args_object(args: Value) -> Map<String, Value> {
    match args {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}
