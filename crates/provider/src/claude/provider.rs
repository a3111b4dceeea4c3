//! Model trait implementation for the Claude (Anthropic) provider.

use super::{Claude, Request, stream::{Event, Translator}};
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
use std::time::Instant;

/// Raw Anthropic non-streaming response.
#[derive(Debug, Deserialize)]
struct RawResponse {
    id: CompactString,
    model: CompactString,
    content: Vec<ContentBlock>,
    #[serde(default)]
    stop_reason: Option<CompactString>,
    usage: RawUsage,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum ContentBlock {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(rename = "tool_use")]
    ToolUse {
        id: CompactString,
        name: CompactString,
        input: serde_json::Value,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
struct RawUsage {
    input_tokens: u32,
    output_tokens: u32,
}

impl Model for Claude {
    async fn send(&self, request: &ocore::Request) -> Result<Completion> {
        let body = Request::from(request);
        let started = Instant::now();
        let text = match self.transport.post(&body).await {
            Ok(text) => text,
            Err(e) => {
                record_dispatch("claude", &request.model, started, None, false);
                return Err(e);
            }
        };

        let raw: RawResponse = serde_json::from_str(&text)
            .map_err(|e| ocore::Error::provider(None, format!("malformed response: {e}")))?;
        let response = to_response(raw);
        record_dispatch(
            "claude",
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
            let mut translator = Translator::new();
            let mut usage = None;
            let inner = transport.stream_sse(&body);
            futures_util::pin_mut!(inner);

            while let Some(next) = inner.next().await {
                if next.is_err() {
                    record_dispatch("claude", &model, started, None, false);
                }
                let data = next?;
                if data == "[DONE]" {
                    break;
                }
                let event = match serde_json::from_str::<Event>(&data) {
                    Ok(event) => event,
                    Err(e) => {
                        tracing::warn!("failed to parse anthropic event: {e}, data: {data}");
                        continue;
                    }
                };
                for event in translator.translate(event) {
                    if let StreamEvent::MessageDelta { usage: Some(u), .. } = &event {
                        usage = Some(u.clone());
                    }
                    if matches!(event, StreamEvent::Done) {
                        record_dispatch("claude", &model, started, usage.as_ref(), true);
                    }
                    yield event;
                }
            }
        }
    }
}

/// Convert an Anthropic response to the normalized format.
fn to_response(raw: RawResponse) -> Response {
    let mut content = String::new();
    let mut tool_calls = Vec::new();

    for block in raw.content {
        match block {
            ContentBlock::Text { text } => {
                if !content.is_empty() {
                    content.push('\n');
                }
                content.push_str(&text);
            }
            ContentBlock::ToolUse { id, name, input } => {
                tool_calls.push(ToolCall {
                    id,
                    index: tool_calls.len() as u32,
                    call_type: "function".into(),
                    function: FunctionCall {
                        name,
                        arguments: serde_json::to_string(&input).unwrap_or_default(),
                    },
                });
            }
            ContentBlock::Other => {}
        }
    }

    let finish_reason = raw.stop_reason.as_deref().map(|r| match r {
        "max_tokens" => FinishReason::Length,
        "tool_use" => FinishReason::ToolCalls,
        _ => FinishReason::Stop,
    });

    Response {
        meta: CompletionMeta {
            id: raw.id,
            object: "chat.completion".into(),
            created: unix_now(),
            model: raw.model,
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
        usage: Some(Usage::new(raw.usage.input_tokens, raw.usage.output_tokens)),
    }
}

fn unix_now() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
