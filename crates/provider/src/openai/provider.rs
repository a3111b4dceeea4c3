//! Model trait implementation for the OpenAI-compatible provider.

use super::{OpenAi, Request, stream::{Chunk, Translator}};
use crate::metrics::record_dispatch;
use anyhow::Result;
use async_stream::try_stream;
use compact_str::CompactString;
use futures_core::Stream;
use futures_util::StreamExt;
use ocore::{
    Choice, Completion, CompletionMeta, Delta, FinishReason, Model, Response, Role, StreamEvent,
    ToolCall, Usage,
};
use serde::Deserialize;
use std::time::Instant;

/// Raw non-streaming response.
#[derive(Debug, Deserialize)]
struct RawResponse {
    #[serde(default)]
    id: CompactString,
    #[serde(default)]
    created: u64,
    #[serde(default)]
    model: CompactString,
    choices: Vec<RawChoice>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct RawChoice {
    message: RawMessage,
    #[serde(default)]
    finish_reason: Option<CompactString>,
}

#[derive(Debug, Deserialize)]
struct RawMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    reasoning_content: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<ToolCall>>,
}

impl Model for OpenAi {
    async fn send(&self, request: &ocore::Request) -> Result<Completion> {
        let body = Request::from(request);
        let started = Instant::now();
        let result = self.transport.post(&body).await;
        let text = match result {
            Ok(text) => text,
            Err(e) => {
                record_dispatch("openai", &request.model, started, None, false);
                return Err(e);
            }
        };

        let raw: RawResponse = serde_json::from_str(&text)
            .map_err(|e| ocore::Error::provider(None, format!("malformed response: {e}")))?;
        let response = to_response(raw);
        record_dispatch(
            "openai",
            &request.model,
            started,
            response.usage.as_ref(),
            true,
        );
        Ok(Completion::Message(response))
    }

    fn stream(&self, request: ocore::Request) -> impl Stream<Item = Result<StreamEvent>> + Send {
        let body = Request::from(&request).stream(request.usage);
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
                    record_dispatch("openai", &model, started, None, false);
                }
                let data = next?;
                if data == "[DONE]" {
                    break;
                }
                let chunk = match serde_json::from_str::<Chunk>(&data) {
                    Ok(chunk) => chunk,
                    Err(e) => {
                        tracing::warn!("failed to parse chunk: {e}, data: {data}");
                        continue;
                    }
                };
                if let Some(u) = &chunk.usage {
                    usage = Some(u.clone());
                }
                for event in translator.translate(chunk) {
                    yield event;
                }
            }

            record_dispatch("openai", &model, started, usage.as_ref(), true);
            yield StreamEvent::Done;
        }
    }
}

/// Convert a raw response to the normalized format.
fn to_response(raw: RawResponse) -> Response {
    let choices = raw
        .choices
        .into_iter()
        .enumerate()
        .map(|(index, choice)| {
            let finish_reason = choice.finish_reason.as_deref().map(|r| match r {
                "length" => FinishReason::Length,
                "content_filter" => FinishReason::ContentFilter,
                "tool_calls" => FinishReason::ToolCalls,
                _ => FinishReason::Stop,
            });
            Choice {
                index: index as u32,
                message: Delta {
                    role: Some(Role::Assistant),
                    content: choice.message.content,
                    reasoning_content: choice.message.reasoning_content,
                    tool_calls: choice.message.tool_calls,
                    citations: None,
                },
                finish_reason,
            }
        })
        .collect();

    Response {
        meta: CompletionMeta {
            id: raw.id,
            object: "chat.completion".into(),
            created: raw.created,
            model: raw.model,
        },
        choices,
        usage: raw.usage,
    }
}
