//! Normalized chat completion response.
//!
//! The response shape is OpenAI-style on the outside (`choices`,
//! `usage`, `finish_reason`) regardless of which vendor produced it —
//! adapters do the shape-specific parsing and construct this type.

use crate::message::{Message, Role};
use crate::tool::ToolCall;
use compact_str::CompactString;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Common metadata shared between streaming and non-streaming completions.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct CompletionMeta {
    /// A unique identifier for the chat completion.
    pub id: CompactString,

    /// The object type.
    pub object: CompactString,

    /// Unix timestamp (in seconds) of when the response was created.
    pub created: u64,

    /// The model used for the completion.
    pub model: CompactString,
}

/// A chat completion response.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Response {
    /// Completion metadata.
    #[serde(flatten)]
    pub meta: CompletionMeta,

    /// The list of completion choices.
    pub choices: Vec<Choice>,

    /// Token usage statistics.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
}

impl Response {
    /// Build a single-choice assistant response.
    pub fn assistant(
        model: impl Into<CompactString>,
        delta: Delta,
        finish_reason: FinishReason,
        usage: Option<Usage>,
    ) -> Self {
        Self {
            meta: CompletionMeta {
                id: CompactString::from(format!("chatcmpl-{}", ulid::Ulid::new())),
                object: "chat.completion".into(),
                created: chrono::Utc::now().timestamp() as u64,
                model: model.into(),
            },
            choices: vec![Choice {
                index: 0,
                message: delta,
                finish_reason: Some(finish_reason),
            }],
            usage,
        }
    }

    /// Build a content-filter response carrying the violation notice.
    pub fn content_filter(model: impl Into<CompactString>, notice: impl Into<String>) -> Self {
        Self::assistant(
            model,
            Delta {
                role: Some(Role::Assistant),
                content: Some(notice.into()),
                ..Default::default()
            },
            FinishReason::ContentFilter,
            None,
        )
    }

    /// Convert the first choice into a transcript message.
    pub fn message(&self) -> Option<Message> {
        let choice = self.choices.first()?;
        let mut message = Message::assistant(choice.message.content.clone().unwrap_or_default());
        if let Some(calls) = &choice.message.tool_calls {
            message.tool_calls = calls.clone();
        }
        message.citations = choice.message.citations.clone().unwrap_or_default();
        message.model = self.meta.model.clone();
        message.usage = self.usage.clone();
        Some(message)
    }

    /// Get the content of the first choice.
    pub fn content(&self) -> Option<&String> {
        self.choices
            .first()
            .and_then(|choice| choice.message.content.as_ref())
    }

    /// Get the tool calls of the first choice.
    pub fn tool_calls(&self) -> Option<&[ToolCall]> {
        self.choices
            .first()
            .and_then(|choice| choice.message.tool_calls.as_deref())
    }

    /// Get the reason the model stopped generating.
    pub fn reason(&self) -> Option<&FinishReason> {
        self.choices
            .first()
            .and_then(|choice| choice.finish_reason.as_ref())
    }
}

/// A completion choice.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Choice {
    /// The index of this choice in the list.
    pub index: u32,

    /// The generated message.
    pub message: Delta,

    /// The reason the model stopped generating.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<FinishReason>,
}

/// Message content in a completion response.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Delta {
    /// The role of the message author.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,

    /// The content of the message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,

    /// Reasoning content (reasoning-capable models).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning_content: Option<String>,

    /// Tool calls made by the model.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCall>>,

    /// Source citations.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub citations: Option<Vec<Value>>,
}

/// The reason the model stopped generating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    /// The model finished naturally.
    Stop,

    /// The model hit the max token limit.
    Length,

    /// A guardrail rejected the input or the output.
    ContentFilter,

    /// The model is making tool calls.
    ToolCalls,
}

/// Token usage statistics.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Usage {
    /// Number of tokens in the prompt.
    pub prompt_tokens: u32,

    /// Number of tokens in the completion.
    pub completion_tokens: u32,

    /// Total number of tokens used.
    pub total_tokens: u32,
}

impl Usage {
    /// Build usage from prompt/completion counts.
    pub fn new(prompt_tokens: u32, completion_tokens: u32) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens + completion_tokens,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assistant_response_has_openai_shape() {
        let response = Response::assistant(
            "gpt-4o",
            Delta {
                role: Some(Role::Assistant),
                content: Some("hi".into()),
                ..Default::default()
            },
            FinishReason::Stop,
            Some(Usage::new(10, 2)),
        );
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["object"], "chat.completion");
        assert_eq!(json["choices"][0]["finish_reason"], "stop");
        assert_eq!(json["usage"]["total_tokens"], 12);
        assert!(json["id"].as_str().unwrap().starts_with("chatcmpl-"));
    }

    #[test]
    fn content_filter_sets_finish_reason() {
        let response = Response::content_filter("gpt-4o", "blocked");
        assert_eq!(response.reason(), Some(&FinishReason::ContentFilter));
    }

    #[test]
    fn message_carries_tool_calls() {
        let response = Response::assistant(
            "m",
            Delta {
                tool_calls: Some(vec![crate::tool::ToolCall::default()]),
                ..Default::default()
            },
            FinishReason::ToolCalls,
            None,
        );
        let message = response.message().unwrap();
        assert_eq!(message.tool_calls.len(), 1);
        assert!(message.content.is_empty());
    }
}
