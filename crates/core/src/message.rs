//! Conversation messages and content parts.

use crate::tool::ToolCall;
use crate::response::Usage;
use chrono::{DateTime, Utc};
use compact_str::CompactString;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A message in a conversation transcript.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Message {
    /// Message id. Assigned by the history store when empty.
    #[serde(default, skip_serializing_if = "CompactString::is_empty")]
    pub id: CompactString,

    /// The role of the message author.
    pub role: Role,

    /// The content of the message.
    #[serde(default, skip_serializing_if = "Content::is_empty")]
    pub content: Content,

    /// Function name for tool messages, display name otherwise.
    ///
    /// Invariant: tool-role messages always carry a non-empty name.
    #[serde(default, skip_serializing_if = "CompactString::is_empty")]
    pub name: CompactString,

    /// The id of the tool call this message responds to (tool role only).
    #[serde(default, skip_serializing_if = "CompactString::is_empty")]
    pub tool_call_id: CompactString,

    /// Tool calls requested by the assistant.
    ///
    /// An assistant message carrying tool calls has empty content until
    /// the results come back.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,

    /// Model reasoning attached to the message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<Reasoning>,

    /// Source citations attached by the provider.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub citations: Vec<Value>,

    /// Token usage for the turn that produced this message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,

    /// The model that produced this message.
    #[serde(default, skip_serializing_if = "CompactString::is_empty")]
    pub model: CompactString,

    /// Creation timestamp. Assigned by the history store when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,

    /// Provider-side log id for feedback correlation.
    #[serde(default, skip_serializing_if = "CompactString::is_empty")]
    pub log_id: CompactString,

    /// Lifecycle status ("submitted", "succeeded", "error", ...).
    #[serde(default, skip_serializing_if = "CompactString::is_empty")]
    pub status: CompactString,

    /// Structured payload (tool output data, async job records).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl Message {
    /// Create a new system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: Content::Text(content.into()),
            ..Default::default()
        }
    }

    /// Create a new user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: Content::Text(content.into()),
            ..Default::default()
        }
    }

    /// Create a new assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: Content::Text(content.into()),
            ..Default::default()
        }
    }

    /// Create a new tool message responding to the given call.
    pub fn tool(
        content: impl Into<String>,
        name: impl Into<CompactString>,
        call: impl Into<CompactString>,
    ) -> Self {
        Self {
            role: Role::Tool,
            content: Content::Text(content.into()),
            name: name.into(),
            tool_call_id: call.into(),
            ..Default::default()
        }
    }

    /// Estimate the number of tokens in this message.
    ///
    /// Uses a simple heuristic: ~4 characters per token.
    pub fn estimate_tokens(&self) -> usize {
        let chars = self.content.flatten().len()
            + self
                .tool_calls
                .iter()
                .map(|tc| tc.function.name.len() + tc.function.arguments.len())
                .sum::<usize>();
        (chars / 4).max(1)
    }
}

/// Estimate total tokens across a slice of messages.
pub fn estimate_tokens(messages: &[Message]) -> usize {
    messages.iter().map(|m| m.estimate_tokens()).sum()
}

/// Message content: a plain string or a list of typed parts.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(untagged)]
pub enum Content {
    /// Plain text content.
    Text(String),
    /// Multi-part content (text, images, audio).
    Parts(Vec<ContentPart>),
}

impl Content {
    /// Whether the content is empty.
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Text(text) => text.is_empty(),
            Self::Parts(parts) => parts.is_empty(),
        }
    }

    /// Flatten the content to plain text, joining text parts with newlines.
    /// Non-text parts contribute their URL.
    pub fn flatten(&self) -> String {
        match self {
            Self::Text(text) => text.clone(),
            Self::Parts(parts) => parts
                .iter()
                .map(|part| match part {
                    ContentPart::Text { text } => text.as_str(),
                    ContentPart::ImageUrl { url, .. } => url.as_str(),
                    ContentPart::AudioUrl { url } => url.as_str(),
                })
                .collect::<Vec<_>>()
                .join("\n"),
        }
    }

    /// Whether the content carries any image part.
    pub fn has_images(&self) -> bool {
        matches!(self, Self::Parts(parts)
            if parts.iter().any(|p| matches!(p, ContentPart::ImageUrl { .. })))
    }
}

impl Default for Content {
    fn default() -> Self {
        Self::Text(String::new())
    }
}

impl From<String> for Content {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<&str> for Content {
    fn from(text: &str) -> Self {
        Self::Text(text.to_owned())
    }
}

/// A single typed content part.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    /// A text fragment.
    Text {
        /// The text.
        text: String,
    },
    /// An image reference.
    ImageUrl {
        /// The image URL (https or data URL).
        url: String,
        /// Vendor detail hint ("low", "high", "auto").
        #[serde(default, skip_serializing_if = "Option::is_none")]
        detail: Option<CompactString>,
    },
    /// An audio reference.
    AudioUrl {
        /// The audio URL.
        url: String,
    },
}

/// Reasoning/analysis content attached to an assistant message.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Reasoning {
    /// The reasoning text.
    pub content: String,

    /// Whether the UI should render it collapsed.
    #[serde(default)]
    pub collapsed: bool,
}

/// The role of a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize, Default)]
pub enum Role {
    /// The user role.
    #[serde(rename = "user")]
    #[default]
    User,
    /// The assistant role.
    #[serde(rename = "assistant")]
    Assistant,
    /// The system role.
    #[serde(rename = "system")]
    System,
    /// The tool role.
    #[serde(rename = "tool")]
    Tool,
}
