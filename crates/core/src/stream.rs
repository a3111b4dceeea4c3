//! Normalized streaming event feed.
//!
//! Every adapter translates its vendor's streaming format (OpenAI-style
//! chunks, Anthropic SSE events, Ollama NDJSON) into this one event
//! grammar before anything downstream sees it. The gateway re-emits the
//! same events as its own SSE frames.

use crate::response::Usage;
use compact_str::CompactString;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A normalized streaming event.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    /// Incremental assistant text.
    ContentBlockDelta {
        /// The text delta.
        content: String,
    },

    /// Incremental reasoning/analysis text.
    ReasoningDelta {
        /// The reasoning delta.
        content: String,
    },

    /// The model started a tool call.
    ToolUseStart {
        /// The tool call id.
        tool_id: CompactString,
        /// The function name.
        tool_name: CompactString,
    },

    /// Incremental tool call arguments, as a (possibly re-sent) object.
    ///
    /// Keys merge last-write-wins downstream, so vendors that re-send the
    /// full object on every delta stay well-formed.
    ToolUseDelta {
        /// The tool call id.
        tool_id: CompactString,
        /// Argument object fragment.
        parameters: Map<String, Value>,
    },

    /// The tool call's arguments are complete.
    ToolUseStop {
        /// The tool call id.
        tool_id: CompactString,
    },

    /// A server-side tool produced a result mid-stream.
    ToolResponse {
        /// The result payload.
        result: ToolResult,
    },

    /// Trailing metadata (usage, provider log id).
    MessageDelta {
        /// Token usage, when the vendor reports it.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        usage: Option<Usage>,
        /// Provider-side log id.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        log_id: Option<CompactString>,
    },

    /// End of stream. Serialized on the wire as the `[DONE]` sentinel,
    /// never as a JSON frame.
    #[serde(skip)]
    Done,
}

/// The result of one server-side tool invocation.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ToolResult {
    /// Unique result id, used to deduplicate vendor re-sends.
    pub id: CompactString,

    /// Human-readable result content.
    #[serde(default)]
    pub content: String,

    /// Result status ("success", "error", ...).
    #[serde(default, skip_serializing_if = "CompactString::is_empty")]
    pub status: CompactString,

    /// Structured result payload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_round_trip_with_snake_case_tags() {
        let event = StreamEvent::ContentBlockDelta {
            content: "Hel".into(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "content_block_delta");
        assert_eq!(json["content"], "Hel");
    }

    #[test]
    fn tool_use_delta_carries_object_parameters() {
        let json = r#"{"type":"tool_use_delta","tool_id":"t1","parameters":{"a":1}}"#;
        let event: StreamEvent = serde_json::from_str(json).unwrap();
        match event {
            StreamEvent::ToolUseDelta { tool_id, parameters } => {
                assert_eq!(tool_id, "t1");
                assert_eq!(parameters["a"], 1);
            }
            other => panic!("unexpected: {other:?}"),
        }
    }
}
