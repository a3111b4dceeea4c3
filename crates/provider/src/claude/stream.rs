//! SSE event translation for the Anthropic streaming Messages API.
//!
//! Anthropic streaming events differ from the OpenAI dialect:
//! - `message_start` — initial message metadata
//! - `content_block_start` — begin a content block (text or tool_use)
//! - `content_block_delta` — incremental content (text_delta,
//!   input_json_delta, or thinking_delta)
//! - `content_block_stop` — end of a content block
//! - `message_delta` — final stop_reason and usage
//! - `message_stop` — end of message
//!
//! Tool-call arguments arrive as raw JSON fragments; the translator
//! buffers them per block index and emits object-valued deltas.

use compact_str::CompactString;
use ocore::{StreamEvent, Usage};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// A raw SSE event from the Anthropic streaming API.
#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    /// Initial message metadata.
    #[serde(rename = "message_start")]
    MessageStart { message: MessageMeta },
    /// Begin a content block.
    #[serde(rename = "content_block_start")]
    ContentBlockStart {
        index: u32,
        content_block: ContentBlock,
    },
    /// Incremental content within a block.
    #[serde(rename = "content_block_delta")]
    ContentBlockDelta { index: u32, delta: BlockDelta },
    /// End of a content block.
    #[serde(rename = "content_block_stop")]
    ContentBlockStop { index: u32 },
    /// Final message delta (stop reason + usage).
    #[serde(rename = "message_delta")]
    MessageDelta {
        #[serde(default)]
        usage: Option<MessageDeltaUsage>,
    },
    /// End of message.
    #[serde(rename = "message_stop")]
    MessageStop,
    /// Ping (keep-alive).
    #[serde(rename = "ping")]
    Ping,
    /// Catch-all for unknown event types.
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Deserialize)]
pub struct MessageMeta {
    pub id: CompactString,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
pub enum ContentBlock {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(rename = "thinking")]
    Thinking {},
    #[serde(rename = "tool_use")]
    ToolUse {
        id: CompactString,
        name: CompactString,
    },
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
pub enum BlockDelta {
    #[serde(rename = "text_delta")]
    TextDelta { text: String },
    #[serde(rename = "thinking_delta")]
    ThinkingDelta { thinking: String },
    #[serde(rename = "input_json_delta")]
    InputJsonDelta { partial_json: String },
}

#[derive(Debug, Deserialize)]
pub struct MessageDeltaUsage {
    #[serde(default)]
    pub input_tokens: u32,
    pub output_tokens: u32,
}

/// A pending tool-use block: id, name, buffered argument fragments.
struct PendingBlock {
    id: CompactString,
    fragments: String,
}

/// Stateful event-to-event translator, scoped to one streamed turn.
#[derive(Default)]
pub struct Translator {
    blocks: BTreeMap<u32, PendingBlock>,
}

impl Translator {
    /// Create a translator for one streamed turn.
    pub fn new() -> Self {
        Self::default()
    }

    /// Translate one raw Anthropic event into zero or more normalized
    /// events.
    pub fn translate(&mut self, event: Event) -> Vec<StreamEvent> {
        match event {
            Event::MessageStart { message } => vec![StreamEvent::MessageDelta {
                usage: None,
                log_id: Some(message.id),
            }],
            Event::ContentBlockStart {
                content_block: ContentBlock::Text { text },
                ..
            } => {
                if text.is_empty() {
                    Vec::new()
                } else {
                    vec![StreamEvent::ContentBlockDelta { content: text }]
                }
            }
            Event::ContentBlockStart {
                content_block: ContentBlock::Thinking {},
                ..
            } => Vec::new(),
            Event::ContentBlockStart {
                index,
                content_block: ContentBlock::ToolUse { id, name },
            } => {
                self.blocks.insert(
                    index,
                    PendingBlock {
                        id: id.clone(),
                        fragments: String::new(),
                    },
                );
                vec![StreamEvent::ToolUseStart {
                    tool_id: id,
                    tool_name: name,
                }]
            }
            Event::ContentBlockDelta {
                delta: BlockDelta::TextDelta { text },
                ..
            } => vec![StreamEvent::ContentBlockDelta { content: text }],
            Event::ContentBlockDelta {
                delta: BlockDelta::ThinkingDelta { thinking },
                ..
            } => vec![StreamEvent::ReasoningDelta { content: thinking }],
            Event::ContentBlockDelta {
                index,
                delta: BlockDelta::InputJsonDelta { partial_json },
            } => {
                let Some(block) = self.blocks.get_mut(&index) else {
                    return Vec::new();
                };
                block.fragments.push_str(&partial_json);
                // Re-send the full object whenever the buffer parses;
                // downstream merge is last-write-wins.
                match parse_fragments(&block.fragments) {
                    Some(parameters) => vec![StreamEvent::ToolUseDelta {
                        tool_id: block.id.clone(),
                        parameters,
                    }],
                    None => Vec::new(),
                }
            }
            Event::ContentBlockStop { index } => {
                let Some(block) = self.blocks.remove(&index) else {
                    return Vec::new();
                };
                let mut events = Vec::new();
                match parse_fragments(&block.fragments) {
                    Some(parameters) => events.push(StreamEvent::ToolUseDelta {
                        tool_id: block.id.clone(),
                        parameters,
                    }),
                    None => tracing::warn!(
                        "tool block {index} closed with unparseable input: {}",
                        block.fragments
                    ),
                }
                events.push(StreamEvent::ToolUseStop { tool_id: block.id });
                events
            }
            Event::MessageDelta { usage } => {
                let usage = usage.map(|u| Usage::new(u.input_tokens, u.output_tokens));
                vec![StreamEvent::MessageDelta {
                    usage,
                    log_id: None,
                }]
            }
            Event::MessageStop => vec![StreamEvent::Done],
            Event::Ping | Event::Unknown => Vec::new(),
        }
    }
}

/// Parse buffered fragments into an argument object. An empty buffer is
/// the empty object (tool calls without arguments).
fn parse_fragments(fragments: &str) -> Option<Map<String, Value>> {
    if fragments.trim().is_empty() {
        return Some(Map::new());
    }
    match serde_json::from_str::<Value>(fragments) {
        Ok(Value::Object(map)) => Some(map),
        _ => None,
    }
}
