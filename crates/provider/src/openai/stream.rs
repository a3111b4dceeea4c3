//! Streaming chunk translation for OpenAI-compatible vendors.
//!
//! These vendors stream tool-call arguments as raw JSON string
//! fragments keyed by index. The translator buffers fragments per call
//! and surfaces the normalized event grammar: `tool_use_start` when a
//! call is announced, object-valued `tool_use_delta` whenever the
//! buffered fragment parses, `tool_use_stop` when the turn finishes
//! with tool calls.

use compact_str::CompactString;
use ocore::{StreamEvent, ToolCall, Usage};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet};

/// A raw streaming chunk from an OpenAI-compatible vendor.
#[derive(Debug, Deserialize)]
pub struct Chunk {
    /// Completion id (provider log id).
    #[serde(default)]
    pub id: CompactString,
    /// Chunk choices.
    #[serde(default)]
    pub choices: Vec<ChunkChoice>,
    /// Usage, present only in the final chunk when requested.
    #[serde(default)]
    pub usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
pub struct ChunkChoice {
    #[serde(default)]
    pub delta: ChunkDelta,
    #[serde(default)]
    pub finish_reason: Option<CompactString>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ChunkDelta {
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub reasoning_content: Option<String>,
    #[serde(default)]
    pub tool_calls: Option<Vec<ToolCall>>,
}

/// Stateful chunk-to-event translator, scoped to one streamed turn.
#[derive(Default)]
pub struct Translator {
    calls: BTreeMap<u32, ToolCall>,
    announced: BTreeSet<u32>,
    log_id_sent: bool,
}

impl Translator {
    /// Create a translator for one streamed turn.
    pub fn new() -> Self {
        Self::default()
    }

    /// Translate one raw chunk into zero or more normalized events.
    pub fn translate(&mut self, chunk: Chunk) -> Vec<StreamEvent> {
        let mut events = Vec::new();

        if !self.log_id_sent && !chunk.id.is_empty() {
            self.log_id_sent = true;
            events.push(StreamEvent::MessageDelta {
                usage: None,
                log_id: Some(chunk.id.clone()),
            });
        }

        for choice in &chunk.choices {
            if let Some(content) = &choice.delta.content
                && !content.is_empty()
            {
                events.push(StreamEvent::ContentBlockDelta {
                    content: content.clone(),
                });
            }
            if let Some(reasoning) = &choice.delta.reasoning_content
                && !reasoning.is_empty()
            {
                events.push(StreamEvent::ReasoningDelta {
                    content: reasoning.clone(),
                });
            }
            if let Some(calls) = &choice.delta.tool_calls {
                for call in calls {
                    self.merge_call(call, &mut events);
                }
            }
            if choice.finish_reason.as_deref() == Some("tool_calls") {
                self.finish_calls(&mut events);
            }
        }

        if let Some(usage) = chunk.usage {
            events.push(StreamEvent::MessageDelta {
                usage: Some(usage),
                log_id: None,
            });
        }

        events
    }

    /// Merge one tool-call fragment and emit start/delta events.
    fn merge_call(&mut self, call: &ToolCall, events: &mut Vec<StreamEvent>) {
        let entry = self.calls.entry(call.index).or_default();
        entry.index = call.index;
        entry.merge(call);

        if !self.announced.contains(&call.index)
            && !entry.id.is_empty()
            && !entry.function.name.is_empty()
        {
            self.announced.insert(call.index);
            events.push(StreamEvent::ToolUseStart {
                tool_id: entry.id.clone(),
                tool_name: entry.function.name.clone(),
            });
        }

        // Fragments rarely parse mid-stream; when they do, re-send the
        // full object — downstream merge is last-write-wins.
        if self.announced.contains(&call.index)
            && let Some(parameters) = parse_arguments(&entry.function.arguments)
        {
            events.push(StreamEvent::ToolUseDelta {
                tool_id: entry.id.clone(),
                parameters,
            });
        }
    }

    /// The turn finished with tool calls: flush final arguments and
    /// close every announced call, in index order.
    fn finish_calls(&mut self, events: &mut Vec<StreamEvent>) {
        for (index, call) in std::mem::take(&mut self.calls) {
            if !self.announced.contains(&index) {
                continue;
            }
            match parse_arguments(&call.function.arguments) {
                Some(parameters) => events.push(StreamEvent::ToolUseDelta {
                    tool_id: call.id.clone(),
                    parameters,
                }),
                None => tracing::warn!(
                    "tool call '{}' finished with unparseable arguments: {}",
                    call.function.name,
                    call.function.arguments
                ),
            }
            events.push(StreamEvent::ToolUseStop {
                tool_id: call.id,
            });
        }
        self.announced.clear();
    }
}

/// Parse an accumulated argument fragment into an object. Empty
/// fragments parse as the empty object.
fn parse_arguments(arguments: &str) -> Option<Map<String, Value>> {
    if arguments.trim().is_empty() {
        return Some(Map::new());
    }
    match serde_json::from_str::<Value>(arguments) {
        Ok(Value::Object(map)) => Some(map),
        _ => None,
    }
}
