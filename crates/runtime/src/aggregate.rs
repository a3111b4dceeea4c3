//! Streaming response aggregation.
//!
//! [`Aggregator`] is a state machine over the normalized event feed. It
//! assembles content text, reasoning, tool-call arguments, and mid-stream
//! tool responses into one completed assistant message. One aggregator is
//! created per streamed turn and dropped with it; pending tool-call
//! state never outlives the request.

use anyhow::Result;
use compact_str::CompactString;
use futures_core::Stream;
use futures_util::StreamExt;
use ocore::{Error, Message, Reasoning, StreamEvent, ToolCall, ToolResult, Usage};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet};
use tokio_util::sync::CancellationToken;

/// A tool call that has started but not yet stopped.
struct Pending {
    name: CompactString,
    parameters: Map<String, Value>,
}

/// Accumulates one streamed turn into a completed message.
#[derive(Default)]
pub struct Aggregator {
    content: String,
    reasoning: String,
    pending: BTreeMap<CompactString, Pending>,
    pending_order: Vec<CompactString>,
    tool_calls: Vec<ToolCall>,
    tool_responses: Vec<ToolResult>,
    seen_responses: BTreeSet<CompactString>,
    usage: Option<Usage>,
    log_id: Option<CompactString>,
    saw_content: bool,
    finished: bool,
}

impl Aggregator {
    /// Create an aggregator for one streamed turn.
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one event. Returns true when consumers should re-render —
    /// the cumulative views below changed.
    pub fn apply(&mut self, event: StreamEvent) -> bool {
        match event {
            StreamEvent::ContentBlockDelta { content } => {
                self.content.push_str(&content);
                self.saw_content = true;
                true
            }
            StreamEvent::ReasoningDelta { content } => {
                self.reasoning.push_str(&content);
                true
            }
            StreamEvent::ToolUseStart { tool_id, tool_name } => {
                if !self.pending.contains_key(&tool_id) {
                    self.pending_order.push(tool_id.clone());
                }
                self.pending.insert(
                    tool_id,
                    Pending {
                        name: tool_name,
                        parameters: Map::new(),
                    },
                );
                false
            }
            StreamEvent::ToolUseDelta { tool_id, parameters } => {
                // Last-write-wins per key; vendors may re-send the full
                // object on every delta.
                if let Some(pending) = self.pending.get_mut(&tool_id) {
                    for (key, value) in parameters {
                        pending.parameters.insert(key, value);
                    }
                }
                false
            }
            StreamEvent::ToolUseStop { tool_id } => {
                // No matching start: out-of-order or duplicate vendor
                // event, ignore.
                let Some(pending) = self.pending.remove(&tool_id) else {
                    return false;
                };
                self.pending_order.retain(|id| id != &tool_id);
                self.tool_calls.push(ToolCall {
                    id: tool_id,
                    index: self.tool_calls.len() as u32,
                    call_type: "function".into(),
                    function: ocore::FunctionCall {
                        name: pending.name,
                        arguments: Value::Object(pending.parameters).to_string(),
                    },
                });
                false
            }
            StreamEvent::ToolResponse { result } => {
                if self.seen_responses.contains(&result.id) {
                    return false;
                }
                self.seen_responses.insert(result.id.clone());
                self.tool_responses.push(result);
                true
            }
            StreamEvent::MessageDelta { usage, log_id } => {
                if let Some(usage) = usage {
                    self.usage = Some(usage);
                }
                if let Some(log_id) = log_id {
                    self.log_id = Some(log_id);
                }
                false
            }
            StreamEvent::Done => {
                self.finished = true;
                false
            }
        }
    }

    /// Cumulative content so far.
    pub fn content(&self) -> &str {
        &self.content
    }

    /// Cumulative reasoning so far.
    pub fn reasoning(&self) -> &str {
        &self.reasoning
    }

    /// Tool responses collected so far.
    pub fn tool_responses(&self) -> &[ToolResult] {
        &self.tool_responses
    }

    /// Finish the turn and build the assistant message.
    ///
    /// Tool calls still pending are dropped, not executed. A stream that
    /// ended without an explicit terminator is a clean end only if at
    /// least one content delta was seen.
    pub fn finish(mut self) -> Result<Turn> {
        if !self.pending.is_empty() {
            tracing::warn!(
                "dropping {} unterminated tool call(s): {:?}",
                self.pending.len(),
                self.pending_order
            );
            self.pending.clear();
        }

        if !self.finished && !self.saw_content && self.tool_calls.is_empty() {
            return Err(Error::provider(None, "stream ended without content").into());
        }

        let mut message = Message::assistant(self.content);
        message.tool_calls = self.tool_calls;
        if !self.reasoning.is_empty() {
            message.reasoning = Some(Reasoning {
                content: self.reasoning,
                collapsed: true,
            });
        }
        message.usage = self.usage;
        message.log_id = self.log_id.unwrap_or_default();

        Ok(Turn {
            message,
            tool_responses: self.tool_responses,
        })
    }

    /// Drive a normalized event stream to completion.
    ///
    /// `on_progress` fires with the cumulative state (not deltas) so
    /// consumers can render idempotently. The cancellation token stops
    /// reading and releases the stream; the partially accumulated turn
    /// is discarded.
    pub async fn collect<S, F>(
        stream: S,
        cancel: &CancellationToken,
        mut on_progress: F,
    ) -> Result<Turn>
    where
        S: Stream<Item = Result<StreamEvent>>,
        F: FnMut(&Aggregator),
    {
        let mut aggregator = Aggregator::new();
        futures_util::pin_mut!(stream);

        loop {
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    anyhow::bail!("request cancelled");
                }
                next = stream.next() => next,
            };
            let Some(next) = next else {
                break;
            };
            let event = next?;
            let done = matches!(event, StreamEvent::Done);
            if aggregator.apply(event) {
                on_progress(&aggregator);
            }
            if done {
                break;
            }
        }

        aggregator.finish()
    }
}

/// One completed streamed turn.
pub struct Turn {
    /// The assembled assistant message.
    pub message: Message,
    /// Tool responses surfaced mid-stream.
    pub tool_responses: Vec<ToolResult>,
}
