//! Server-side tool orchestration.
//!
//! Executes the tool calls a model turn emitted, records what was
//! requested and what came back in the transcript, and isolates
//! per-tool failures: one failing tool becomes an error-status tool
//! message and the loop continues.

use crate::history::HistoryStore;
use anyhow::Result;
use compact_str::CompactString;
use ocore::{Error, Message, Role, Tool, ToolCall};
use serde_json::Value;
use std::collections::BTreeMap;
use std::pin::Pin;
use std::sync::Arc;

/// Display name of the marker message recording requested tool calls.
const MARKER_NAME: &str = "External Functions";

/// A type-erased async tool handler.
///
/// Receives the conversation id and the parsed arguments.
pub type Handler = Arc<
    dyn Fn(CompactString, Value) -> Pin<Box<dyn Future<Output = Result<ToolOutput>> + Send>>
        + Send
        + Sync,
>;

/// The result of one tool invocation.
#[derive(Debug, Clone, Default)]
pub struct ToolOutput {
    /// Human-readable result content.
    pub content: String,
    /// Result status. Empty means success.
    pub status: CompactString,
    /// Structured payload (e.g. an async job record).
    pub data: Option<Value>,
}

impl ToolOutput {
    /// A plain text result.
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            status: "success".into(),
            data: None,
        }
    }

    /// Attach a structured payload.
    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }
}

/// Executes tool calls against the registered handlers.
#[derive(Default, Clone)]
pub struct Orchestrator {
    tools: BTreeMap<CompactString, (Tool, Handler)>,
}

impl Orchestrator {
    /// Create an orchestrator with no tools.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool with its handler.
    pub fn register<F, Fut>(&mut self, tool: Tool, handler: F)
    where
        F: Fn(CompactString, Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<ToolOutput>> + Send + 'static,
    {
        let name = tool.name.clone();
        let handler: Handler = Arc::new(move |conversation, args| {
            Box::pin(handler(conversation, args))
        });
        self.tools.insert(name, (tool, handler));
    }

    /// Whether a tool with this name is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// Schemas of all registered tools, in name order.
    pub fn schemas(&self) -> Vec<Tool> {
        self.tools.values().map(|(tool, _)| tool.clone()).collect()
    }

    /// Execute a turn's tool calls, in the order received.
    ///
    /// Appends the marker assistant message first — what was requested
    /// is recorded even if execution later fails — then one tool message
    /// per call. Returns everything appended so the caller can feed it
    /// back into a follow-up model round.
    pub async fn run(
        &self,
        conversation: &str,
        calls: &[ToolCall],
        store: &HistoryStore,
    ) -> Result<Vec<Message>> {
        let marker = Message {
            role: Role::Assistant,
            name: MARKER_NAME.into(),
            tool_calls: calls.to_vec(),
            ..Default::default()
        };

        let mut appended = Vec::with_capacity(calls.len() + 1);
        appended.push(store.add(conversation, marker).await);

        for call in calls {
            let name = &call.function.name;
            let message = match self.invoke(conversation, call).await {
                Ok(output) => {
                    let mut message = Message::tool(output.content, name.clone(), call.id.clone());
                    message.status = if output.status.is_empty() {
                        "success".into()
                    } else {
                        output.status
                    };
                    message.data = output.data;
                    message
                }
                Err(e) => {
                    tracing::warn!("tool '{name}' failed: {e}");
                    let mut message =
                        Message::tool(format!("Error: {e}"), name.clone(), call.id.clone());
                    message.status = "error".into();
                    message
                }
            };
            appended.push(store.add(conversation, message).await);
        }

        Ok(appended)
    }

    /// Invoke one tool call.
    async fn invoke(&self, conversation: &str, call: &ToolCall) -> Result<ToolOutput> {
        let Some((_, handler)) = self.tools.get(call.function.name.as_str()) else {
            return Err(Error::ToolExecution(format!(
                "function '{}' not available",
                call.function.name
            ))
            .into());
        };
        let args = parse_arguments(&call.function.arguments)?;
        handler(CompactString::from(conversation), args).await
    }
}

/// Parse tool-call arguments, tolerating both JSON objects and
/// double-encoded JSON strings.
fn parse_arguments(arguments: &str) -> Result<Value> {
    if arguments.trim().is_empty() {
        return Ok(Value::Object(serde_json::Map::new()));
    }
    let value: Value = serde_json::from_str(arguments)
        .map_err(|e| Error::ToolExecution(format!("invalid arguments: {e}")))?;
    match value {
        Value::String(inner) => serde_json::from_str(&inner)
            .map_err(|e| Error::ToolExecution(format!("invalid arguments: {e}")).into()),
        other => Ok(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parse_arguments_accepts_objects() {
        let args = parse_arguments("{\"a\":1}").unwrap();
        assert_eq!(args["a"], 1);
    }

    #[test]
    fn parse_arguments_accepts_double_encoded_strings() {
        let args = parse_arguments("\"{\\\"a\\\":1}\"").unwrap();
        assert_eq!(args["a"], 1);
    }

    #[test]
    fn parse_arguments_empty_is_empty_object() {
        let args = parse_arguments("").unwrap();
        assert_eq!(args, json!({}));
    }

    #[test]
    fn parse_arguments_rejects_garbage() {
        assert!(parse_arguments("{not json").is_err());
    }
}
