//! Normalized chat completion request.

use crate::message::Message;
use crate::tool::{Tool, ToolChoice};
use compact_str::CompactString;
use serde::{Deserialize, Serialize};

/// A normalized chat completion request.
///
/// Contains everything needed to make an upstream call: model, messages,
/// sampling parameters, and tools. Provider adapters convert this to
/// their wire format; vendor-specific reshaping never happens upstream
/// of the adapter.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Request {
    /// The model to use.
    pub model: CompactString,

    /// The conversation messages.
    #[serde(default)]
    pub messages: Vec<Message>,

    /// System prompt. Adapters for vendors without a dedicated system
    /// slot merge it into the first user turn.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,

    /// Sampling temperature.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,

    /// Nucleus sampling.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f64>,

    /// Top-k sampling (vendors that support it).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_k: Option<u32>,

    /// Maximum tokens to generate.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<usize>,

    /// Frequency penalty.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frequency_penalty: Option<f64>,

    /// Presence penalty.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub presence_penalty: Option<f64>,

    /// The tools available for this request.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<Tool>>,

    /// Controls which tool is called by the model.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_choice: Option<ToolChoice>,

    /// Whether to return usage information in stream mode.
    #[serde(default)]
    pub usage: bool,

    /// Conversation id. Async-job vendors use it to route webhook
    /// callbacks back to the right transcript entry.
    #[serde(default, skip_serializing_if = "CompactString::is_empty")]
    pub conversation: CompactString,
}

impl Request {
    /// Create a new request for the given model.
    pub fn new(model: impl Into<CompactString>) -> Self {
        Self {
            model: model.into(),
            messages: Vec::new(),
            system_prompt: None,
            temperature: None,
            top_p: None,
            top_k: None,
            max_tokens: None,
            frequency_penalty: None,
            presence_penalty: None,
            tools: None,
            tool_choice: None,
            usage: false,
            conversation: CompactString::default(),
        }
    }

    /// Set the messages for this request.
    pub fn with_messages(mut self, messages: Vec<Message>) -> Self {
        self.messages = messages;
        self
    }

    /// Set the system prompt for this request.
    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    /// Set the tools for this request.
    pub fn with_tools(mut self, tools: Vec<Tool>) -> Self {
        self.tools = Some(tools);
        self
    }

    /// Set the tool choice for this request.
    pub fn with_tool_choice(mut self, tool_choice: ToolChoice) -> Self {
        self.tool_choice = Some(tool_choice);
        self
    }

    /// Drop the tools from this request. Used when the selected model's
    /// capability row does not declare function support.
    pub fn without_tools(mut self) -> Self {
        self.tools = None;
        self.tool_choice = None;
        self
    }
}
