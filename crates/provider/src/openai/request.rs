//! Request body for the OpenAI-compatible chat completions API.

use ocore::{Content, ContentPart, Message, Role, Tool, ToolChoice};
use serde::Serialize;
use serde_json::{Value, json};

/// The request body for the OpenAI-compatible chat completions API.
#[derive(Debug, Clone, Serialize)]
pub struct Request {
    /// The model identifier.
    pub model: String,
    /// The messages array (OpenAI message format).
    pub messages: Vec<Value>,
    /// Sampling temperature.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    /// Nucleus sampling.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f64>,
    /// Maximum tokens to generate.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<usize>,
    /// Frequency penalty.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frequency_penalty: Option<f64>,
    /// Presence penalty.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub presence_penalty: Option<f64>,
    /// Whether to stream the response.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stream: Option<bool>,
    /// Stream options (usage reporting).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stream_options: Option<Value>,
    /// Tools the model may call.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<Value>>,
    /// Tool choice control.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_choice: Option<Value>,
}

impl Request {
    /// Enable streaming for the request.
    pub fn stream(mut self, usage: bool) -> Self {
        self.stream = Some(true);
        if usage {
            self.stream_options = Some(json!({"include_usage": true}));
        }
        self
    }
}

impl From<&ocore::Request> for Request {
    fn from(req: &ocore::Request) -> Self {
        let mut messages = Vec::with_capacity(req.messages.len() + 1);
        if let Some(system) = &req.system_prompt {
            messages.push(json!({"role": "system", "content": system}));
        }
        for msg in &req.messages {
            messages.push(wire_message(msg));
        }

        Self {
            model: req.model.to_string(),
            messages,
            temperature: req.temperature,
            top_p: req.top_p,
            max_tokens: req.max_tokens,
            frequency_penalty: req.frequency_penalty,
            presence_penalty: req.presence_penalty,
            stream: None,
            stream_options: None,
            tools: req.tools.as_deref().map(wire_tools),
            tool_choice: req.tool_choice.as_ref().map(wire_tool_choice),
        }
    }
}

/// Convert one normalized message to the OpenAI wire shape.
fn wire_message(msg: &Message) -> Value {
    match msg.role {
        Role::System => json!({"role": "system", "content": msg.content.flatten()}),
        Role::User => json!({"role": "user", "content": wire_content(&msg.content)}),
        Role::Assistant => {
            let mut wire = json!({"role": "assistant", "content": msg.content.flatten()});
            if !msg.tool_calls.is_empty() {
                wire["tool_calls"] = Value::Array(
                    msg.tool_calls
                        .iter()
                        .map(|tc| {
                            json!({
                                "id": tc.id,
                                "type": "function",
                                "function": {
                                    "name": tc.function.name,
                                    "arguments": tc.function.arguments,
                                },
                            })
                        })
                        .collect(),
                );
            }
            wire
        }
        Role::Tool => json!({
            "role": "tool",
            "tool_call_id": msg.tool_call_id,
            "content": msg.content.flatten(),
        }),
    }
}

/// Convert normalized content to the OpenAI content slot.
fn wire_content(content: &Content) -> Value {
    match content {
        Content::Text(text) => json!(text),
        Content::Parts(parts) => Value::Array(parts.iter().map(wire_part).collect()),
    }
}

fn wire_part(part: &ContentPart) -> Value {
    match part {
        ContentPart::Text { text } => json!({"type": "text", "text": text}),
        ContentPart::ImageUrl { url, detail } => {
            let mut image = json!({"url": url});
            if let Some(detail) = detail {
                image["detail"] = json!(detail);
            }
            json!({"type": "image_url", "image_url": image})
        }
        // No dedicated audio slot on this dialect; pass the reference
        // through as text.
        ContentPart::AudioUrl { url } => json!({"type": "text", "text": url}),
    }
}

fn wire_tools(tools: &[Tool]) -> Vec<Value> {
    tools
        .iter()
        .map(|tool| {
            json!({
                "type": "function",
                "function": {
                    "name": tool.name,
                    "description": tool.description,
                    "parameters": tool.parameters,
                },
            })
        })
        .collect()
}

fn wire_tool_choice(choice: &ToolChoice) -> Value {
    match choice {
        ToolChoice::None => json!("none"),
        ToolChoice::Auto => json!("auto"),
        ToolChoice::Required => json!("required"),
        ToolChoice::Function(name) => json!({
            "type": "function",
            "function": {"name": name},
        }),
    }
}
