//! Request body for the Anthropic Messages API.

use ocore::{Content, ContentPart, Message, Role, Tool, ToolChoice};
use serde::Serialize;
use serde_json::{Value, json};

/// The request body for the Anthropic Messages API.
#[derive(Debug, Clone, Serialize)]
pub struct Request {
    /// The model identifier.
    pub model: String,
    /// Maximum tokens to generate (required by this API).
    pub max_tokens: usize,
    /// System prompt (top-level, not in the messages array).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
    /// The messages array (Anthropic content block format).
    pub messages: Vec<Value>,
    /// Whether to stream the response.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stream: Option<bool>,
    /// Tools the model may call.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<Value>>,
    /// Tool choice control.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_choice: Option<Value>,
    /// Temperature.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    /// Top-p sampling.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f64>,
    /// Top-k sampling.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_k: Option<u32>,
}

impl Request {
    /// Enable streaming for the request.
    pub fn stream(mut self) -> Self {
        self.stream = Some(true);
        self
    }
}

impl From<&ocore::Request> for Request {
    fn from(req: &ocore::Request) -> Self {
        let mut system = req.system_prompt.clone();
        let mut messages = Vec::with_capacity(req.messages.len());

        for msg in &req.messages {
            match msg.role {
                // This API has a top-level system slot; the last system
                // message in history wins.
                Role::System => system = Some(msg.content.flatten()),
                Role::User => messages.push(json!({
                    "role": "user",
                    "content": user_blocks(&msg.content),
                })),
                Role::Assistant => {
                    let mut content = Vec::new();
                    let text = msg.content.flatten();
                    if !text.is_empty() {
                        content.push(json!({"type": "text", "text": text}));
                    }
                    for tc in &msg.tool_calls {
                        let input: Value =
                            serde_json::from_str(&tc.function.arguments).unwrap_or(json!({}));
                        content.push(json!({
                            "type": "tool_use",
                            "id": tc.id,
                            "name": tc.function.name,
                            "input": input,
                        }));
                    }
                    if content.is_empty() {
                        content.push(json!({"type": "text", "text": ""}));
                    }
                    messages.push(json!({
                        "role": "assistant",
                        "content": content,
                    }));
                }
                Role::Tool => messages.push(json!({
                    "role": "user",
                    "content": [{
                        "type": "tool_result",
                        "tool_use_id": msg.tool_call_id,
                        "content": msg.content.flatten(),
                    }],
                })),
            }
        }

        Self {
            model: req.model.to_string(),
            max_tokens: req.max_tokens.unwrap_or(4096),
            system,
            messages,
            stream: None,
            tools: req.tools.as_deref().map(wire_tools),
            tool_choice: req.tool_choice.as_ref().map(wire_tool_choice),
            temperature: req.temperature,
            top_p: req.top_p,
            top_k: req.top_k,
        }
    }
}

/// Convert user content to Anthropic content blocks.
fn user_blocks(content: &Content) -> Value {
    match content {
        Content::Text(text) => json!(text),
        Content::Parts(parts) => Value::Array(parts.iter().map(wire_part).collect()),
    }
}

fn wire_part(part: &ContentPart) -> Value {
    match part {
        ContentPart::Text { text } => json!({"type": "text", "text": text}),
        ContentPart::ImageUrl { url, .. } => match split_data_url(url) {
            Some((media_type, data)) => json!({
                "type": "image",
                "source": {
                    "type": "base64",
                    "media_type": media_type,
                    "data": data,
                },
            }),
            None => json!({
                "type": "image",
                "source": {"type": "url", "url": url},
            }),
        },
        // No audio slot on this API; pass the reference through as text.
        ContentPart::AudioUrl { url } => json!({"type": "text", "text": url}),
    }
}

/// Split a `data:<media>;base64,<payload>` URL into its parts.
fn split_data_url(url: &str) -> Option<(&str, &str)> {
    let rest = url.strip_prefix("data:")?;
    let (media_type, data) = rest.split_once(";base64,")?;
    Some((media_type, data))
}

fn wire_tools(tools: &[Tool]) -> Vec<Value> {
    tools
        .iter()
        .map(|tool| {
            json!({
                "name": tool.name,
                "description": tool.description,
                "input_schema": tool.parameters,
            })
        })
        .collect()
}

fn wire_tool_choice(choice: &ToolChoice) -> Value {
    match choice {
        ToolChoice::None => json!({"type": "none"}),
        ToolChoice::Auto => json!({"type": "auto"}),
        ToolChoice::Required => json!({"type": "any"}),
        ToolChoice::Function(name) => json!({"type": "tool", "name": name}),
    }
}
