//! Request body for the Ollama chat API.

use ocore::{Content, ContentPart, Message, Role, Tool};
use serde::Serialize;
use serde_json::{Value, json};

/// The request body for the Ollama `/api/chat` endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct Request {
    /// The model identifier.
    pub model: String,
    /// The messages array (Ollama message format).
    pub messages: Vec<Value>,
    /// Whether to stream the response.
    pub stream: bool,
    /// Sampling options.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<Value>,
    /// Tools the model may call.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<Value>>,
}

impl Request {
    /// Enable streaming for the request.
    pub fn stream(mut self) -> Self {
        self.stream = true;
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

        let mut options = serde_json::Map::new();
        if let Some(t) = req.temperature {
            options.insert("temperature".into(), json!(t));
        }
        if let Some(p) = req.top_p {
            options.insert("top_p".into(), json!(p));
        }
        if let Some(k) = req.top_k {
            options.insert("top_k".into(), json!(k));
        }
        if let Some(m) = req.max_tokens {
            options.insert("num_predict".into(), json!(m));
        }

        Self {
            model: req.model.to_string(),
            messages,
            stream: false,
            options: if options.is_empty() {
                None
            } else {
                Some(Value::Object(options))
            },
            tools: req.tools.as_deref().map(wire_tools),
        }
    }
}

/// Convert one normalized message to the Ollama wire shape.
///
/// Images travel in a separate base64 `images` array next to the text.
fn wire_message(msg: &Message) -> Value {
    let role = match msg.role {
        Role::System => "system",
        Role::User => "user",
        Role::Assistant => "assistant",
        Role::Tool => "tool",
    };

    let mut wire = json!({"role": role, "content": text_content(&msg.content)});
    let images = base64_images(&msg.content);
    if !images.is_empty() {
        wire["images"] = json!(images);
    }
    if msg.role == Role::Assistant && !msg.tool_calls.is_empty() {
        wire["tool_calls"] = Value::Array(
            msg.tool_calls
                .iter()
                .map(|tc| {
                    let args: Value =
                        serde_json::from_str(&tc.function.arguments).unwrap_or(json!({}));
                    json!({"function": {"name": tc.function.name, "arguments": args}})
                })
                .collect(),
        );
    }
    wire
}

/// Text-only view of the content (image parts are carried separately).
fn text_content(content: &Content) -> String {
    match content {
        Content::Text(text) => text.clone(),
        Content::Parts(parts) => parts
            .iter()
            .filter_map(|part| match part {
                ContentPart::Text { text } => Some(text.as_str()),
                ContentPart::AudioUrl { url } => Some(url.as_str()),
                ContentPart::ImageUrl { .. } => None,
            })
            .collect::<Vec<_>>()
            .join("\n"),
    }
}

/// Collect base64 payloads from `data:` image URLs.
fn base64_images(content: &Content) -> Vec<String> {
    let Content::Parts(parts) = content else {
        return Vec::new();
    };
    parts
        .iter()
        .filter_map(|part| match part {
            ContentPart::ImageUrl { url, .. } => url
                .strip_prefix("data:")
                .and_then(|rest| rest.split_once(";base64,"))
                .map(|(_, data)| data.to_owned()),
            _ => None,
        })
        .collect()
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
