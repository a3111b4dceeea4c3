//! Request body for the Gemini generateContent API.

use ocore::{Content, ContentPart, Message, Role, Tool, ToolChoice};
use serde::Serialize;
use serde_json::{Value, json};

/// The request body for the Gemini generateContent API.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Request {
    /// The conversation turns (Gemini content format).
    pub contents: Vec<Value>,
    /// System prompt (dedicated top-level slot).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_instruction: Option<Value>,
    /// Sampling configuration.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generation_config: Option<Value>,
    /// Tools the model may call.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<Value>>,
    /// Tool calling mode.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_config: Option<Value>,
}

impl From<&ocore::Request> for Request {
    fn from(req: &ocore::Request) -> Self {
        let mut system = req.system_prompt.clone();
        let mut contents = Vec::with_capacity(req.messages.len());

        for msg in &req.messages {
            match msg.role {
                Role::System => system = Some(msg.content.flatten()),
                Role::User => contents.push(json!({
                    "role": "user",
                    "parts": user_parts(&msg.content),
                })),
                Role::Assistant => {
                    let mut parts = Vec::new();
                    let text = msg.content.flatten();
                    if !text.is_empty() {
                        parts.push(json!({"text": text}));
                    }
                    for tc in &msg.tool_calls {
                        let args: Value =
                            serde_json::from_str(&tc.function.arguments).unwrap_or(json!({}));
                        parts.push(json!({
                            "functionCall": {"name": tc.function.name, "args": args},
                        }));
                    }
                    if parts.is_empty() {
                        parts.push(json!({"text": ""}));
                    }
                    contents.push(json!({"role": "model", "parts": parts}));
                }
                Role::Tool => contents.push(json!({
                    "role": "user",
                    "parts": [{
                        "functionResponse": {
                            "name": msg.name,
                            "response": {"content": msg.content.flatten()},
                        },
                    }],
                })),
            }
        }

        let mut generation_config = serde_json::Map::new();
        if let Some(t) = req.temperature {
            generation_config.insert("temperature".into(), json!(t));
        }
        if let Some(p) = req.top_p {
            generation_config.insert("topP".into(), json!(p));
        }
        if let Some(k) = req.top_k {
            generation_config.insert("topK".into(), json!(k));
        }
        if let Some(m) = req.max_tokens {
            generation_config.insert("maxOutputTokens".into(), json!(m));
        }

        Self {
            contents,
            system_instruction: system.map(|s| json!({"parts": [{"text": s}]})),
            generation_config: if generation_config.is_empty() {
                None
            } else {
                Some(Value::Object(generation_config))
            },
            tools: req.tools.as_deref().map(wire_tools),
            tool_config: req.tool_choice.as_ref().map(wire_tool_config),
        }
    }
}

/// Convert user content to Gemini parts.
fn user_parts(content: &Content) -> Vec<Value> {
    match content {
        Content::Text(text) => vec![json!({"text": text})],
        Content::Parts(parts) => parts.iter().map(wire_part).collect(),
    }
}

fn wire_part(part: &ContentPart) -> Value {
    match part {
        ContentPart::Text { text } => json!({"text": text}),
        ContentPart::ImageUrl { url, .. } => media_part(url, "image/png"),
        ContentPart::AudioUrl { url } => media_part(url, "audio/mpeg"),
    }
}

/// Inline-data block for `data:` URLs, file reference otherwise.
fn media_part(url: &str, fallback_mime: &str) -> Value {
    match split_data_url(url) {
        Some((mime_type, data)) => json!({
            "inlineData": {"mimeType": mime_type, "data": data},
        }),
        None => json!({
            "fileData": {"mimeType": fallback_mime, "fileUri": url},
        }),
    }
}

/// Split a `data:<media>;base64,<payload>` URL into its parts.
fn split_data_url(url: &str) -> Option<(&str, &str)> {
    let rest = url.strip_prefix("data:")?;
    rest.split_once(";base64,")
}

fn wire_tools(tools: &[Tool]) -> Vec<Value> {
    vec![json!({
        "functionDeclarations": tools
            .iter()
            .map(|tool| {
                json!({
                    "name": tool.name,
                    "description": tool.description,
                    "parameters": tool.parameters,
                })
            })
            .collect::<Vec<_>>(),
    })]
}

fn wire_tool_config(choice: &ToolChoice) -> Value {
    match choice {
        ToolChoice::None => json!({"functionCallingConfig": {"mode": "NONE"}}),
        ToolChoice::Auto => json!({"functionCallingConfig": {"mode": "AUTO"}}),
        ToolChoice::Required => json!({"functionCallingConfig": {"mode": "ANY"}}),
        ToolChoice::Function(name) => json!({
            "functionCallingConfig": {"mode": "ANY", "allowedFunctionNames": [name]},
        }),
    }
}
