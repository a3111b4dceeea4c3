//! Tool abstractions shared by providers and the orchestrator.

use compact_str::CompactString;
use schemars::Schema;
use serde::{Deserialize, Serialize};

/// A tool the model may call.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Tool {
    /// The name of the tool.
    pub name: CompactString,

    /// The description of the tool.
    pub description: String,

    /// The parameters of the tool.
    pub parameters: Schema,

    /// Whether to strictly validate the parameters.
    #[serde(default)]
    pub strict: bool,
}

/// A tool call made by the model.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ToolCall {
    /// The ID of the tool call.
    #[serde(default, skip_serializing_if = "CompactString::is_empty")]
    pub id: CompactString,

    /// The index of the tool call (used in streaming).
    #[serde(default, skip_serializing)]
    pub index: u32,

    /// The type of tool (currently only "function").
    #[serde(default, rename = "type")]
    pub call_type: CompactString,

    /// The function to call.
    pub function: FunctionCall,
}

impl ToolCall {
    /// Merge a streaming delta into this tool call.
    ///
    /// Ids, types, and names overwrite when present; argument fragments
    /// append. Used by adapters that stream raw JSON fragments.
    pub fn merge(&mut self, call: &Self) {
        if !call.id.is_empty() {
            self.id = call.id.clone();
        }
        if !call.call_type.is_empty() {
            self.call_type = call.call_type.clone();
        }
        if !call.function.name.is_empty() {
            self.function.name = call.function.name.clone();
        }
        self.function.arguments.push_str(&call.function.arguments);
    }
}

/// A function call within a tool call.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct FunctionCall {
    /// The name of the function to call.
    #[serde(default, skip_serializing_if = "CompactString::is_empty")]
    pub name: CompactString,

    /// The arguments to pass to the function (JSON string).
    ///
    /// During streaming this is a partial fragment; it is only valid
    /// JSON once the call is finalized.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub arguments: String,
}

/// Controls which tool is called by the model.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub enum ToolChoice {
    /// Model will not call any tool.
    #[serde(rename = "none")]
    None,

    /// Model can pick between generating a message or calling tools.
    #[serde(rename = "auto")]
    #[default]
    Auto,

    /// Model must call one or more tools.
    #[serde(rename = "required")]
    Required,

    /// Model must call the specified function.
    Function(CompactString),
}

impl From<&str> for ToolChoice {
    fn from(value: &str) -> Self {
        ToolChoice::Function(value.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_appends_argument_fragments() {
        let mut call = ToolCall {
            id: "call_1".into(),
            call_type: "function".into(),
            function: FunctionCall {
                name: "search".into(),
                arguments: "{\"q\":".into(),
            },
            ..Default::default()
        };
        call.merge(&ToolCall {
            function: FunctionCall {
                arguments: "\"rust\"}".into(),
                ..Default::default()
            },
            ..Default::default()
        });
        assert_eq!(call.function.arguments, "{\"q\":\"rust\"}");
        assert_eq!(call.function.name, "search");
    }

    #[test]
    fn merge_overwrites_id_and_name() {
        let mut call = ToolCall::default();
        call.merge(&ToolCall {
            id: "call_2".into(),
            function: FunctionCall {
                name: "lookup".into(),
                ..Default::default()
            },
            ..Default::default()
        });
        assert_eq!(call.id, "call_2");
        assert_eq!(call.function.name, "lookup");
    }
}
