//! Tool definition and tool-call types.
//!
//! A [`Tool`] is what the caller advertises to the model; a [`ToolCall`] is
//! what the model sends back when it wants one executed. Tool-call arguments
//! stay a raw JSON string until the orchestrator parses them, so a malformed
//! payload can be reported back to the model instead of failing the run.

use serde::{Deserialize, Serialize};

/// Separator between the plugin segment and the function segment of a fully
/// qualified tool name (`plugin-function`).
///
/// Names without the separator are plain function names with no plugin.
pub const NAME_SEPARATOR: char = '-';

/// A tool (function) the model may request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tool {
    /// Tool type, currently always `"function"`.
    pub r#type: String,
    /// The function definition.
    pub function: ToolFunction,
}

/// Function metadata advertised to the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolFunction {
    /// Fully qualified function name.
    pub name: String,
    /// Human-readable description of what the function does.
    pub description: String,
    /// JSON Schema for the function parameters.
    pub parameters: serde_json::Value,
}

impl Tool {
    /// Create a function tool.
    pub fn function(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: serde_json::Value,
    ) -> Self {
        Self {
            r#type: "function".to_string(),
            function: ToolFunction {
                name: name.into(),
                description: description.into(),
                parameters,
            },
        }
    }

    /// The fully qualified function name.
    pub fn name(&self) -> &str {
        &self.function.name
    }
}

/// A tool call requested by the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Provider-assigned call id, echoed back on the tool-result message.
    pub id: String,
    /// The requested function and its raw arguments.
    pub function: FunctionCall,
}

/// The function portion of a tool call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionCall {
    /// Fully qualified function name (`plugin-function` or bare name).
    pub name: String,
    /// Raw JSON argument string, unparsed.
    pub arguments: String,
}

impl ToolCall {
    /// Create a tool call.
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        arguments: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            function: FunctionCall {
                name: name.into(),
                arguments: arguments.into(),
            },
        }
    }

    /// The plugin segment of the fully qualified name, if present.
    pub fn plugin_name(&self) -> Option<&str> {
        self.function
            .name
            .split_once(NAME_SEPARATOR)
            .map(|(plugin, _)| plugin)
    }

    /// The bare function name with any plugin prefix stripped.
    pub fn function_name(&self) -> &str {
        self.function
            .name
            .split_once(NAME_SEPARATOR)
            .map_or(self.function.name.as_str(), |(_, function)| function)
    }
}
