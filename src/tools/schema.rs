//! Typed view of the JSON Schema a tool server advertises.

use serde_json::Value;
use std::fmt;

use crate::mcp::McpTool;

/// Shown when a tool advertises no description.
const NO_DESCRIPTION: &str = "No description available";

/// Shown when a schema property has no `type`.
const UNKNOWN_TYPE: &str = "unknown";

/// Declared type of a tool parameter.
///
/// Only the types the coercer understands get their own variant. Any other
/// declared type (`boolean`, `object`, a missing type, ...) is passed
/// through as a string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamType {
    Integer,
    Number,
    Array,
    String,
}

impl ParamType {
    pub fn from_declared(declared: Option<&str>) -> Self {
        match declared {
            Some("integer") => ParamType::Integer,
            Some("number") => ParamType::Number,
            Some("array") => ParamType::Array,
            _ => ParamType::String,
        }
    }
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ParamType::Integer => "integer",
            ParamType::Number => "number",
            ParamType::Array => "array",
            ParamType::String => "string",
        };
        f.write_str(name)
    }
}

/// One entry of a tool's input schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamSpec {
    pub name: String,
    /// The `type` exactly as declared, used for display.
    pub type_name: String,
    pub kind: ParamType,
}

impl ParamSpec {
    #[cfg(test)]
    pub fn new(name: impl Into<String>, kind: ParamType) -> Self {
        Self {
            name: name.into(),
            type_name: kind.to_string(),
            kind,
        }
    }

    fn from_property(name: &str, info: &Value) -> Self {
        let declared = info.get("type").and_then(Value::as_str);
        Self {
            name: name.to_string(),
            type_name: declared.unwrap_or(UNKNOWN_TYPE).to_string(),
            kind: ParamType::from_declared(declared),
        }
    }
}

/// A tool as the agent sees it: name, description, and ordered parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
    /// Parameters in the order the server declared them.
    pub params: Vec<ParamSpec>,
}

impl ToolDescriptor {
    pub fn new(name: impl Into<String>, description: impl Into<String>, params: Vec<ParamSpec>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            params,
        }
    }

    /// Converts a wire-level tool. Parameter order follows the order of
    /// `inputSchema.properties` as received.
    pub fn from_wire(tool: &McpTool) -> Self {
        let params = tool
            .input_schema
            .get("properties")
            .and_then(Value::as_object)
            .map(|props| {
                props
                    .iter()
                    .map(|(name, info)| ParamSpec::from_property(name, info))
                    .collect()
            })
            .unwrap_or_default();

        let description = tool
            .description
            .as_deref()
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .unwrap_or(NO_DESCRIPTION);

        Self::new(tool.name.clone(), description, params)
    }

    /// `name(a: integer, b: integer) - description`
    pub fn signature(&self) -> String {
        let params = if self.params.is_empty() {
            "no parameters".to_string()
        } else {
            self.params
                .iter()
                .map(|p| format!("{}: {}", p.name, p.type_name))
                .collect::<Vec<_>>()
                .join(", ")
        };
        format!("{}({}) - {}", self.name, params, self.description)
    }
}
