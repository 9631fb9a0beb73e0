//! Tool catalog, argument coercion, and dispatch.
//!
//! Tools live in an external server reached through a [`ToolSession`]. The
//! catalog it advertises is turned into [`ToolDescriptor`]s once at startup;
//! the [`Dispatcher`] then maps the model's positional string arguments onto
//! each tool's declared schema and invokes it.

pub mod coerce;
pub mod dispatch;
pub mod schema;

use anyhow::Result;
use serde_json::{Map, Value};

use crate::mcp::{CallToolResult, McpTool};

pub use coerce::{coerce, ArgValue, Arguments};
pub use dispatch::{Dispatch, Dispatcher, ToolOutput};
pub use schema::{ParamSpec, ParamType, ToolDescriptor};

/// A live connection to a tool server.
///
/// Implemented by [`McpClient`](crate::mcp::McpClient); tests substitute
/// in-memory fakes.
#[async_trait::async_trait]
pub trait ToolSession: Send {
    /// Fetch every tool the server advertises.
    async fn list_tools(&mut self) -> Result<Vec<McpTool>>;

    /// Invoke `name` with a JSON object of arguments.
    async fn call_tool(&mut self, name: &str, arguments: Map<String, Value>)
        -> Result<CallToolResult>;
}

/// Holds all advertised tools and resolves them by name.
#[derive(Debug, Clone, Default)]
pub struct ToolCatalog {
    tools: Vec<ToolDescriptor>,
}

impl ToolCatalog {
    pub fn new(tools: Vec<ToolDescriptor>) -> Self {
        Self { tools }
    }

    /// Build a catalog from a server's `tools/list` answer.
    pub fn from_wire(tools: &[McpTool]) -> Self {
        Self::new(tools.iter().map(ToolDescriptor::from_wire).collect())
    }

    /// Exact, case-sensitive lookup.
    pub fn get(&self, name: &str) -> Option<&ToolDescriptor> {
        self.tools.iter().find(|t| t.name == name)
    }

    pub fn names(&self) -> Vec<&str> {
        self.tools.iter().map(|t| t.name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Numbered, one-per-line listing embedded in the system prompt.
    ///
    /// ```text
    /// 1. add(a: integer, b: integer) - Add two numbers
    /// 2. open_paint(no parameters) - Open Microsoft Paint
    /// ```
    pub fn render(&self) -> String {
        self.tools
            .iter()
            .enumerate()
            .map(|(i, tool)| format!("{}. {}", i + 1, tool.signature()))
            .collect::<Vec<_>>()
            .join("\n")
    }
}
