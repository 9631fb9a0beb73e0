//! Resolving, coercing, and invoking a tool call.

use std::fmt;
use std::time::Duration;

use tracing::{debug, warn};

use super::coerce::{coerce, Arguments};
use super::{ToolCatalog, ToolSession};
use crate::constants::{PAINT_OPEN_PREFIX, PAINT_SETTLE_DELAY_MS};
use crate::error::AgentError;
use crate::mcp::CallToolResult;

/// Normalized result of a tool call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolOutput {
    /// One entry per content item the server returned.
    Items(Vec<String>),
    /// The result had no content list; this is its string form.
    Text(String),
}

impl ToolOutput {
    /// Extracts each content item's text, falling back to the item's JSON
    /// form for non-text items. Results without a content list are
    /// rendered whole.
    pub fn from_result(result: &CallToolResult) -> Self {
        match &result.content {
            Some(items) => ToolOutput::Items(
                items
                    .iter()
                    .map(|item| match &item.text {
                        Some(text) => text.clone(),
                        None => serde_json::to_string(item).unwrap_or_default(),
                    })
                    .collect(),
            ),
            None => ToolOutput::Text(serde_json::to_string(result).unwrap_or_default()),
        }
    }
}

/// `[a, b]` for item lists, the text itself otherwise.
impl fmt::Display for ToolOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ToolOutput::Items(items) => write!(f, "[{}]", items.join(", ")),
            ToolOutput::Text(text) => f.write_str(text),
        }
    }
}

/// A completed tool call.
#[derive(Debug, Clone, PartialEq)]
pub struct Dispatch {
    pub tool: String,
    pub arguments: Arguments,
    pub output: ToolOutput,
}

/// Maps directive arguments onto the catalog and invokes tools.
pub struct Dispatcher {
    catalog: ToolCatalog,
    settle_delay: Duration,
}

impl Dispatcher {
    pub fn new(catalog: ToolCatalog) -> Self {
        Self {
            catalog,
            settle_delay: Duration::from_millis(PAINT_SETTLE_DELAY_MS),
        }
    }

    /// Pause applied after opening the paint application.
    pub fn with_settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay = delay;
        self
    }

    pub fn catalog(&self) -> &ToolCatalog {
        &self.catalog
    }

    /// Resolves `tool` and coerces `raw_args` positionally against its
    /// schema. Surplus arguments are ignored.
    pub fn prepare(&self, tool: &str, raw_args: &[String]) -> Result<Arguments, AgentError> {
        let descriptor = self.catalog.get(tool).ok_or_else(|| {
            debug!(available = ?self.catalog.names(), "unknown tool {tool}");
            AgentError::UnknownTool(tool.to_string())
        })?;
        debug!(tool, params = ?descriptor.params, "resolved tool schema");

        let mut raw = raw_args.iter();
        let mut arguments = Arguments::new();
        for param in &descriptor.params {
            let value = raw.next().ok_or_else(|| AgentError::InsufficientArguments {
                tool: tool.to_string(),
                expected: descriptor.params.len(),
                provided: raw_args.len(),
            })?;
            debug!("converting parameter {} with value {value} to {}", param.name, param.kind);
            arguments.push(param.name.clone(), coerce(param, value)?);
        }
        Ok(arguments)
    }

    /// Runs one tool call end to end.
    ///
    /// Nothing is sent to the session unless every argument coerces.
    pub async fn dispatch(
        &self,
        session: &mut dyn ToolSession,
        tool: &str,
        raw_args: &[String],
    ) -> Result<Dispatch, AgentError> {
        let arguments = self.prepare(tool, raw_args)?;
        debug!(tool, %arguments, "calling tool");

        let result = session
            .call_tool(tool, arguments.to_json())
            .await
            .map_err(|e| AgentError::ToolInvocation {
                tool: tool.to_string(),
                message: format!("{e:#}"),
            })?;

        if tool.starts_with(PAINT_OPEN_PREFIX) && !self.settle_delay.is_zero() {
            // Paint needs a moment to finish maximizing before the next call.
            tokio::time::sleep(self.settle_delay).await;
        }

        debug!(?result, "raw tool result");
        if result.is_error {
            warn!("tool {tool} reported an error result");
        }

        Ok(Dispatch {
            tool: tool.to_string(),
            arguments,
            output: ToolOutput::from_result(&result),
        })
    }
}
