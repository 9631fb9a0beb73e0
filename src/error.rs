//! Errors that end an agent run.

use thiserror::Error;

use crate::tools::ParamType;

/// Every way a run can be cut short.
///
/// Generation errors abort the loop immediately. Dispatch errors are first
/// written to the run history so the trace shows what was attempted.
#[derive(Debug, Error)]
pub enum AgentError {
    #[error("LLM generation timed out after {secs:.1}s")]
    GenerationTimeout { secs: f64 },

    #[error("LLM generation failed: {0}")]
    GenerationFailure(String),

    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("Not enough parameters provided for {tool}: expected {expected}, got {provided}")]
    InsufficientArguments {
        tool: String,
        expected: usize,
        provided: usize,
    },

    #[error("Cannot convert {value:?} for parameter {param} to {expected}: {reason}")]
    CoercionFailure {
        param: String,
        value: String,
        expected: ParamType,
        reason: String,
    },

    #[error("Tool {tool} failed: {message}")]
    ToolInvocation { tool: String, message: String },
}
