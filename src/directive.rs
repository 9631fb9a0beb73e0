//! The one-line response grammar the model must answer in.
//!
//! Each model reply is reduced to a single line (see [`select_line`]) and
//! parsed into a [`Directive`]:
//!
//! ```text
//! FUNCTION_CALL: name|arg1|arg2|...
//! USE_PAINT: name|arg1|arg2|...
//! FINAL_ANSWER: value
//! COMPLETE_RUN
//! ```
//!
//! Prefixes are case-sensitive. Anything else is a [`DirectiveError`], which
//! the agent loop treats as an unrecognized (ignored) reply.

use thiserror::Error;

const FUNCTION_CALL_PREFIX: &str = "FUNCTION_CALL:";
const USE_PAINT_PREFIX: &str = "USE_PAINT:";
const FINAL_ANSWER_PREFIX: &str = "FINAL_ANSWER:";
const COMPLETE_RUN_MARKER: &str = "COMPLETE_RUN";

/// Which marker introduced a tool call. Both are dispatched identically.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallKind {
    Function,
    Paint,
}

impl CallKind {
    pub fn marker(self) -> &'static str {
        match self {
            CallKind::Function => FUNCTION_CALL_PREFIX,
            CallKind::Paint => USE_PAINT_PREFIX,
        }
    }
}

/// A single parsed instruction from the model.
#[derive(Debug, Clone, PartialEq)]
pub enum Directive {
    /// Invoke `tool` with positional string arguments.
    FunctionCall {
        kind: CallKind,
        tool: String,
        args: Vec<String>,
    },
    /// The model has finished calculating. `line` is the full directive text.
    FinalAnswer { value: String, line: String },
    /// The model asks to end the run.
    CompleteRun,
    /// The line did not match the grammar.
    Unrecognized { line: String, reason: DirectiveError },
}

/// Why a line could not be parsed as a directive.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DirectiveError {
    #[error("empty response")]
    Empty,
    #[error("no directive marker found in: {0}")]
    NoMarker(String),
}

impl Directive {
    /// Parses one line against the grammar.
    ///
    /// Surrounding whitespace is ignored. Tool name and arguments are
    /// split on `|` and trimmed individually. Routing is by prefix only: an
    /// empty tool name or answer still yields a directive, and the tool
    /// lookup rejects the empty name later.
    pub fn parse(line: &str) -> Result<Self, DirectiveError> {
        let line = line.trim();
        if line.is_empty() {
            return Err(DirectiveError::Empty);
        }

        for kind in [CallKind::Function, CallKind::Paint] {
            if let Some(rest) = line.strip_prefix(kind.marker()) {
                return Ok(parse_call(kind, rest));
            }
        }

        if let Some(rest) = line.strip_prefix(FINAL_ANSWER_PREFIX) {
            return Ok(Directive::FinalAnswer {
                value: rest.trim().to_string(),
                line: line.to_string(),
            });
        }

        if line.starts_with(COMPLETE_RUN_MARKER) {
            return Ok(Directive::CompleteRun);
        }

        Err(DirectiveError::NoMarker(line.to_string()))
    }

    /// Like [`Directive::parse`], but folds parse errors into
    /// [`Directive::Unrecognized`].
    pub fn classify(line: &str) -> Self {
        Self::parse(line).unwrap_or_else(|reason| Directive::Unrecognized {
            line: line.trim().to_string(),
            reason,
        })
    }
}

fn parse_call(kind: CallKind, rest: &str) -> Directive {
    let mut parts = rest.split('|').map(str::trim);
    let tool = parts.next().unwrap_or_default();
    Directive::FunctionCall {
        kind,
        tool: tool.to_string(),
        args: parts.map(String::from).collect(),
    }
}

/// Picks the line of a model reply to parse.
///
/// Returns the first trimmed line that starts with a tool-call marker,
/// otherwise the whole reply trimmed. Models sometimes wrap a call in
/// prose; final answers and completion must stand alone.
pub fn select_line(response: &str) -> &str {
    let response = response.trim();
    response
        .lines()
        .map(str::trim)
        .find(|line| line.starts_with(FUNCTION_CALL_PREFIX) || line.starts_with(USE_PAINT_PREFIX))
        .unwrap_or(response)
}
