//! Schema-driven conversion of the model's string arguments.

use serde_json::{Map, Value};
use std::fmt;

use super::schema::{ParamSpec, ParamType};
use crate::error::AgentError;

/// A coerced argument value.
#[derive(Debug, Clone, PartialEq)]
pub enum ArgValue {
    Integer(i64),
    Number(f64),
    Array(Vec<i64>),
    String(String),
}

impl ArgValue {
    pub fn to_json(&self) -> Value {
        match self {
            ArgValue::Integer(n) => Value::from(*n),
            ArgValue::Number(x) => Value::from(*x),
            ArgValue::Array(items) => Value::from(items.clone()),
            ArgValue::String(s) => Value::from(s.as_str()),
        }
    }
}

/// Literal form used in history entries: `5`, `2.0`, `[1, 2]`, `'text'`.
impl fmt::Display for ArgValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgValue::Integer(n) => write!(f, "{n}"),
            ArgValue::Number(x) if x.is_finite() && x.fract() == 0.0 && x.abs() < 1e16 => {
                write!(f, "{x:.1}")
            }
            ArgValue::Number(x) => write!(f, "{x}"),
            ArgValue::Array(items) => {
                let items: Vec<String> = items.iter().map(i64::to_string).collect();
                write!(f, "[{}]", items.join(", "))
            }
            ArgValue::String(s) => f.write_str(&quote_literal(s)),
        }
    }
}

/// Single quotes, switching to double quotes when the text holds a single
/// quote but no double quote. Only the chosen quote is escaped.
fn quote_literal(s: &str) -> String {
    let quote = if s.contains('\'') && !s.contains('"') { '"' } else { '\'' };
    let mut out = String::with_capacity(s.len() + 2);
    out.push(quote);
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c == quote => {
                out.push('\\');
                out.push(c);
            }
            c => out.push(c),
        }
    }
    out.push(quote);
    out
}

/// Coerced arguments, in the tool's declared parameter order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Arguments(Vec<(String, ArgValue)>);

impl Arguments {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn push(&mut self, name: impl Into<String>, value: ArgValue) {
        self.0.push((name.into(), value));
    }

    #[cfg(test)]
    pub fn get(&self, name: &str) -> Option<&ArgValue> {
        self.0.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    /// JSON object sent as `tools/call` arguments.
    pub fn to_json(&self) -> Map<String, Value> {
        self.0
            .iter()
            .map(|(name, value)| (name.clone(), value.to_json()))
            .collect()
    }
}

/// `{'a': 5, 'b': 3}`
impl fmt::Display for Arguments {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let pairs: Vec<String> = self
            .0
            .iter()
            .map(|(name, value)| format!("'{name}': {value}"))
            .collect();
        write!(f, "{{{}}}", pairs.join(", "))
    }
}

/// Converts one raw argument to the parameter's declared type.
///
/// Arrays accept `[1,2,3]` or a bare `1,2,3`; each element must be a whole
/// number. `[]` yields an empty array.
pub fn coerce(param: &ParamSpec, raw: &str) -> Result<ArgValue, AgentError> {
    let fail = |reason: String| AgentError::CoercionFailure {
        param: param.name.clone(),
        value: raw.to_string(),
        expected: param.kind,
        reason,
    };

    match param.kind {
        ParamType::Integer => raw
            .trim()
            .parse::<i64>()
            .map(ArgValue::Integer)
            .map_err(|e| fail(e.to_string())),
        ParamType::Number => raw
            .trim()
            .parse::<f64>()
            .map(ArgValue::Number)
            .map_err(|e| fail(e.to_string())),
        ParamType::Array => {
            let body = raw.trim().trim_matches(|c| c == '[' || c == ']').trim();
            if body.is_empty() {
                return Ok(ArgValue::Array(Vec::new()));
            }
            body.split(',')
                .map(|item| {
                    let item = item.trim();
                    item.parse::<i64>()
                        .map_err(|e| fail(format!("element {item:?}: {e}")))
                })
                .collect::<Result<Vec<_>, _>>()
                .map(ArgValue::Array)
        }
        ParamType::String => Ok(ArgValue::String(raw.to_string())),
    }
}
