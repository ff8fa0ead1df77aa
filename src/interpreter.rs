//! Recognition of tool-call directives embedded in free-form model output.
//!
//! Models are asked to answer with `{"action": "tool_call", "tool": ..., "args": {...}}`
//! when they need a tool, but in practice they wrap the object in prose,
//! markdown fences or trailing commentary. Locating the object is a two-step
//! state machine: find an opening brace (anchor search, then a key-token
//! fallback), then walk forward counting brace depth until it closes.

use crate::models::ToolInvocationRequest;
use serde_json::Value;
use thiserror::Error;

pub const TOOL_CALL_ACTION: &str = "tool_call";

/// Literal spellings of the directive prefix seen in model output.
const ANCHORS: &[&str] = &[
    r#"{"action":"tool_call""#,
    r#"{"action": "tool_call""#,
    r#"{ "action": "tool_call""#,
    r#"{ "action":"tool_call""#,
    r#"{"action" : "tool_call""#,
    r#"{ "action" : "tool_call""#,
];

const ACTION_KEY: &str = r#""action""#;
const TOOL_CALL_VALUE: &str = r#""tool_call""#;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("no tool call directive found in response")]
    NoDirective,
    #[error("unbalanced braces in tool call starting at offset {0}")]
    Unbalanced(usize),
    #[error("invalid JSON in tool call: {0}")]
    InvalidJson(String),
    #[error("tool call is not a JSON object")]
    NotAnObject,
    #[error("action field is not \"tool_call\"")]
    WrongAction,
    #[error("tool name is missing or empty")]
    MissingTool,
    #[error("args field is missing or not an object")]
    InvalidArgs,
}

impl ParseError {
    /// False when the text simply holds no tool directive, true when one was
    /// found but could not be turned into a request.
    pub fn is_malformed_directive(&self) -> bool {
        !matches!(
            self,
            ParseError::NoDirective | ParseError::WrongAction | ParseError::NotAnObject
        )
    }
}

/// Returns true when `text` carries a well-formed tool directive.
///
/// Never fails; every parse problem just means "not a tool call".
pub fn detect(text: &str) -> bool {
    extract(text).is_ok()
}

/// Pulls the first tool directive out of `text`.
pub fn extract(text: &str) -> Result<ToolInvocationRequest, ParseError> {
    let trimmed = text.trim();
    if let Ok(value @ Value::Object(_)) = serde_json::from_str::<Value>(trimmed) {
        return into_request(value);
    }

    let start = locate_opening_brace(text).ok_or(ParseError::NoDirective)?;
    let end = find_matching_brace(text, start).ok_or(ParseError::Unbalanced(start))?;

    let candidate = &text[start..end];
    let value: Value =
        serde_json::from_str(candidate).map_err(|e| ParseError::InvalidJson(e.to_string()))?;
    into_request(value)
}

/// Byte offset of the `{` that opens the directive, if any.
fn locate_opening_brace(text: &str) -> Option<usize> {
    let anchored = ANCHORS.iter().filter_map(|anchor| text.find(anchor)).min();
    if anchored.is_some() {
        return anchored;
    }

    let action_pos = text.find(ACTION_KEY)?;
    text.find(TOOL_CALL_VALUE)?;
    enclosing_brace_before(text, action_pos)
}

/// Nearest `{` before `pos` whose balanced object spans `pos`. Candidates
/// are checked with the same string-aware scanner as the forward pass.
fn enclosing_brace_before(text: &str, pos: usize) -> Option<usize> {
    text[..pos]
        .char_indices()
        .rev()
        .filter(|(_, ch)| *ch == '{')
        .map(|(idx, _)| idx)
        .find(|&idx| find_matching_brace(text, idx).is_some_and(|end| end > pos))
}

/// Exclusive end offset of the object opened at `start`.
fn find_matching_brace(text: &str, start: usize) -> Option<usize> {
    let mut scanner = BraceScanner::default();
    for (offset, ch) in text[start..].char_indices() {
        if scanner.step(ch) == ScanStep::Closed {
            return Some(start + offset + ch.len_utf8());
        }
    }
    None
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScanStep {
    Open,
    Closed,
}

/// Brace-depth counter. Braces inside string literals are ignored.
#[derive(Debug, Default)]
struct BraceScanner {
    depth: usize,
    in_string: bool,
    escaped: bool,
}

impl BraceScanner {
    fn step(&mut self, ch: char) -> ScanStep {
        if self.in_string {
            if self.escaped {
                self.escaped = false;
            } else if ch == '\\' {
                self.escaped = true;
            } else if ch == '"' {
                self.in_string = false;
            }
            return ScanStep::Open;
        }

        match ch {
            '"' => self.in_string = true,
            '{' => self.depth += 1,
            '}' if self.depth > 0 => {
                self.depth -= 1;
                if self.depth == 0 {
                    return ScanStep::Closed;
                }
            }
            _ => {}
        }
        ScanStep::Open
    }
}

fn into_request(value: Value) -> Result<ToolInvocationRequest, ParseError> {
    let Value::Object(mut obj) = value else {
        return Err(ParseError::NotAnObject);
    };

    if obj.get("action").and_then(Value::as_str) != Some(TOOL_CALL_ACTION) {
        return Err(ParseError::WrongAction);
    }

    let tool = obj
        .get("tool")
        .and_then(Value::as_str)
        .filter(|name| !name.trim().is_empty())
        .ok_or(ParseError::MissingTool)?
        .to_string();

    match obj.remove("args") {
        Some(Value::Object(args)) => Ok(ToolInvocationRequest::new(tool, args)),
        _ => Err(ParseError::InvalidArgs),
    }
}
