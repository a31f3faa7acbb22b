//! The structured-action wire protocol between the agent loop and the model.
//!
//! Every model turn must be exactly one JSON object: a tool call
//! `{"tool": "python_exec_on_df", "args": {"code": …}}` or a final answer
//! `{"answer": …}`. Parsing is strict schema-first with exactly one
//! fallback: a turn that is not JSON at all is treated as opaque free text
//! and becomes the final answer. Malformed JSON objects are protocol
//! violations fed back to the model; nothing is silently patched.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::sandbox::ExecutionResult;

/// Name of the one declared tool
pub const TOOL_NAME: &str = "python_exec_on_df";

/// Appended to the transcript after a protocol violation
pub const CORRECTIVE_INSTRUCTION: &str =
    "Please respond with either a python_exec function call or a final answer in JSON.";

/// Answer reported when the loop ends without one
pub const NO_ANSWER_SENTINEL: &str = "(no answer)";

/// What a model turn encodes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Structured tool call carrying a code payload
    ToolCall { code: String },
    /// Structured final answer
    Answer(String),
    /// Not JSON at all; the raw text is the final answer
    PlainText(String),
    /// JSON, but conforming to neither structured shape
    Violation(String),
}

/// The code payload extracted from a model turn, plus the turn that
/// produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolInvocation {
    pub code: String,
    pub turn_index: usize,
}

/// Execution outcome as reported back to the model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Observation {
    pub ok: bool,
    pub stdout: String,
    pub stderr: String,
    pub images: Vec<String>,
}

impl From<&ExecutionResult> for Observation {
    fn from(result: &ExecutionResult) -> Self {
        // Give the model something to self-correct on when the child died
        // without writing to stderr (timeouts, spawn failures)
        let stderr = if result.stderr.trim().is_empty() {
            result
                .diagnostic
                .as_ref()
                .map(|d| d.message.clone())
                .unwrap_or_default()
        } else {
            result.stderr.clone()
        };

        Self {
            ok: result.ok,
            stdout: result.stdout.clone(),
            stderr,
            images: result.artifacts.clone(),
        }
    }
}

/// Parse one model turn into an action.
///
/// A single surrounding Markdown fence is stripped before parsing; that is
/// trimming of wrapping, not repair of the payload.
pub fn parse_action(raw: &str, tool_name: &str) -> Action {
    let text = strip_fence(raw.trim());

    let value: Value = match serde_json::from_str(text) {
        Ok(value) => value,
        Err(_) => return Action::PlainText(raw.trim().to_string()),
    };

    let Value::Object(map) = value else {
        return Action::Violation("payload is JSON but not an object".to_string());
    };

    if let Some(tool) = map.get("tool") {
        if tool.as_str() != Some(tool_name) {
            return Action::Violation(format!(
                "unknown tool {tool}; the only declared tool is `{tool_name}`"
            ));
        }
        return match map
            .get("args")
            .and_then(|args| args.get("code"))
            .and_then(Value::as_str)
        {
            Some(code) => Action::ToolCall {
                code: code.to_string(),
            },
            None => Action::Violation(
                "tool call is missing a string `args.code` payload".to_string(),
            ),
        };
    }

    if let Some(answer) = map.get("answer") {
        return match answer.as_str() {
            Some(text) => Action::Answer(text.to_string()),
            None => Action::Violation("`answer` payload is not a string".to_string()),
        };
    }

    Action::Violation("JSON object is neither a tool call nor an answer".to_string())
}

/// Strip one surrounding ``` fence, if present.
fn strip_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    let Some(body_start) = rest.find('\n') else {
        return text;
    };
    let body = &rest[body_start + 1..];
    body.strip_suffix("```")
        .map(str::trim_end)
        .unwrap_or(text)
}
