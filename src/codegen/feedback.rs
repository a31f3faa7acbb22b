//! Failure feedback folded into repair prompts.
//!
//! Syntax failures embed the failing line plus a fixed context window with
//! the offending line annotated; runtime failures embed the tail of the
//! captured diagnostic. Both are plain text, ready for the repair template.

use crate::codegen::validate::ValidationError;
use crate::sandbox::ExecutionResult;

/// Render a validation failure as repair feedback.
///
/// For syntax errors the failing line is shown with `context` lines on each
/// side and a `→` marker; structural errors carry just the message.
pub fn validation_feedback(source: &str, error: &ValidationError, context: usize) -> String {
    match error {
        ValidationError::Syntax { line, .. } => {
            format!(
                "{error}\nContext:\n{}",
                annotated_context(source, *line, context)
            )
        }
        ValidationError::Structural { .. } => error.to_string(),
    }
}

/// Render a smoke-test failure as repair feedback, keeping the last
/// `tail` lines of the captured diagnostic.
pub fn runtime_feedback(result: &ExecutionResult, tail: usize) -> String {
    let trace = if result.stderr.trim().is_empty() {
        result
            .diagnostic
            .as_ref()
            .map(|d| d.message.clone())
            .unwrap_or_default()
    } else {
        result.stderr.clone()
    };

    let lines: Vec<&str> = trace.lines().collect();
    let start = lines.len().saturating_sub(tail);
    let tail_text = lines[start..].join("\n");

    if tail_text.trim().is_empty() {
        "Runtime failure during smoke test:\n<no traceback captured>".to_string()
    } else {
        format!("Runtime failure during smoke test:\n{tail_text}")
    }
}

/// The failing line ± `around` lines, each prefixed with its 1-based number
/// and the failing line marked with `→`.
fn annotated_context(source: &str, lineno: usize, around: usize) -> String {
    let lines: Vec<&str> = source.lines().collect();
    if lines.is_empty() {
        return "<empty source>".to_string();
    }

    let first = lineno.saturating_sub(around).max(1);
    let last = (lineno + around).min(lines.len());

    (first..=last)
        .map(|i| {
            let marker = if i == lineno { '→' } else { ' ' };
            format!("{marker} {i:>4}: {}", lines[i - 1])
        })
        .collect::<Vec<_>>()
        .join("\n")
}
