//! Batch runner: one sandboxed entry-point call per parameter set.
//!
//! Each grid row wraps the verified candidate in the sweep harness, runs it
//! in isolation, and persists either the merged params+outputs record or a
//! per-row `{"error": …}` marker. A failing row never aborts the batch.

use std::time::Duration;

use eyre::{Context, Result, eyre};
use serde_json::Value;

use crate::sandbox::{ExecutionResult, SandboxExecutor, sweep_program};
use crate::store::ModelStore;

/// Run a verified candidate once per grid row; returns the number of
/// persisted result rows (every row persists, failed or not).
pub async fn run_batch(
    store: &ModelStore,
    sandbox: &dyn SandboxExecutor,
    model_id: &str,
    grid: &[serde_json::Map<String, Value>],
    timeout: Duration,
) -> Result<usize> {
    let record = store
        .get_simulation(model_id)
        .context("Failed to load simulation")?
        .ok_or_else(|| eyre!("No simulation stored under handle '{model_id}'"))?;

    for (row, params) in grid.iter().enumerate() {
        tracing::info!(row, total = grid.len(), "sweep row");
        let program = sweep_program(&record.source, params);
        let result = sandbox.execute_isolated(&program, None, timeout).await;

        let outputs = match extract_outputs(&result) {
            Ok(outputs) => outputs,
            Err(message) => {
                tracing::warn!(row, %message, "sweep row failed");
                let mut marker = serde_json::Map::new();
                marker.insert("error".to_string(), Value::String(message));
                marker
            }
        };

        store
            .insert_result(model_id, params, &outputs)
            .context("Failed to persist sweep row")?;
    }

    Ok(grid.len())
}

/// Parse the harness' JSON record off the last stdout line, or describe
/// why the run produced none.
fn extract_outputs(
    result: &ExecutionResult,
) -> std::result::Result<serde_json::Map<String, Value>, String> {
    if !result.ok {
        let detail = if result.stderr.trim().is_empty() {
            result
                .diagnostic
                .as_ref()
                .map(|d| d.message.clone())
                .unwrap_or_else(|| "execution failed".to_string())
        } else {
            last_line(&result.stderr)
        };
        return Err(detail);
    }

    let line = last_line(&result.stdout);
    match serde_json::from_str::<Value>(&line) {
        Ok(Value::Object(outputs)) => Ok(outputs),
        Ok(_) => Err(format!("entry point printed a non-record result: {line}")),
        Err(_) => Err(format!("entry point printed no JSON record: {line}")),
    }
}

fn last_line(text: &str) -> String {
    text.lines()
        .rev()
        .find(|l| !l.trim().is_empty())
        .unwrap_or("")
        .trim()
        .to_string()
}
