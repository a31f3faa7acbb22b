//! Program builders for sandboxed runs.
//!
//! The executor runs exactly one program file per call; these builders wrap
//! a candidate source or an ad hoc snippet into that program. Helper
//! imports inside the appended runner block are underscore-prefixed so they
//! cannot shadow names in model-authored code.

use serde_json::Value;

/// File name the executor writes the program under in the scratch dir
pub const PROGRAM_FILE: &str = "program.py";

/// File name the dataset is materialized under, and which query programs read
pub const DATASET_FILE: &str = "data.csv";

/// Wrap a candidate program for a smoke run: call the entry point with its
/// default arguments, require a dict-shaped return, and print a schema-v1
/// summary line on success.
pub fn smoke_program(candidate: &str) -> String {
    format!(
        r#"{candidate}

if __name__ == "__main__":
    import json as _json
    import sys as _sys
    import traceback as _traceback
    try:
        _result = simulate()
    except Exception:
        _traceback.print_exc()
        _sys.exit(1)
    if not isinstance(_result, dict):
        _sys.stderr.write("simulate() must return a dict, got %s\n" % type(_result).__name__)
        _sys.exit(1)
    print(_json.dumps({{"ok": True, "schema": 1, "keys": sorted(_result.keys())}}))
"#
    )
}

/// Wrap a candidate program for one sweep row: call the entry point with the
/// given keyword parameters and print the returned record as JSON.
pub fn sweep_program(candidate: &str, params: &serde_json::Map<String, Value>) -> String {
    let params_json = serde_json::to_string(&Value::Object(params.clone()))
        .unwrap_or_else(|_| "{}".to_string());
    let params_literal = python_string_literal(&params_json);
    format!(
        r#"{candidate}

if __name__ == "__main__":
    import json as _json
    import sys as _sys
    import traceback as _traceback
    _params = _json.loads("{params_literal}")
    try:
        _result = simulate(**_params)
    except Exception:
        _traceback.print_exc()
        _sys.exit(1)
    if not isinstance(_result, dict):
        _sys.stderr.write("simulate() must return a dict, got %s\n" % type(_result).__name__)
        _sys.exit(1)
    print(_json.dumps(_result))
"#
    )
}

/// Escape text for splicing into a double-quoted Python string literal.
///
/// Compact JSON never contains raw newlines or control characters, so
/// backslashes and double quotes are the only characters that need escaping.
fn python_string_literal(text: &str) -> String {
    text.replace('\\', "\\\\").replace('"', "\\\"")
}

/// Wrap an agent snippet for a dataset query: the dataset CSV is loaded into
/// a dataframe bound as `df` before the snippet runs.
pub fn query_program(snippet: &str) -> String {
    format!(
        r#"import pandas as pd

df = pd.read_csv("{DATASET_FILE}")

{snippet}
"#
    )
}
