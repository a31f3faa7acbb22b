//! Tabular dataset assembled from stored sweep results.
//!
//! The agent loop binds one of these per question. Executed code never
//! touches the dataset in place: each tool invocation gets a fresh CSV
//! materialization inside its own scratch directory, so mutations die with
//! the child process.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Named columns plus rows of JSON values.
///
/// Column order is the order of first appearance across the source
/// records; rows missing a column carry `Value::Null` in that cell.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Dataset {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl Dataset {
    /// Assemble a dataset from record maps (typically merged params+outputs
    /// rows loaded from the results table).
    pub fn from_records(records: &[serde_json::Map<String, Value>]) -> Self {
        let mut columns: Vec<String> = Vec::new();
        for record in records {
            for key in record.keys() {
                if !columns.iter().any(|c| c == key) {
                    columns.push(key.clone());
                }
            }
        }

        let rows = records
            .iter()
            .map(|record| {
                columns
                    .iter()
                    .map(|col| record.get(col).cloned().unwrap_or(Value::Null))
                    .collect()
            })
            .collect();

        Self { columns, rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Render as CSV for the read-only binding handed to executed code.
    pub fn to_csv(&self) -> String {
        let mut out = String::new();
        out.push_str(
            &self
                .columns
                .iter()
                .map(|c| csv_escape(c))
                .collect::<Vec<_>>()
                .join(","),
        );
        out.push('\n');

        for row in &self.rows {
            let line = row
                .iter()
                .map(|cell| match cell {
                    Value::Null => String::new(),
                    Value::String(s) => csv_escape(s),
                    // Arrays and objects serialize with commas and quotes
                    other => csv_escape(&other.to_string()),
                })
                .collect::<Vec<_>>()
                .join(",");
            out.push_str(&line);
            out.push('\n');
        }

        out
    }
}

fn csv_escape(field: &str) -> String {
    if field.contains(',') || field.contains('"') || field.contains('\n') {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}
