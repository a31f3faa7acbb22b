//! Persisted record types.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A verified candidate program as stored.
///
/// The source is persisted byte-identical to the verified candidate; the
/// SHA-256 lets callers detect corruption or out-of-band edits.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SimulationRecord {
    /// Handle the candidate is retrieved by
    pub id: String,
    /// Designated experiment name
    pub name: String,
    /// Originating metadata, as supplied
    pub metadata: Value,
    /// Verified source text
    pub source: String,
    /// Hex SHA-256 of `source`
    pub source_sha256: String,
    /// RFC 3339 creation timestamp
    pub created_at: String,
}

impl SimulationRecord {
    /// True when the stored hash still matches the stored source.
    pub fn integrity_ok(&self) -> bool {
        crate::store::model_store::sha256_hex(&self.source) == self.source_sha256
    }
}

/// One sweep output row: the parameters a run was called with, merged with
/// what the entry point returned (or an `{"error": …}` marker).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResultRow {
    pub model_id: String,
    pub params: serde_json::Map<String, Value>,
    pub outputs: serde_json::Map<String, Value>,
    /// RFC 3339 creation timestamp
    pub created_at: String,
}

impl ResultRow {
    /// Merge params and outputs into one flat record, outputs last.
    pub fn merged(&self) -> serde_json::Map<String, Value> {
        let mut merged = self.params.clone();
        for (key, value) in &self.outputs {
            merged.insert(key.clone(), value.clone());
        }
        merged
    }

    /// True when this row records a failed run instead of outputs.
    pub fn is_error(&self) -> bool {
        self.outputs.contains_key("error")
    }
}

/// A finalized question/answer record. Append-only.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StoredReport {
    pub id: i64,
    pub model_id: String,
    pub question: String,
    pub answer: String,
    /// Artifact references accumulated during the session, arrival order
    pub artifacts: Vec<String>,
    /// RFC 3339 creation timestamp
    pub created_at: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_result_row_merged_outputs_win() {
        let mut params = serde_json::Map::new();
        params.insert("L".to_string(), json!(1.0));
        let mut outputs = serde_json::Map::new();
        outputs.insert("period".to_string(), json!(2.0));
        outputs.insert("L".to_string(), json!(99.0));

        let row = ResultRow {
            model_id: "m".to_string(),
            params,
            outputs,
            created_at: String::new(),
        };
        let merged = row.merged();
        assert_eq!(merged.get("L").unwrap(), &json!(99.0));
        assert_eq!(merged.get("period").unwrap(), &json!(2.0));
    }

    #[test]
    fn test_result_row_error_marker() {
        let mut outputs = serde_json::Map::new();
        outputs.insert("error".to_string(), json!("boom"));
        let row = ResultRow {
            model_id: "m".to_string(),
            params: serde_json::Map::new(),
            outputs,
            created_at: String::new(),
        };
        assert!(row.is_error());
    }

    #[test]
    fn test_stored_report_roundtrip() {
        let report = StoredReport {
            id: 1,
            model_id: "m".to_string(),
            question: "q".to_string(),
            answer: "a".to_string(),
            artifacts: vec!["plot_1-a1b2.png".to_string()],
            created_at: "2025-01-01T00:00:00Z".to_string(),
        };
        let json = serde_json::to_string(&report).unwrap();
        let restored: StoredReport = serde_json::from_str(&json).unwrap();
        assert_eq!(report, restored);
    }
}
