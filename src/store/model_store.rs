//! Single-file SQLite store for candidates, sweep results, and reports.
//!
//! The schema is created on open if absent. Result and report rows carry
//! autoincrement primary keys, so insertion order is also listing order.

use eyre::{Context, Result};
use rusqlite::{Connection, OptionalExtension, params};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::fs;
use std::path::Path;

use crate::id::generate_model_id;
use crate::metadata::ExperimentMetadata;
use crate::store::records::{ResultRow, SimulationRecord, StoredReport};

/// Hex SHA-256 of a source text.
pub fn sha256_hex(source: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(source.as_bytes());
    hex::encode(hasher.finalize())
}

fn now_rfc3339() -> String {
    chrono::Utc::now().to_rfc3339()
}

/// Store over one SQLite database file.
pub struct ModelStore {
    db: Connection,
}

impl ModelStore {
    /// Open (or create) the store at the given path, creating parent
    /// directories and the schema as needed.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create store directory: {}", parent.display()))?;
        }
        let db = Connection::open(path)
            .with_context(|| format!("Failed to open database: {}", path.display()))?;
        Self::init_schema(&db)?;
        Ok(Self { db })
    }

    /// In-memory store for tests.
    pub fn open_in_memory() -> Result<Self> {
        let db = Connection::open_in_memory().context("Failed to open in-memory database")?;
        Self::init_schema(&db)?;
        Ok(Self { db })
    }

    fn init_schema(db: &Connection) -> Result<()> {
        db.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS simulations (
                id            TEXT PRIMARY KEY,
                name          TEXT NOT NULL,
                metadata      TEXT NOT NULL,
                source        TEXT NOT NULL,
                source_sha256 TEXT NOT NULL,
                created_at    TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS results (
                id         INTEGER PRIMARY KEY AUTOINCREMENT,
                model_id   TEXT NOT NULL,
                params     TEXT NOT NULL,
                outputs    TEXT NOT NULL,
                created_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_results_model ON results(model_id);

            CREATE TABLE IF NOT EXISTS reports (
                id         INTEGER PRIMARY KEY AUTOINCREMENT,
                model_id   TEXT NOT NULL,
                question   TEXT NOT NULL,
                answer     TEXT NOT NULL,
                artifacts  TEXT NOT NULL,
                created_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_reports_model ON reports(model_id);
            "#,
        )
        .context("Failed to initialize database schema")?;
        Ok(())
    }

    /// Persist a verified candidate; returns its retrieval handle.
    pub fn insert_simulation(
        &self,
        metadata: &ExperimentMetadata,
        source: &str,
    ) -> Result<String> {
        let id = generate_model_id(&metadata.slug());
        let metadata_json =
            serde_json::to_string(metadata).context("Failed to serialize metadata")?;

        self.db
            .execute(
                "INSERT INTO simulations (id, name, metadata, source, source_sha256, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    id,
                    metadata.name,
                    metadata_json,
                    source,
                    sha256_hex(source),
                    now_rfc3339()
                ],
            )
            .context("Failed to insert simulation")?;

        Ok(id)
    }

    /// Fetch a stored candidate by handle.
    pub fn get_simulation(&self, id: &str) -> Result<Option<SimulationRecord>> {
        self.db
            .query_row(
                "SELECT id, name, metadata, source, source_sha256, created_at
                 FROM simulations WHERE id = ?1",
                params![id],
                |row| {
                    let metadata_json: String = row.get(2)?;
                    Ok(SimulationRecord {
                        id: row.get(0)?,
                        name: row.get(1)?,
                        metadata: serde_json::from_str(&metadata_json)
                            .unwrap_or(Value::Null),
                        source: row.get(3)?,
                        source_sha256: row.get(4)?,
                        created_at: row.get(5)?,
                    })
                },
            )
            .optional()
            .context("Failed to query simulation")
    }

    /// Append one sweep output row.
    pub fn insert_result(
        &self,
        model_id: &str,
        params_map: &serde_json::Map<String, Value>,
        outputs: &serde_json::Map<String, Value>,
    ) -> Result<()> {
        self.db
            .execute(
                "INSERT INTO results (model_id, params, outputs, created_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![
                    model_id,
                    serde_json::to_string(params_map).context("Failed to serialize params")?,
                    serde_json::to_string(outputs).context("Failed to serialize outputs")?,
                    now_rfc3339()
                ],
            )
            .context("Failed to insert result row")?;
        Ok(())
    }

    /// All result rows for a candidate, in insertion order.
    pub fn load_results(&self, model_id: &str) -> Result<Vec<ResultRow>> {
        let mut stmt = self
            .db
            .prepare(
                "SELECT model_id, params, outputs, created_at
                 FROM results WHERE model_id = ?1 ORDER BY id",
            )
            .context("Failed to prepare results query")?;

        let rows = stmt
            .query_map(params![model_id], |row| {
                let params_json: String = row.get(1)?;
                let outputs_json: String = row.get(2)?;
                Ok(ResultRow {
                    model_id: row.get(0)?,
                    params: serde_json::from_str(&params_json).unwrap_or_default(),
                    outputs: serde_json::from_str(&outputs_json).unwrap_or_default(),
                    created_at: row.get(3)?,
                })
            })
            .context("Failed to query results")?
            .collect::<std::result::Result<Vec<_>, _>>()
            .context("Failed to read result rows")?;

        Ok(rows)
    }

    /// Merged params+outputs records for dataset assembly, insertion order.
    pub fn load_result_records(
        &self,
        model_id: &str,
    ) -> Result<Vec<serde_json::Map<String, Value>>> {
        Ok(self
            .load_results(model_id)?
            .iter()
            .map(ResultRow::merged)
            .collect())
    }

    /// Append one finalized question/answer record.
    pub fn record_report(
        &self,
        model_id: &str,
        question: &str,
        answer: &str,
        artifacts: &[String],
    ) -> Result<()> {
        self.db
            .execute(
                "INSERT INTO reports (model_id, question, answer, artifacts, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    model_id,
                    question,
                    answer,
                    serde_json::to_string(artifacts).context("Failed to serialize artifacts")?,
                    now_rfc3339()
                ],
            )
            .context("Failed to insert report")?;
        tracing::info!(%model_id, "stored report");
        Ok(())
    }

    /// Stored reports in insertion order, optionally filtered by candidate.
    pub fn list_reports(&self, model_id: Option<&str>) -> Result<Vec<StoredReport>> {
        let (sql, filter) = match model_id {
            Some(id) => (
                "SELECT id, model_id, question, answer, artifacts, created_at
                 FROM reports WHERE model_id = ?1 ORDER BY id",
                Some(id),
            ),
            None => (
                "SELECT id, model_id, question, answer, artifacts, created_at
                 FROM reports ORDER BY id",
                None,
            ),
        };

        let mut stmt = self.db.prepare(sql).context("Failed to prepare reports query")?;
        let map_row = |row: &rusqlite::Row<'_>| {
            let artifacts_json: String = row.get(4)?;
            Ok(StoredReport {
                id: row.get(0)?,
                model_id: row.get(1)?,
                question: row.get(2)?,
                answer: row.get(3)?,
                artifacts: serde_json::from_str(&artifacts_json).unwrap_or_default(),
                created_at: row.get(5)?,
            })
        };

        let reports = match filter {
            Some(id) => stmt
                .query_map(params![id], map_row)
                .context("Failed to query reports")?
                .collect::<std::result::Result<Vec<_>, _>>(),
            None => stmt
                .query_map([], map_row)
                .context("Failed to query reports")?
                .collect::<std::result::Result<Vec<_>, _>>(),
        }
        .context("Failed to read report rows")?;

        Ok(reports)
    }
}
