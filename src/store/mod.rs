//! SQLite-backed persistence.
//!
//! Three tables: verified candidates (`simulations`), sweep output rows
//! (`results`), and finalized question/answer records (`reports`). Reports
//! are append-only; no update or delete surface exists for them.

pub mod model_store;
pub mod records;

pub use model_store::ModelStore;
pub use records::{ResultRow, SimulationRecord, StoredReport};
