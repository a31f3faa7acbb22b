//! Error types for simforge
//!
//! Centralized error handling using thiserror.

use thiserror::Error;

/// All error types that can occur in simforge
#[derive(Debug, Error)]
pub enum SimforgeError {
    /// Candidate source failed structural validation
    #[error("Structural validation failed: {0}")]
    Structural(String),

    /// Candidate source failed to parse
    #[error("Syntax error at line {line}, column {col}: {message}")]
    Syntax {
        line: usize,
        col: usize,
        message: String,
    },

    /// Generation-repair loop used every attempt without a verified candidate
    #[error("Exhausted {attempts} generation attempts without a verified candidate")]
    ExhaustedAttempts { attempts: u32 },

    /// Storage/persistence error
    #[error("Storage error: {0}")]
    Storage(String),

    /// LLM API error
    #[error("LLM error: {0}")]
    Llm(String),

    /// Prompt template registration or rendering error
    #[error("Template error: {0}")]
    Template(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for simforge operations
pub type Result<T> = std::result::Result<T, SimforgeError>;
