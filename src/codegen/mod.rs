//! Generation-repair pipeline.
//!
//! Turns a candidate program produced by a language model into a verified,
//! executable artifact: sanitize the raw response, run cheap static checks,
//! smoke-test in the sandbox, and fold every failure back into the next
//! prompt. Only exhausting every attempt surfaces as an error.

pub mod feedback;
pub mod generator;
pub mod sanitize;
pub mod validate;

pub use generator::{CandidateProgram, CodeGenerator, ValidationStatus};
pub use sanitize::sanitize;
pub use validate::{ValidationError, validate_structure};
