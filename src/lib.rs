//! simforge - generate, verify, and interrogate machine-written simulations.
//!
//! Two bounded, self-correcting control loops share one isolated execution
//! harness: the generation-repair pipeline turns model-authored candidate
//! programs into verified artifacts, and the tool-calling agent loop lets a
//! model interrogate the resulting dataset through sandboxed code execution
//! under a strict protocol, a step budget, and cooperative cancellation.

pub mod agent;
pub mod cli;
pub mod codegen;
pub mod config;
pub mod dataset;
pub mod error;
pub mod id;
pub mod llm;
pub mod metadata;
pub mod prompt;
pub mod sandbox;
pub mod store;
pub mod sweep;

pub use error::{Result, SimforgeError};
