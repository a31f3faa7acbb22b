//! Isolated execution of untrusted, model-authored code.
//!
//! Every run happens in a child process with a hard wall-clock timeout,
//! captured output streams, and artifact detection by directory snapshot.
//! The executor converts every failure mode into a structured result and
//! never raises to its caller.

pub mod executor;
pub mod harness;

pub use executor::{
    Diagnostic, DiagnosticKind, ExecutionResult, ProcessSandbox, SandboxExecutor,
};
pub use harness::{DATASET_FILE, PROGRAM_FILE, query_program, smoke_program, sweep_program};
