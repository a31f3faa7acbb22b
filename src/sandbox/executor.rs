//! Process-level sandbox.
//!
//! Each call writes the program (and the dataset, when bound) into a fresh
//! scratch directory, spawns the configured interpreter on it, and waits
//! under a hard wall-clock timeout. The child is killed when the timeout
//! fires. New files left in the scratch directory are detected by snapshot
//! diff and copied out under freshly generated unique names.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

use crate::config::SandboxConfig;
use crate::dataset::Dataset;
use crate::id::generate_artifact_id;
use crate::sandbox::harness::{DATASET_FILE, PROGRAM_FILE};

/// What went wrong during an isolated run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagnosticKind {
    /// Wall-clock limit hit; the child was killed
    Timeout,
    /// The program ran and failed (exception, nonzero exit, bad return shape)
    Runtime,
    /// The run never started (scratch dir, spawn, or I/O failure)
    Setup,
}

/// Structured failure description attached to a result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub message: String,
}

impl Diagnostic {
    pub fn timeout(message: impl Into<String>) -> Self {
        Self {
            kind: DiagnosticKind::Timeout,
            message: message.into(),
        }
    }

    pub fn runtime(message: impl Into<String>) -> Self {
        Self {
            kind: DiagnosticKind::Runtime,
            message: message.into(),
        }
    }

    pub fn setup(message: impl Into<String>) -> Self {
        Self {
            kind: DiagnosticKind::Setup,
            message: message.into(),
        }
    }
}

/// Outcome of one isolated run. Never mutated after return.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub ok: bool,
    pub stdout: String,
    pub stderr: String,
    /// Unique references to files created during the run, one per file
    pub artifacts: Vec<String>,
    pub diagnostic: Option<Diagnostic>,
}

impl ExecutionResult {
    pub fn success(stdout: impl Into<String>, stderr: impl Into<String>) -> Self {
        Self {
            ok: true,
            stdout: stdout.into(),
            stderr: stderr.into(),
            artifacts: Vec::new(),
            diagnostic: None,
        }
    }

    pub fn runtime_failure(
        message: impl Into<String>,
        stdout: impl Into<String>,
        stderr: impl Into<String>,
    ) -> Self {
        Self {
            ok: false,
            stdout: stdout.into(),
            stderr: stderr.into(),
            artifacts: Vec::new(),
            diagnostic: Some(Diagnostic::runtime(message)),
        }
    }

    pub fn timeout(limit: Duration) -> Self {
        Self {
            ok: false,
            stdout: String::new(),
            stderr: String::new(),
            artifacts: Vec::new(),
            diagnostic: Some(Diagnostic::timeout(format!(
                "execution timed out after {}ms",
                limit.as_millis()
            ))),
        }
    }

    pub fn setup_failure(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            stdout: String::new(),
            stderr: String::new(),
            artifacts: Vec::new(),
            diagnostic: Some(Diagnostic::setup(message)),
        }
    }

    pub fn with_artifacts(mut self, artifacts: Vec<String>) -> Self {
        self.artifacts = artifacts;
        self
    }

    /// True when the run failed on the wall-clock limit
    pub fn timed_out(&self) -> bool {
        matches!(
            self.diagnostic,
            Some(Diagnostic {
                kind: DiagnosticKind::Timeout,
                ..
            })
        )
    }
}

/// Seam for isolated execution.
///
/// The method is infallible by contract: every failure mode is folded into
/// the returned result.
#[async_trait]
pub trait SandboxExecutor: Send + Sync {
    async fn execute_isolated(
        &self,
        program: &str,
        dataset: Option<&Dataset>,
        timeout: Duration,
    ) -> ExecutionResult;
}

/// Sandbox backed by a child OS process per call.
pub struct ProcessSandbox {
    interpreter: String,
    artifact_dir: PathBuf,
    max_output_bytes: usize,
}

impl ProcessSandbox {
    pub fn new(config: &SandboxConfig) -> Self {
        Self {
            interpreter: config.interpreter.clone(),
            artifact_dir: config.artifact_dir.clone(),
            max_output_bytes: config.max_output_bytes,
        }
    }

    /// Override the interpreter
    pub fn with_interpreter(mut self, interpreter: impl Into<String>) -> Self {
        self.interpreter = interpreter.into();
        self
    }

    /// Check whether the configured interpreter can be spawned at all
    pub async fn is_available(&self) -> bool {
        Command::new(&self.interpreter)
            .arg("-c")
            .arg("")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
            .map(|s| s.success())
            .unwrap_or(false)
    }

    fn cap_output(&self, raw: &[u8]) -> String {
        let s = String::from_utf8_lossy(raw);
        if s.len() <= self.max_output_bytes {
            return s.into_owned();
        }
        let mut end = self.max_output_bytes;
        while !s.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}\n... (output truncated)", &s[..end])
    }

    fn collect_artifacts(&self, scratch: &Path, before: &HashSet<OsString>) -> Vec<String> {
        let mut new_files: Vec<OsString> = match std::fs::read_dir(scratch) {
            Ok(entries) => entries
                .filter_map(|e| e.ok())
                .filter(|e| e.file_type().map(|t| t.is_file()).unwrap_or(false))
                .map(|e| e.file_name())
                .filter(|name| !before.contains(name))
                .collect(),
            Err(e) => {
                tracing::warn!("failed to rescan scratch dir: {}", e);
                return Vec::new();
            }
        };
        new_files.sort();

        if new_files.is_empty() {
            return Vec::new();
        }

        if let Err(e) = std::fs::create_dir_all(&self.artifact_dir) {
            tracing::warn!(
                "failed to create artifact dir {}: {}",
                self.artifact_dir.display(),
                e
            );
            return Vec::new();
        }

        let mut artifacts = Vec::new();
        for name in new_files {
            let ext = Path::new(&name)
                .extension()
                .map(|e| format!(".{}", e.to_string_lossy()))
                .unwrap_or_default();
            let unique = format!("plot_{}{}", generate_artifact_id(), ext);
            match std::fs::copy(scratch.join(&name), self.artifact_dir.join(&unique)) {
                Ok(_) => artifacts.push(unique),
                Err(e) => tracing::warn!("failed to collect artifact {:?}: {}", name, e),
            }
        }
        artifacts
    }
}

fn snapshot_dir(dir: &Path) -> HashSet<OsString> {
    std::fs::read_dir(dir)
        .map(|entries| entries.filter_map(|e| e.ok()).map(|e| e.file_name()).collect())
        .unwrap_or_default()
}

#[async_trait]
impl SandboxExecutor for ProcessSandbox {
    async fn execute_isolated(
        &self,
        program: &str,
        dataset: Option<&Dataset>,
        timeout: Duration,
    ) -> ExecutionResult {
        let scratch = match tempfile::tempdir() {
            Ok(dir) => dir,
            Err(e) => {
                return ExecutionResult::setup_failure(format!(
                    "failed to create scratch dir: {}",
                    e
                ));
            }
        };

        if let Err(e) = std::fs::write(scratch.path().join(PROGRAM_FILE), program) {
            return ExecutionResult::setup_failure(format!("failed to write program: {}", e));
        }

        // Immutable per-call view: a fresh CSV every time, never shared
        if let Some(ds) = dataset {
            if let Err(e) = std::fs::write(scratch.path().join(DATASET_FILE), ds.to_csv()) {
                return ExecutionResult::setup_failure(format!("failed to write dataset: {}", e));
            }
        }

        let before = snapshot_dir(scratch.path());

        let mut cmd = Command::new(&self.interpreter);
        cmd.arg(PROGRAM_FILE)
            .current_dir(scratch.path())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let child = match cmd.spawn() {
            Ok(child) => child,
            Err(e) => {
                return ExecutionResult::setup_failure(format!(
                    "failed to spawn {}: {}",
                    self.interpreter, e
                ));
            }
        };

        let output = match tokio::time::timeout(timeout, child.wait_with_output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                return ExecutionResult::setup_failure(format!(
                    "failed to collect process output: {}",
                    e
                ));
            }
            Err(_) => {
                // Dropping the wait future kills the child (kill_on_drop)
                tracing::debug!("sandboxed run hit {}ms wall-clock limit", timeout.as_millis());
                return ExecutionResult::timeout(timeout);
            }
        };

        let stdout = self.cap_output(&output.stdout);
        let stderr = self.cap_output(&output.stderr);
        let artifacts = self.collect_artifacts(scratch.path(), &before);

        if output.status.success() {
            ExecutionResult::success(stdout, stderr).with_artifacts(artifacts)
        } else {
            let code = output.status.code().unwrap_or(-1);
            ExecutionResult::runtime_failure(
                format!("process exited with status {}", code),
                stdout,
                stderr,
            )
            .with_artifacts(artifacts)
        }
    }
}
