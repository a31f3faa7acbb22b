//! The generation-repair loop.
//!
//! Bounded attempts to obtain a verified candidate program: request source
//! from the model, sanitize, validate, smoke-test in the sandbox, persist.
//! Each failure becomes annotated feedback appended to the conversation, so
//! the next attempt sees what went wrong. Only exhausting every attempt
//! surfaces to the caller.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::codegen::feedback::{runtime_feedback, validation_feedback};
use crate::codegen::sanitize::sanitize;
use crate::codegen::validate::validate_structure;
use crate::config::CodegenConfig;
use crate::error::{Result, SimforgeError};
use crate::llm::{ChatRequest, LlmClient, Message};
use crate::metadata::ExperimentMetadata;
use crate::prompt::PromptRenderer;
use crate::sandbox::{SandboxExecutor, smoke_program};
use crate::store::ModelStore;

/// How far a candidate has progressed through verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationStatus {
    Unvalidated,
    StructurallyValid,
    ExecutionVerified,
}

/// A model-authored program on its way through the pipeline.
///
/// Owned by the repair loop until persisted; immutable once verified.
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateProgram {
    pub source: String,
    pub status: ValidationStatus,
    /// 1-based attempt that produced this candidate
    pub attempt: u32,
}

impl CandidateProgram {
    pub fn new(source: String, attempt: u32) -> Self {
        Self {
            source,
            status: ValidationStatus::Unvalidated,
            attempt,
        }
    }
}

/// Drives the generation-repair loop against an LLM and a sandbox.
pub struct CodeGenerator {
    llm: Arc<dyn LlmClient>,
    sandbox: Arc<dyn SandboxExecutor>,
    renderer: PromptRenderer,
    config: CodegenConfig,
}

impl CodeGenerator {
    pub fn new(
        llm: Arc<dyn LlmClient>,
        sandbox: Arc<dyn SandboxExecutor>,
        renderer: PromptRenderer,
        config: CodegenConfig,
    ) -> Self {
        Self {
            llm,
            sandbox,
            renderer,
            config,
        }
    }

    /// Obtain a verified candidate for `metadata` and persist it.
    ///
    /// Returns the handle the stored candidate can later be retrieved by.
    /// The only hard failure is `ExhaustedAttempts`; every validation or
    /// smoke-test failure is folded into the next attempt's prompt.
    pub async fn generate_verified(
        &self,
        store: &ModelStore,
        metadata: &ExperimentMetadata,
    ) -> Result<String> {
        let system = self.renderer.codegen_system(metadata)?;
        let mut messages = vec![Message::user(self.renderer.codegen_request()?)];
        let smoke_timeout = Duration::from_millis(self.config.smoke_timeout_ms);

        for attempt in 1..=self.config.max_attempts {
            tracing::info!(attempt, max = self.config.max_attempts, "requesting candidate");

            let request = ChatRequest::new(system.clone()).with_messages(messages.clone());
            let response = self
                .llm
                .complete(request)
                .await
                .map_err(|e| SimforgeError::Llm(e.to_string()))?;
            messages.push(Message::assistant(&response.content));

            let mut candidate = CandidateProgram::new(sanitize(&response.content), attempt);

            if let Err(error) = validate_structure(&candidate.source) {
                tracing::info!(attempt, %error, "candidate rejected by validator");
                let feedback =
                    validation_feedback(&candidate.source, &error, self.config.context_lines);
                messages.push(Message::user(self.renderer.codegen_repair(&feedback)?));
                continue;
            }
            candidate.status = ValidationStatus::StructurallyValid;

            let result = self
                .sandbox
                .execute_isolated(&smoke_program(&candidate.source), None, smoke_timeout)
                .await;

            if !result.ok {
                tracing::info!(
                    attempt,
                    diagnostic = ?result.diagnostic,
                    "candidate failed smoke test"
                );
                let feedback = runtime_feedback(&result, self.config.traceback_tail_lines);
                messages.push(Message::user(self.renderer.codegen_repair(&feedback)?));
                continue;
            }
            candidate.status = ValidationStatus::ExecutionVerified;

            let handle = store
                .insert_simulation(metadata, &candidate.source)
                .map_err(|e| SimforgeError::Storage(e.to_string()))?;
            tracing::info!(attempt, %handle, "candidate verified and persisted");
            return Ok(handle);
        }

        tracing::warn!(
            attempts = self.config.max_attempts,
            "generation attempts exhausted"
        );
        Err(SimforgeError::ExhaustedAttempts {
            attempts: self.config.max_attempts,
        })
    }
}
