//! The agent loop itself.
//!
//! A synchronous sequence of request/response turns. The only suspension
//! points are the model call and the sandboxed execution; cancellation is
//! polled at turn boundaries only, so a request already in flight always
//! completes before the loop notices a stop.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::agent::protocol::{
    Action, CORRECTIVE_INSTRUCTION, NO_ANSWER_SENTINEL, Observation, TOOL_NAME, ToolInvocation,
    parse_action,
};
use crate::agent::transcript::Transcript;
use crate::config::AgentConfig;
use crate::dataset::Dataset;
use crate::error::{Result, SimforgeError};
use crate::llm::{ChatRequest, LlmClient};
use crate::prompt::PromptRenderer;
use crate::sandbox::{SandboxExecutor, query_program};
use crate::store::ModelStore;

/// Cooperative cancellation, polled at turn boundaries.
pub trait SignalProbe: Send + Sync {
    fn cancelled(&self) -> bool;
}

/// Probe that never signals; for callers without a cancel path.
pub struct NoSignal;

impl SignalProbe for NoSignal {
    fn cancelled(&self) -> bool {
        false
    }
}

/// Probe backed by a shared flag; flip it from a signal handler or a test.
#[derive(Clone, Default)]
pub struct FlagSignal(Arc<AtomicBool>);

impl FlagSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

impl SignalProbe for FlagSignal {
    fn cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// How the loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentState {
    /// The model returned a final answer (structured or plain text)
    ModelReturnedAnswer,
    /// Cancellation observed at a turn boundary
    Cancelled,
    /// Step budget reached without a terminal turn
    BudgetExhausted,
}

/// What one `ask` invocation produced.
#[derive(Debug, Clone)]
pub struct AgentResult {
    pub answer: String,
    /// Every artifact from every tool invocation, arrival order
    pub artifacts: Vec<String>,
    /// Tool invocations processed, one per consuming turn
    pub invocations: Vec<ToolInvocation>,
    pub transcript: Transcript,
    pub state: AgentState,
}

/// Drives one question against a bound dataset.
pub struct AgentLoop {
    llm: Arc<dyn LlmClient>,
    sandbox: Arc<dyn SandboxExecutor>,
    renderer: PromptRenderer,
    config: AgentConfig,
}

impl AgentLoop {
    pub fn new(
        llm: Arc<dyn LlmClient>,
        sandbox: Arc<dyn SandboxExecutor>,
        renderer: PromptRenderer,
        config: AgentConfig,
    ) -> Self {
        Self {
            llm,
            sandbox,
            renderer,
            config,
        }
    }

    /// Answer `question` about `dataset`, persisting the finalized report.
    ///
    /// Execution failures are surfaced to the model as observations, never
    /// to the caller; cancellation and budget exhaustion end the loop with
    /// a structured partial result carrying the sentinel answer.
    pub async fn ask(
        &self,
        store: &ModelStore,
        model_id: &str,
        dataset: &Dataset,
        question: &str,
        cancel: &dyn SignalProbe,
    ) -> Result<AgentResult> {
        let system = self.renderer.agent_system(TOOL_NAME, &dataset.columns)?;
        let mut transcript = Transcript::new(system);
        transcript.push_user(question);

        let mut artifacts: Vec<String> = Vec::new();
        let mut invocations: Vec<ToolInvocation> = Vec::new();
        let tool_timeout = Duration::from_millis(self.config.tool_timeout_ms);

        loop {
            if cancel.cancelled() {
                tracing::info!(steps = transcript.steps(), "cancellation observed");
                return Ok(AgentResult {
                    answer: NO_ANSWER_SENTINEL.to_string(),
                    artifacts,
                    invocations,
                    transcript,
                    state: AgentState::Cancelled,
                });
            }

            if transcript.steps() >= self.config.max_steps {
                tracing::warn!(budget = self.config.max_steps, "step budget exhausted");
                return Ok(AgentResult {
                    answer: NO_ANSWER_SENTINEL.to_string(),
                    artifacts,
                    invocations,
                    transcript,
                    state: AgentState::BudgetExhausted,
                });
            }

            let request = ChatRequest::new(transcript.system())
                .with_messages(transcript.window(self.config.transcript_window));
            let response = self
                .llm
                .complete(request)
                .await
                .map_err(|e| SimforgeError::Llm(e.to_string()))?;

            let turn_index = transcript.next_index();
            transcript.push_assistant(&response.content);

            match parse_action(&response.content, TOOL_NAME) {
                Action::ToolCall { code } => {
                    tracing::debug!(step = transcript.steps() + 1, "model requested tool");
                    let result = self
                        .sandbox
                        .execute_isolated(&query_program(&code), Some(dataset), tool_timeout)
                        .await;
                    artifacts.extend(result.artifacts.iter().cloned());

                    let observation = Observation::from(&result);
                    transcript.push_tool(serde_json::to_string(&observation)?);
                    invocations.push(ToolInvocation { code, turn_index });
                    transcript.count_step();
                }
                Action::Answer(answer) | Action::PlainText(answer) => {
                    tracing::info!(steps = transcript.steps(), "model returned answer");
                    store
                        .record_report(model_id, question, &answer, &artifacts)
                        .map_err(|e| SimforgeError::Storage(e.to_string()))?;
                    return Ok(AgentResult {
                        answer,
                        artifacts,
                        invocations,
                        transcript,
                        state: AgentState::ModelReturnedAnswer,
                    });
                }
                Action::Violation(reason) => {
                    tracing::warn!(%reason, "protocol violation");
                    transcript.push_user(CORRECTIVE_INSTRUCTION);
                    transcript.count_step();
                }
            }
        }
    }
}
