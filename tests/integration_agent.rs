//! Agent loop integration tests
//!
//! Drives the tool-calling loop with a scripted LLM client and a scripted
//! sandbox: protocol parsing, step budget, cancellation, artifact
//! accumulation, and report persistence. Dataset immutability across calls
//! is exercised against the real process sandbox.

use std::collections::VecDeque;
use std::path::Path;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use simforge::agent::{AgentLoop, AgentState, FlagSignal, NoSignal};
use simforge::config::{AgentConfig, SandboxConfig};
use simforge::dataset::Dataset;
use simforge::llm::MockLlmClient;
use simforge::prompt::PromptRenderer;
use simforge::sandbox::{ExecutionResult, ProcessSandbox, SandboxExecutor};
use simforge::store::ModelStore;

/// Sandbox double that plays back scripted results and counts calls.
struct ScriptedSandbox {
    results: Mutex<VecDeque<ExecutionResult>>,
    calls: AtomicU32,
}

impl ScriptedSandbox {
    fn new(results: Vec<ExecutionResult>) -> Self {
        Self {
            results: Mutex::new(results.into()),
            calls: AtomicU32::new(0),
        }
    }

    fn call_count(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SandboxExecutor for ScriptedSandbox {
    async fn execute_isolated(
        &self,
        _program: &str,
        _dataset: Option<&Dataset>,
        _timeout: Duration,
    ) -> ExecutionResult {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.results
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| ExecutionResult::success("", ""))
    }
}

fn dataset() -> Dataset {
    let records: Vec<serde_json::Map<String, serde_json::Value>> = vec![
        [
            ("L".to_string(), serde_json::json!(1.0)),
            ("X".to_string(), serde_json::json!(17.0)),
        ]
        .into_iter()
        .collect(),
        [
            ("L".to_string(), serde_json::json!(2.0)),
            ("X".to_string(), serde_json::json!(42.0)),
        ]
        .into_iter()
        .collect(),
    ];
    Dataset::from_records(&records)
}

fn agent(llm: Arc<MockLlmClient>, sandbox: Arc<ScriptedSandbox>, max_steps: u32) -> AgentLoop {
    let config = AgentConfig {
        max_steps,
        ..AgentConfig::default()
    };
    AgentLoop::new(llm, sandbox, PromptRenderer::new().unwrap(), config)
}

/// Scenario C: one tool call computing a maximum, then a structured
/// answer; the loop ends in `ModelReturnedAnswer` at step 2.
#[tokio::test]
async fn test_tool_call_then_answer() {
    let llm = Arc::new(MockLlmClient::new(vec![
        r#"{"tool": "python_exec_on_df", "args": {"code": "print(df['X'].max())"}}"#,
        r#"{"answer": "42.0"}"#,
    ]));
    let sandbox = Arc::new(ScriptedSandbox::new(vec![ExecutionResult::success(
        "42.0\n",
        "",
    )]));
    let store = ModelStore::open_in_memory().unwrap();

    let result = agent(llm.clone(), sandbox.clone(), 20)
        .ask(&store, "m1", &dataset(), "what is the maximum of column X", &NoSignal)
        .await
        .unwrap();

    assert_eq!(result.state, AgentState::ModelReturnedAnswer);
    assert_eq!(result.answer, "42.0");
    assert!(result.artifacts.is_empty());
    assert_eq!(result.invocations.len(), 1);
    assert_eq!(result.invocations[0].code, "print(df['X'].max())");
    assert_eq!(result.transcript.steps(), 1);
    assert_eq!(llm.call_count(), 2);
    assert_eq!(sandbox.call_count(), 1);

    // The finalized report was persisted
    let reports = store.list_reports(Some("m1")).unwrap();
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].question, "what is the maximum of column X");
    assert_eq!(reports[0].answer, "42.0");
}

/// The observation fed back to the model carries ok/stdout/stderr/images.
#[tokio::test]
async fn test_observation_appended_to_transcript() {
    let llm = Arc::new(MockLlmClient::new(vec![
        r#"{"tool": "python_exec_on_df", "args": {"code": "print(len(df))"}}"#,
        r#"{"answer": "2 rows"}"#,
    ]));
    let sandbox = Arc::new(ScriptedSandbox::new(vec![ExecutionResult::success("2\n", "")]));
    let store = ModelStore::open_in_memory().unwrap();

    agent(llm.clone(), sandbox, 20)
        .ask(&store, "m1", &dataset(), "how many rows", &NoSignal)
        .await
        .unwrap();

    // Second request sees the observation JSON as the latest turn
    let requests = llm.requests();
    let observation = &requests[1].messages.last().unwrap().content;
    assert!(observation.contains("\"ok\":true"));
    assert!(observation.contains(r#""stdout":"2\n""#));
    assert!(observation.contains("\"images\":[]"));
}

/// A model that only ever violates the protocol terminates at exactly the
/// step budget with the sentinel answer.
#[tokio::test]
async fn test_persistent_violations_exhaust_budget() {
    let llm = Arc::new(MockLlmClient::repeating(r#"{"thought": "let me ponder"}"#));
    let sandbox = Arc::new(ScriptedSandbox::new(vec![]));
    let store = ModelStore::open_in_memory().unwrap();

    let result = agent(llm.clone(), sandbox.clone(), 5)
        .ask(&store, "m1", &dataset(), "anything", &NoSignal)
        .await
        .unwrap();

    assert_eq!(result.state, AgentState::BudgetExhausted);
    assert_eq!(result.answer, "(no answer)");
    assert_eq!(result.transcript.steps(), 5);
    assert_eq!(llm.call_count(), 5);
    assert_eq!(sandbox.call_count(), 0);
    // No report persisted without an answer
    assert!(store.list_reports(None).unwrap().is_empty());
}

/// Each violation is answered with the corrective instruction.
#[tokio::test]
async fn test_violation_gets_corrective_instruction() {
    let llm = Arc::new(MockLlmClient::new(vec![
        r#"{"thought": "hmm"}"#,
        r#"{"answer": "done"}"#,
    ]));
    let sandbox = Arc::new(ScriptedSandbox::new(vec![]));
    let store = ModelStore::open_in_memory().unwrap();

    let result = agent(llm.clone(), sandbox, 20)
        .ask(&store, "m1", &dataset(), "anything", &NoSignal)
        .await
        .unwrap();

    assert_eq!(result.state, AgentState::ModelReturnedAnswer);
    let requests = llm.requests();
    let corrective = &requests[1].messages.last().unwrap().content;
    assert!(corrective.contains("python_exec"));
    assert!(corrective.contains("final answer"));
}

/// Cancellation before the first turn: zero model calls, zero tool
/// invocations, `Cancelled` with the sentinel.
#[tokio::test]
async fn test_pre_cancelled_loop_does_nothing() {
    let llm = Arc::new(MockLlmClient::repeating(r#"{"answer": "never seen"}"#));
    let sandbox = Arc::new(ScriptedSandbox::new(vec![]));
    let store = ModelStore::open_in_memory().unwrap();

    let cancel = FlagSignal::new();
    cancel.set();

    let result = agent(llm.clone(), sandbox.clone(), 20)
        .ask(&store, "m1", &dataset(), "anything", &cancel)
        .await
        .unwrap();

    assert_eq!(result.state, AgentState::Cancelled);
    assert_eq!(result.answer, "(no answer)");
    assert!(result.invocations.is_empty());
    assert_eq!(llm.call_count(), 0);
    assert_eq!(sandbox.call_count(), 0);
}

/// A plain-text turn that is not JSON becomes the final answer.
#[tokio::test]
async fn test_plain_text_fallback_is_final_answer() {
    let llm = Arc::new(MockLlmClient::new(vec!["The maximum of X is 42.0."]));
    let sandbox = Arc::new(ScriptedSandbox::new(vec![]));
    let store = ModelStore::open_in_memory().unwrap();

    let result = agent(llm, sandbox, 20)
        .ask(&store, "m1", &dataset(), "max of X?", &NoSignal)
        .await
        .unwrap();

    assert_eq!(result.state, AgentState::ModelReturnedAnswer);
    assert_eq!(result.answer, "The maximum of X is 42.0.");
    assert_eq!(store.list_reports(Some("m1")).unwrap().len(), 1);
}

/// Artifacts from every tool invocation accumulate in arrival order and
/// land in the persisted report.
#[tokio::test]
async fn test_artifacts_accumulate_across_invocations() {
    let llm = Arc::new(MockLlmClient::new(vec![
        r#"{"tool": "python_exec_on_df", "args": {"code": "plot_a()"}}"#,
        r#"{"tool": "python_exec_on_df", "args": {"code": "plot_b()"}}"#,
        r#"{"answer": "see plots"}"#,
    ]));
    let sandbox = Arc::new(ScriptedSandbox::new(vec![
        ExecutionResult::success("", "").with_artifacts(vec!["plot_1-aaaa.png".to_string()]),
        ExecutionResult::success("", "").with_artifacts(vec!["plot_2-bbbb.png".to_string()]),
    ]));
    let store = ModelStore::open_in_memory().unwrap();

    let result = agent(llm, sandbox, 20)
        .ask(&store, "m1", &dataset(), "plot X against L", &NoSignal)
        .await
        .unwrap();

    assert_eq!(result.artifacts, vec!["plot_1-aaaa.png", "plot_2-bbbb.png"]);
    let reports = store.list_reports(Some("m1")).unwrap();
    assert_eq!(reports[0].artifacts, vec!["plot_1-aaaa.png", "plot_2-bbbb.png"]);
}

/// A failed tool execution is surfaced to the model as an observation, not
/// to the caller; the loop keeps going.
#[tokio::test]
async fn test_execution_failure_surfaced_to_model() {
    let llm = Arc::new(MockLlmClient::new(vec![
        r#"{"tool": "python_exec_on_df", "args": {"code": "df['missing']"}}"#,
        r#"{"answer": "that column does not exist"}"#,
    ]));
    let sandbox = Arc::new(ScriptedSandbox::new(vec![ExecutionResult::runtime_failure(
        "process exited with status 1",
        "",
        "KeyError: 'missing'",
    )]));
    let store = ModelStore::open_in_memory().unwrap();

    let result = agent(llm.clone(), sandbox, 20)
        .ask(&store, "m1", &dataset(), "anything", &NoSignal)
        .await
        .unwrap();

    assert_eq!(result.state, AgentState::ModelReturnedAnswer);
    let requests = llm.requests();
    let observation = &requests[1].messages.last().unwrap().content;
    assert!(observation.contains("\"ok\":false"));
    assert!(observation.contains("KeyError"));
}

/// The system context survives however tight the transcript window gets.
#[tokio::test]
async fn test_system_context_never_dropped() {
    let llm = Arc::new(MockLlmClient::new(vec![
        r#"{"thought": "1"}"#,
        r#"{"thought": "2"}"#,
        r#"{"thought": "3"}"#,
        r#"{"answer": "done"}"#,
    ]));
    let sandbox = Arc::new(ScriptedSandbox::new(vec![]));
    let store = ModelStore::open_in_memory().unwrap();

    let config = AgentConfig {
        max_steps: 20,
        transcript_window: 2,
        ..AgentConfig::default()
    };
    let agent = AgentLoop::new(llm.clone(), sandbox, PromptRenderer::new().unwrap(), config);
    agent
        .ask(&store, "m1", &dataset(), "anything", &NoSignal)
        .await
        .unwrap();

    for request in llm.requests() {
        assert!(request.system.contains("python_exec_on_df"));
        assert!(request.messages.len() <= 2);
    }
}

/// Mutations performed by one invocation do not leak into the next: every
/// call gets a fresh materialization of the dataset.
#[tokio::test]
async fn test_dataset_not_mutated_between_invocations() {
    if !sh_available().await {
        return;
    }
    let dir = tempfile::tempdir().unwrap();
    let sandbox = sh_sandbox(dir.path());
    let ds = dataset();

    let first = sandbox
        .execute_isolated(
            "echo '9.9,9.9' >> data.csv; wc -l < data.csv",
            Some(&ds),
            Duration::from_secs(10),
        )
        .await;
    let second = sandbox
        .execute_isolated("wc -l < data.csv", Some(&ds), Duration::from_secs(10))
        .await;

    assert!(first.ok);
    assert!(second.ok);
    // First call saw its own appended row; the second starts fresh
    assert_eq!(first.stdout.trim(), "4");
    assert_eq!(second.stdout.trim(), "3");
}

fn sh_sandbox(artifact_dir: &Path) -> ProcessSandbox {
    let config = SandboxConfig {
        interpreter: "sh".to_string(),
        artifact_dir: artifact_dir.to_path_buf(),
        timeout_ms: 30000,
        max_output_bytes: 100000,
    };
    ProcessSandbox::new(&config)
}

async fn sh_available() -> bool {
    tokio::process::Command::new("sh")
        .arg("-c")
        .arg("")
        .status()
        .await
        .map(|s| s.success())
        .unwrap_or(false)
}
