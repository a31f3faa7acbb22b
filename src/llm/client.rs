//! Core LLM client trait and test double.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;

use crate::llm::types::{ChatRequest, ChatResponse, Usage};

/// Stateless LLM client - each call is independent
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Single completion request (blocking until complete)
    async fn complete(&self, request: ChatRequest) -> Result<ChatResponse, LlmError>;

    /// Model identifier reported in persisted records
    fn model(&self) -> &str;
}

/// Errors that can occur during LLM operations
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("API error {status}: {message}")]
    ApiError { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("JSON parsing error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Missing API key: environment variable {env_var} not set")]
    MissingApiKey { env_var: String },
}

/// Scripted LLM client for tests.
///
/// Returns canned responses in order and records every request it receives
/// so tests can assert on prompt contents. When the script runs out, the
/// last response repeats, which lets tests model a client that keeps
/// emitting the same turn forever.
pub struct MockLlmClient {
    responses: Mutex<VecDeque<String>>,
    last: Mutex<Option<String>>,
    requests: Mutex<Vec<ChatRequest>>,
}

impl MockLlmClient {
    /// Create a mock that plays back the given responses in order
    pub fn new(responses: Vec<&str>) -> Self {
        Self {
            responses: Mutex::new(responses.into_iter().map(String::from).collect()),
            last: Mutex::new(None),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Create a mock that returns the same response on every call
    pub fn repeating(response: &str) -> Self {
        Self::new(vec![response])
    }

    /// Requests received so far, in call order
    pub fn requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Number of completions served
    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl LlmClient for MockLlmClient {
    async fn complete(&self, request: ChatRequest) -> Result<ChatResponse, LlmError> {
        self.requests.lock().unwrap().push(request);

        let mut responses = self.responses.lock().unwrap();
        let mut last = self.last.lock().unwrap();
        let content = match responses.pop_front() {
            Some(next) => {
                *last = Some(next.clone());
                next
            }
            None => last
                .clone()
                .ok_or_else(|| LlmError::InvalidResponse("mock has no responses".to_string()))?,
        };

        Ok(ChatResponse {
            content,
            usage: Usage::default(),
        })
    }

    fn model(&self) -> &str {
        "mock"
    }
}
