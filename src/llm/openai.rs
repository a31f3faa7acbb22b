//! OpenAI-compatible chat-completions client.
//!
//! Implements the LlmClient trait against any endpoint speaking the
//! `/chat/completions` wire format. The base URL is configurable so the
//! same client works with self-hosted gateways.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{Value, json};

use crate::config::LlmConfig;
use crate::llm::client::{LlmClient, LlmError};
use crate::llm::types::{ChatRequest, ChatResponse, Role, Usage};

/// Default model to use
const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// Default max tokens
const DEFAULT_MAX_TOKENS: u32 = 4096;

/// Configuration for the OpenAI-compatible client
#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    pub model: String,
    pub base_url: String,
    pub api_key_env: String,
    pub max_tokens: u32,
    pub timeout: Duration,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            base_url: "https://api.openai.com/v1".to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
            timeout: Duration::from_secs(120),
        }
    }
}

impl OpenAiConfig {
    /// Create a new config with a specific model
    pub fn with_model(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            ..Default::default()
        }
    }
}

impl From<&LlmConfig> for OpenAiConfig {
    fn from(cfg: &LlmConfig) -> Self {
        Self {
            model: cfg.model.clone(),
            base_url: cfg.base_url.clone(),
            api_key_env: cfg.api_key_env.clone(),
            max_tokens: cfg.max_tokens,
            timeout: Duration::from_millis(cfg.timeout_ms),
        }
    }
}

/// OpenAI-compatible API client
pub struct OpenAiClient {
    client: Client,
    api_key: String,
    config: OpenAiConfig,
    usage: Arc<Mutex<Usage>>,
}

impl OpenAiClient {
    /// Create a new client, reading the API key from the configured
    /// environment variable
    pub fn new(config: OpenAiConfig) -> Result<Self, LlmError> {
        let api_key = std::env::var(&config.api_key_env).map_err(|_| LlmError::MissingApiKey {
            env_var: config.api_key_env.clone(),
        })?;

        Self::with_api_key(api_key, config)
    }

    /// Create a client with an explicit API key
    pub fn with_api_key(api_key: String, config: OpenAiConfig) -> Result<Self, LlmError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(LlmError::Network)?;

        Ok(Self {
            client,
            api_key,
            config,
            usage: Arc::new(Mutex::new(Usage::default())),
        })
    }

    /// True once an API key is loaded
    pub fn is_ready(&self) -> bool {
        !self.api_key.is_empty()
    }

    /// Build the request body for the chat-completions endpoint
    fn build_request(&self, request: &ChatRequest) -> Value {
        let model = request.model.as_ref().unwrap_or(&self.config.model).clone();
        let max_tokens = request.max_tokens.unwrap_or(self.config.max_tokens);

        let mut messages: Vec<Value> = Vec::with_capacity(request.messages.len() + 1);

        // System context travels as the leading message in this wire format
        if !request.system.is_empty() {
            messages.push(json!({ "role": "system", "content": request.system }));
        }

        for m in &request.messages {
            messages.push(json!({
                "role": match m.role {
                    Role::User => "user",
                    Role::Assistant => "assistant",
                },
                "content": m.content
            }));
        }

        json!({
            "model": model,
            "max_tokens": max_tokens,
            "messages": messages
        })
    }

    /// Parse the API response into a ChatResponse
    fn parse_response(&self, body: Value) -> Result<ChatResponse, LlmError> {
        let content = body["choices"][0]["message"]["content"]
            .as_str()
            .ok_or_else(|| {
                LlmError::InvalidResponse("response carried no message content".to_string())
            })?
            .to_string();

        let usage = if let Some(u) = body.get("usage") {
            Usage::new(
                u["prompt_tokens"].as_u64().unwrap_or(0),
                u["completion_tokens"].as_u64().unwrap_or(0),
            )
        } else {
            Usage::default()
        };

        // Track cumulative usage
        {
            let mut total = self.usage.lock().unwrap();
            total.add(&usage);
        }

        Ok(ChatResponse { content, usage })
    }

    /// Send a request to the chat-completions endpoint
    async fn send_request(&self, body: Value) -> Result<Value, LlmError> {
        let url = format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'));

        let response = self
            .client
            .post(&url)
            .header("authorization", format!("Bearer {}", self.api_key))
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await?;

        let status = response.status();

        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(LlmError::ApiError {
                status: status.as_u16(),
                message,
            });
        }

        Ok(response.json().await?)
    }

    /// Get cumulative token usage
    pub fn total_usage(&self) -> Usage {
        self.usage.lock().unwrap().clone()
    }
}

#[async_trait]
impl LlmClient for OpenAiClient {
    async fn complete(&self, request: ChatRequest) -> Result<ChatResponse, LlmError> {
        let body = self.build_request(&request);
        let response = self.send_request(body).await?;
        self.parse_response(response)
    }

    fn model(&self) -> &str {
        &self.config.model
    }
}

impl std::fmt::Debug for OpenAiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiClient")
            .field("model", &self.config.model)
            .field("base_url", &self.config.base_url)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = OpenAiConfig::default();
        assert_eq!(config.model, DEFAULT_MODEL);
        assert_eq!(config.max_tokens, DEFAULT_MAX_TOKENS);
        assert_eq!(config.api_key_env, "OPENAI_API_KEY");
    }

    #[test]
    fn test_config_with_model() {
        let config = OpenAiConfig::with_model("gpt-4o");
        assert_eq!(config.model, "gpt-4o");
        assert_eq!(config.max_tokens, DEFAULT_MAX_TOKENS);
    }

    #[test]
    fn test_config_from_llm_config() {
        let llm = LlmConfig {
            model: "local-7b".to_string(),
            base_url: "http://localhost:8080/v1".to_string(),
            api_key_env: "LOCAL_KEY".to_string(),
            max_tokens: 1024,
            timeout_ms: 5000,
        };
        let config = OpenAiConfig::from(&llm);
        assert_eq!(config.model, "local-7b");
        assert_eq!(config.base_url, "http://localhost:8080/v1");
        assert_eq!(config.timeout, Duration::from_millis(5000));
    }

    #[test]
    fn test_client_without_api_key() {
        let config = OpenAiConfig {
            api_key_env: "SIMFORGE_TEST_UNSET_KEY".to_string(),
            ..Default::default()
        };
        let result = OpenAiClient::new(config);
        assert!(matches!(result, Err(LlmError::MissingApiKey { .. })));
    }

    #[test]
    fn test_client_with_api_key() {
        let result = OpenAiClient::with_api_key("test-key".to_string(), OpenAiConfig::default());
        assert!(result.is_ok());
        let client = result.unwrap();
        assert!(client.is_ready());
        assert_eq!(client.model(), DEFAULT_MODEL);
    }

    #[test]
    fn test_build_request_basic() {
        let client =
            OpenAiClient::with_api_key("test-key".to_string(), OpenAiConfig::default()).unwrap();

        let request = ChatRequest::new("You are helpful").with_user_message("Hello");

        let body = client.build_request(&request);

        assert_eq!(body["model"], DEFAULT_MODEL);
        assert_eq!(body["max_tokens"], DEFAULT_MAX_TOKENS);
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][0]["content"], "You are helpful");
        assert_eq!(body["messages"][1]["role"], "user");
        assert_eq!(body["messages"][1]["content"], "Hello");
    }

    #[test]
    fn test_build_request_no_system() {
        let client =
            OpenAiClient::with_api_key("test-key".to_string(), OpenAiConfig::default()).unwrap();

        let request = ChatRequest::default().with_user_message("Hello");
        let body = client.build_request(&request);

        assert_eq!(body["messages"][0]["role"], "user");
    }

    #[test]
    fn test_build_request_custom_model() {
        let client =
            OpenAiClient::with_api_key("test-key".to_string(), OpenAiConfig::default()).unwrap();

        let mut request = ChatRequest::new("test").with_user_message("Hello");
        request.model = Some("gpt-4o".to_string());

        let body = client.build_request(&request);

        assert_eq!(body["model"], "gpt-4o");
    }

    #[test]
    fn test_parse_response_content() {
        let client =
            OpenAiClient::with_api_key("test-key".to_string(), OpenAiConfig::default()).unwrap();

        let api_response = json!({
            "choices": [
                { "message": { "role": "assistant", "content": "Hello there!" } }
            ],
            "usage": { "prompt_tokens": 10, "completion_tokens": 5 }
        });

        let response = client.parse_response(api_response).unwrap();

        assert_eq!(response.content, "Hello there!");
        assert_eq!(response.usage.input_tokens, 10);
        assert_eq!(response.usage.output_tokens, 5);
    }

    #[test]
    fn test_parse_response_missing_content() {
        let client =
            OpenAiClient::with_api_key("test-key".to_string(), OpenAiConfig::default()).unwrap();

        let api_response = json!({ "choices": [] });
        let result = client.parse_response(api_response);
        assert!(matches!(result, Err(LlmError::InvalidResponse(_))));
    }

    #[test]
    fn test_total_usage_accumulation() {
        let client =
            OpenAiClient::with_api_key("test-key".to_string(), OpenAiConfig::default()).unwrap();

        let _ = client.parse_response(json!({
            "choices": [{ "message": { "content": "a" } }],
            "usage": { "prompt_tokens": 100, "completion_tokens": 50 }
        }));
        let _ = client.parse_response(json!({
            "choices": [{ "message": { "content": "b" } }],
            "usage": { "prompt_tokens": 200, "completion_tokens": 100 }
        }));

        let total = client.total_usage();
        assert_eq!(total.input_tokens, 300);
        assert_eq!(total.output_tokens, 150);
    }

    #[test]
    fn test_debug_impl_hides_key() {
        let client =
            OpenAiClient::with_api_key("test-key".to_string(), OpenAiConfig::default()).unwrap();

        let debug_str = format!("{:?}", client);
        assert!(debug_str.contains("OpenAiClient"));
        assert!(!debug_str.contains("test-key"));
    }

    #[test]
    fn test_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<OpenAiClient>();
    }

    #[test]
    fn test_empty_api_key_not_ready() {
        let client = OpenAiClient::with_api_key(String::new(), OpenAiConfig::default()).unwrap();
        assert!(!client.is_ready());
    }
}
