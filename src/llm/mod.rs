//! LLM client layer - chat-completion API integration
//!
//! This module provides:
//! - Message types for LLM communication
//! - LlmClient trait for API abstraction
//! - OpenAiClient implementation (OpenAI-compatible chat completions)
//! - MockLlmClient for tests
//!
//! The tool protocol is text-embedded: the agent declares its tool inside
//! the system context and parses structured actions out of the returned
//! message text, so the wire types here carry no provider-native tool
//! schema.

pub mod client;
pub mod openai;
pub mod types;

pub use client::{LlmClient, LlmError, MockLlmClient};
pub use openai::{OpenAiClient, OpenAiConfig};
pub use types::{ChatRequest, ChatResponse, Message, Role, Usage};
