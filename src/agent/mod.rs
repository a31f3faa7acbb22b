//! Tool-calling agent loop.
//!
//! A bounded conversation in which the model may repeatedly request
//! sandboxed code execution against a bound dataset, or terminate with a
//! final answer. One strict message protocol, a step budget, and
//! cooperative cancellation polled at turn boundaries.

pub mod protocol;
pub mod runner;
pub mod transcript;

pub use protocol::{
    Action, CORRECTIVE_INSTRUCTION, NO_ANSWER_SENTINEL, Observation, TOOL_NAME, ToolInvocation,
    parse_action,
};
pub use runner::{AgentLoop, AgentResult, AgentState, FlagSignal, NoSignal, SignalProbe};
pub use transcript::{Transcript, Turn, TurnRole};
