//! Conversation state for one agent-loop invocation.
//!
//! The transcript records every turn in order, counts steps against the
//! budget, and can render a bounded message window for the next model
//! request. However tight the window, the system context is never dropped:
//! it travels separately from the windowed turns.

use serde::{Deserialize, Serialize};

use crate::llm::Message;

/// Who produced a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnRole {
    System,
    User,
    Assistant,
    /// Observation JSON from a tool execution
    Tool,
}

/// One transcript entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: TurnRole,
    pub content: String,
}

/// Ordered transcript plus the step counter.
///
/// Owned exclusively by one loop invocation; discarded at loop end except
/// for the portions persisted via the report store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transcript {
    system: String,
    turns: Vec<Turn>,
    steps: u32,
}

impl Transcript {
    pub fn new(system: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            turns: Vec::new(),
            steps: 0,
        }
    }

    pub fn system(&self) -> &str {
        &self.system
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    /// Steps consumed so far (tool invocations + protocol violations)
    pub fn steps(&self) -> u32 {
        self.steps
    }

    /// Index the next pushed turn will get
    pub fn next_index(&self) -> usize {
        self.turns.len()
    }

    pub fn push_user(&mut self, content: impl Into<String>) {
        self.turns.push(Turn {
            role: TurnRole::User,
            content: content.into(),
        });
    }

    pub fn push_assistant(&mut self, content: impl Into<String>) {
        self.turns.push(Turn {
            role: TurnRole::Assistant,
            content: content.into(),
        });
    }

    pub fn push_tool(&mut self, content: impl Into<String>) {
        self.turns.push(Turn {
            role: TurnRole::Tool,
            content: content.into(),
        });
    }

    /// Count one step. Monotonic; there is no way to decrement.
    pub fn count_step(&mut self) {
        self.steps += 1;
    }

    /// Wire messages for the next model request: at most `window` trailing
    /// turns. The system context is not part of the window; callers place
    /// it in the request's dedicated system slot.
    pub fn window(&self, window: usize) -> Vec<Message> {
        let start = self.turns.len().saturating_sub(window);
        self.turns[start..]
            .iter()
            .map(|turn| match turn.role {
                TurnRole::Assistant => Message::assistant(&turn.content),
                // User, tool observations, and corrective instructions all
                // travel as user messages in this text-embedded protocol
                _ => Message::user(&turn.content),
            })
            .collect()
    }
}
