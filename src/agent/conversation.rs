//! Conversation history management
//!
//! Append-only record of one run. The loop owns it; the model adapter only
//! ever sees it borrowed, so trimming for request size never touches it.

use crate::core::{Role, Turn};

/// Ordered turns of a single run
#[derive(Debug, Clone, Default)]
pub struct Conversation {
    turns: Vec<Turn>,
}

impl Conversation {
    /// Create an empty conversation
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a conversation seeded with the system instructions and the task
    pub fn seeded(system_prompt: impl Into<String>, task: impl Into<String>) -> Self {
        let mut conversation = Self::new();
        conversation.push(Turn::system(system_prompt));
        conversation.push(Turn::user(task));
        conversation
    }

    /// Append a turn
    pub fn push(&mut self, turn: Turn) {
        self.turns.push(turn);
    }

    /// Append an assistant turn
    pub fn add_assistant(&mut self, content: impl Into<String>) {
        self.push(Turn::assistant(content));
    }

    /// Append an observation attributed to a tool
    pub fn add_observation(&mut self, tool: impl Into<String>, content: impl Into<String>) {
        self.push(Turn::observation(tool, content));
    }

    /// All turns in order
    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    /// Get the last observation turn
    pub fn last_observation(&self) -> Option<&Turn> {
        self.turns.iter().rev().find(|t| t.role == Role::Observation)
    }

    /// Number of observations attributed to `tool`
    pub fn observations_from(&self, tool: &str) -> usize {
        self.turns
            .iter()
            .filter(|t| t.role == Role::Observation && t.tool_name.as_deref() == Some(tool))
            .count()
    }

    /// Get turn count
    pub fn len(&self) -> usize {
        self.turns.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Plain-text transcript, one block per turn
    pub fn transcript(&self) -> String {
        self.turns
            .iter()
            .map(|t| match &t.tool_name {
                Some(tool) => format!("[{} {}]\n{}", t.role, tool, t.content),
                None => format!("[{}]\n{}", t.role, t.content),
            })
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}
