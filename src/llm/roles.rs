//! Role mapping tables
//!
//! Each service gets one table translating conversation roles into its own
//! vocabulary. Observations fold into the user role where a service has no
//! tool role; the tool name goes into the text so attribution survives.

use crate::core::{Role, Turn};
use crate::llm::traits::WireMessage;

/// Conversation role → service role
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoleMap {
    pub system: &'static str,
    pub user: &'static str,
    pub assistant: &'static str,
    pub observation: &'static str,
}

/// Argo gateway: system, user and assistant only
pub const ARGO_ROLES: RoleMap = RoleMap {
    system: "system",
    user: "user",
    assistant: "assistant",
    observation: "user",
};

/// OpenAI chat completions: `tool` needs a call id we do not have
pub const OPENAI_ROLES: RoleMap = RoleMap {
    system: "system",
    user: "user",
    assistant: "assistant",
    observation: "user",
};

/// Ollama accepts a plain `tool` role
pub const OLLAMA_ROLES: RoleMap = RoleMap {
    system: "system",
    user: "user",
    assistant: "assistant",
    observation: "tool",
};

impl RoleMap {
    /// Service role for a conversation role
    pub fn role(&self, role: Role) -> &'static str {
        match role {
            Role::System => self.system,
            Role::User => self.user,
            Role::Assistant => self.assistant,
            Role::Observation => self.observation,
        }
    }

    /// Whether observations share a role with something else
    pub fn folds_observations(&self) -> bool {
        self.observation == self.user
            || self.observation == self.assistant
            || self.observation == self.system
    }

    /// Translate one turn
    pub fn to_wire(&self, turn: &Turn) -> WireMessage {
        let role = self.role(turn.role);
        if turn.role != Role::Observation || !self.folds_observations() {
            return WireMessage::new(role, turn.content.clone());
        }

        let source = turn.tool_name.as_deref().unwrap_or("tool");
        WireMessage::new(
            role,
            format!("Observation from `{}`:\n{}", source, turn.content),
        )
    }

    /// Translate a sequence of turns, preserving order
    pub fn to_wire_all(&self, turns: &[Turn]) -> Vec<WireMessage> {
        turns.iter().map(|t| self.to_wire(t)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_argo_folds_observation_into_user() {
        let turn = Turn::observation("run_build", "BUILD FAILED");
        let msg = ARGO_ROLES.to_wire(&turn);
        assert_eq!(msg.role, "user");
        assert_eq!(msg.content, "Observation from `run_build`:\nBUILD FAILED");
    }

    #[test]
    fn test_ollama_keeps_tool_role() {
        let turn = Turn::observation("run_build", "BUILD FAILED");
        let msg = OLLAMA_ROLES.to_wire(&turn);
        assert_eq!(msg.role, "tool");
        assert_eq!(msg.content, "BUILD FAILED");
    }

    #[test]
    fn test_order_preserved() {
        let turns = vec![
            Turn::system("s"),
            Turn::user("task"),
            Turn::assistant("call"),
            Turn::observation("read_source_file", "data"),
        ];
        let roles: Vec<String> = OPENAI_ROLES
            .to_wire_all(&turns)
            .into_iter()
            .map(|m| m.role)
            .collect();
        assert_eq!(roles, vec!["system", "user", "assistant", "user"]);
    }
}
