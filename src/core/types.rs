//! Shared types used across Scribe modules
//!
//! Contains conversation turns, tool calls, tool specs and agent actions.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Role of a conversation turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Tool descriptions and behavioural instructions
    System,
    /// The task, or other user-supplied content
    User,
    /// Model output
    Assistant,
    /// Result of a tool invocation
    Observation,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::System => write!(f, "system"),
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
            Role::Observation => write!(f, "observation"),
        }
    }
}

/// One role-tagged unit of conversation text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    /// Role of the turn
    pub role: Role,
    /// Text body
    pub content: String,
    /// Tool that produced an observation turn
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_name: Option<String>,
}

impl Turn {
    /// Create a new system turn
    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    /// Create a new user turn
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    /// Create a new assistant turn
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    /// Create an observation turn attributed to a tool
    pub fn observation(tool_name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: Role::Observation,
            content: content.into(),
            tool_name: Some(tool_name.into()),
        }
    }

    fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            tool_name: None,
        }
    }
}

/// A tool call made by the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Name of the tool to invoke
    #[serde(alias = "name")]
    pub tool: String,
    /// JSON arguments for the tool
    #[serde(default = "empty_arguments")]
    pub arguments: Value,
}

fn empty_arguments() -> Value {
    Value::Object(Map::new())
}

impl ToolCall {
    /// Create a new tool call
    pub fn new(tool: impl Into<String>, arguments: Value) -> Self {
        Self {
            tool: tool.into(),
            arguments,
        }
    }

    /// Get a string argument by key
    pub fn get_string(&self, key: &str) -> Option<String> {
        self.arguments
            .get(key)
            .and_then(|v| v.as_str())
            .map(|s| s.to_string())
    }
}

/// What the model wants to do next
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// The task is done; the text is the model's final answer
    FinalAnswer(String),
    /// Run a tool. `reply` is the full model text the call was parsed from.
    Invoke { reply: String, call: ToolCall },
}

/// Semantic type of a tool parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamKind {
    String,
    Integer,
    Boolean,
}

impl ParamKind {
    /// JSON schema type name
    pub fn as_str(&self) -> &'static str {
        match self {
            ParamKind::String => "string",
            ParamKind::Integer => "integer",
            ParamKind::Boolean => "boolean",
        }
    }

    /// Whether a JSON value fits this kind
    pub fn accepts(&self, value: &Value) -> bool {
        match self {
            ParamKind::String => value.is_string(),
            ParamKind::Integer => value.is_u64() || value.is_i64(),
            ParamKind::Boolean => value.is_boolean(),
        }
    }
}

/// One parameter of a tool
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamSpec {
    pub name: String,
    pub kind: ParamKind,
    pub required: bool,
    pub description: String,
}

/// Description of a tool the model may call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolSpec {
    /// Unique tool name
    pub name: String,
    /// Usage description shown to the model
    pub description: String,
    /// Parameter schema
    pub params: Vec<ParamSpec>,
}

impl ToolSpec {
    /// Start a spec with no parameters
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            params: Vec::new(),
        }
    }

    /// Add a required parameter
    pub fn required(self, name: &str, kind: ParamKind, description: &str) -> Self {
        self.param(name, kind, true, description)
    }

    /// Add an optional parameter
    pub fn optional(self, name: &str, kind: ParamKind, description: &str) -> Self {
        self.param(name, kind, false, description)
    }

    fn param(mut self, name: &str, kind: ParamKind, required: bool, description: &str) -> Self {
        self.params.push(ParamSpec {
            name: name.to_string(),
            kind,
            required,
            description: description.to_string(),
        });
        self
    }

    /// Human-readable usage block for the system prompt
    pub fn usage(&self) -> String {
        let mut out = format!("### {}\n{}\n", self.name, self.description);
        if self.params.is_empty() {
            out.push_str("Arguments: none\n");
            return out;
        }
        out.push_str("Arguments:\n");
        for param in &self.params {
            out.push_str(&format!(
                "  - {} ({}, {}): {}\n",
                param.name,
                param.kind.as_str(),
                if param.required { "required" } else { "optional" },
                param.description
            ));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tool_call_accepts_name_alias() {
        let call: ToolCall =
            serde_json::from_str(r#"{"name": "run_build", "arguments": {"build_command": "make"}}"#)
                .unwrap();
        assert_eq!(call.tool, "run_build");
        assert_eq!(call.get_string("build_command").as_deref(), Some("make"));
    }

    #[test]
    fn test_tool_call_defaults_arguments() {
        let call: ToolCall = serde_json::from_str(r#"{"tool": "list_directory"}"#).unwrap();
        assert!(call.arguments.as_object().unwrap().is_empty());
    }

    #[test]
    fn test_usage_marks_required_and_optional() {
        let spec = ToolSpec::new("write_source_file", "Write a file")
            .required("file_path", ParamKind::String, "Path")
            .optional("mode", ParamKind::Integer, "Unused");
        let usage = spec.usage();
        assert!(usage.starts_with("### write_source_file\nWrite a file\n"));
        assert!(usage.contains("  - file_path (string, required): Path\n"));
        assert!(usage.contains("  - mode (integer, optional): Unused\n"));
    }

    #[test]
    fn test_param_kind_accepts() {
        assert!(ParamKind::String.accepts(&serde_json::json!("x")));
        assert!(!ParamKind::String.accepts(&serde_json::json!(3)));
        assert!(ParamKind::Integer.accepts(&serde_json::json!(-3)));
        assert!(ParamKind::Boolean.accepts(&serde_json::json!(true)));
    }
}
