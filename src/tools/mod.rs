//! Tools module - what the agent can do to the outside world
//!
//! Contains the execution sandbox, the built-in tools, and the tool registry.

pub mod builtin;
pub mod registry;
pub mod sandbox;

pub use registry::{RegisteredTool, ToolHandler, ToolRegistry, ToolRegistryBuilder, FINAL_ANSWER_TOOL};
pub use sandbox::{CapturedOutput, ExecutionResult, ExecutionStatus, Sandbox};
