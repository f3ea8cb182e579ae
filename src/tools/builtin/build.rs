//! Build tool
//!
//! Runs the build command; success is exit code 0 and nothing else.

use async_trait::async_trait;

use crate::core::{ParamKind, Result, ToolCall, ToolSpec};
use crate::tools::registry::ToolHandler;
use crate::tools::sandbox::{ExecutionResult, Sandbox};

/// Tool running the project build
pub struct BuildTool {
    default_command: String,
}

impl BuildTool {
    pub fn new(default_command: impl Into<String>) -> Self {
        Self {
            default_command: default_command.into(),
        }
    }

    pub fn spec(default_command: &str) -> ToolSpec {
        ToolSpec::new("run_build", "Run the build command and capture its output.").optional(
            "build_command",
            ParamKind::String,
            &format!("Build command to run (default: '{}')", default_command),
        )
    }

    fn command(&self, call: &ToolCall) -> String {
        call.get_string("build_command")
            .filter(|c| !c.trim().is_empty())
            .unwrap_or_else(|| self.default_command.clone())
    }
}

#[async_trait]
impl ToolHandler for BuildTool {
    async fn call(&self, call: &ToolCall, sandbox: &Sandbox) -> Result<ExecutionResult> {
        let command = self.command(call);
        let result = sandbox.run(&command).await?;

        let verdict = if result.is_ok() {
            "BUILD SUCCESSFUL"
        } else {
            "BUILD FAILED"
        };
        tracing::info!(command = %command, exit_code = ?result.exit_code, "{}", verdict);

        Ok(result.with_header(format!("Build Command: {}\n{}", command, verdict)))
    }
}
