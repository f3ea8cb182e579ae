//! Translation CLI tool
//!
//! Passes the model's command straight to the translator binary.

use async_trait::async_trait;

use crate::core::{ParamKind, Result, ToolCall, ToolSpec};
use crate::tools::registry::ToolHandler;
use crate::tools::sandbox::{ExecutionResult, Sandbox};

/// Tool wrapping the external translation CLI
pub struct TranslatorTool {
    cli: String,
}

impl TranslatorTool {
    pub fn new(cli: impl Into<String>) -> Self {
        Self { cli: cli.into() }
    }

    pub fn spec() -> ToolSpec {
        ToolSpec::new(
            "execute_code_scribe",
            "Run the code-scribe translation CLI. Pass the command without the program name.\n\
             Commands:\n\
             - draft <source_file>: generate an initial translation draft\n\
             - translate <source_file> -p <config.toml>: translate using a prompt config\n\
             - update <files...> -p <prompt_or_config>: update/integrate files such as the Makefile",
        )
        .required(
            "command",
            ParamKind::String,
            "Command line after the program name, e.g. 'translate src/Init.F90 -p translate.toml'",
        )
    }

    /// Full command line for the sandbox
    pub fn command_line(&self, call: &ToolCall) -> String {
        let args = call.get_string("command").unwrap_or_default();
        format!("{} {}", self.cli, args.trim())
    }
}

#[async_trait]
impl ToolHandler for TranslatorTool {
    async fn call(&self, call: &ToolCall, sandbox: &Sandbox) -> Result<ExecutionResult> {
        let command_line = self.command_line(call);
        let result = sandbox.run(&command_line).await?;
        Ok(result.with_header(format!("Command: {}", command_line)))
    }
}
