//! Built-in tools
//!
//! The translation CLI, the build command, and plain file operations.

mod build;
mod files;
mod makefile;
mod translate;

use std::sync::Arc;

pub use build::BuildTool;
pub use files::{ListDirectoryTool, ReadFileTool, WriteFileTool};
pub use makefile::MakefileTool;
pub use translate::TranslatorTool;

use crate::core::config::Config;
use crate::core::Result;
use crate::tools::registry::ToolRegistryBuilder;

/// Register every built-in tool
pub fn register_all(builder: &mut ToolRegistryBuilder, config: &Config) -> Result<()> {
    builder
        .register(
            TranslatorTool::spec(),
            Arc::new(TranslatorTool::new(&config.sandbox.translator_cli)),
        )?
        .register(
            BuildTool::spec(&config.sandbox.build_command),
            Arc::new(BuildTool::new(&config.sandbox.build_command)),
        )?
        .register(ReadFileTool::spec(), Arc::new(ReadFileTool))?
        .register(WriteFileTool::spec(), Arc::new(WriteFileTool))?
        .register(
            MakefileTool::spec(),
            Arc::new(MakefileTool::new(&config.makefile)),
        )?
        .register(ListDirectoryTool::spec(), Arc::new(ListDirectoryTool))?;
    Ok(())
}
