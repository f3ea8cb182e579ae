//! File tools: read, write, list.

use async_trait::async_trait;

use crate::core::{ParamKind, Result, ToolCall, ToolSpec};
use crate::tools::registry::ToolHandler;
use crate::tools::sandbox::{ExecutionResult, Sandbox};

/// Read a source file
pub struct ReadFileTool;

impl ReadFileTool {
    pub fn spec() -> ToolSpec {
        ToolSpec::new("read_source_file", "Read a source file.").required(
            "file_path",
            ParamKind::String,
            "Path to the file, e.g. 'src/Initialize.F90'",
        )
    }
}

#[async_trait]
impl ToolHandler for ReadFileTool {
    async fn call(&self, call: &ToolCall, sandbox: &Sandbox) -> Result<ExecutionResult> {
        let path = call.get_string("file_path").unwrap_or_default();
        Ok(sandbox.read_file(&path).await)
    }
}

/// Write a source file
pub struct WriteFileTool;

impl WriteFileTool {
    pub fn spec() -> ToolSpec {
        ToolSpec::new(
            "write_source_file",
            "Write code to a file, replacing it. Missing directories are created.",
        )
        .required(
            "file_path",
            ParamKind::String,
            "Path for the file, e.g. 'src/Initialize.cpp'",
        )
        .required("content", ParamKind::String, "Complete file content")
    }
}

#[async_trait]
impl ToolHandler for WriteFileTool {
    async fn call(&self, call: &ToolCall, sandbox: &Sandbox) -> Result<ExecutionResult> {
        let path = call.get_string("file_path").unwrap_or_default();
        let content = call.get_string("content").unwrap_or_default();
        Ok(sandbox.write_file(&path, &content).await)
    }
}

/// List a directory
pub struct ListDirectoryTool;

impl ListDirectoryTool {
    pub fn spec() -> ToolSpec {
        ToolSpec::new("list_directory", "List files in a directory.").optional(
            "path",
            ParamKind::String,
            "Directory path (default: the working directory)",
        )
    }
}

#[async_trait]
impl ToolHandler for ListDirectoryTool {
    async fn call(&self, call: &ToolCall, sandbox: &Sandbox) -> Result<ExecutionResult> {
        let path = call.get_string("path").unwrap_or_else(|| ".".to_string());
        Ok(sandbox.list_dir(&path).await)
    }
}
