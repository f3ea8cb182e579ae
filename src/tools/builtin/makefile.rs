//! Makefile tool
//!
//! Renders a single-target Makefile from a list of sources.

use std::path::Path;

use async_trait::async_trait;

use crate::core::config::MakefileConfig;
use crate::core::{ParamKind, Result, ToolCall, ToolSpec};
use crate::tools::registry::ToolHandler;
use crate::tools::sandbox::{ExecutionResult, Sandbox};

/// Tool writing a Makefile from a template
pub struct MakefileTool {
    compiler: String,
    flags: String,
}

impl MakefileTool {
    pub fn new(config: &MakefileConfig) -> Self {
        Self {
            compiler: config.compiler.clone(),
            flags: config.flags.clone(),
        }
    }

    pub fn spec() -> ToolSpec {
        ToolSpec::new(
            "update_makefile",
            "Create or replace a Makefile that builds one executable from the given sources.",
        )
        .required("makefile_path", ParamKind::String, "Path to the Makefile")
        .required(
            "sources",
            ParamKind::String,
            "Comma-separated source files, e.g. 'src/Initialize.cpp,src/main.cpp'",
        )
    }

    /// Render the Makefile; `None` when no sources were given
    pub fn render(&self, sources: &str) -> Option<String> {
        let sources: Vec<&str> = sources
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect();

        let target = Path::new(sources.first()?)
            .file_stem()?
            .to_string_lossy()
            .into_owned();

        Some(format!(
            "CXX = {cxx}\n\
             CXXFLAGS = {flags}\n\
             \n\
             SRCS = {srcs}\n\
             TARGET = {target}\n\
             \n\
             all: $(TARGET)\n\
             \n\
             $(TARGET): $(SRCS)\n\
             \t$(CXX) $(CXXFLAGS) -o $(TARGET) $(SRCS)\n\
             \n\
             clean:\n\
             \trm -f $(TARGET)\n\
             \n\
             .PHONY: all clean\n",
            cxx = self.compiler,
            flags = self.flags,
            srcs = sources.join(" "),
            target = target,
        ))
    }
}

#[async_trait]
impl ToolHandler for MakefileTool {
    async fn call(&self, call: &ToolCall, sandbox: &Sandbox) -> Result<ExecutionResult> {
        let path = call.get_string("makefile_path").unwrap_or_default();
        let sources = call.get_string("sources").unwrap_or_default();

        match self.render(&sources) {
            Some(content) => Ok(sandbox.write_file(&path, &content).await),
            None => Ok(ExecutionResult::error_message(
                "ERROR: 'sources' must name at least one source file",
                sandbox.output_cap(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_makefile() {
        let tool = MakefileTool::new(&MakefileConfig::default());
        let makefile = tool
            .render("src/Diffusion.cpp, src/main.cpp")
            .unwrap();
        assert!(makefile.contains("SRCS = src/Diffusion.cpp src/main.cpp\n"));
        assert!(makefile.contains("TARGET = Diffusion\n"));
        assert!(makefile.contains("\n\t$(CXX) $(CXXFLAGS) -o $(TARGET) $(SRCS)\n"));
    }

    #[test]
    fn test_render_without_sources() {
        let tool = MakefileTool::new(&MakefileConfig::default());
        assert!(tool.render(" , ").is_none());
    }
}
