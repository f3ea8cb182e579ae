//! Tool registry - manages and dispatches tool calls
//!
//! Tools are registered on a [`ToolRegistryBuilder`] at startup. `build()`
//! freezes the table into a [`ToolRegistry`], which has no way to register
//! further tools and is shared read-only between runs.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::core::config::Config;
use crate::core::{Result, ScribeError, ToolCall, ToolSpec, ValidationError};
use crate::tools::builtin;
use crate::tools::sandbox::{ExecutionResult, Sandbox};

/// Name the model uses to finish; handled by the model adapter, never dispatched
pub const FINAL_ANSWER_TOOL: &str = "final_answer";

/// Executable side of a tool
#[async_trait]
pub trait ToolHandler: Send + Sync {
    /// Run a validated call inside the run's sandbox.
    ///
    /// Returning `Err` aborts the run; ordinary failures belong in the
    /// `ExecutionResult`.
    async fn call(&self, call: &ToolCall, sandbox: &Sandbox) -> Result<ExecutionResult>;
}

/// A spec together with its handler
#[derive(Clone)]
pub struct RegisteredTool {
    pub spec: ToolSpec,
    handler: Arc<dyn ToolHandler>,
}

impl std::fmt::Debug for RegisteredTool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegisteredTool")
            .field("spec", &self.spec)
            .finish_non_exhaustive()
    }
}

/// Mutable registration table used during startup
#[derive(Debug, Default)]
pub struct ToolRegistryBuilder {
    tools: HashMap<String, RegisteredTool>,
    order: Vec<String>,
}

impl ToolRegistryBuilder {
    /// Create an empty builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool; names must be unique
    pub fn register(
        &mut self,
        spec: ToolSpec,
        handler: Arc<dyn ToolHandler>,
    ) -> Result<&mut Self> {
        if spec.name == FINAL_ANSWER_TOOL {
            return Err(ScribeError::config(format!(
                "'{}' is reserved for finishing a run",
                FINAL_ANSWER_TOOL
            )));
        }
        if self.tools.contains_key(&spec.name) {
            return Err(ScribeError::DuplicateTool(spec.name));
        }

        let name = spec.name.clone();
        self.tools
            .insert(name.clone(), RegisteredTool { spec, handler });
        self.order.push(name);
        Ok(self)
    }

    /// Freeze the table
    pub fn build(self) -> ToolRegistry {
        ToolRegistry {
            tools: self.tools,
            order: self.order,
        }
    }
}

/// Immutable registry of available tools
#[derive(Debug)]
pub struct ToolRegistry {
    /// Tools indexed by name
    tools: HashMap<String, RegisteredTool>,
    /// Registration order, for stable prompts
    order: Vec<String>,
}

impl ToolRegistry {
    /// Start a new registration table
    pub fn builder() -> ToolRegistryBuilder {
        ToolRegistryBuilder::new()
    }

    /// Registry holding the translation, build and file tools
    pub fn with_builtin_tools(config: &Config) -> Result<Self> {
        let mut builder = Self::builder();
        builtin::register_all(&mut builder, config)?;
        Ok(builder.build())
    }

    /// Look up a tool by name
    pub fn resolve(&self, name: &str) -> std::result::Result<&RegisteredTool, ValidationError> {
        self.tools
            .get(name)
            .ok_or_else(|| ValidationError::UnknownTool {
                name: name.to_string(),
                available: self.names().join(", "),
            })
    }

    /// Check a call against its tool's parameter schema
    pub fn validate(&self, call: &ToolCall) -> std::result::Result<&RegisteredTool, ValidationError> {
        let tool = self.resolve(&call.tool)?;

        let args = match &call.arguments {
            Value::Object(map) => map,
            Value::Null => {
                return match tool.spec.params.iter().find(|p| p.required) {
                    Some(p) => Err(ValidationError::MissingArgument {
                        tool: call.tool.clone(),
                        argument: p.name.clone(),
                    }),
                    None => Ok(tool),
                }
            }
            _ => {
                return Err(ValidationError::ArgumentsNotObject {
                    tool: call.tool.clone(),
                })
            }
        };

        for param in &tool.spec.params {
            match args.get(&param.name) {
                None | Some(Value::Null) if param.required => {
                    return Err(ValidationError::MissingArgument {
                        tool: call.tool.clone(),
                        argument: param.name.clone(),
                    })
                }
                None | Some(Value::Null) => {}
                Some(value) if !param.kind.accepts(value) => {
                    return Err(ValidationError::InvalidArgument {
                        tool: call.tool.clone(),
                        argument: param.name.clone(),
                        expected: param.kind.as_str().to_string(),
                    })
                }
                Some(_) => {}
            }
        }

        Ok(tool)
    }

    /// Validate and execute a call
    ///
    /// The outer `Result` carries fatal errors; the inner one carries
    /// validation failures the model should see.
    pub async fn dispatch(
        &self,
        call: &ToolCall,
        sandbox: &Sandbox,
    ) -> Result<std::result::Result<ExecutionResult, ValidationError>> {
        let tool = match self.validate(call) {
            Ok(tool) => tool,
            Err(e) => return Ok(Err(e)),
        };

        tracing::debug!(tool = %call.tool, "Dispatching tool");
        let result = tool.handler.call(call, sandbox).await?;
        Ok(Ok(result))
    }

    /// Tool specs in registration order
    pub fn specs(&self) -> Vec<&ToolSpec> {
        self.order
            .iter()
            .filter_map(|name| self.tools.get(name))
            .map(|t| &t.spec)
            .collect()
    }

    /// Registered tool names in registration order
    pub fn names(&self) -> &[String] {
        &self.order
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Usage text for every tool, for the system turn
    pub fn render_usage(&self) -> String {
        self.specs()
            .iter()
            .map(|spec| spec.usage())
            .collect::<Vec<_>>()
            .join("\n")
    }
}
