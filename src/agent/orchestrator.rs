//! Agent orchestrator
//!
//! Runs the tool-calling loop: ask the model for an action, dispatch it,
//! feed the observation back, and stop on a final answer, a fatal error,
//! cancellation, or an exhausted step budget.
//!
//! Each step that dispatches a tool appends exactly two turns (the
//! assistant reply and the observation). A final step appends one. A step
//! aborted by a launch failure keeps the reply that issued the call; any
//! other aborted step appends none.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::agent::conversation::Conversation;
use crate::agent::loop_state::{AbortReason, LoopState, RunOutcome, RunReport};
use crate::core::{Action, Config, Result, ScribeError, ToolCall};
use crate::llm::ModelAdapter;
use crate::tools::{Sandbox, ToolRegistry, FINAL_ANSWER_TOOL};

/// Attribution for observations about replies that could not be parsed
pub const REPLY_PARSER: &str = "reply_parser";

const BASE_INSTRUCTIONS: &str = "\
You are a code translation agent. You convert source files between languages and \
repair build failures until the project compiles. Work one step at a time: every \
reply either calls exactly one tool or finishes the task.";

/// Drives a single run from task to outcome
#[derive(Clone)]
pub struct Orchestrator {
    /// Tool registry, shared read-only between runs
    tools: Arc<ToolRegistry>,
    /// Model adapter
    model: ModelAdapter,
    /// Process and file boundary for this run
    sandbox: Sandbox,
    /// Step budget
    max_steps: usize,
    /// Extra behavioural instructions appended to the system turn
    instructions: Option<String>,
}

impl Orchestrator {
    /// Create an orchestrator from its parts
    pub fn new(tools: Arc<ToolRegistry>, model: ModelAdapter, sandbox: Sandbox) -> Self {
        Self {
            tools,
            model,
            sandbox,
            max_steps: 20,
            instructions: None,
        }
    }

    /// Create an orchestrator with the built-in tools and configured model
    pub fn from_config(config: &Config) -> Result<Self> {
        config.validate()?;
        let tools = Arc::new(ToolRegistry::with_builtin_tools(config)?);
        let model = ModelAdapter::from_config(config)?;
        let sandbox = Sandbox::from_config(&config.sandbox);

        Ok(Self::new(tools, model, sandbox)
            .with_max_steps(config.agent.max_steps)
            .with_instructions(config.agent.instructions.clone()))
    }

    /// Set the step budget
    pub fn with_max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = max_steps;
        self
    }

    /// Set extra instructions for the system turn
    pub fn with_instructions(mut self, instructions: Option<String>) -> Self {
        self.instructions = instructions;
        self
    }

    /// Replace the sandbox
    pub fn with_sandbox(mut self, sandbox: Sandbox) -> Self {
        self.sandbox = sandbox;
        self
    }

    pub fn tools(&self) -> &Arc<ToolRegistry> {
        &self.tools
    }

    pub fn sandbox(&self) -> &Sandbox {
        &self.sandbox
    }

    pub fn max_steps(&self) -> usize {
        self.max_steps
    }

    /// System turn: tool descriptions, reply protocol and instructions
    pub fn system_prompt(&self) -> String {
        let mut prompt = format!(
            "{}\n\n## Tools\n\n{}\n## How to reply\n\n\
             Think briefly about the last observation, then give exactly one action as a \
             JSON object in a ```json block:\n\n\
             ```json\n{{\"tool\": \"<tool name>\", \"arguments\": {{\"<name>\": \"<value>\"}}}}\n```\n\n\
             The result of every tool call comes back as an observation. A failed build is an \
             observation too: read the errors, fix the files, and build again.\n\n\
             When the task is done, reply with:\n\n\
             ```json\n{{\"tool\": \"{}\", \"arguments\": {{\"answer\": \"<summary of what was done>\"}}}}\n```\n\n\
             Relative paths are resolved against {}.",
            BASE_INSTRUCTIONS,
            self.tools.render_usage(),
            FINAL_ANSWER_TOOL,
            self.sandbox.working_dir().display()
        );

        if let Some(extra) = self.instructions.as_deref().filter(|s| !s.trim().is_empty()) {
            prompt.push_str("\n\n## Instructions\n\n");
            prompt.push_str(extra.trim());
        }
        prompt
    }

    /// Run a task to completion
    ///
    /// Never fails: every way a run can end is described by the returned
    /// report, together with the conversation so far.
    pub async fn run(&self, task: &str, cancel: &CancellationToken) -> RunReport {
        let mut conversation = Conversation::seeded(self.system_prompt(), task);
        let mut state = LoopState::new(self.max_steps);
        state.start();

        tracing::info!(
            model = self.model.service_name(),
            max_steps = self.max_steps,
            cwd = %self.sandbox.working_dir().display(),
            "Starting run"
        );

        let outcome = 'run: loop {
            if cancel.is_cancelled() {
                tracing::warn!(step = state.step, "Run cancelled");
                break RunOutcome::Aborted(AbortReason::Cancelled);
            }
            if !state.has_budget() {
                tracing::warn!(steps = state.step, "Step budget exhausted");
                break RunOutcome::BudgetExhausted;
            }

            let step = state.next_step();
            tracing::info!(step, max_steps = self.max_steps, "Requesting next action");

            let action = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    tracing::warn!(step, "Run cancelled while waiting for the model");
                    break 'run RunOutcome::Aborted(AbortReason::Cancelled);
                }
                action = self.model.next_action(conversation.turns()) => action,
            };

            match action {
                Ok(Action::FinalAnswer(answer)) => {
                    tracing::info!(step, "Final answer received");
                    conversation.add_assistant(answer.clone());
                    break RunOutcome::Completed(answer);
                }
                Ok(Action::Invoke { reply, call }) => {
                    conversation.add_assistant(reply);
                    match self.invoke(step, &call).await {
                        Ok(observation) => conversation.add_observation(call.tool, observation),
                        Err(e) => {
                            tracing::error!(step, tool = %call.tool, error = %e, "Tool failed to launch");
                            break RunOutcome::Aborted(AbortReason::from_error(&e));
                        }
                    }
                }
                Err(ScribeError::Validation(e)) => {
                    tracing::warn!(step, error = %e, "Model reply could not be parsed");
                    conversation.add_assistant(e.raw_reply().unwrap_or_default());
                    conversation.add_observation(REPLY_PARSER, e.to_string());
                }
                Err(e) => {
                    tracing::error!(step, error = %e, "Model request failed");
                    break RunOutcome::Aborted(AbortReason::from_error(&e));
                }
            }
        };

        state.finish(&outcome);
        tracing::info!(
            outcome = %outcome,
            steps = state.step,
            turns = conversation.len(),
            "Run finished"
        );

        RunReport::new(outcome, state.step, conversation)
    }

    /// Dispatch one call; validation problems become the observation text
    async fn invoke(&self, step: usize, call: &ToolCall) -> Result<String> {
        match self.tools.dispatch(call, &self.sandbox).await? {
            Ok(result) => {
                tracing::info!(
                    step,
                    tool = %call.tool,
                    ok = result.is_ok(),
                    exit_code = ?result.exit_code,
                    truncated = result.is_truncated(),
                    "Tool finished"
                );
                Ok(result.render())
            }
            Err(e) => {
                tracing::warn!(step, tool = %call.tool, error = %e, "Invalid tool call");
                Ok(e.to_string())
            }
        }
    }
}
