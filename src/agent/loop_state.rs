//! Agent loop state management
//!
//! Tracks where a run is in its lifecycle and how it ended.

use std::fmt;

use crate::agent::conversation::Conversation;
use crate::core::ScribeError;

/// Lifecycle of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Init,
    Running,
    Completed,
    Aborted,
    BudgetExhausted,
}

impl RunState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RunState::Completed | RunState::Aborted | RunState::BudgetExhausted
        )
    }
}

/// Why a run stopped early
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AbortReason {
    /// Model service unreachable after all retries
    ModelUnavailable(String),
    /// Model service refused the request
    ModelRejected(String),
    /// An external process could not be launched
    Execution(String),
    /// Cancelled from outside between steps
    Cancelled,
    /// Anything else that made continuing impossible
    Internal(String),
}

impl AbortReason {
    /// Classify a fatal error
    pub fn from_error(error: &ScribeError) -> Self {
        match error {
            ScribeError::ModelUnavailable { .. } => Self::ModelUnavailable(error.to_string()),
            ScribeError::ModelRejected { .. } | ScribeError::ModelRequest { .. } => {
                Self::ModelRejected(error.to_string())
            }
            ScribeError::Execution(_) => Self::Execution(error.to_string()),
            other => Self::Internal(other.to_string()),
        }
    }
}

impl fmt::Display for AbortReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AbortReason::ModelUnavailable(msg)
            | AbortReason::ModelRejected(msg)
            | AbortReason::Execution(msg)
            | AbortReason::Internal(msg) => write!(f, "{}", msg),
            AbortReason::Cancelled => write!(f, "Cancelled"),
        }
    }
}

/// How a run ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// The model gave a final answer
    Completed(String),
    /// A fatal error or cancellation stopped the run
    Aborted(AbortReason),
    /// The step budget ran out first
    BudgetExhausted,
}

impl RunOutcome {
    pub fn state(&self) -> RunState {
        match self {
            RunOutcome::Completed(_) => RunState::Completed,
            RunOutcome::Aborted(_) => RunState::Aborted,
            RunOutcome::BudgetExhausted => RunState::BudgetExhausted,
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, RunOutcome::Completed(_))
    }

    /// Process exit code for this outcome
    pub fn exit_code(&self) -> i32 {
        match self {
            RunOutcome::Completed(_) => 0,
            RunOutcome::Aborted(_) => 1,
            RunOutcome::BudgetExhausted => 2,
        }
    }
}

impl fmt::Display for RunOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunOutcome::Completed(_) => write!(f, "Completed"),
            RunOutcome::Aborted(reason) => write!(f, "Aborted: {}", reason),
            RunOutcome::BudgetExhausted => write!(f, "BudgetExhausted"),
        }
    }
}

/// Step counter and state of a run in progress
#[derive(Debug, Clone)]
pub struct LoopState {
    /// Steps started so far
    pub step: usize,
    /// Maximum allowed steps
    pub max_steps: usize,
    state: RunState,
}

impl LoopState {
    /// Create a new loop state with the given budget
    pub fn new(max_steps: usize) -> Self {
        Self {
            step: 0,
            max_steps,
            state: RunState::Init,
        }
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    /// Init → Running
    pub fn start(&mut self) {
        if self.state == RunState::Init {
            self.state = RunState::Running;
        }
    }

    /// Whether another step fits in the budget
    pub fn has_budget(&self) -> bool {
        self.step < self.max_steps
    }

    /// Increment the step counter
    pub fn next_step(&mut self) -> usize {
        self.step += 1;
        self.step
    }

    /// Move to the terminal state matching `outcome`
    pub fn finish(&mut self, outcome: &RunOutcome) {
        self.state = outcome.state();
    }
}

/// Everything a caller needs to inspect or resume a finished run
#[derive(Debug, Clone)]
pub struct RunReport {
    pub outcome: RunOutcome,
    /// Steps started, including the one that ended the run
    pub steps: usize,
    pub conversation: Conversation,
    /// Text of the most recent observation, if any tool ran
    pub last_observation: Option<String>,
}

impl RunReport {
    pub fn new(outcome: RunOutcome, steps: usize, conversation: Conversation) -> Self {
        let last_observation = conversation.last_observation().map(|t| t.content.clone());
        Self {
            outcome,
            steps,
            conversation,
            last_observation,
        }
    }

    /// Short human-readable summary
    pub fn summary(&self) -> String {
        let mut out = format!(
            "Outcome: {}\nSteps: {}\nTurns: {}",
            self.outcome,
            self.steps,
            self.conversation.len()
        );
        if let RunOutcome::Completed(answer) = &self.outcome {
            out.push_str(&format!("\n\n{}", answer));
        } else if let Some(obs) = &self.last_observation {
            out.push_str(&format!("\n\nLast observation:\n{}", obs));
        }
        out
    }
}
