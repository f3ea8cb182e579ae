//! Agent module - orchestration and conversation management
//!
//! Contains the step-bounded loop that coordinates model calls and tool
//! execution, plus task templates and concurrent batches.

pub mod batch;
pub mod conversation;
pub mod loop_state;
pub mod orchestrator;
pub mod templates;

pub use batch::{BatchJob, BatchRunner};
pub use conversation::Conversation;
pub use loop_state::{AbortReason, LoopState, RunOutcome, RunReport, RunState};
pub use orchestrator::Orchestrator;
pub use templates::{TaskTemplate, TranslationMode};
