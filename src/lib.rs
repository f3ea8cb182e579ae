//! Scribe - Tool-Calling Code Translation Agent
//!
//! An LLM-driven agent that converts source files between languages by
//! calling a translator CLI, a build command and plain file tools, and keeps
//! repairing build failures until the project compiles or the step budget
//! runs out.
//!
//! # Architecture
//!
//! - **Core**: Shared types, configuration, and error handling
//! - **LLM**: Model services (Argo, Ollama, OpenAI-compatible) and the adapter
//!   that maps conversations to requests and replies to actions
//! - **Tools**: Immutable tool registry, built-in tools and the execution sandbox
//! - **Agent**: The step-bounded orchestration loop, task templates and batches
//!
//! # Usage
//!
//! ```rust,no_run
//! use scribe::{Config, Orchestrator};
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> scribe::Result<()> {
//!     let orchestrator = Orchestrator::from_config(&Config::load())?;
//!     let report = orchestrator
//!         .run("Translate a.f to C++ and build it", &CancellationToken::new())
//!         .await;
//!     println!("{}", report.summary());
//!     Ok(())
//! }
//! ```

pub mod agent;
pub mod core;
pub mod llm;
pub mod tools;

// Re-export commonly used items
pub use agent::{Orchestrator, RunOutcome, RunReport};
pub use core::{Config, Result, ScribeError};
