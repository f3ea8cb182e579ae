//! LLM module - Language Model integrations
//!
//! Services move text over HTTP; the adapter owns everything between the
//! conversation and the service: role mapping, size limits, retries and
//! reply parsing.

pub mod adapter;
pub mod provider;
pub mod reply;
pub mod retry;
pub mod roles;
pub mod traits;

pub use adapter::ModelAdapter;
pub use provider::create_provider;
pub use reply::parse_action;
pub use retry::RetryPolicy;
pub use roles::RoleMap;
pub use traits::{CompletionRequest, GenerateOptions, ModelService, WireMessage};
