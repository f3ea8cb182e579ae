//! Core module - shared infrastructure for Scribe
//!
//! This module contains foundational types, configuration, and error handling
//! used throughout the crate.

pub mod config;
pub mod error;
pub mod types;

pub use config::Config;
pub use error::{Result, ScribeError, ValidationError};
pub use types::*;
