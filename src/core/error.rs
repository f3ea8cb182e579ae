//! Custom error types for Scribe
//!
//! `ScribeError` covers everything that can end a run or fail startup.
//! `ValidationError` covers malformed tool calls, which the agent loop
//! feeds back to the model instead of aborting.

use thiserror::Error;

/// Main error type for Scribe operations
#[derive(Error, Debug)]
pub enum ScribeError {
    /// A tool call the model produced could not be accepted
    #[error("{0}")]
    Validation(#[from] ValidationError),

    /// A tool with the same name was registered twice
    #[error("DuplicateToolError: tool '{0}' is already registered")]
    DuplicateTool(String),

    /// An external process could not be launched
    #[error("ExecutionError: {0}")]
    Execution(String),

    /// The model service stayed unreachable after all retries
    #[error("ModelUnavailableError: gave up after {attempts} attempt(s): {last_error}")]
    ModelUnavailable { attempts: u32, last_error: String },

    /// The model service refused the request with a non-retryable status
    #[error("ModelRejectedError: HTTP {status}: {body}")]
    ModelRejected { status: u16, body: String },

    /// A single model request failed; `retryable` drives the retry policy
    #[error("Model request failed: {message}")]
    ModelRequest { message: String, retryable: bool },

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// JSON parsing errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error for other cases
    #[error("{0}")]
    Other(String),
}

/// Convenience Result type for Scribe operations
pub type Result<T> = std::result::Result<T, ScribeError>;

impl ScribeError {
    /// Create an execution (launch) error
    pub fn execution(msg: impl Into<String>) -> Self {
        Self::Execution(msg.into())
    }

    /// Create a config error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a model request error that may be retried
    pub fn transient(msg: impl Into<String>) -> Self {
        Self::ModelRequest {
            message: msg.into(),
            retryable: true,
        }
    }

    /// Create a model request error that must not be retried
    pub fn permanent(msg: impl Into<String>) -> Self {
        Self::ModelRequest {
            message: msg.into(),
            retryable: false,
        }
    }

    /// Whether the model retry policy should try this request again
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::ModelRequest {
                retryable: true,
                ..
            }
        )
    }
}

impl From<reqwest::Error> for ScribeError {
    fn from(e: reqwest::Error) -> Self {
        // Timeouts, refused connections and truncated bodies are retryable.
        let retryable = e.is_timeout() || e.is_connect() || e.is_request() || e.is_body();
        Self::ModelRequest {
            message: e.to_string(),
            retryable,
        }
    }
}

/// A recoverable problem with a tool call
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// The named tool is not in the registry
    #[error("UnknownToolError: no tool named '{name}'. Available tools: {available}")]
    UnknownTool { name: String, available: String },

    /// A required argument was not supplied
    #[error("MissingArgument: tool '{tool}' requires argument '{argument}'")]
    MissingArgument { tool: String, argument: String },

    /// An argument has the wrong JSON type
    #[error("InvalidArgument: argument '{argument}' of tool '{tool}' must be {expected}")]
    InvalidArgument {
        tool: String,
        argument: String,
        expected: String,
    },

    /// The arguments were not a JSON object
    #[error("InvalidArguments: arguments for tool '{tool}' must be a JSON object")]
    ArgumentsNotObject { tool: String },

    /// The model reply contained an action block that could not be parsed
    #[error("MalformedCall: {reason}")]
    MalformedCall { raw: String, reason: String },

    /// The model reply contained no action object at all
    #[error(
        "NoAction: the reply contains no tool call. Reply with one tool call, or call \
         final_answer with an 'answer' argument when the task is done"
    )]
    NoAction { raw: String },
}

impl ValidationError {
    /// The model's reply text, for errors raised while parsing it
    pub fn raw_reply(&self) -> Option<&str> {
        match self {
            Self::MalformedCall { raw, .. } | Self::NoAction { raw } => Some(raw),
            _ => None,
        }
    }
}
