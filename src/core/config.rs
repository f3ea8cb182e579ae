//! Configuration management for Scribe
//!
//! Supports environment variables, config files, and runtime overrides.
//! Priority: CLI args > config file > env vars > defaults.
//!
//! Config file location: ~/.config/scribe/config.toml

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use crate::core::error::{Result, ScribeError};

/// Main configuration for Scribe
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Model service configuration
    #[serde(default)]
    pub model: ModelConfig,
    /// Process and filesystem sandbox configuration
    #[serde(default)]
    pub sandbox: SandboxConfig,
    /// Agent loop configuration
    #[serde(default)]
    pub agent: AgentConfig,
    /// Makefile template used by `update_makefile`
    #[serde(default)]
    pub makefile: MakefileConfig,
}

/// Which remote service speaks to the model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderType {
    /// Argo gateway (`{user, model, messages}` → `{response}`)
    Argo,
    /// Local Ollama server
    Ollama,
    /// Any OpenAI-compatible chat completions endpoint
    OpenAi,
}

impl ProviderType {
    fn from_env_value(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "argo" => Some(Self::Argo),
            "ollama" => Some(Self::Ollama),
            "openai" => Some(Self::OpenAi),
            _ => None,
        }
    }

    fn default_endpoint(&self) -> String {
        match self {
            ProviderType::Argo => String::new(),
            ProviderType::Ollama => "http://localhost:11434".to_string(),
            ProviderType::OpenAi => "https://api.openai.com/v1".to_string(),
        }
    }

    fn default_model(&self) -> &'static str {
        match self {
            ProviderType::Argo => "gpt5mini",
            ProviderType::Ollama => "qwen3:8b",
            ProviderType::OpenAi => "gpt-4o-mini",
        }
    }
}

impl std::fmt::Display for ProviderType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProviderType::Argo => write!(f, "argo"),
            ProviderType::Ollama => write!(f, "ollama"),
            ProviderType::OpenAi => write!(f, "openai"),
        }
    }
}

/// Model service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Service flavour
    pub provider: ProviderType,
    /// Base URL (Ollama/OpenAI) or full chat URL (Argo)
    pub endpoint: String,
    /// Model identifier
    pub model: String,
    /// User name sent with Argo requests
    pub user: Option<String>,
    /// Bearer key for OpenAI-compatible services
    pub api_key: Option<String>,
    /// Sampling temperature
    pub temperature: f32,
    /// Nucleus sampling
    pub top_p: f32,
    /// Completion token cap
    pub max_completion_tokens: u32,
    /// Per-request timeout in seconds
    pub timeout_secs: u64,
    /// Attempts per model request, including the first
    pub max_attempts: u32,
    /// First backoff delay in milliseconds
    pub backoff_base_ms: u64,
    /// Backoff delay ceiling in milliseconds
    pub backoff_max_ms: u64,
    /// Serialized request size ceiling in bytes
    pub max_input_bytes: usize,
}

impl Default for ModelConfig {
    fn default() -> Self {
        let provider = env::var("SCRIBE_PROVIDER")
            .ok()
            .and_then(|v| ProviderType::from_env_value(&v))
            .unwrap_or(ProviderType::Argo);

        let endpoint = env::var("SCRIBE_ENDPOINT")
            .or_else(|_| match provider {
                ProviderType::Argo => env::var("ARGO_API_ENDPOINT"),
                _ => Err(env::VarError::NotPresent),
            })
            .unwrap_or_else(|_| provider.default_endpoint());

        Self {
            provider,
            endpoint,
            model: env::var("SCRIBE_MODEL").unwrap_or_else(|_| provider.default_model().to_string()),
            user: env::var("ARGO_USER").ok(),
            api_key: env::var("SCRIBE_API_KEY")
                .or_else(|_| env::var("OPENAI_API_KEY"))
                .ok(),
            temperature: 0.7,
            top_p: 0.9,
            max_completion_tokens: 4000,
            timeout_secs: 300,
            max_attempts: 4,
            backoff_base_ms: 1000,
            backoff_max_ms: 30_000,
            max_input_bytes: 400_000,
        }
    }
}

/// Process and filesystem boundary configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SandboxConfig {
    /// Directory every command and relative path resolves against
    pub working_dir: PathBuf,
    /// Translation CLI invoked by `execute_code_scribe`
    pub translator_cli: String,
    /// Default build command for `run_build`
    pub build_command: String,
    /// Timeout for external commands, in seconds
    pub command_timeout_secs: u64,
    /// Time between SIGTERM and the forced kill, in milliseconds
    pub kill_grace_ms: u64,
    /// Bytes retained per output stream
    pub output_cap_bytes: usize,
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            working_dir: PathBuf::from("."),
            translator_cli: env::var("SCRIBE_TRANSLATOR").unwrap_or_else(|_| "code-scribe".to_string()),
            build_command: env::var("SCRIBE_BUILD_COMMAND").unwrap_or_else(|_| "make".to_string()),
            command_timeout_secs: 1800,
            kill_grace_ms: 2000,
            output_cap_bytes: 64 * 1024,
        }
    }
}

/// Agent loop configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Maximum action/observation cycles per run
    /// Default: 20
    pub max_steps: usize,
    /// Extra behavioural instructions appended to the system turn
    pub instructions: Option<String>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_steps: env::var("SCRIBE_MAX_STEPS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(20),
            instructions: None,
        }
    }
}

/// Makefile template settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MakefileConfig {
    pub compiler: String,
    pub flags: String,
}

impl Default for MakefileConfig {
    fn default() -> Self {
        Self {
            compiler: "g++".to_string(),
            flags: "-std=c++11 -Wall".to_string(),
        }
    }
}

impl Config {
    /// Get the config directory path
    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("scribe")
    }

    /// Get the config file path
    pub fn config_file() -> PathBuf {
        Self::config_dir().join("config.toml")
    }

    /// Load configuration from the default file, environment, and defaults
    pub fn load() -> Self {
        // Try to load .env file if it exists
        let _ = dotenvy::dotenv();

        match Self::load_from(&Self::config_file()) {
            Ok(config) => config,
            Err(e) => {
                tracing::debug!("Using default configuration: {}", e);
                Self::default()
            }
        }
    }

    /// Load configuration from a specific file
    pub fn load_from(path: &Path) -> Result<Self> {
        let _ = dotenvy::dotenv();

        if !path.exists() {
            return Err(ScribeError::config(format!(
                "Config file not found: {}",
                path.display()
            )));
        }

        let content = fs::read_to_string(path)
            .map_err(|e| ScribeError::config(format!("Failed to read config: {}", e)))?;

        Self::from_toml(&content)
    }

    /// Parse configuration from TOML text; missing keys take defaults
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content)
            .map_err(|e| ScribeError::config(format!("Failed to parse config: {}", e)))
    }

    /// Render the configuration as TOML
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| ScribeError::config(format!("Failed to serialize config: {}", e)))
    }

    /// Check the configuration before starting a run
    pub fn validate(&self) -> Result<()> {
        if self.model.endpoint.trim().is_empty() {
            return Err(ScribeError::config(format!(
                "No endpoint configured for provider '{}'. Set ARGO_API_ENDPOINT or model.endpoint",
                self.model.provider
            )));
        }
        url::Url::parse(&self.model.endpoint).map_err(|e| {
            ScribeError::config(format!("Invalid endpoint '{}': {}", self.model.endpoint, e))
        })?;

        if self.model.provider == ProviderType::Argo && self.model.user.is_none() {
            return Err(ScribeError::config(
                "Argo requires a user name. Set ARGO_USER or model.user",
            ));
        }
        if self.model.max_attempts == 0 {
            return Err(ScribeError::config("model.max_attempts must be at least 1"));
        }
        if self.agent.max_steps == 0 {
            return Err(ScribeError::config("agent.max_steps must be at least 1"));
        }
        if self.sandbox.output_cap_bytes == 0 {
            return Err(ScribeError::config("sandbox.output_cap_bytes must be at least 1"));
        }
        Ok(())
    }
}
