// Application configuration
// Read once from the environment in main, then handed to the adapters by reference.

use std::collections::HashMap;
use std::path::PathBuf;
use thiserror::Error;

pub const DEFAULT_LLM_BASE_URL: &str = "https://api.cerebras.ai/v1";
pub const DEFAULT_LLM_MODEL: &str = "gpt-oss-120b";
pub const DEFAULT_MAX_TOKENS: u32 = 500;
pub const DEFAULT_TEMPERATURE: f32 = 0.1;
pub const DEFAULT_JUDGE0_URL: &str = "http://localhost:2358";
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:5000";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("LLM API key not found. Set LLM_API_KEY (or CEREBRAS_API_KEY) in the environment or .env file")]
    MissingApiKey,

    #[error("Invalid value for {name}: {value}")]
    InvalidValue { name: &'static str, value: String },
}

/// Model parameters sent with every completion request
#[derive(Debug, Clone, PartialEq)]
pub struct ModelConfig {
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_LLM_MODEL.to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
            temperature: DEFAULT_TEMPERATURE,
        }
    }
}

#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: ModelConfig,
}

#[derive(Debug, Clone)]
pub struct Judge0Config {
    pub base_url: String,
    pub auth_token: Option<String>,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub llm: LlmConfig,
    pub judge0: Judge0Config,
    pub languages_path: Option<PathBuf>,
    pub bind_addr: String,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(std::env::vars().collect())
    }

    /// Build from an explicit variable map so tests never touch the process environment
    pub fn from_vars(vars: HashMap<String, String>) -> Result<Self, ConfigError> {
        let get = |name: &str| {
            vars.get(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let api_key = get("LLM_API_KEY")
            .or_else(|| get("CEREBRAS_API_KEY"))
            .ok_or(ConfigError::MissingApiKey)?;

        let max_tokens = match get("LLM_MAX_TOKENS") {
            Some(raw) => raw
                .parse::<u32>()
                .ok()
                .filter(|n| *n > 0)
                .ok_or(ConfigError::InvalidValue { name: "LLM_MAX_TOKENS", value: raw })?,
            None => DEFAULT_MAX_TOKENS,
        };

        let temperature = match get("LLM_TEMPERATURE") {
            Some(raw) => raw
                .parse::<f32>()
                .ok()
                .filter(|t| (0.0..=1.0).contains(t))
                .ok_or(ConfigError::InvalidValue { name: "LLM_TEMPERATURE", value: raw })?,
            None => DEFAULT_TEMPERATURE,
        };

        Ok(Self {
            llm: LlmConfig {
                api_key,
                base_url: get("LLM_BASE_URL").unwrap_or_else(|| DEFAULT_LLM_BASE_URL.to_string()),
                model: ModelConfig {
                    model: get("LLM_MODEL").unwrap_or_else(|| DEFAULT_LLM_MODEL.to_string()),
                    max_tokens,
                    temperature,
                },
            },
            judge0: Judge0Config {
                base_url: get("JUDGE0_URL").unwrap_or_else(|| DEFAULT_JUDGE0_URL.to_string()),
                auth_token: get("JUDGE0_AUTH_TOKEN"),
            },
            languages_path: get("LANGUAGES_CONFIG").map(PathBuf::from),
            bind_addr: get("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string()),
        })
    }
}
