//! Configuration for the claim appeal assistant
//!
//! Everything that the agents share (model settings, the model-call retry
//! policy, the appeal window, the refinement loop cap) lives in one
//! [`AppConfig`] that is loaded from TOML and handed to constructors.
//! Secrets are never stored in the file, only the names of the
//! environment variables holding them.

use crate::eligibility::DEFAULT_APPEAL_WINDOW_DAYS;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use tracing::warn;

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub agent: AgentSection,
    #[serde(default)]
    pub llm: LlmSection,
    #[serde(default)]
    pub retry: RetrySection,
    #[serde(default)]
    pub eligibility: EligibilitySection,
    #[serde(default)]
    pub pipeline: PipelineSection,
    /// Per-role model overrides keyed by role name (e.g. "reviewer")
    #[serde(default)]
    pub roles: BTreeMap<String, RoleOverride>,
    #[serde(default)]
    pub tools: ToolsSection,
}

/// Identity of the root coordinator
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AgentSection {
    /// Agent name (must match [a-zA-Z0-9._-]+)
    #[serde(default = "default_agent_name")]
    pub name: String,
    #[serde(default = "default_agent_description")]
    pub description: String,
}

fn default_agent_name() -> String {
    "claim_ally_agent".to_string()
}

fn default_agent_description() -> String {
    "Checks appeal eligibility for denied insurance claims and drafts appeal letters".to_string()
}

impl Default for AgentSection {
    fn default() -> Self {
        Self {
            name: default_agent_name(),
            description: default_agent_description(),
        }
    }
}

/// Model provider settings shared by every role
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LlmSection {
    /// Provider name ("gemini" or "openai")
    #[serde(default = "default_provider")]
    pub provider: String,
    /// Model identifier
    #[serde(default = "default_model")]
    pub model: String,
    /// Environment variable containing the API key
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    /// Override for the provider's API base URL
    pub base_url: Option<String>,
    /// HTTP timeout per model call in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Optional temperature (0.0 to 2.0)
    pub temperature: Option<f32>,
    /// Optional max output tokens
    pub max_tokens: Option<u32>,
}

fn default_provider() -> String {
    "gemini".to_string()
}

fn default_model() -> String {
    "gemini-2.5-flash-lite".to_string()
}

fn default_api_key_env() -> String {
    "GOOGLE_API_KEY".to_string()
}

fn default_timeout_secs() -> u64 {
    60
}

impl Default for LlmSection {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_model(),
            api_key_env: default_api_key_env(),
            base_url: None,
            timeout_secs: default_timeout_secs(),
            temperature: None,
            max_tokens: None,
        }
    }
}

/// Retry policy applied to every model call
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RetrySection {
    /// Maximum attempts including the first one
    #[serde(default = "default_attempts")]
    pub attempts: u32,
    /// Delay multiplier between consecutive retries
    #[serde(default = "default_exp_base")]
    pub exp_base: f64,
    /// Delay before the first retry in milliseconds
    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,
    /// Upper bound for any single delay in milliseconds
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
    /// HTTP statuses that trigger a retry
    #[serde(default = "default_http_status_codes")]
    pub http_status_codes: Vec<u16>,
}

fn default_attempts() -> u32 {
    5
}

fn default_exp_base() -> f64 {
    7.0
}

fn default_initial_delay_ms() -> u64 {
    1000
}

fn default_max_delay_ms() -> u64 {
    60_000
}

fn default_http_status_codes() -> Vec<u16> {
    vec![429, 500, 503, 504]
}

impl Default for RetrySection {
    fn default() -> Self {
        Self {
            attempts: default_attempts(),
            exp_base: default_exp_base(),
            initial_delay_ms: default_initial_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            http_status_codes: default_http_status_codes(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EligibilitySection {
    #[serde(default = "default_window_days")]
    pub appeal_window_days: u64,
}

fn default_window_days() -> u64 {
    DEFAULT_APPEAL_WINDOW_DAYS
}

impl Default for EligibilitySection {
    fn default() -> Self {
        Self {
            appeal_window_days: default_window_days(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PipelineSection {
    /// Review/refine passes before the loop gives up
    #[serde(default = "default_max_refinement_iterations")]
    pub max_refinement_iterations: usize,
    /// Model turns allowed inside a single agent run
    #[serde(default = "default_max_tool_iterations")]
    pub max_tool_iterations: usize,
}

fn default_max_refinement_iterations() -> usize {
    3
}

fn default_max_tool_iterations() -> usize {
    10
}

impl Default for PipelineSection {
    fn default() -> Self {
        Self {
            max_refinement_iterations: default_max_refinement_iterations(),
            max_tool_iterations: default_max_tool_iterations(),
        }
    }
}

/// Per-role model settings; unset fields fall back to `[llm]`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct RoleOverride {
    pub model: Option<String>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ToolsSection {
    #[serde(default)]
    pub web_search: WebSearchSection,
}

/// Search backend used by the researcher role
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WebSearchSection {
    #[serde(default = "default_search_enabled")]
    pub enabled: bool,
    #[serde(default = "default_search_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_search_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_search_max_results")]
    pub max_results: usize,
}

fn default_search_enabled() -> bool {
    true
}

fn default_search_api_key_env() -> String {
    "SERPER_API_KEY".to_string()
}

fn default_search_endpoint() -> String {
    "https://google.serper.dev/search".to_string()
}

fn default_search_max_results() -> usize {
    5
}

impl Default for WebSearchSection {
    fn default() -> Self {
        Self {
            enabled: default_search_enabled(),
            api_key_env: default_search_api_key_env(),
            endpoint: default_search_endpoint(),
            max_results: default_search_max_results(),
        }
    }
}

/// Resolved model settings for one role
#[derive(Debug, Clone, PartialEq)]
pub struct ModelSettings {
    pub model: String,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),
    #[error("Failed to parse TOML: {0}")]
    TomlParse(#[from] toml::de::Error),
    #[error("Environment variable not found: {0}")]
    EnvVarNotFound(String),
    #[error("Invalid agent name: {0}")]
    InvalidAgentName(String),
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl AppConfig {
    /// Load configuration from a TOML file and validate it
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: AppConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_agent_name(&self.agent.name)?;

        match self.llm.provider.as_str() {
            "gemini" | "openai" => {}
            other => {
                return Err(ConfigError::InvalidConfig(format!(
                    "Unsupported LLM provider '{other}' (expected \"gemini\" or \"openai\")"
                )))
            }
        }

        if self.retry.attempts == 0 {
            return Err(ConfigError::InvalidConfig(
                "retry.attempts must be at least 1".to_string(),
            ));
        }
        if self.retry.exp_base < 1.0 {
            return Err(ConfigError::InvalidConfig(
                "retry.exp_base must be >= 1.0".to_string(),
            ));
        }
        if self.pipeline.max_refinement_iterations == 0 {
            return Err(ConfigError::InvalidConfig(
                "pipeline.max_refinement_iterations must be at least 1".to_string(),
            ));
        }
        if self.pipeline.max_tool_iterations == 0 {
            return Err(ConfigError::InvalidConfig(
                "pipeline.max_tool_iterations must be at least 1".to_string(),
            ));
        }
        if let Some(temperature) = self.llm.temperature {
            if !(0.0..=2.0).contains(&temperature) {
                return Err(ConfigError::InvalidConfig(format!(
                    "llm.temperature {temperature} outside 0.0..=2.0"
                )));
            }
        }

        Ok(())
    }

    /// Model settings for a role, applying `[roles.<name>]` overrides
    pub fn model_settings_for(&self, role: &str) -> ModelSettings {
        let role_override = self.roles.get(role).cloned().unwrap_or_default();
        ModelSettings {
            model: role_override
                .model
                .unwrap_or_else(|| self.llm.model.clone()),
            temperature: role_override.temperature.or(self.llm.temperature),
            max_tokens: role_override.max_tokens.or(self.llm.max_tokens),
        }
    }

    pub fn llm_timeout(&self) -> Duration {
        Duration::from_secs(self.llm.timeout_secs)
    }

    /// Get LLM API key from its environment variable
    pub fn get_llm_api_key(&self) -> Result<String, ConfigError> {
        get_env_var_required(&self.llm.api_key_env)
    }

    /// Search API key, `None` when unset or empty
    pub fn get_search_api_key(&self) -> Option<String> {
        std::env::var(&self.tools.web_search.api_key_env)
            .ok()
            .filter(|key| !key.is_empty())
    }

    /// Log a warning when the model credential is missing
    ///
    /// Returns whether the credential is present.
    pub fn check_credentials(&self) -> bool {
        match self.get_llm_api_key() {
            Ok(key) if !key.is_empty() => true,
            _ => {
                warn!(
                    api_key_env = %self.llm.api_key_env,
                    "{} not found; model calls will fail until it is set (a .env file is also read)",
                    self.llm.api_key_env
                );
                false
            }
        }
    }
}

fn get_env_var_required(env_var_name: &str) -> Result<String, ConfigError> {
    std::env::var(env_var_name).map_err(|_| ConfigError::EnvVarNotFound(env_var_name.to_string()))
}

fn validate_agent_name(name: &str) -> Result<(), ConfigError> {
    let valid_chars = name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '_' || c == '-');

    if name.is_empty() || !valid_chars {
        return Err(ConfigError::InvalidAgentName(format!(
            "Agent name '{name}' must match pattern [a-zA-Z0-9._-]+"
        )));
    }

    Ok(())
}
