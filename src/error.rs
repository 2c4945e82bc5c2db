//! Error types for the appeal assistant
//!
//! Each layer keeps its own error enum (`LlmError`, `ToolError`,
//! `ConfigError`); [`AppealError`] is the top-level type that agents and
//! the runner propagate.

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

static SECRET_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(password|token|key|secret)[=:]\s*\S+").expect("secret pattern")
});

static SENSITIVE_PATH_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"/[a-zA-Z0-9._/-]+/(secrets?|\.ssh|\.aws|\.config)/[a-zA-Z0-9._/-]+")
        .expect("path pattern")
});

const MAX_USER_MESSAGE_LEN: usize = 500;

/// Main error type for agent and pipeline operations
#[derive(Debug, Error)]
pub enum AppealError {
    #[error("LLM provider error in {agent}: {source}")]
    Llm {
        agent: String,
        #[source]
        source: crate::llm::provider::LlmError,
    },

    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    #[error("Instruction references unknown state key '{key}'")]
    MissingStateKey { key: String },

    #[error("Agent {agent} exceeded {max} model turns without a final answer")]
    ToolIterationsExceeded { agent: String, max: usize },

    #[error("Internal error: {message}")]
    InternalError { message: String },

    #[error("Configuration error: {0}")]
    ConfigError(#[from] crate::config::ConfigError),

    #[error("Tool error: {0}")]
    ToolError(#[from] crate::tools::ToolError),
}

impl AppealError {
    pub fn llm(agent: impl Into<String>, source: crate::llm::provider::LlmError) -> Self {
        Self::Llm {
            agent: agent.into(),
            source,
        }
    }

    pub fn invalid_input<S: Into<String>>(message: S) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    pub fn internal_error<S: Into<String>>(message: S) -> Self {
        Self::InternalError {
            message: message.into(),
        }
    }

    /// Message safe to show to an end user
    pub fn user_message(&self) -> String {
        sanitize_error_message(&self.to_string())
    }
}

/// Redact credentials and sensitive paths, then cap the length
pub fn sanitize_error_message(message: &str) -> String {
    let mut sanitized = SECRET_PATTERN
        .replace_all(message, "${1}=***")
        .to_string();

    sanitized = SENSITIVE_PATH_PATTERN
        .replace_all(&sanitized, "/***REDACTED***/")
        .to_string();

    if sanitized.len() > MAX_USER_MESSAGE_LEN {
        let suffix = "...[truncated]";
        let mut cut = MAX_USER_MESSAGE_LEN - suffix.len();
        while !sanitized.is_char_boundary(cut) {
            cut -= 1;
        }
        sanitized = format!("{}{}", &sanitized[..cut], suffix);
    }

    sanitized
}

/// Result type for agent operations
pub type AppealResult<T> = Result<T, AppealError>;
