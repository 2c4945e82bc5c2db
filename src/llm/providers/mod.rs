//! LLM provider implementations
//!
//! Concrete [`LlmProvider`](crate::llm::provider::LlmProvider) backends and
//! the factory that picks one from configuration.

pub mod gemini;
pub mod openai;

pub use gemini::*;
pub use openai::*;

use crate::config::AppConfig;
use crate::llm::provider::{LlmError, LlmProvider};
use crate::llm::retry::RetryPolicy;
use std::sync::Arc;

/// Build the configured provider with the shared retry policy
///
/// A missing API key is only warned about; the provider is built anyway and
/// each model call fails until the key is set.
pub fn create_provider(config: &AppConfig) -> Result<Arc<dyn LlmProvider>, LlmError> {
    let api_key = if config.check_credentials() {
        config.get_llm_api_key().unwrap_or_default()
    } else {
        String::new()
    };
    let retry = RetryPolicy::from(&config.retry);
    let timeout = config.llm_timeout();

    match config.llm.provider.as_str() {
        "gemini" => {
            let mut gemini = GeminiConfig {
                api_key,
                timeout,
                retry,
                ..Default::default()
            };
            if let Some(base_url) = &config.llm.base_url {
                gemini.base_url = base_url.clone();
            }
            Ok(Arc::new(GeminiProvider::build(gemini)?))
        }
        "openai" => {
            let mut openai = OpenAiConfig {
                api_key,
                timeout,
                retry,
                ..Default::default()
            };
            if let Some(base_url) = &config.llm.base_url {
                openai.base_url = base_url.clone();
            }
            Ok(Arc::new(OpenAiProvider::build(openai)?))
        }
        other => Err(LlmError::NotConfigured(format!(
            "Unsupported LLM provider: {other}"
        ))),
    }
}
