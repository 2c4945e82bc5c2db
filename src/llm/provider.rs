//! LLM provider abstraction and trait definitions
//!
//! Every agent role talks to a model through [`LlmProvider`], which keeps
//! the orchestration code independent of the vendor API behind it.

use crate::config::ModelSettings;
use crate::tools::ToolDescription;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// A single message in a conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: MessageRole,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: content.into(),
        }
    }
}

/// Message roles in a conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
}

/// LLM completion request parameters
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub messages: Vec<Message>,
    pub model: String,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
    pub top_p: Option<f32>,
    pub stop_sequences: Option<Vec<String>>,
    pub tools: Option<Vec<ToolDescription>>,
    pub metadata: HashMap<String, String>,
}

impl CompletionRequest {
    /// Request for a role's model settings; an empty tool list sends no tools
    pub fn for_model(
        settings: &ModelSettings,
        messages: Vec<Message>,
        tools: Vec<ToolDescription>,
    ) -> Self {
        Self {
            messages,
            model: settings.model.clone(),
            max_tokens: settings.max_tokens,
            temperature: settings.temperature,
            top_p: None,
            stop_sequences: None,
            tools: if tools.is_empty() { None } else { Some(tools) },
            metadata: HashMap::new(),
        }
    }
}

/// Tool call information from LLM response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    pub arguments: serde_json::Value,
}

/// LLM completion response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionResponse {
    pub content: Option<String>,
    pub model: String,
    pub usage: TokenUsage,
    pub finish_reason: FinishReason,
    pub tool_calls: Option<Vec<ToolCall>>,
    pub metadata: HashMap<String, String>,
}

impl CompletionResponse {
    /// Tool calls requested by the model, empty when it answered directly
    pub fn requested_tools(&self) -> &[ToolCall] {
        self.tool_calls.as_deref().unwrap_or_default()
    }
}

/// Token usage statistics
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// Reason why completion finished
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FinishReason {
    Stop,
    Length,
    ContentFilter,
    Error,
}

/// LLM provider trait for dependency injection and testing
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Provider name (e.g. "gemini", "openai")
    fn name(&self) -> &str;

    /// Generate a completion from the given request
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError>;

    /// Check if the provider is configured and reachable
    async fn health_check(&self) -> Result<(), LlmError>;
}

/// LLM provider errors
#[derive(Debug, Clone, Error)]
pub enum LlmError {
    #[error("Provider not configured: {0}")]
    NotConfigured(String),
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),
    #[error("HTTP {status} from provider: {body}")]
    HttpStatus { status: u16, body: String },
    #[error("Retries exhausted after {attempts} attempts: {last_error}")]
    RetriesExhausted { attempts: u32, last_error: String },
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
    #[error("Network error: {0}")]
    NetworkError(String),
    #[error("API error: {0}")]
    ApiError(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_message_constructors() {
        assert_eq!(Message::system("s").role, MessageRole::System);
        assert_eq!(Message::user("u").role, MessageRole::User);
        let reply = Message::assistant("a");
        assert_eq!(reply.role, MessageRole::Assistant);
        assert_eq!(reply.content, "a");
    }

    #[test]
    fn test_request_for_model_omits_empty_tools() {
        let settings = ModelSettings {
            model: "gemini-2.5-flash-lite".to_string(),
            temperature: Some(0.3),
            max_tokens: None,
        };
        let request = CompletionRequest::for_model(&settings, vec![Message::user("hi")], vec![]);
        assert_eq!(request.model, "gemini-2.5-flash-lite");
        assert_eq!(request.temperature, Some(0.3));
        assert!(request.tools.is_none());

        let tool = ToolDescription {
            name: "exit_loop".to_string(),
            description: "stop".to_string(),
            parameters: json!({"type": "object", "properties": {}}),
        };
        let request =
            CompletionRequest::for_model(&settings, vec![Message::user("hi")], vec![tool]);
        assert_eq!(request.tools.map(|t| t.len()), Some(1));
    }

    #[test]
    fn test_requested_tools_defaults_to_empty() {
        let response = CompletionResponse {
            content: Some("done".to_string()),
            model: "m".to_string(),
            usage: TokenUsage::default(),
            finish_reason: FinishReason::Stop,
            tool_calls: None,
            metadata: HashMap::new(),
        };
        assert!(response.requested_tools().is_empty());
    }

    #[test]
    fn test_llm_error_display() {
        let error = LlmError::HttpStatus {
            status: 503,
            body: "overloaded".to_string(),
        };
        assert_eq!(error.to_string(), "HTTP 503 from provider: overloaded");

        let error = LlmError::RetriesExhausted {
            attempts: 5,
            last_error: "HTTP 429".to_string(),
        };
        assert!(error.to_string().contains("5 attempts"));
    }

    #[test]
    fn test_message_role_serialization() {
        assert_eq!(
            serde_json::to_string(&MessageRole::Assistant).unwrap(),
            "\"assistant\""
        );
    }
}
