//! Mock implementations for testing
//!
//! [`ScriptedLlmProvider`] plays back per-agent reply scripts, so a whole
//! pipeline can run without a model endpoint. Scripts are keyed by the
//! agent name every [`LlmAgent`](crate::agent::LlmAgent) puts in request
//! metadata.

use crate::agent::llm_agent::AGENT_METADATA_KEY;
use crate::llm::provider::{
    CompletionRequest, CompletionResponse, FinishReason, LlmError, LlmProvider, TokenUsage,
    ToolCall,
};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use tokio::sync::Mutex;

/// One canned model reply
#[derive(Debug, Clone)]
pub enum ScriptedReply {
    Text(String),
    ToolCalls {
        content: Option<String>,
        calls: Vec<(String, Value)>,
    },
    Error(LlmError),
}

impl ScriptedReply {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }

    pub fn tool_call(name: impl Into<String>, arguments: Value) -> Self {
        Self::ToolCalls {
            content: None,
            calls: vec![(name.into(), arguments)],
        }
    }

    pub fn error(error: LlmError) -> Self {
        Self::Error(error)
    }
}

/// Provider that answers each agent from its own queue of replies
///
/// A request from an agent whose queue is empty fails with
/// [`LlmError::ApiError`], which makes unexpected extra calls visible.
#[derive(Debug, Default)]
pub struct ScriptedLlmProvider {
    scripts: Mutex<HashMap<String, VecDeque<ScriptedReply>>>,
    requests: Mutex<Vec<CompletionRequest>>,
    call_counter: Mutex<usize>,
}

impl ScriptedLlmProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue replies for `agent`, appending to any already queued
    pub fn script(mut self, agent: impl Into<String>, replies: Vec<ScriptedReply>) -> Self {
        self.scripts
            .get_mut()
            .entry(agent.into())
            .or_default()
            .extend(replies);
        self
    }

    /// Every request received, in order
    pub async fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().await.clone()
    }

    /// Requests sent by one agent
    pub async fn requests_for(&self, agent: &str) -> Vec<CompletionRequest> {
        self.requests
            .lock()
            .await
            .iter()
            .filter(|request| request_agent(request) == agent)
            .cloned()
            .collect()
    }

    /// Replies still queued for `agent`
    pub async fn remaining(&self, agent: &str) -> usize {
        self.scripts
            .lock()
            .await
            .get(agent)
            .map(VecDeque::len)
            .unwrap_or(0)
    }
}

fn request_agent(request: &CompletionRequest) -> &str {
    request
        .metadata
        .get(AGENT_METADATA_KEY)
        .map(String::as_str)
        .unwrap_or("")
}

fn response(content: Option<String>, tool_calls: Option<Vec<ToolCall>>) -> CompletionResponse {
    CompletionResponse {
        content,
        model: "mock-model".to_string(),
        usage: TokenUsage {
            prompt_tokens: 10,
            completion_tokens: 5,
            total_tokens: 15,
        },
        finish_reason: FinishReason::Stop,
        tool_calls,
        metadata: HashMap::new(),
    }
}

#[async_trait]
impl LlmProvider for ScriptedLlmProvider {
    fn name(&self) -> &str {
        "mock"
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        let agent = request_agent(&request).to_string();
        self.requests.lock().await.push(request);

        let reply = self
            .scripts
            .lock()
            .await
            .get_mut(&agent)
            .and_then(VecDeque::pop_front)
            .ok_or_else(|| LlmError::ApiError(format!("no scripted reply left for agent '{agent}'")))?;

        let mut counter = self.call_counter.lock().await;
        *counter += 1;

        match reply {
            ScriptedReply::Text(text) => Ok(response(Some(text), None)),
            ScriptedReply::ToolCalls { content, calls } => {
                let calls = calls
                    .into_iter()
                    .enumerate()
                    .map(|(index, (name, arguments))| ToolCall {
                        id: format!("call_{}_{}", *counter, index),
                        name,
                        arguments,
                    })
                    .collect();
                Ok(response(content, Some(calls)))
            }
            ScriptedReply::Error(error) => Err(error),
        }
    }

    async fn health_check(&self) -> Result<(), LlmError> {
        Ok(())
    }
}
