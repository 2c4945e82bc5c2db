//! Model-backed agent with a bounded tool-call loop
//!
//! Each model turn may request tool calls. The calls are executed, their
//! results are appended as a user message, and the model is asked again,
//! until it answers without tools, a tool raises the exit signal, or the
//! turn budget runs out.

use crate::agent::{Agent, AgentOutcome, InvocationContext};
use crate::config::ModelSettings;
use crate::error::{AppealError, AppealResult};
use crate::llm::provider::{CompletionRequest, LlmProvider, Message, ToolCall};
use crate::session::{render_instruction, SessionState};
use crate::tools::{ToolContext, ToolSystem};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info, warn, Instrument};

const DEFAULT_MAX_TOOL_ITERATIONS: usize = 10;

/// Metadata key carrying the calling agent's name on every model request
pub const AGENT_METADATA_KEY: &str = "agent";

pub struct LlmAgent {
    name: String,
    description: String,
    instruction: String,
    settings: ModelSettings,
    provider: Arc<dyn LlmProvider>,
    tools: ToolSystem,
    output_key: Option<String>,
    max_tool_iterations: usize,
}

/// Result of one tool-call loop
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TurnResult {
    pub text: String,
    pub escalate: bool,
    pub model_turns: usize,
}

impl LlmAgent {
    pub fn new(
        name: impl Into<String>,
        provider: Arc<dyn LlmProvider>,
        settings: ModelSettings,
    ) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            instruction: String::new(),
            settings,
            provider,
            tools: ToolSystem::new(),
            output_key: None,
            max_tool_iterations: DEFAULT_MAX_TOOL_ITERATIONS,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Instruction template; `{key}` placeholders are filled from state
    pub fn with_instruction(mut self, instruction: impl Into<String>) -> Self {
        self.instruction = instruction.into();
        self
    }

    pub fn with_tools(mut self, tools: ToolSystem) -> Self {
        self.tools = tools;
        self
    }

    pub fn with_output_key(mut self, key: impl Into<String>) -> Self {
        self.output_key = Some(key.into());
        self
    }

    pub fn with_max_tool_iterations(mut self, max: usize) -> Self {
        self.max_tool_iterations = max.max(1);
        self
    }

    pub fn instruction(&self) -> &str {
        &self.instruction
    }

    pub fn output_key(&self) -> Option<&str> {
        self.output_key.as_deref()
    }

    pub fn tools(&self) -> &ToolSystem {
        &self.tools
    }

    /// Drive the model until it produces a final answer
    ///
    /// Messages produced along the way are appended to `messages`.
    pub async fn run_turn(
        &self,
        messages: &mut Vec<Message>,
        state: &mut SessionState,
    ) -> AppealResult<TurnResult> {
        let descriptions = self.tools.descriptions();

        for model_turn in 1..=self.max_tool_iterations {
            let mut request =
                CompletionRequest::for_model(&self.settings, messages.clone(), descriptions.clone());
            request
                .metadata
                .insert(AGENT_METADATA_KEY.to_string(), self.name.clone());

            let response = self
                .provider
                .complete(request)
                .await
                .map_err(|e| AppealError::llm(&self.name, e))?;

            let content = response.content.clone().unwrap_or_default();
            let calls = response.requested_tools();
            if !content.is_empty() {
                messages.push(Message::assistant(content.clone()));
            } else if !calls.is_empty() {
                // Keep a model turn ahead of the tool results in the transcript
                messages.push(Message::assistant(tool_call_note(calls)));
            }

            if calls.is_empty() {
                debug!(agent = %self.name, model_turns = model_turn, "Model produced final answer");
                return Ok(TurnResult {
                    text: content,
                    escalate: false,
                    model_turns: model_turn,
                });
            }

            debug!(agent = %self.name, model_turn, tool_count = calls.len(), "Processing tool calls");
            let (results, escalate) = self.execute_tool_calls(calls, state).await;
            messages.push(Message::user(format!("Tool results:\n{}", results.join("\n"))));

            if escalate {
                info!(agent = %self.name, model_turns = model_turn, "Tool raised exit signal");
                return Ok(TurnResult {
                    text: content,
                    escalate: true,
                    model_turns: model_turn,
                });
            }
        }

        Err(AppealError::ToolIterationsExceeded {
            agent: self.name.clone(),
            max: self.max_tool_iterations,
        })
    }

    /// Run each call in order; failures are reported back to the model as text
    async fn execute_tool_calls(
        &self,
        calls: &[ToolCall],
        state: &mut SessionState,
    ) -> (Vec<String>, bool) {
        let mut results = Vec::with_capacity(calls.len());
        let mut escalate = false;

        for call in calls {
            let mut context = ToolContext::new(&self.name, state);
            match self
                .tools
                .execute_tool(&call.name, &call.arguments, &mut context)
                .await
            {
                Ok(value) => results.push(format!("Tool {} returned: {}", call.name, value)),
                Err(e) => {
                    warn!(agent = %self.name, tool = %call.name, error = %e, "Tool call failed");
                    results.push(format!("Tool {} failed: {}", call.name, e));
                }
            }
            escalate |= context.actions.escalate;
        }

        (results, escalate)
    }
}

fn tool_call_note(calls: &[ToolCall]) -> String {
    let names: Vec<&str> = calls.iter().map(|call| call.name.as_str()).collect();
    format!("Calling tools: {}", names.join(", "))
}

#[async_trait]
impl Agent for LlmAgent {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    async fn run(&self, ctx: &mut InvocationContext) -> AppealResult<AgentOutcome> {
        let span = crate::agent_span!(agent = %self.name, invocation_id = %ctx.invocation_id);

        async {
            let instruction = render_instruction(&self.instruction, &ctx.state)?;
            let mut messages = vec![
                Message::system(instruction),
                Message::user(ctx.user_content.clone()),
            ];

            let turn = self.run_turn(&mut messages, &mut ctx.state).await?;
            // Models often pad replies with newlines; state holds the bare text
            let text = turn.text.trim().to_string();

            if !turn.escalate {
                match (&self.output_key, text.is_empty()) {
                    (Some(key), false) => ctx.state.set(key.clone(), text.clone()),
                    (Some(key), true) => {
                        warn!(agent = %self.name, output_key = %key, "Empty model output; state left unchanged")
                    }
                    (None, _) => {}
                }
            }

            Ok::<_, AppealError>(AgentOutcome {
                text: Some(text).filter(|t| !t.is_empty()),
                escalate: turn.escalate,
            })
        }
        .instrument(span)
        .await
    }
}
