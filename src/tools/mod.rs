//! Tool system
//!
//! Tools are the functions an agent's model may call. Each tool describes
//! itself with a JSON schema, arguments are validated against that schema
//! before execution, and tools get a [`ToolContext`] to read or write the
//! session state and to raise the loop exit signal.

use crate::session::SessionState;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::Instrument;

pub mod agent_tool;
pub mod eligibility;
pub mod exit_loop;
pub mod web_search;

pub use agent_tool::AgentTool;
pub use eligibility::CheckAppealEligibilityTool;
pub use exit_loop::ExitLoopTool;
pub use web_search::WebSearchTool;

/// A callable function exposed to a model
#[async_trait]
pub trait Tool: Send + Sync {
    /// Name, description and parameter schema sent to the model
    fn describe(&self) -> ToolDescription;

    /// Run with arguments that already passed schema validation
    async fn execute(
        &self,
        parameters: &Value,
        context: &mut ToolContext<'_>,
    ) -> Result<Value, ToolError>;
}

/// Tool description sent to the model
#[derive(Debug, Clone, PartialEq)]
pub struct ToolDescription {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

/// Side effects a tool may request from the agent running it
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ToolActions {
    /// Ask the enclosing loop to stop
    pub escalate: bool,
}

/// Per-call view of the invocation a tool runs in
pub struct ToolContext<'a> {
    pub agent_name: &'a str,
    pub state: &'a mut SessionState,
    pub actions: ToolActions,
}

impl<'a> ToolContext<'a> {
    pub fn new(agent_name: &'a str, state: &'a mut SessionState) -> Self {
        Self {
            agent_name,
            state,
            actions: ToolActions::default(),
        }
    }
}

/// Name-keyed set of tools available to one agent
#[derive(Clone, Default)]
pub struct ToolSystem {
    tools: BTreeMap<String, Arc<dyn Tool>>,
}

impl std::fmt::Debug for ToolSystem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolSystem")
            .field("tools", &self.list_tools())
            .finish()
    }
}

impl ToolSystem {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool under its described name, replacing any previous one
    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        let name = tool.describe().name;
        self.tools.insert(name, tool);
    }

    pub fn with(mut self, tool: Arc<dyn Tool>) -> Self {
        self.register(tool);
        self
    }

    pub fn describe_tool(&self, tool_name: &str) -> Option<ToolDescription> {
        self.tools.get(tool_name).map(|tool| tool.describe())
    }

    pub fn descriptions(&self) -> Vec<ToolDescription> {
        self.tools.values().map(|tool| tool.describe()).collect()
    }

    pub fn list_tools(&self) -> Vec<String> {
        self.tools.keys().cloned().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Validate and run a tool call
    pub async fn execute_tool(
        &self,
        tool_name: &str,
        parameters: &Value,
        context: &mut ToolContext<'_>,
    ) -> Result<Value, ToolError> {
        let tool = self
            .tools
            .get(tool_name)
            .ok_or_else(|| ToolError::UnknownTool(tool_name.to_string()))?;

        validate_parameters(&tool.describe(), parameters)?;

        let span = crate::tool_span!(tool = %tool_name, agent = %context.agent_name);
        tool.execute(parameters, context).instrument(span).await
    }
}

/// Check arguments against the tool's JSON schema
pub fn validate_parameters(description: &ToolDescription, parameters: &Value) -> Result<(), ToolError> {
    let validator = jsonschema::validator_for(&description.parameters)
        .map_err(|e| ToolError::SchemaError(format!("Schema compilation error: {e}")))?;

    validator.validate(parameters).map_err(|errors| {
        let error_messages: Vec<String> = errors
            .map(|e| format!("At '{}': {}", e.instance_path, e))
            .collect();
        ToolError::ValidationError(error_messages.join("; "))
    })
}

/// Schema for a parameter struct derived with `schemars`
pub fn schema_for<T: schemars::JsonSchema>() -> Value {
    let schema = schemars::schema_for!(T);
    serde_json::to_value(schema).unwrap_or_else(|_| serde_json::json!({"type": "object"}))
}

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("Unknown tool: {0}")]
    UnknownTool(String),
    #[error("Tool initialization failed: {0}")]
    InitializationError(String),
    #[error("Parameter validation failed: {0}")]
    ValidationError(String),
    #[error("Schema error: {0}")]
    SchemaError(String),
    #[error("Tool execution failed: {0}")]
    ExecutionError(String),
}
