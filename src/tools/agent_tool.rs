//! Expose an agent as a tool
//!
//! The wrapped agent runs against a child context seeded from the caller's
//! state. Slots it writes are merged back into the caller's state, and its
//! final text is returned as `{"result": ...}`.

use crate::agent::{Agent, InvocationContext};
use crate::tools::{Tool, ToolContext, ToolDescription, ToolError};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{info, warn};

pub struct AgentTool {
    agent: Arc<dyn Agent>,
}

impl AgentTool {
    pub fn new(agent: Arc<dyn Agent>) -> Self {
        Self { agent }
    }
}

#[async_trait]
impl Tool for AgentTool {
    fn describe(&self) -> ToolDescription {
        ToolDescription {
            name: self.agent.name().to_string(),
            description: self.agent.description().to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "request": {
                        "type": "string",
                        "description": "Everything the agent needs to do its job, in one message"
                    }
                },
                "required": ["request"]
            }),
        }
    }

    async fn execute(
        &self,
        parameters: &Value,
        context: &mut ToolContext<'_>,
    ) -> Result<Value, ToolError> {
        let request = parameters["request"]
            .as_str()
            .ok_or_else(|| ToolError::ValidationError("request must be a string".to_string()))?;

        let mut child = InvocationContext::new(request, context.state.clone());
        info!(
            caller = %context.agent_name,
            agent = %self.agent.name(),
            invocation_id = %child.invocation_id,
            "Delegating to agent"
        );

        match self.agent.run(&mut child).await {
            Ok(outcome) => {
                context.state.merge(&child.state);
                Ok(json!({"result": outcome.text.unwrap_or_default()}))
            }
            Err(e) => {
                warn!(agent = %self.agent.name(), error = %e, "Delegated agent failed");
                Err(ToolError::ExecutionError(e.user_message()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::AgentOutcome;
    use crate::error::{AppealError, AppealResult};
    use crate::session::SessionState;

    struct Upper {
        fail: bool,
    }

    #[async_trait]
    impl Agent for Upper {
        fn name(&self) -> &str {
            "upper"
        }

        fn description(&self) -> &str {
            "Upper-cases the request"
        }

        async fn run(&self, ctx: &mut InvocationContext) -> AppealResult<AgentOutcome> {
            if self.fail {
                return Err(AppealError::internal_error("token=abc123 leaked"));
            }
            let seen = ctx.state.get("seed").unwrap_or_default().to_string();
            ctx.state.set("written", seen);
            Ok(AgentOutcome::text(ctx.user_content.to_uppercase()))
        }
    }

    #[test]
    fn test_describe_uses_agent_identity() {
        let description = AgentTool::new(Arc::new(Upper { fail: false })).describe();
        assert_eq!(description.name, "upper");
        assert_eq!(description.description, "Upper-cases the request");
        assert_eq!(description.parameters["required"], json!(["request"]));
    }

    #[tokio::test]
    async fn test_runs_with_parent_state_and_merges_back() {
        let tool = AgentTool::new(Arc::new(Upper { fail: false }));
        let mut state = SessionState::new();
        state.set("seed", "from parent");
        let mut context = ToolContext::new("coordinator", &mut state);

        let result = tool
            .execute(&json!({"request": "hello"}), &mut context)
            .await
            .unwrap();

        assert_eq!(result, json!({"result": "HELLO"}));
        assert_eq!(state.get("written"), Some("from parent"));
    }

    #[tokio::test]
    async fn test_failure_is_sanitized() {
        let tool = AgentTool::new(Arc::new(Upper { fail: true }));
        let mut state = SessionState::new();
        let mut context = ToolContext::new("coordinator", &mut state);

        let error = tool
            .execute(&json!({"request": "hello"}), &mut context)
            .await
            .unwrap_err();

        let message = error.to_string();
        assert!(!message.contains("abc123"));
        assert!(state.is_empty());
    }
}
