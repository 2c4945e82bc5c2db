//! `exit_loop` tool: the refinement loop's exit signal

use crate::tools::{Tool, ToolContext, ToolDescription, ToolError};
use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::debug;

pub const TOOL_NAME: &str = "exit_loop";

/// Fixed payload returned on every call
pub fn exit_loop_response() -> Value {
    json!({"status": "APPROVED", "message": "Appeal letter well written"})
}

/// Raises the escalate action so the enclosing loop stops
#[derive(Debug, Clone, Copy, Default)]
pub struct ExitLoopTool;

#[async_trait]
impl Tool for ExitLoopTool {
    fn describe(&self) -> ToolDescription {
        ToolDescription {
            name: TOOL_NAME.to_string(),
            description: "Call this function ONLY when the review_result is 'APPROVED', \
                          indicating the appeal letter is well written"
                .to_string(),
            parameters: json!({
                "type": "object",
                "properties": {},
                "additionalProperties": false
            }),
        }
    }

    async fn execute(
        &self,
        _parameters: &Value,
        context: &mut ToolContext<'_>,
    ) -> Result<Value, ToolError> {
        debug!(agent = %context.agent_name, "Exit signal raised");
        context.actions.escalate = true;
        Ok(exit_loop_response())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{keys, SessionState};

    #[tokio::test]
    async fn test_returns_literal_and_escalates_regardless_of_state() {
        for review in [None, Some("APPROVED"), Some("Needs a stronger opening.")] {
            let mut state = SessionState::new();
            if let Some(review) = review {
                state.set(keys::REVIEW_RESULT, review);
            }
            let mut context = ToolContext::new("refiner", &mut state);

            let result = ExitLoopTool.execute(&json!({}), &mut context).await.unwrap();
            assert_eq!(
                result,
                json!({"status": "APPROVED", "message": "Appeal letter well written"})
            );
            assert!(context.actions.escalate);
        }
    }
}
