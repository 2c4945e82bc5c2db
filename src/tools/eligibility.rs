//! `check_appeal_eligibility` tool

use crate::eligibility::{EligibilityChecker, EligibilityStatus};
use crate::session::keys;
use crate::tools::{schema_for, Tool, ToolContext, ToolDescription, ToolError};
use async_trait::async_trait;
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::Value;
use tracing::info;

pub const TOOL_NAME: &str = "check_appeal_eligibility";

#[derive(Debug, Deserialize, JsonSchema)]
pub struct CheckEligibilityParams {
    /// Date the claim was denied, formatted YYYY-MM-DD (e.g. 2025-10-20)
    pub date_of_denial: String,
}

/// Exposes [`EligibilityChecker`] to the coordinator's model
#[derive(Debug, Clone, Default)]
pub struct CheckAppealEligibilityTool {
    checker: EligibilityChecker,
}

impl CheckAppealEligibilityTool {
    pub fn new(checker: EligibilityChecker) -> Self {
        Self { checker }
    }
}

#[async_trait]
impl Tool for CheckAppealEligibilityTool {
    fn describe(&self) -> ToolDescription {
        ToolDescription {
            name: TOOL_NAME.to_string(),
            description: format!(
                "Checks if the claim is within the typical {}-day timely filing limit.",
                self.checker.window_days()
            ),
            parameters: schema_for::<CheckEligibilityParams>(),
        }
    }

    async fn execute(
        &self,
        parameters: &Value,
        context: &mut ToolContext<'_>,
    ) -> Result<Value, ToolError> {
        let params: CheckEligibilityParams = serde_json::from_value(parameters.clone())
            .map_err(|e| ToolError::ValidationError(e.to_string()))?;

        let result = self.checker.check(&params.date_of_denial);
        info!(status = %result.status, "Appeal eligibility checked");

        if result.status != EligibilityStatus::Warning {
            context
                .state
                .set(keys::DENIAL_DATE, params.date_of_denial.as_str());
        }

        serde_json::to_value(result).map_err(|e| ToolError::ExecutionError(e.to_string()))
    }
}
