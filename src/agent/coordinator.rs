//! Conversational root agent
//!
//! The coordinator talks to the user, checks the denial date with
//! `check_appeal_eligibility`, and hands the collected facts to the appeal
//! pipeline through its `review_pipeline` tool.

use crate::agent::pipeline::roles;
use crate::agent::{Agent, AgentOutcome, AppealPipeline, InvocationContext, LlmAgent};
use crate::config::AppConfig;
use crate::eligibility::{EligibilityChecker, DENIAL_DATE_FORMAT};
use crate::error::{AppealError, AppealResult};
use crate::llm::provider::{LlmProvider, Message};
use crate::session::Session;
use crate::tools::{AgentTool, CheckAppealEligibilityTool, ToolSystem};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, Instrument};

const COORDINATOR_INSTRUCTION: &str = "\
You are a helpful claim denial appeal agent that writes appeal letters based on user information.
Today's date is {today}.

1. **Initial Step:** If the user wishes to appeal a denied claim, ask them for the exact date of denial (e.g., '2025-10-20').
2. **Tool Check (Eligibility):** Once the user provides the date of denial, call the 'check_appeal_eligibility' tool immediately using this date.
3. **If Eligible:** If the 'check_appeal_eligibility' tool returns an 'eligible' status, ask the user for the **policy ID** and the **reason for denial**.
4. After receiving this information, **combine the date of denial, the policy ID, and the reason for denial into a single, comprehensive request** and call the 'review_pipeline' tool to write the appeal letter, then present the final letter to the user.
5. **If Warning:** If the 'check_appeal_eligibility' tool returns a 'warning' status, tell the user the date must be in **YYYY-MM-DD** format and ask them to re-enter the date of denial, starting again from the initial step.
6. **If Ineligible:** If the 'check_appeal_eligibility' tool returns an 'ineligible' status, let the user know that the time frame for appeal has passed.";

pub struct RootCoordinator {
    agent: LlmAgent,
    checker: EligibilityChecker,
}

impl RootCoordinator {
    pub fn new(
        config: &AppConfig,
        provider: Arc<dyn LlmProvider>,
        pipeline: Arc<AppealPipeline>,
        checker: EligibilityChecker,
    ) -> Self {
        let tools = ToolSystem::new()
            .with(Arc::new(CheckAppealEligibilityTool::new(checker.clone())))
            .with(Arc::new(AgentTool::new(pipeline)));

        let agent = LlmAgent::new(
            config.agent.name.clone(),
            provider,
            config.model_settings_for(roles::COORDINATOR),
        )
        .with_description(config.agent.description.clone())
        .with_instruction(COORDINATOR_INSTRUCTION)
        .with_tools(tools)
        .with_max_tool_iterations(config.pipeline.max_tool_iterations);

        Self { agent, checker }
    }

    fn system_instruction(&self) -> String {
        let today = self.checker.today().format(DENIAL_DATE_FORMAT).to_string();
        self.agent.instruction().replace("{today}", &today)
    }

    /// Run one conversational turn and return the reply
    ///
    /// The user message and everything the model produced (including tool
    /// results) are appended to the session history.
    pub async fn handle_turn(&self, session: &mut Session, user_text: &str) -> AppealResult<String> {
        let span = crate::agent_span!(agent = %self.agent.name(), session_id = %session.id);

        async {
            let mut messages = Vec::with_capacity(session.history.len() + 2);
            messages.push(Message::system(self.system_instruction()));
            messages.extend(session.history.iter().cloned());
            messages.push(Message::user(user_text));
            let first_new = messages.len() - 1;

            let turn = self.agent.run_turn(&mut messages, &mut session.state).await?;
            debug!(model_turns = turn.model_turns, "Coordinator turn complete");

            session.history.extend(messages.drain(first_new..));
            Ok::<_, AppealError>(turn.text)
        }
        .instrument(span)
        .await
    }
}

#[async_trait]
impl Agent for RootCoordinator {
    fn name(&self) -> &str {
        self.agent.name()
    }

    fn description(&self) -> &str {
        self.agent.description()
    }

    /// Single-shot run without history
    async fn run(&self, ctx: &mut InvocationContext) -> AppealResult<AgentOutcome> {
        let mut session = Session::new();
        session.state = std::mem::take(&mut ctx.state);
        let result = self.handle_turn(&mut session, &ctx.user_content).await;
        ctx.state = session.state;
        Ok(AgentOutcome::text(result?))
    }
}
