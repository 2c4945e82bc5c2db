//! The appeal-drafting pipeline
//!
//! ```text
//! review_pipeline (sequence)
//! ├── ResearchAssistant      -> evidence
//! ├── LetterWriter           -> appealletter
//! ├── LetterRefinementLoop (max 3 passes, exits on APPROVED)
//! │   ├── reviewer           -> review_result
//! │   └── RefinerAgent       -> appealletter | exit_loop
//! └── FinalOutputPresenter   -> final_appeal_letter
//! ```

use crate::agent::{
    Agent, AgentOutcome, InvocationContext, LlmAgent, LoopAgent, SequentialAgent,
};
use crate::config::AppConfig;
use crate::error::{AppealError, AppealResult};
use crate::llm::provider::LlmProvider;
use crate::session::{keys, SessionState, APPROVED};
use crate::tools::{ExitLoopTool, Tool, ToolSystem};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{info, Instrument};

/// Role ids used for `[roles.<id>]` model overrides
pub mod roles {
    pub const RESEARCHER: &str = "researcher";
    pub const LETTER_WRITER: &str = "letter_writer";
    pub const REVIEWER: &str = "reviewer";
    pub const REFINER: &str = "refiner";
    pub const FINAL_PRESENTER: &str = "final_presenter";
    pub const COORDINATOR: &str = "coordinator";
}

/// Tool name the coordinator calls the pipeline by
pub const PIPELINE_NAME: &str = "review_pipeline";
pub const REFINEMENT_LOOP_NAME: &str = "LetterRefinementLoop";

const RESEARCHER_INSTRUCTION: &str = "\
You are a research assistant for health insurance claim appeals.
The user message contains the date of denial, the policy ID and the reason the claim was denied.
Find information that supports overturning the denial: coverage rules, medical necessity criteria, \
timely filing rules and consumer protection regulations that apply to the stated reason.
Use the web_search tool when it is available.
Summarize the evidence as concise, factual points with sources where you have them.";

const LETTER_WRITER_INSTRUCTION: &str = "\
Write a letter to appeal the denial. Use {evidence}.
Your final output MUST include the Appeal Letter you have written.";

const REVIEWER_INSTRUCTION: &str = "\
You are a letter reviewer. Review the {evidence} and {appealletter}.
You must compare these two and make sure the appeal letter incorporates the evidence.
After verifying the facts, you must refine the grammar and adjust the tone to be professional and persuasive.
If the letter matches all these, you MUST respond with the exact phrase: \"APPROVED\".
Else, provide the review comment.";

const REFINER_INSTRUCTION: &str = "\
You are an appeal letter refiner. You have a {review_result} and {appealletter}.

Your task is to analyze the review.
- IF the review is EXACTLY \"APPROVED\", you MUST call the `exit_loop` function and nothing else.
- OTHERWISE, rewrite the appeal letter to fully incorporate the feedback from the critique.";

const FINAL_PRESENTER_INSTRUCTION: &str = "\
The appeal letter refinement process is complete.
Output the full text of the final approved letter stored in {appealletter}.
Present only the letter text, and nothing else.";

/// Combine the collected facts into the single request the pipeline expects
pub fn compose_request(date_of_denial: &str, policy_id: &str, denial_reason: &str) -> String {
    format!(
        "Write an appeal letter for a denied insurance claim.\n\
         Date of denial: {date_of_denial}\n\
         Policy ID: {policy_id}\n\
         Reason for denial: {denial_reason}"
    )
}

/// Fully wired Researcher → LetterWriter → refinement loop → presenter
pub struct AppealPipeline {
    sequence: SequentialAgent,
}

impl AppealPipeline {
    /// Build every role from configuration
    ///
    /// `search_tool` is handed to the researcher; without it the researcher
    /// relies on the model alone.
    pub fn build(
        config: &AppConfig,
        provider: Arc<dyn LlmProvider>,
        search_tool: Option<Arc<dyn Tool>>,
    ) -> Self {
        let max_tool_iterations = config.pipeline.max_tool_iterations;
        let role = |id: &str, name: &str| {
            LlmAgent::new(name, provider.clone(), config.model_settings_for(id))
                .with_max_tool_iterations(max_tool_iterations)
        };

        let mut research_tools = ToolSystem::new();
        if let Some(tool) = search_tool {
            research_tools.register(tool);
        }

        let researcher = role(roles::RESEARCHER, "ResearchAssistant")
            .with_description(
                "Finds and summarizes information on the denial reason from the insurance mentioned by the user",
            )
            .with_instruction(RESEARCHER_INSTRUCTION)
            .with_tools(research_tools)
            .with_output_key(keys::EVIDENCE);

        let letter_writer = role(roles::LETTER_WRITER, "LetterWriter")
            .with_description("Drafts the appeal letter from the collected evidence")
            .with_instruction(LETTER_WRITER_INSTRUCTION)
            .with_output_key(keys::APPEAL_LETTER);

        let reviewer = role(roles::REVIEWER, "reviewer")
            .with_description("Checks the letter against the evidence and approves or critiques it")
            .with_instruction(REVIEWER_INSTRUCTION)
            .with_output_key(keys::REVIEW_RESULT);

        let refiner = role(roles::REFINER, "RefinerAgent")
            .with_description("Rewrites the letter from the critique or ends the review loop")
            .with_instruction(REFINER_INSTRUCTION)
            .with_tools(ToolSystem::new().with(Arc::new(ExitLoopTool)))
            .with_output_key(keys::APPEAL_LETTER);

        let final_presenter = role(roles::FINAL_PRESENTER, "FinalOutputPresenter")
            .with_description("Presents the final appeal letter text")
            .with_instruction(FINAL_PRESENTER_INSTRUCTION)
            .with_output_key(keys::FINAL_APPEAL_LETTER);

        let refinement_loop = LoopAgent::new(
            REFINEMENT_LOOP_NAME,
            vec![Arc::new(reviewer), Arc::new(refiner)],
            config.pipeline.max_refinement_iterations,
        )
        .with_description("Reviews and refines the appeal letter until approved")
        .with_exit_guard(keys::REVIEW_RESULT, APPROVED);

        let sequence = SequentialAgent::new(
            PIPELINE_NAME,
            vec![
                Arc::new(researcher),
                Arc::new(letter_writer),
                Arc::new(refinement_loop),
                Arc::new(final_presenter),
            ],
        )
        .with_description(
            "Researches the denial, drafts an appeal letter, refines it through review \
             and returns the final letter. Pass the date of denial, policy ID and \
             reason for denial as one request.",
        );

        Self { sequence }
    }

    pub fn stage_names(&self) -> Vec<&str> {
        self.sequence.sub_agents().iter().map(|a| a.name()).collect()
    }

    /// Run the pipeline on `request` and return the final letter
    ///
    /// `state` receives every slot the roles wrote.
    pub async fn draft(&self, request: &str, state: &mut SessionState) -> AppealResult<String> {
        let mut ctx = InvocationContext::new(request, state.clone());
        self.run(&mut ctx).await?;
        state.merge(&ctx.state);

        ctx.state
            .get(keys::FINAL_APPEAL_LETTER)
            .map(str::to_string)
            .ok_or_else(|| AppealError::internal_error("pipeline produced no final appeal letter"))
    }
}

#[async_trait]
impl Agent for AppealPipeline {
    fn name(&self) -> &str {
        self.sequence.name()
    }

    fn description(&self) -> &str {
        self.sequence.description()
    }

    async fn run(&self, ctx: &mut InvocationContext) -> AppealResult<AgentOutcome> {
        let span = crate::agent_span!(agent = PIPELINE_NAME, invocation_id = %ctx.invocation_id);
        async {
            info!("Appeal pipeline started");
            let outcome = self.sequence.run(ctx).await?;
            info!(
                has_final_letter = ctx.state.contains(keys::FINAL_APPEAL_LETTER),
                "Appeal pipeline finished"
            );
            Ok::<_, AppealError>(AgentOutcome {
                text: ctx
                    .state
                    .get(keys::FINAL_APPEAL_LETTER)
                    .map(str::to_string)
                    .or(outcome.text),
                escalate: false,
            })
        }
        .instrument(span)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedLlmProvider;

    #[test]
    fn test_stage_order() {
        let pipeline = AppealPipeline::build(
            &AppConfig::default(),
            Arc::new(ScriptedLlmProvider::new()),
            None,
        );
        assert_eq!(pipeline.name(), "review_pipeline");
        assert_eq!(
            pipeline.stage_names(),
            vec![
                "ResearchAssistant",
                "LetterWriter",
                "LetterRefinementLoop",
                "FinalOutputPresenter"
            ]
        );
    }

    #[test]
    fn test_compose_request_contains_all_facts() {
        let request = compose_request("2025-10-20", "POL-123", "not medically necessary");
        assert!(request.contains("2025-10-20"));
        assert!(request.contains("POL-123"));
        assert!(request.contains("not medically necessary"));
    }

    #[test]
    fn test_instructions_reference_expected_state() {
        assert!(LETTER_WRITER_INSTRUCTION.contains("{evidence}"));
        assert!(REVIEWER_INSTRUCTION.contains("{appealletter}"));
        assert!(REFINER_INSTRUCTION.contains("{review_result}"));
        assert!(FINAL_PRESENTER_INSTRUCTION.contains("{appealletter}"));
    }
}
