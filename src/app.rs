//! Application assembly
//!
//! [`ClaimAlly`] wires configuration, the model provider, the clock and the
//! optional search tool into the pipeline and the coordinator. The CLI and
//! the integration tests both go through it.

use crate::agent::pipeline::compose_request;
use crate::agent::{AppealPipeline, RootCoordinator};
use crate::config::AppConfig;
use crate::eligibility::{Clock, EligibilityChecker, EligibilityResult, EligibilityStatus, SystemClock};
use crate::error::{AppealError, AppealResult};
use crate::llm::create_provider;
use crate::llm::provider::LlmProvider;
use crate::session::{keys, Session, SessionState};
use crate::tools::{Tool, WebSearchTool};
use std::sync::Arc;
use tracing::{info, warn};

pub struct ClaimAlly {
    config: AppConfig,
    checker: EligibilityChecker,
    pipeline: Arc<AppealPipeline>,
    coordinator: RootCoordinator,
}

/// Result of a direct draft request
#[derive(Debug, Clone)]
pub struct Draft {
    pub letter: String,
    /// Every state slot the pipeline wrote
    pub state: SessionState,
}

impl ClaimAlly {
    pub fn new(
        config: AppConfig,
        provider: Arc<dyn LlmProvider>,
        clock: Arc<dyn Clock>,
        search_tool: Option<Arc<dyn Tool>>,
    ) -> Self {
        let checker = EligibilityChecker::new(config.eligibility.appeal_window_days, clock);
        let pipeline = Arc::new(AppealPipeline::build(&config, provider.clone(), search_tool));
        let coordinator = RootCoordinator::new(&config, provider, pipeline.clone(), checker.clone());

        Self {
            config,
            checker,
            pipeline,
            coordinator,
        }
    }

    /// Build against the configured provider and the system clock
    pub fn from_config(config: AppConfig) -> AppealResult<Self> {
        let provider = create_provider(&config).map_err(|e| AppealError::llm("provider", e))?;
        let search_tool = build_search_tool(&config);
        info!(
            provider = provider.name(),
            model = %config.llm.model,
            web_search = search_tool.is_some(),
            "Claim assistant ready"
        );
        Ok(Self::new(config, provider, Arc::new(SystemClock), search_tool))
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn coordinator(&self) -> &RootCoordinator {
        &self.coordinator
    }

    pub fn pipeline(&self) -> &AppealPipeline {
        &self.pipeline
    }

    pub fn check_eligibility(&self, date_of_denial: &str) -> EligibilityResult {
        self.checker.check(date_of_denial)
    }

    /// One conversational turn with the coordinator
    pub async fn chat_turn(&self, session: &mut Session, user_text: &str) -> AppealResult<String> {
        self.coordinator.handle_turn(session, user_text).await
    }

    /// Check eligibility, then run the pipeline directly
    ///
    /// Fails with [`AppealError::InvalidInput`] when the date is malformed or
    /// the appeal window has passed.
    pub async fn draft_letter(
        &self,
        date_of_denial: &str,
        policy_id: &str,
        denial_reason: &str,
    ) -> AppealResult<Draft> {
        let eligibility = self.check_eligibility(date_of_denial);
        match eligibility.status {
            EligibilityStatus::Eligible => {}
            EligibilityStatus::Warning => {
                return Err(AppealError::invalid_input(format!(
                    "{} Use YYYY-MM-DD.",
                    eligibility.message
                )))
            }
            EligibilityStatus::Ineligible => {
                return Err(AppealError::invalid_input(eligibility.message))
            }
        }

        let mut state = SessionState::new();
        state.set(keys::DENIAL_DATE, date_of_denial);

        let request = compose_request(date_of_denial, policy_id, denial_reason);
        let letter = self.pipeline.draft(&request, &mut state).await?;
        Ok(Draft { letter, state })
    }
}

/// Search tool for the researcher, when enabled and keyed
fn build_search_tool(config: &AppConfig) -> Option<Arc<dyn Tool>> {
    let settings = &config.tools.web_search;
    if !settings.enabled {
        return None;
    }

    let Some(api_key) = config.get_search_api_key() else {
        warn!(
            api_key_env = %settings.api_key_env,
            "Web search disabled: {} not set; the researcher will rely on the model alone",
            settings.api_key_env
        );
        return None;
    };

    match WebSearchTool::new(api_key, settings) {
        Ok(tool) => Some(Arc::new(tool)),
        Err(e) => {
            warn!(error = %e, "Web search disabled");
            None
        }
    }
}
