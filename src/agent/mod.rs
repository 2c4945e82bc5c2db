//! Agents and their composition
//!
//! Every stage implements [`Agent`]: it runs against an
//! [`InvocationContext`] (the user request plus shared session state) and
//! reports an [`AgentOutcome`]. Model-backed stages are [`LlmAgent`]s;
//! [`SequentialAgent`] and [`LoopAgent`] compose stages into the appeal
//! pipeline, and [`RootCoordinator`] drives the conversation.

pub mod coordinator;
pub mod llm_agent;
pub mod loop_agent;
pub mod pipeline;
pub mod sequential;

pub use coordinator::RootCoordinator;
pub use llm_agent::{LlmAgent, TurnResult};
pub use loop_agent::{LoopAgent, LoopOutcome};
pub use pipeline::AppealPipeline;
pub use sequential::SequentialAgent;

use crate::error::AppealResult;
use crate::session::SessionState;
use async_trait::async_trait;
use uuid::Uuid;

/// A pipeline stage
#[async_trait]
pub trait Agent: Send + Sync {
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    async fn run(&self, ctx: &mut InvocationContext) -> AppealResult<AgentOutcome>;
}

/// Input and shared state for one pass through an agent graph
#[derive(Debug, Clone)]
pub struct InvocationContext {
    pub invocation_id: Uuid,
    /// Request text every stage sees as the user turn
    pub user_content: String,
    pub state: SessionState,
}

impl InvocationContext {
    pub fn new(user_content: impl Into<String>, state: SessionState) -> Self {
        Self {
            invocation_id: Uuid::new_v4(),
            user_content: user_content.into(),
            state,
        }
    }
}

/// What a stage reports back to its parent
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AgentOutcome {
    /// Final text of the stage, if it produced any
    pub text: Option<String>,
    /// Set when a tool raised the exit signal
    pub escalate: bool,
}

impl AgentOutcome {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            escalate: false,
        }
    }
}
