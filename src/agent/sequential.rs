//! Run sub-agents one after another over shared state

use crate::agent::{Agent, AgentOutcome, InvocationContext};
use crate::error::AppealResult;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info};

pub struct SequentialAgent {
    name: String,
    description: String,
    sub_agents: Vec<Arc<dyn Agent>>,
}

impl SequentialAgent {
    pub fn new(name: impl Into<String>, sub_agents: Vec<Arc<dyn Agent>>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            sub_agents,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn sub_agents(&self) -> &[Arc<dyn Agent>] {
        &self.sub_agents
    }
}

#[async_trait]
impl Agent for SequentialAgent {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    /// The last stage's text is the sequence's text. An escalating stage
    /// ends the sequence and the signal is passed up.
    async fn run(&self, ctx: &mut InvocationContext) -> AppealResult<AgentOutcome> {
        let mut outcome = AgentOutcome::default();

        for (index, agent) in self.sub_agents.iter().enumerate() {
            debug!(sequence = %self.name, stage = index + 1, agent = %agent.name(), "Starting stage");
            let stage = agent.run(ctx).await?;

            if stage.text.is_some() {
                outcome.text = stage.text;
            }
            if stage.escalate {
                info!(sequence = %self.name, agent = %agent.name(), "Stage escalated; ending sequence");
                outcome.escalate = true;
                break;
            }
        }

        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::SessionState;
    use tokio::sync::Mutex;

    struct Recorder {
        name: &'static str,
        escalate: bool,
        log: Arc<Mutex<Vec<&'static str>>>,
    }

    #[async_trait]
    impl Agent for Recorder {
        fn name(&self) -> &str {
            self.name
        }

        fn description(&self) -> &str {
            ""
        }

        async fn run(&self, ctx: &mut InvocationContext) -> AppealResult<AgentOutcome> {
            self.log.lock().await.push(self.name);
            ctx.state.set(self.name, "done");
            Ok(AgentOutcome {
                text: Some(format!("{} output", self.name)),
                escalate: self.escalate,
            })
        }
    }

    fn recorder(
        name: &'static str,
        escalate: bool,
        log: &Arc<Mutex<Vec<&'static str>>>,
    ) -> Arc<dyn Agent> {
        Arc::new(Recorder {
            name,
            escalate,
            log: log.clone(),
        })
    }

    #[tokio::test]
    async fn test_runs_in_order_and_returns_last_text() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let sequence = SequentialAgent::new(
            "seq",
            vec![recorder("a", false, &log), recorder("b", false, &log)],
        );

        let mut ctx = InvocationContext::new("go", SessionState::new());
        let outcome = sequence.run(&mut ctx).await.unwrap();

        assert_eq!(*log.lock().await, vec!["a", "b"]);
        assert_eq!(outcome.text.as_deref(), Some("b output"));
        assert!(!outcome.escalate);
        assert!(ctx.state.contains("a") && ctx.state.contains("b"));
    }

    #[tokio::test]
    async fn test_escalation_stops_sequence() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let sequence = SequentialAgent::new(
            "seq",
            vec![
                recorder("a", true, &log),
                recorder("b", false, &log),
            ],
        );

        let mut ctx = InvocationContext::new("go", SessionState::new());
        let outcome = sequence.run(&mut ctx).await.unwrap();

        assert_eq!(*log.lock().await, vec!["a"]);
        assert!(outcome.escalate);
    }
}
