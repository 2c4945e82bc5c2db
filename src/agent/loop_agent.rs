//! Bounded repeat of a fixed stage list
//!
//! A [`LoopAgent`] runs its sub-agents in order, then again, until either a
//! sub-agent raises the exit signal or `max_iterations` passes complete.
//! With an exit guard configured, the signal only ends the loop when the
//! guarded state key holds the expected value; otherwise it is dropped and
//! the loop carries on.

use crate::agent::{Agent, AgentOutcome, InvocationContext};
use crate::error::AppealResult;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info, warn};

pub struct LoopAgent {
    name: String,
    description: String,
    sub_agents: Vec<Arc<dyn Agent>>,
    max_iterations: usize,
    exit_guard: Option<(String, String)>,
}

/// How a loop run ended
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoopOutcome {
    /// Passes started, `1..=max_iterations`
    pub iterations: usize,
    /// True when an accepted exit signal ended the loop
    pub approved: bool,
    pub last_text: Option<String>,
}

impl LoopAgent {
    pub fn new(
        name: impl Into<String>,
        sub_agents: Vec<Arc<dyn Agent>>,
        max_iterations: usize,
    ) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            sub_agents,
            max_iterations: max_iterations.max(1),
            exit_guard: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Only honour the exit signal while `state[key] == value`
    pub fn with_exit_guard(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.exit_guard = Some((key.into(), value.into()));
        self
    }

    pub fn max_iterations(&self) -> usize {
        self.max_iterations
    }

    fn exit_allowed(&self, ctx: &InvocationContext) -> bool {
        match &self.exit_guard {
            Some((key, value)) => ctx.state.is(key, value),
            None => true,
        }
    }

    pub async fn run_loop(&self, ctx: &mut InvocationContext) -> AppealResult<LoopOutcome> {
        let mut outcome = LoopOutcome::default();

        for iteration in 1..=self.max_iterations {
            outcome.iterations = iteration;
            debug!(loop_agent = %self.name, iteration, "Starting iteration");

            for agent in &self.sub_agents {
                let stage = agent.run(ctx).await?;
                if stage.text.is_some() {
                    outcome.last_text = stage.text;
                }

                if !stage.escalate {
                    continue;
                }
                if self.exit_allowed(ctx) {
                    info!(loop_agent = %self.name, iteration, agent = %agent.name(), "Exit signal accepted");
                    outcome.approved = true;
                    return Ok(outcome);
                }
                warn!(
                    loop_agent = %self.name,
                    iteration,
                    agent = %agent.name(),
                    "Exit signal ignored; guard condition not met"
                );
            }
        }

        warn!(
            loop_agent = %self.name,
            max_iterations = self.max_iterations,
            "Iteration cap reached without approval; continuing with latest state"
        );
        Ok(outcome)
    }
}

#[async_trait]
impl Agent for LoopAgent {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    /// The exit signal is consumed here and never reaches the parent
    async fn run(&self, ctx: &mut InvocationContext) -> AppealResult<AgentOutcome> {
        let outcome = self.run_loop(ctx).await?;
        info!(
            loop_agent = %self.name,
            iterations = outcome.iterations,
            approved = outcome.approved,
            "Loop finished"
        );
        Ok(AgentOutcome {
            text: outcome.last_text,
            escalate: false,
        })
    }
}
