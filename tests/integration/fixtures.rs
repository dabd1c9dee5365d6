//! Test fixtures for integration tests.
//!
//! Provides stub work executors and engine builders. No fixture performs
//! real domain work; executors synthesize payloads so the suite is fully
//! deterministic and safe for CI.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use tokio_util::sync::CancellationToken;

use quorum::orchestration::{WorkContext, WorkExecutor};
use quorum::{
    EngineConfig, Error, Orchestrator, Result, Role, SubtaskId, SubtaskResult, WorkerId,
};

/// Echoes the role and subtask id back with a fixed confidence.
pub struct EchoExecutor {
    pub confidence: f64,
}

impl EchoExecutor {
    pub fn new() -> Self {
        Self { confidence: 0.9 }
    }
}

#[async_trait]
impl WorkExecutor for EchoExecutor {
    async fn execute(
        &self,
        role: Role,
        context: WorkContext,
        _cancel: CancellationToken,
    ) -> Result<SubtaskResult> {
        Ok(SubtaskResult::new(
            json!({
                "role": role.as_str(),
                "subtask": context.subtask.id.to_string(),
                "saw_deps": context.subtask.depends_on.len(),
            }),
            self.confidence,
        ))
    }
}

/// Records the order subtasks were executed in, then echoes.
pub struct OrderTrackingExecutor {
    pub order: Mutex<Vec<SubtaskId>>,
}

impl OrderTrackingExecutor {
    pub fn new() -> Self {
        Self {
            order: Mutex::new(Vec::new()),
        }
    }

    pub fn executed(&self) -> Vec<SubtaskId> {
        self.order.lock().unwrap().clone()
    }
}

#[async_trait]
impl WorkExecutor for OrderTrackingExecutor {
    async fn execute(
        &self,
        _role: Role,
        context: WorkContext,
        _cancel: CancellationToken,
    ) -> Result<SubtaskResult> {
        // Every dependency must already be visible to this subtask.
        for dep in &context.subtask.depends_on {
            assert!(
                context.prior_results.contains_key(dep),
                "subtask {} dispatched before dependency {}",
                context.subtask.id,
                dep
            );
        }
        self.order.lock().unwrap().push(context.subtask.id.clone());
        Ok(SubtaskResult::new(json!({}), 0.8))
    }
}

/// Fails any subtask whose id ends with the configured tag.
pub struct FailOnTagExecutor {
    pub tag: String,
}

#[async_trait]
impl WorkExecutor for FailOnTagExecutor {
    async fn execute(
        &self,
        _role: Role,
        context: WorkContext,
        _cancel: CancellationToken,
    ) -> Result<SubtaskResult> {
        if context.subtask.id.as_str().ends_with(&self.tag) {
            return Err(Error::ExecutorFailure {
                subtask: context.subtask.id.to_string(),
                message: format!("fixture failure on {}", self.tag),
            });
        }
        Ok(SubtaskResult::new(json!({}), 0.7))
    }
}

/// Sleeps far past any test deadline, honoring cancellation.
pub struct SlowExecutor;

#[async_trait]
impl WorkExecutor for SlowExecutor {
    async fn execute(
        &self,
        _role: Role,
        _context: WorkContext,
        cancel: CancellationToken,
    ) -> Result<SubtaskResult> {
        tokio::select! {
            _ = cancel.cancelled() => Err(Error::Cancelled),
            _ = tokio::time::sleep(Duration::from_secs(3600)) => {
                Ok(SubtaskResult::new(json!({}), 1.0))
            }
        }
    }
}

/// Build an engine with one worker per given role, default config.
pub fn engine_with_roles(
    roles: &[Role],
    executor: Arc<dyn WorkExecutor>,
) -> (Orchestrator, Vec<WorkerId>) {
    engine_with_config(EngineConfig::default(), roles, executor)
}

/// Build an engine with one worker per given role and a custom config.
pub fn engine_with_config(
    config: EngineConfig,
    roles: &[Role],
    executor: Arc<dyn WorkExecutor>,
) -> (Orchestrator, Vec<WorkerId>) {
    let mut orchestrator = Orchestrator::new(config, executor);
    let workers = roles
        .iter()
        .map(|&role| orchestrator.register_worker(role, HashSet::new()))
        .collect();
    (orchestrator, workers)
}

/// The full role set used by the research_report template.
pub fn report_roles() -> Vec<Role> {
    vec![
        Role::Researcher,
        Role::Analyst,
        Role::Synthesizer,
        Role::Reviewer,
    ]
}
