//! The work-executor plugin seam.
//!
//! The engine never performs domain work itself. Each dispatched subtask
//! is handed to an external `WorkExecutor` implementation along with the
//! task input, the results of prior subtasks, and a cancellation token.
//! The engine never inspects the returned payload; it only checks that
//! the confidence is well-formed.

use crate::core::task::{Subtask, SubtaskId, SubtaskResult};
use crate::error::{Error, Result};
use crate::worker::Role;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeMap;
use tokio_util::sync::CancellationToken;

/// Everything an executor gets to see for one subtask call.
#[derive(Debug, Clone)]
pub struct WorkContext {
    /// The composite task's input payload.
    pub task_input: Value,
    /// Results of subtasks that completed before this dispatch. All of
    /// this subtask's dependencies are guaranteed to be present.
    pub prior_results: BTreeMap<SubtaskId, SubtaskResult>,
    /// The subtask being executed.
    pub subtask: Subtask,
}

/// Pluggable work executor: `(role, context) → (result, confidence)`.
///
/// Implementations must surface failures as errors — never as a
/// silently empty payload — and should return promptly once the
/// cancellation token fires.
#[async_trait]
pub trait WorkExecutor: Send + Sync {
    async fn execute(
        &self,
        role: Role,
        context: WorkContext,
        cancel: CancellationToken,
    ) -> Result<SubtaskResult>;
}

/// Reject malformed executor output.
///
/// A confidence outside [0, 1] (including NaN) is an executor defect
/// and is reported as `ExecutorFailure` rather than poisoning the
/// aggregated confidence downstream.
pub fn validate_result(subtask: &SubtaskId, result: SubtaskResult) -> Result<SubtaskResult> {
    if !(0.0..=1.0).contains(&result.confidence) {
        return Err(Error::ExecutorFailure {
            subtask: subtask.to_string(),
            message: format!("confidence {} outside [0, 1]", result.confidence),
        });
    }
    Ok(result)
}
