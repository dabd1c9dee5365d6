//! Dependency-ordered subtask execution.
//!
//! The Scheduler resolves a task's subtask graph into execution waves:
//! every subtask whose dependencies are satisfied is dispatched to its
//! assigned worker's executor, up to a bounded concurrency limit.
//! Completion unlocks dependents; a cyclic graph fails before anything
//! is dispatched; executor failures cancel in-flight work and fail the
//! task. Lifecycle events are emitted on a channel so callers can react
//! without polling.

use crate::blackboard::{Blackboard, Message, Recipient};
use crate::core::graph::SubtaskGraph;
use crate::core::task::{Subtask, SubtaskId, SubtaskResult, TaskId};
use crate::error::{Error, Result};
use crate::orchestration::auction::Allocation;
use crate::orchestration::executor::{validate_result, WorkContext, WorkExecutor};
use crate::worker::{Role, WorkerId};
use crate::{qlog_debug, qlog_warn};
use serde_json::{json, Value};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

/// Events emitted by the scheduler for subtask lifecycle changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchedulerEvent {
    /// A subtask has been dispatched to its assigned worker's executor.
    SubtaskStarted {
        /// The subtask that was dispatched.
        subtask_id: SubtaskId,
        /// The worker it was dispatched to.
        worker_id: WorkerId,
    },
    /// A subtask completed successfully.
    SubtaskCompleted {
        /// The subtask that completed.
        subtask_id: SubtaskId,
    },
    /// A subtask failed; the task will fail with it.
    SubtaskFailed {
        /// The subtask that failed.
        subtask_id: SubtaskId,
        /// Error message describing the failure.
        error: String,
    },
    /// Every subtask in the graph has been accounted for.
    AllSubtasksComplete,
}

/// Executes one task's subtask graph in dependency order.
pub struct Scheduler {
    /// The subtask dependency graph.
    graph: SubtaskGraph,
    /// Role assignments from the auction.
    allocation: Allocation,
    /// Shared coordination surface for knowledge and messages.
    blackboard: Arc<Blackboard>,
    /// The external work executor plugin.
    executor: Arc<dyn WorkExecutor>,
    /// Maximum number of subtasks in flight at once.
    max_concurrent: usize,
    /// Channel for emitting scheduler events.
    event_tx: mpsc::Sender<SchedulerEvent>,
}

impl Scheduler {
    pub fn new(
        graph: SubtaskGraph,
        allocation: Allocation,
        blackboard: Arc<Blackboard>,
        executor: Arc<dyn WorkExecutor>,
        max_concurrent: usize,
        event_tx: mpsc::Sender<SchedulerEvent>,
    ) -> Self {
        Self {
            graph,
            allocation,
            blackboard,
            executor,
            max_concurrent: max_concurrent.max(1),
            event_tx,
        }
    }

    /// Execute the graph to completion.
    ///
    /// Validates acyclicity first (a cyclic graph dispatches nothing),
    /// then repeatedly dispatches ready subtasks — lowest id first, up
    /// to the concurrency limit — and waits for completions. Each
    /// completed result is stored, published to the blackboard knowledge
    /// store under the subtask-id key, and announced to the coordinator.
    ///
    /// # Errors
    /// `CyclicDependency` before any dispatch; `ExecutorFailure` when a
    /// plugin call fails or returns malformed output (in-flight work is
    /// cancelled); `Cancelled` when the supplied token fires.
    pub async fn run(
        &mut self,
        task_id: &TaskId,
        task_input: &Value,
        cancel: CancellationToken,
    ) -> Result<BTreeMap<SubtaskId, SubtaskResult>> {
        let order = self.graph.execution_order()?;
        let assigned = self.assign_subtasks(&order);

        let mut completed: HashSet<SubtaskId> = HashSet::new();
        let mut results: BTreeMap<SubtaskId, SubtaskResult> = BTreeMap::new();
        let mut running: HashSet<SubtaskId> = HashSet::new();
        let mut join_set: JoinSet<(SubtaskId, WorkerId, Result<SubtaskResult>)> = JoinSet::new();

        while completed.len() < self.graph.len() {
            let dispatched = self
                .dispatch_ready(
                    task_input,
                    &assigned,
                    &mut completed,
                    &results,
                    &mut running,
                    &mut join_set,
                    &cancel,
                )
                .await;

            if join_set.is_empty() {
                if dispatched == 0 && completed.len() < self.graph.len() {
                    // Cannot happen after the acyclicity check; guards
                    // against a busy loop if the graph index desyncs.
                    return Err(Error::Validation(
                        "scheduler stalled with unscheduled subtasks".to_string(),
                    ));
                }
                continue;
            }

            tokio::select! {
                _ = cancel.cancelled() => {
                    join_set.abort_all();
                    qlog_warn!("task {} cancelled with {} subtasks in flight",
                        task_id.short(), running.len());
                    return Err(Error::Cancelled);
                }
                joined = join_set.join_next() => {
                    let Some(joined) = joined else { continue };
                    let (subtask_id, worker_id, result) = joined.map_err(|e| {
                        cancel.cancel();
                        Error::TaskJoin(e.to_string())
                    })?;

                    let result = result.and_then(|r| validate_result(&subtask_id, r));
                    match result {
                        Ok(result) => {
                            running.remove(&subtask_id);
                            completed.insert(subtask_id.clone());
                            self.record_completion(task_id, &subtask_id, worker_id, &result);
                            results.insert(subtask_id.clone(), result);
                            let _ = self
                                .event_tx
                                .send(SchedulerEvent::SubtaskCompleted { subtask_id })
                                .await;
                        }
                        Err(err) => {
                            cancel.cancel();
                            join_set.abort_all();
                            let _ = self
                                .event_tx
                                .send(SchedulerEvent::SubtaskFailed {
                                    subtask_id: subtask_id.clone(),
                                    error: err.to_string(),
                                })
                                .await;
                            return Err(match err {
                                failure @ Error::ExecutorFailure { .. } => failure,
                                other => Error::ExecutorFailure {
                                    subtask: subtask_id.to_string(),
                                    message: other.to_string(),
                                },
                            });
                        }
                    }
                }
            }
        }

        let _ = self.event_tx.send(SchedulerEvent::AllSubtasksComplete).await;
        Ok(results)
    }

    /// Map every subtask to its assigned worker, in topological order so
    /// the i-th subtask of a role deterministically gets that role's
    /// i-th assignee.
    fn assign_subtasks(&self, order: &[SubtaskId]) -> HashMap<SubtaskId, WorkerId> {
        let mut role_ordinals: HashMap<Role, usize> = HashMap::new();
        let mut assigned = HashMap::new();
        for id in order {
            let Some(subtask) = self.graph.subtask(id) else {
                continue;
            };
            let ordinal = role_ordinals.entry(subtask.role).or_insert(0);
            if let Some(worker) = self.allocation.worker_for(subtask.role, *ordinal) {
                assigned.insert(id.clone(), worker);
            }
            *ordinal += 1;
        }
        assigned
    }

    /// Dispatch every ready, unassigned-to-a-slot subtask up to the
    /// concurrency limit. Subtasks whose role attracted no assignment
    /// are recorded as gaps and skipped so their dependents can still
    /// run (the result map simply lacks their key).
    #[allow(clippy::too_many_arguments)]
    async fn dispatch_ready(
        &self,
        task_input: &Value,
        assigned: &HashMap<SubtaskId, WorkerId>,
        completed: &mut HashSet<SubtaskId>,
        results: &BTreeMap<SubtaskId, SubtaskResult>,
        running: &mut HashSet<SubtaskId>,
        join_set: &mut JoinSet<(SubtaskId, WorkerId, Result<SubtaskResult>)>,
        cancel: &CancellationToken,
    ) -> usize {
        let mut ready: Vec<Subtask> = self
            .graph
            .ready_subtasks(completed)
            .into_iter()
            .filter(|s| !running.contains(&s.id))
            .cloned()
            .collect();
        ready.sort_by(|a, b| a.id.cmp(&b.id));

        let mut dispatched = 0;
        for subtask in ready {
            if join_set.len() >= self.max_concurrent {
                break;
            }
            let Some(&worker_id) = assigned.get(&subtask.id) else {
                qlog_warn!(
                    "no worker assigned for subtask {} (role {}); recording gap",
                    subtask.id,
                    subtask.role
                );
                completed.insert(subtask.id.clone());
                dispatched += 1;
                continue;
            };

            let context = WorkContext {
                task_input: task_input.clone(),
                prior_results: results.clone(),
                subtask: subtask.clone(),
            };
            let executor = Arc::clone(&self.executor);
            let child = cancel.child_token();
            let role = subtask.role;
            let subtask_id = subtask.id.clone();

            qlog_debug!("dispatching subtask {} to worker {}", subtask_id, worker_id.short());
            running.insert(subtask_id.clone());
            let _ = self
                .event_tx
                .send(SchedulerEvent::SubtaskStarted {
                    subtask_id: subtask_id.clone(),
                    worker_id,
                })
                .await;

            join_set.spawn(async move {
                let result = executor.execute(role, context, child).await;
                (subtask_id, worker_id, result)
            });
            dispatched += 1;
        }
        dispatched
    }

    /// Publish a completed result to the knowledge store and notify the
    /// coordinator.
    fn record_completion(
        &self,
        task_id: &TaskId,
        subtask_id: &SubtaskId,
        worker_id: WorkerId,
        result: &SubtaskResult,
    ) {
        qlog_debug!(
            "task {} subtask {} completed (confidence {:.2})",
            task_id.short(),
            subtask_id,
            result.confidence
        );
        self.blackboard.put_knowledge(
            subtask_id.as_str(),
            json!({
                "payload": result.payload,
                "confidence": result.confidence,
            }),
            worker_id,
        );
        self.blackboard.publish(Message::new(
            worker_id,
            Recipient::Worker(self.allocation.coordinator),
            "subtask_completed",
            json!({
                "subtask": subtask_id.to_string(),
                "confidence": result.confidence,
            }),
        ));
        self.blackboard.bump_metric("subtasks_completed");
    }
}
