//! The engine façade: worker registry, task lifecycle, and the
//! decompose → allocate → schedule → aggregate pipeline.
//!
//! The orchestrator owns the worker pool, the task store, both
//! registries, and the blackboard. `execute` drives a single task from
//! Pending to a terminal status under the configured deadline;
//! reputation updates are applied here, after the pipeline settles, so
//! allocation-stage failures never touch worker scores.

use crate::blackboard::Blackboard;
use crate::config::EngineConfig;
use crate::core::graph::SubtaskGraph;
use crate::core::task::{CollectiveResult, CompositeTask, Priority, TaskId, TaskStatus};
use crate::error::{Error, Result};
use crate::orchestration::aggregate::{AggregateFn, AggregationRegistry};
use crate::orchestration::auction::run_auction;
use crate::orchestration::decompose::{DecomposeFn, DecompositionRegistry};
use crate::orchestration::executor::WorkExecutor;
use crate::orchestration::scheduler::Scheduler;
use crate::worker::{Role, Worker, WorkerId};
use crate::{qlog, qlog_debug, qlog_warn};
use serde::Serialize;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Aggregate view of engine history: task counts, success rate, and the
/// worker pairs that completed the most tasks together.
#[derive(Debug, Clone, Serialize)]
pub struct SystemIntelligence {
    pub total_tasks: usize,
    pub completed: usize,
    pub failed: usize,
    /// completed / terminal tasks; 0.0 when nothing has finished yet.
    /// Pending and in-progress tasks are not part of history and never
    /// dilute the rate.
    pub success_rate: f64,
    /// Top co-assignment pairs over terminal tasks, most frequent first.
    /// Failed runs count too: their workers were assigned and worked
    /// together. Pairs are ordered (lower id first) so reports are
    /// deterministic.
    pub top_pairings: Vec<((WorkerId, WorkerId), u64)>,
}

/// The task-execution engine.
pub struct Orchestrator {
    config: EngineConfig,
    blackboard: Arc<Blackboard>,
    workers: HashMap<WorkerId, Worker>,
    tasks: HashMap<TaskId, CompositeTask>,
    decompositions: DecompositionRegistry,
    aggregations: AggregationRegistry,
    executor: Arc<dyn WorkExecutor>,
}

impl Orchestrator {
    /// Create an engine with the built-in task-type registries and a
    /// fresh blackboard.
    pub fn new(config: EngineConfig, executor: Arc<dyn WorkExecutor>) -> Self {
        Self {
            config,
            blackboard: Arc::new(Blackboard::new()),
            workers: HashMap::new(),
            tasks: HashMap::new(),
            decompositions: DecompositionRegistry::with_defaults(),
            aggregations: AggregationRegistry::with_defaults(),
            executor,
        }
    }

    // ========== Worker management ==========

    /// Register a new active worker and return its id.
    pub fn register_worker(&mut self, role: Role, capabilities: HashSet<Role>) -> WorkerId {
        let worker = Worker::new(role, capabilities, Arc::clone(&self.blackboard));
        let id = worker.id;
        qlog!("Registered worker {} with role {}", id.short(), role);
        self.workers.insert(id, worker);
        id
    }

    /// Deactivate a worker. It stops bidding but keeps its history.
    pub fn deactivate_worker(&mut self, id: &WorkerId) -> Result<()> {
        let worker = self
            .workers
            .get_mut(id)
            .ok_or(Error::WorkerNotFound(*id))?;
        worker.deactivate();
        qlog!("Deactivated worker {}", id.short());
        Ok(())
    }

    pub fn worker(&self, id: &WorkerId) -> Option<&Worker> {
        self.workers.get(id)
    }

    /// Number of workers currently eligible to bid.
    pub fn active_worker_count(&self) -> usize {
        self.workers.values().filter(|w| w.active).count()
    }

    // ========== Task-type registries ==========

    /// Register (or replace) the decomposition builder for a task type.
    pub fn register_decomposition(&mut self, task_type: &str, builder: DecomposeFn) {
        self.decompositions.register(task_type, builder);
    }

    /// Register (or replace) the aggregation combiner for a task type.
    pub fn register_aggregation(&mut self, task_type: &str, combiner: AggregateFn) {
        self.aggregations.register(task_type, combiner);
    }

    // ========== Task lifecycle ==========

    /// Create a pending task and return its id. The task is not
    /// decomposed or allocated until `execute`.
    pub fn create_task(
        &mut self,
        task_type: &str,
        description: &str,
        required_roles: Vec<Role>,
        input: Value,
        priority: Priority,
    ) -> Result<TaskId> {
        if required_roles.is_empty() {
            return Err(Error::Validation(
                "a task needs at least one required role".to_string(),
            ));
        }
        let task = CompositeTask::new(task_type, description, required_roles, input, priority);
        let id = task.id;
        qlog!(
            "Created task {} type={} priority={}",
            id.short(),
            task_type,
            priority
        );
        self.tasks.insert(id, task);
        self.blackboard.bump_metric("tasks_created");
        Ok(id)
    }

    pub fn task(&self, id: &TaskId) -> Option<&CompositeTask> {
        self.tasks.get(id)
    }

    /// Read-only handle to the shared blackboard.
    pub fn blackboard(&self) -> Arc<Blackboard> {
        Arc::clone(&self.blackboard)
    }

    /// Run a task through the full pipeline: decompose, allocate,
    /// schedule, aggregate. The whole pipeline runs under the configured
    /// deadline; expiry cancels in-flight subtasks and fails the task.
    ///
    /// On success the assigned workers are rewarded and the task stores
    /// its collective result. On failure the task records the reason;
    /// assigned workers are penalized only when the failure happened in
    /// the execution stage (executor error, timeout, cancellation) — a
    /// task that never dispatched leaves reputations untouched.
    pub async fn execute(&mut self, task_id: TaskId) -> Result<CollectiveResult> {
        let mut task = self
            .tasks
            .get(&task_id)
            .cloned()
            .ok_or(Error::TaskNotFound(task_id))?;
        if task.is_finished() {
            return Err(Error::Validation(format!(
                "task {} already finished ({})",
                task_id.short(),
                task.status
            )));
        }

        task.start();
        let outcome = self.run_pipeline(&mut task).await;

        match outcome {
            Ok(result) => {
                task.complete(result.clone());
                for worker_id in &task.assigned_workers {
                    if let Some(worker) = self.workers.get_mut(worker_id) {
                        worker.update_performance(true);
                        worker.record_completed(task_id);
                    }
                }
                self.blackboard.bump_metric("tasks_completed");
                qlog!(
                    "Task {} completed (confidence {:.2})",
                    task_id.short(),
                    result.confidence
                );
                self.tasks.insert(task_id, task);
                Ok(result)
            }
            Err(err) => {
                task.fail(&err.to_string());
                if is_execution_failure(&err) {
                    for worker_id in &task.assigned_workers {
                        if let Some(worker) = self.workers.get_mut(worker_id) {
                            worker.update_performance(false);
                        }
                    }
                }
                self.blackboard.bump_metric("tasks_failed");
                qlog_warn!("Task {} failed: {}", task_id.short(), err);
                self.tasks.insert(task_id, task);
                Err(err)
            }
        }
    }

    /// The fallible stages of `execute`, mutating the task copy as each
    /// stage settles so a failure leaves a partial audit trail.
    async fn run_pipeline(&mut self, task: &mut CompositeTask) -> Result<CollectiveResult> {
        let subtasks = self.decompositions.build(&task.task_type, &task.id)?;
        qlog_debug!(
            "Task {} decomposed into {} subtasks",
            task.id.short(),
            subtasks.len()
        );
        task.subtasks = subtasks.clone();
        let graph = SubtaskGraph::from_subtasks(subtasks)?;

        let allocation = run_auction(task, &self.workers)?;
        task.assigned_workers = allocation.workers();
        task.coordinator = Some(allocation.coordinator);

        let (event_tx, mut event_rx) = mpsc::channel(self.config.event_channel_capacity);
        let event_log = tokio::spawn(async move {
            while let Some(event) = event_rx.recv().await {
                qlog_debug!("scheduler event: {:?}", event);
            }
        });

        let mut scheduler = Scheduler::new(
            graph,
            allocation,
            Arc::clone(&self.blackboard),
            Arc::clone(&self.executor),
            self.config.max_concurrent_subtasks,
            event_tx,
        );
        let cancel = CancellationToken::new();
        let deadline = self.config.deadline();

        let results = match tokio::time::timeout(
            deadline,
            scheduler.run(&task.id, &task.input, cancel.clone()),
        )
        .await
        {
            Ok(run) => run?,
            Err(_elapsed) => {
                cancel.cancel();
                return Err(Error::Timeout(deadline));
            }
        };
        drop(scheduler);
        let _ = event_log.await;

        task.subtask_results = results.clone();
        Ok(self
            .aggregations
            .aggregate(&task.task_type, &task.id, &results))
    }

    // ========== Reporting ==========

    /// Summarize engine history: counts, success rate, and the most
    /// frequent co-assignment pairs. History means tasks that reached a
    /// terminal status; created-but-unexecuted tasks are excluded.
    pub fn system_intelligence(&self) -> SystemIntelligence {
        let total_tasks = self.tasks.len();
        let terminal: Vec<&CompositeTask> =
            self.tasks.values().filter(|t| t.is_finished()).collect();
        let completed = terminal
            .iter()
            .filter(|t| t.status == TaskStatus::Completed)
            .count();
        let failed = terminal.len() - completed;
        let success_rate = if terminal.is_empty() {
            0.0
        } else {
            completed as f64 / terminal.len() as f64
        };

        let mut pair_counts: BTreeMap<(WorkerId, WorkerId), u64> = BTreeMap::new();
        for task in &terminal {
            let mut members: Vec<WorkerId> = task.assigned_workers.clone();
            members.sort_unstable();
            members.dedup();
            for (i, &a) in members.iter().enumerate() {
                for &b in &members[i + 1..] {
                    *pair_counts.entry((a, b)).or_insert(0) += 1;
                }
            }
        }
        let mut top_pairings: Vec<((WorkerId, WorkerId), u64)> = pair_counts.into_iter().collect();
        top_pairings.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        top_pairings.truncate(self.config.intelligence_top_n);

        SystemIntelligence {
            total_tasks,
            completed,
            failed,
            success_rate,
            top_pairings,
        }
    }
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("workers", &self.workers.len())
            .field("tasks", &self.tasks.len())
            .field("decompositions", &self.decompositions)
            .field("aggregations", &self.aggregations)
            .finish()
    }
}

/// Whether a failure happened in the execution stage, where assigned
/// workers carry responsibility for the outcome. Allocation-stage and
/// graph-stage failures never touch reputations.
fn is_execution_failure(err: &Error) -> bool {
    matches!(
        err,
        Error::ExecutorFailure { .. } | Error::Timeout(_) | Error::Cancelled
    )
}
