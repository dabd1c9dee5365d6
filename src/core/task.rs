//! Task data model for the execution engine.
//!
//! A `CompositeTask` is the unit of work submitted to the orchestrator. It
//! carries a graph of role-tagged `Subtask`s, the workers assigned through
//! the auction, and the aggregated result once execution finishes.

use crate::worker::{Role, WorkerId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use uuid::Uuid;

/// Unique identifier for a composite task.
///
/// Uses UUID v4 for generation and provides a short form display
/// for human-readable output and derived subtask ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(pub Uuid);

impl TaskId {
    /// Create a new unique task identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Return first 8 characters of the UUID for display.
    pub fn short(&self) -> String {
        self.0.to_string()[..8].to_string()
    }
}

impl Default for TaskId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for TaskId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// Identifier for a subtask within a composite task's graph.
///
/// Derived deterministically from the parent task id and a role tag, so
/// decomposition builders are pure functions of the task id. The string
/// form doubles as the blackboard knowledge key for the subtask's result.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubtaskId(pub String);

impl SubtaskId {
    /// Derive the subtask id for `tag` under the given parent task.
    pub fn derive(task_id: &TaskId, tag: &str) -> Self {
        Self(format!("{}_{}", task_id.short(), tag))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SubtaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Task priority, ordered from least to most urgent.
///
/// Critical tasks earn a higher priority bonus in worker bids.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
    Critical,
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Priority::Low => write!(f, "low"),
            Priority::Medium => write!(f, "medium"),
            Priority::High => write!(f, "high"),
            Priority::Critical => write!(f, "critical"),
        }
    }
}

/// Composite task status in its lifecycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case", tag = "state")]
pub enum TaskStatus {
    /// Task created but not yet executed.
    #[default]
    Pending,
    /// Task is being allocated and executed.
    InProgress,
    /// All subtasks completed and aggregation succeeded.
    Completed,
    /// Task failed during allocation, scheduling, or execution.
    Failed {
        /// Human-readable reason for the failure.
        reason: String,
    },
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaskStatus::Pending => write!(f, "pending"),
            TaskStatus::InProgress => write!(f, "in_progress"),
            TaskStatus::Completed => write!(f, "completed"),
            TaskStatus::Failed { reason } => write!(f, "failed: {}", reason),
        }
    }
}

/// A single role-tagged unit of work inside a composite task.
///
/// Immutable once the graph is built; dependencies reference other
/// subtask ids within the same graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subtask {
    /// Identifier derived from the parent task id and a role tag.
    pub id: SubtaskId,
    /// The role required to execute this subtask.
    pub role: Role,
    /// Subtask ids that must complete before this one may start.
    pub depends_on: Vec<SubtaskId>,
    /// Human-readable description of the work.
    pub description: String,
}

impl Subtask {
    /// Create a subtask with no dependencies.
    pub fn new(id: SubtaskId, role: Role, description: &str) -> Self {
        Self {
            id,
            role,
            depends_on: Vec::new(),
            description: description.to_string(),
        }
    }

    /// Create a subtask that depends on the given subtask ids.
    pub fn with_deps(
        id: SubtaskId,
        role: Role,
        depends_on: Vec<SubtaskId>,
        description: &str,
    ) -> Self {
        Self {
            id,
            role,
            depends_on,
            description: description.to_string(),
        }
    }
}

/// Output of a single subtask execution.
///
/// The engine never inspects the payload; it only stores, forwards,
/// and aggregates it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubtaskResult {
    /// Opaque result payload produced by the work executor.
    pub payload: Value,
    /// Executor's self-assessed confidence in [0, 1].
    pub confidence: f64,
}

impl SubtaskResult {
    pub fn new(payload: Value, confidence: f64) -> Self {
        Self {
            payload,
            confidence,
        }
    }
}

/// Final aggregated result of a composite task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectiveResult {
    /// Task-type-specific combination of the subtask payloads.
    pub summary: Value,
    /// Arithmetic mean of the contributing subtask confidences.
    pub confidence: f64,
}

/// A composite unit of work: subtask graph, allocation, and outcome.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompositeTask {
    /// Unique identifier for this task.
    pub id: TaskId,
    /// Key into the decomposition and aggregation registries.
    pub task_type: String,
    /// Human-readable description of the overall goal.
    pub description: String,
    /// Task priority.
    pub priority: Priority,
    /// Roles that must be filled, in declared order. Duplicates mean
    /// multiple workers of the same role are needed.
    pub required_roles: Vec<Role>,
    /// Opaque input payload forwarded to every work executor call.
    pub input: Value,
    /// Subtask graph, populated by the decomposition registry.
    pub subtasks: Vec<Subtask>,
    /// Workers assigned through the auction, in required-role order.
    pub assigned_workers: Vec<WorkerId>,
    /// The assigned worker with the highest performance score.
    pub coordinator: Option<WorkerId>,
    /// Current lifecycle status.
    pub status: TaskStatus,
    /// Aggregated result, present once the task completed.
    pub result: Option<CollectiveResult>,
    /// Per-subtask results collected during execution.
    pub subtask_results: BTreeMap<SubtaskId, SubtaskResult>,
    /// When the task was created.
    pub created_at: DateTime<Utc>,
    /// When the task reached a terminal status.
    pub completed_at: Option<DateTime<Utc>>,
}

impl CompositeTask {
    /// Create a new pending task.
    pub fn new(
        task_type: &str,
        description: &str,
        required_roles: Vec<Role>,
        input: Value,
        priority: Priority,
    ) -> Self {
        Self {
            id: TaskId::new(),
            task_type: task_type.to_string(),
            description: description.to_string(),
            priority,
            required_roles,
            input,
            subtasks: Vec::new(),
            assigned_workers: Vec::new(),
            coordinator: None,
            status: TaskStatus::Pending,
            result: None,
            subtask_results: BTreeMap::new(),
            created_at: Utc::now(),
            completed_at: None,
        }
    }

    /// Transition to InProgress.
    pub fn start(&mut self) {
        self.status = TaskStatus::InProgress;
    }

    /// Mark the task completed with its aggregated result.
    pub fn complete(&mut self, result: CollectiveResult) {
        self.status = TaskStatus::Completed;
        self.result = Some(result);
        self.completed_at = Some(Utc::now());
    }

    /// Mark the task failed with a human-readable reason.
    pub fn fail(&mut self, reason: &str) {
        self.status = TaskStatus::Failed {
            reason: reason.to_string(),
        };
        self.completed_at = Some(Utc::now());
    }

    /// Check if the task reached a terminal status.
    pub fn is_finished(&self) -> bool {
        matches!(
            self.status,
            TaskStatus::Completed | TaskStatus::Failed { .. }
        )
    }
}
