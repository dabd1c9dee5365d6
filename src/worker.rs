//! Worker identity, bidding, reputation, and messaging.
//!
//! A `Worker` is a capability-matched execution slot with a bounded
//! reputation score. Workers compete for roles through `bid()`, talk to
//! each other through the shared blackboard handle injected at
//! construction, and never execute domain logic themselves — that is the
//! work executor's job.

use crate::blackboard::{Blackboard, Message, Recipient};
use crate::core::task::{CompositeTask, Priority, TaskId};
use crate::orchestration::auction::Bid;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use std::sync::Arc;
use uuid::Uuid;

/// Unique identifier for a worker.
///
/// Ordered so that auction tie-breaks (lowest id wins) are deterministic
/// and reproducible across runs with identical inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WorkerId(pub Uuid);

impl WorkerId {
    /// Create a new unique worker identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Return first 8 characters of the UUID for display.
    pub fn short(&self) -> String {
        self.0.to_string()[..8].to_string()
    }
}

impl Default for WorkerId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for WorkerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for WorkerId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// The fixed enumeration of worker roles.
///
/// A worker has exactly one primary role; its capability set may cover
/// additional roles, which feeds the bid's capability-match term.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Researcher,
    Analyst,
    Strategist,
    Executor,
    Reviewer,
    Synthesizer,
}

impl Role {
    /// All roles, in declaration order.
    pub fn all() -> [Role; 6] {
        [
            Role::Researcher,
            Role::Analyst,
            Role::Strategist,
            Role::Executor,
            Role::Reviewer,
            Role::Synthesizer,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Researcher => "researcher",
            Role::Analyst => "analyst",
            Role::Strategist => "strategist",
            Role::Executor => "executor",
            Role::Reviewer => "reviewer",
            Role::Synthesizer => "synthesizer",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = crate::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "researcher" => Ok(Role::Researcher),
            "analyst" => Ok(Role::Analyst),
            "strategist" => Ok(Role::Strategist),
            "executor" => Ok(Role::Executor),
            "reviewer" => Ok(Role::Reviewer),
            "synthesizer" => Ok(Role::Synthesizer),
            other => Err(crate::Error::Validation(format!("unknown role: {}", other))),
        }
    }
}

/// Weights of the bid score components. They sum to 1.0 so the score
/// stays bounded in [0, 100].
const W_CAPABILITY: f64 = 0.4;
const W_WORKLOAD: f64 = 0.3;
const W_PERFORMANCE: f64 = 0.2;
const W_PRIORITY: f64 = 0.1;

/// A registered worker: identity, capabilities, reputation, and a handle
/// to the shared blackboard.
///
/// Workers are created at registration and never destroyed, only
/// deactivated. The performance score is a crude but monotone, bounded
/// reputation signal — not a learning model.
#[derive(Debug, Clone)]
pub struct Worker {
    /// Unique identifier.
    pub id: WorkerId,
    /// Primary role; the only role this worker can be auctioned for.
    pub role: Role,
    /// Role-tagged duties this worker can cover, used for the bid's
    /// capability-match term.
    pub capabilities: HashSet<Role>,
    /// Reputation score, clamped to [0, 100].
    performance: f64,
    /// Inactive workers never bid.
    pub active: bool,
    /// Ids of composite tasks this worker helped complete.
    pub completed_tasks: Vec<TaskId>,
    /// Shared coordination surface.
    blackboard: Arc<Blackboard>,
}

impl Worker {
    /// Create an active worker with a starting performance of 50.
    ///
    /// The worker's primary role is always part of its capability set.
    pub fn new(role: Role, capabilities: HashSet<Role>, blackboard: Arc<Blackboard>) -> Self {
        let id = WorkerId::new();
        blackboard.register_worker(id);
        let mut capabilities = capabilities;
        capabilities.insert(role);
        Self {
            id,
            role,
            capabilities,
            performance: 50.0,
            active: true,
            completed_tasks: Vec::new(),
            blackboard,
        }
    }

    /// Current reputation score in [0, 100].
    pub fn performance(&self) -> f64 {
        self.performance
    }

    /// Compute this worker's bid for a task.
    ///
    /// Returns None when the worker is inactive or its primary role is
    /// not among the task's required roles. Otherwise the score is
    ///
    /// `100 × (0.4·capability_match + 0.3·(1 − min(workload_penalty, 0.5))
    ///       + 0.2·(performance/100) + 0.1·priority_bonus)`
    ///
    /// where `capability_match` is the overlap between the worker's
    /// capability set and the deduplicated required-role set. The result
    /// is bounded and reproducible; ties are broken by worker id at
    /// allocation.
    pub fn bid(&self, task: &CompositeTask) -> Option<Bid> {
        if !self.active || !task.required_roles.contains(&self.role) {
            return None;
        }

        let required: HashSet<Role> = task.required_roles.iter().copied().collect();
        let overlap = self.capabilities.intersection(&required).count();
        let capability_match = overlap as f64 / required.len() as f64;

        let workload_penalty = (0.1 * self.completed_tasks.len() as f64).min(0.5);
        let priority_bonus = if task.priority == Priority::Critical {
            1.0
        } else {
            0.8
        };

        let score = 100.0
            * (W_CAPABILITY * capability_match
                + W_WORKLOAD * (1.0 - workload_penalty)
                + W_PERFORMANCE * (self.performance / 100.0)
                + W_PRIORITY * priority_bonus);

        // Higher reputation, tighter estimate. Floor keeps it plausible.
        let estimated_minutes = (60.0 - self.performance / 4.0).max(10.0) as u32;

        Some(Bid {
            worker_id: self.id,
            score,
            estimated_minutes,
            confidence: capability_match.max(0.1),
            rationale: format!(
                "capability={:.2} workload_penalty={:.2} performance={:.0} priority_bonus={:.1}",
                capability_match, workload_penalty, self.performance, priority_bonus
            ),
        })
    }

    /// Update reputation after a task outcome: +2 on success, −5 on
    /// failure, always clamped to [0, 100].
    pub fn update_performance(&mut self, success: bool) {
        self.performance = if success {
            (self.performance + 2.0).min(100.0)
        } else {
            (self.performance - 5.0).max(0.0)
        };
    }

    /// Record a completed task id, feeding the workload penalty of
    /// future bids.
    pub fn record_completed(&mut self, task_id: TaskId) {
        self.completed_tasks.push(task_id);
    }

    /// Deactivate this worker. It stops bidding but keeps its history.
    pub fn deactivate(&mut self) {
        self.active = false;
    }

    // ========== Messaging ==========

    /// Send a direct message to another worker via the blackboard.
    pub fn send(&self, to: WorkerId, kind: &str, payload: Value) {
        self.blackboard
            .publish(Message::new(self.id, Recipient::Worker(to), kind, payload));
    }

    /// Broadcast a message to every registered worker.
    pub fn broadcast(&self, kind: &str, payload: Value) {
        self.blackboard
            .publish(Message::new(self.id, Recipient::Broadcast, kind, payload));
    }

    /// Drain this worker's inbox.
    pub fn check_messages(&self) -> Vec<Message> {
        self.blackboard.drain(&self.id)
    }

    /// Contribute a fact to the shared knowledge store.
    pub fn contribute_knowledge(&self, key: &str, value: Value) {
        self.blackboard.put_knowledge(key, value, self.id);
    }

    /// Query the shared knowledge store.
    pub fn query_knowledge(&self, key: &str) -> Option<Value> {
        self.blackboard.get_knowledge(key).map(|entry| entry.value)
    }
}
