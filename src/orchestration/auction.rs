//! Scoring-based auction for allocating task roles to workers.
//!
//! Each role in a task's declared role order is put up for bids from
//! every active worker whose primary role matches. The highest score
//! wins; ties resolve to the lowest worker id so allocation is fully
//! deterministic. A role that attracts no bids fails the allocation
//! outright rather than silently producing a partially staffed task.

use crate::core::task::CompositeTask;
use crate::error::{Error, Result};
use crate::worker::{Role, Worker, WorkerId};
use crate::{qlog_debug, qlog_warn};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A worker's self-assessed suitability for a task.
///
/// Ephemeral: bids exist only during allocation and are kept on the
/// winning assignment for audit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bid {
    /// The bidding worker.
    pub worker_id: WorkerId,
    /// Bounded suitability score in [0, 100].
    pub score: f64,
    /// The worker's time estimate for its share of the task.
    pub estimated_minutes: u32,
    /// The worker's confidence in the bid, in [0, 1].
    pub confidence: f64,
    /// Human-readable breakdown of the score components.
    pub rationale: String,
}

/// One filled role slot: the role, the winning worker, and its bid.
#[derive(Debug, Clone)]
pub struct RoleAssignment {
    pub role: Role,
    pub worker: WorkerId,
    pub winning_bid: Bid,
}

/// Result of a successful auction: every required role filled, in the
/// task's declared order, plus an elected coordinator.
#[derive(Debug, Clone)]
pub struct Allocation {
    /// Filled slots, aligned with the task's required-role order.
    pub assignments: Vec<RoleAssignment>,
    /// The assigned worker with the highest performance score. A
    /// messaging focal point, not a scheduling authority.
    pub coordinator: WorkerId,
}

impl Allocation {
    /// Assigned worker ids in declared-role order.
    pub fn workers(&self) -> Vec<WorkerId> {
        self.assignments.iter().map(|a| a.worker).collect()
    }

    /// The worker filling the `ordinal`-th subtask of `role`.
    ///
    /// When a role has fewer assignees than subtasks, assignment wraps
    /// round-robin over that role's workers.
    pub fn worker_for(&self, role: Role, ordinal: usize) -> Option<WorkerId> {
        let of_role: Vec<WorkerId> = self
            .assignments
            .iter()
            .filter(|a| a.role == role)
            .map(|a| a.worker)
            .collect();
        if of_role.is_empty() {
            return None;
        }
        Some(of_role[ordinal % of_role.len()])
    }
}

/// Run the auction for a task over the registered worker set.
///
/// Roles are processed in the task's declared order (not role-set
/// order), so a role appearing twice is filled by two distinct workers.
///
/// # Errors
/// `NoEligibleWorker(role)` when a required role attracts zero bids;
/// nothing is assigned in that case.
pub fn run_auction(
    task: &CompositeTask,
    workers: &HashMap<WorkerId, Worker>,
) -> Result<Allocation> {
    let mut assignments: Vec<RoleAssignment> = Vec::with_capacity(task.required_roles.len());

    for &role in &task.required_roles {
        let taken: Vec<WorkerId> = assignments.iter().map(|a| a.worker).collect();

        // Candidates: active workers with a matching primary role that
        // are not already filling a slot on this task.
        let mut bids: Vec<Bid> = workers
            .values()
            .filter(|w| w.role == role && !taken.contains(&w.id))
            .filter_map(|w| w.bid(task))
            .collect();

        if bids.is_empty() {
            qlog_warn!(
                "auction for task {} found no eligible worker for role {}",
                task.id.short(),
                role
            );
            return Err(Error::NoEligibleWorker(role));
        }

        // Highest score wins; ties resolve to the lowest worker id so
        // repeated runs with identical inputs allocate identically.
        bids.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.worker_id.cmp(&b.worker_id))
        });
        let winning_bid = bids.remove(0);

        qlog_debug!(
            "task {} role {} -> worker {} (score {:.1})",
            task.id.short(),
            role,
            winning_bid.worker_id.short(),
            winning_bid.score
        );
        assignments.push(RoleAssignment {
            role,
            worker: winning_bid.worker_id,
            winning_bid,
        });
    }

    let coordinator = elect_coordinator(&assignments, workers)?;
    Ok(Allocation {
        assignments,
        coordinator,
    })
}

/// The assigned worker with the highest current performance score; ties
/// resolve to the lowest worker id.
fn elect_coordinator(
    assignments: &[RoleAssignment],
    workers: &HashMap<WorkerId, Worker>,
) -> Result<WorkerId> {
    assignments
        .iter()
        .filter_map(|a| workers.get(&a.worker))
        .max_by(|a, b| {
            a.performance()
                .partial_cmp(&b.performance())
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| b.id.cmp(&a.id))
        })
        .map(|w| w.id)
        .ok_or_else(|| Error::Validation("auction produced no assignments".to_string()))
}
