//! Quorum: a competitive task-allocation and dependency-ordered
//! execution engine.
//!
//! Workers with typed roles bid on composite tasks; a deterministic
//! auction fills every required role, a scheduler executes the task's
//! subtask graph in dependency order under a deadline, and the results
//! are aggregated into a single collective answer. All domain work is
//! delegated to a pluggable [`WorkExecutor`]; the engine only
//! coordinates.

pub mod blackboard;
pub mod config;
pub mod core;
pub mod error;
pub mod log;
pub mod orchestration;
pub mod worker;

pub use blackboard::{Blackboard, KnowledgeEntry, Message, Recipient};
pub use config::EngineConfig;
pub use crate::core::graph::SubtaskGraph;
pub use crate::core::task::{
    CollectiveResult, CompositeTask, Priority, Subtask, SubtaskId, SubtaskResult, TaskId,
    TaskStatus,
};
pub use error::{Error, Result};
pub use orchestration::{
    Allocation, Bid, DecompositionRegistry, Orchestrator, SchedulerEvent, SystemIntelligence,
    WorkContext, WorkExecutor,
};
pub use worker::{Role, Worker, WorkerId};
