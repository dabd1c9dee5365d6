//! Core domain models for the quorum engine.
//!
//! This module contains the fundamental data structures used throughout
//! the engine: composite tasks, subtasks, and the dependency graph.

pub mod graph;
pub mod task;

pub use graph::SubtaskGraph;
pub use task::{
    CollectiveResult, CompositeTask, Priority, Subtask, SubtaskId, SubtaskResult, TaskId,
    TaskStatus,
};
