//! Decomposition registry: task type → subtask graph template.
//!
//! Builders are pure functions of the task id, so decomposition is
//! deterministic and never touches I/O. Adding a task type means
//! registering a builder — the orchestrator itself never changes.

use crate::core::task::{Subtask, SubtaskId, TaskId};
use crate::error::{Error, Result};
use crate::worker::Role;
use std::collections::HashMap;

/// A pure decomposition function: parent task id → subtask template.
pub type DecomposeFn = Box<dyn Fn(&TaskId) -> Vec<Subtask> + Send + Sync>;

/// Registry mapping task-type identifiers to decomposition builders.
pub struct DecompositionRegistry {
    builders: HashMap<String, DecomposeFn>,
}

impl DecompositionRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            builders: HashMap::new(),
        }
    }

    /// Create a registry pre-loaded with the built-in templates:
    /// `"pair"`, `"research_report"`, and `"pipeline"`.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register("pair", Box::new(pair_template));
        registry.register("research_report", Box::new(research_report_template));
        registry.register("pipeline", Box::new(pipeline_template));
        registry
    }

    /// Register (or replace) the builder for a task type.
    pub fn register(&mut self, task_type: &str, builder: DecomposeFn) {
        self.builders.insert(task_type.to_string(), builder);
    }

    /// Check whether a task type has a registered builder.
    pub fn contains(&self, task_type: &str) -> bool {
        self.builders.contains_key(task_type)
    }

    /// Build the subtask list for a task.
    ///
    /// # Errors
    /// `UnknownTaskType` for unregistered types — an unknown type fails
    /// fast instead of silently producing a no-op task.
    pub fn build(&self, task_type: &str, task_id: &TaskId) -> Result<Vec<Subtask>> {
        let builder = self
            .builders
            .get(task_type)
            .ok_or_else(|| Error::UnknownTaskType(task_type.to_string()))?;
        Ok(builder(task_id))
    }
}

impl Default for DecompositionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for DecompositionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut types: Vec<&str> = self.builders.keys().map(String::as_str).collect();
        types.sort_unstable();
        f.debug_struct("DecompositionRegistry")
            .field("task_types", &types)
            .finish()
    }
}

/// Two independent subtasks: analysis and research.
fn pair_template(task_id: &TaskId) -> Vec<Subtask> {
    vec![
        Subtask::new(
            SubtaskId::derive(task_id, "analysis"),
            Role::Analyst,
            "Analyze the task input",
        ),
        Subtask::new(
            SubtaskId::derive(task_id, "research"),
            Role::Researcher,
            "Research background for the task input",
        ),
    ]
}

/// Parallel research and analysis, synthesis over both, review last.
fn research_report_template(task_id: &TaskId) -> Vec<Subtask> {
    let research = SubtaskId::derive(task_id, "research");
    let analysis = SubtaskId::derive(task_id, "analysis");
    let synthesis = SubtaskId::derive(task_id, "synthesis");
    let review = SubtaskId::derive(task_id, "review");
    vec![
        Subtask::new(research.clone(), Role::Researcher, "Gather source material"),
        Subtask::new(analysis.clone(), Role::Analyst, "Analyze gathered data"),
        Subtask::with_deps(
            synthesis.clone(),
            Role::Synthesizer,
            vec![research, analysis],
            "Synthesize findings into a draft report",
        ),
        Subtask::with_deps(
            review,
            Role::Reviewer,
            vec![synthesis],
            "Review the draft report",
        ),
    ]
}

/// Strict research → analysis → execution chain.
fn pipeline_template(task_id: &TaskId) -> Vec<Subtask> {
    let research = SubtaskId::derive(task_id, "research");
    let analysis = SubtaskId::derive(task_id, "analysis");
    let execution = SubtaskId::derive(task_id, "execution");
    vec![
        Subtask::new(research.clone(), Role::Researcher, "Collect inputs"),
        Subtask::with_deps(
            analysis.clone(),
            Role::Analyst,
            vec![research],
            "Analyze collected inputs",
        ),
        Subtask::with_deps(
            execution,
            Role::Executor,
            vec![analysis],
            "Act on the analysis",
        ),
    ]
}
