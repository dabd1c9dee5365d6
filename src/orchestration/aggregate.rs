//! Aggregation registry: task type → result combination function.
//!
//! Combiners are pure functions over the per-subtask result map. The
//! derived confidence is always the arithmetic mean of the contributing
//! subtask confidences; combiners only shape the summary payload.

use crate::core::task::{CollectiveResult, SubtaskId, SubtaskResult, TaskId};
use serde_json::{json, Map, Value};
use std::collections::{BTreeMap, HashMap};

/// A pure combination function over named subtask results.
pub type AggregateFn =
    Box<dyn Fn(&TaskId, &BTreeMap<SubtaskId, SubtaskResult>) -> Value + Send + Sync>;

/// Registry mapping task-type identifiers to combiners.
///
/// Unknown task types fall back to a generic envelope carrying the raw
/// per-subtask map, so aggregation never fails outright.
pub struct AggregationRegistry {
    combiners: HashMap<String, AggregateFn>,
}

impl AggregationRegistry {
    /// Create an empty registry (generic fallback only).
    pub fn new() -> Self {
        Self {
            combiners: HashMap::new(),
        }
    }

    /// Create a registry pre-loaded with combiners for the built-in
    /// decomposition templates.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register("pair", Box::new(tagged_summary));
        registry.register("research_report", Box::new(tagged_summary));
        registry.register("pipeline", Box::new(tagged_summary));
        registry
    }

    /// Register (or replace) the combiner for a task type.
    pub fn register(&mut self, task_type: &str, combiner: AggregateFn) {
        self.combiners.insert(task_type.to_string(), combiner);
    }

    /// Combine subtask results into the task's collective result.
    ///
    /// `confidence` is the mean of the subtask confidences, or 0.5 when
    /// no subtask contributed a result.
    pub fn aggregate(
        &self,
        task_type: &str,
        task_id: &TaskId,
        results: &BTreeMap<SubtaskId, SubtaskResult>,
    ) -> CollectiveResult {
        let summary = match self.combiners.get(task_type) {
            Some(combiner) => combiner(task_id, results),
            None => generic_envelope(task_id, task_type, results),
        };
        CollectiveResult {
            summary,
            confidence: mean_confidence(results),
        }
    }
}

impl Default for AggregationRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for AggregationRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut types: Vec<&str> = self.combiners.keys().map(String::as_str).collect();
        types.sort_unstable();
        f.debug_struct("AggregationRegistry")
            .field("task_types", &types)
            .finish()
    }
}

/// Arithmetic mean of the subtask confidences; 0.5 when empty.
fn mean_confidence(results: &BTreeMap<SubtaskId, SubtaskResult>) -> f64 {
    if results.is_empty() {
        return 0.5;
    }
    results.values().map(|r| r.confidence).sum::<f64>() / results.len() as f64
}

/// Keys subtask payloads by their role tag (the part of the subtask id
/// after the task-id prefix).
fn tagged_summary(task_id: &TaskId, results: &BTreeMap<SubtaskId, SubtaskResult>) -> Value {
    let prefix = format!("{}_", task_id.short());
    let mut sections = Map::new();
    for (id, result) in results {
        let tag = id.as_str().strip_prefix(&prefix).unwrap_or(id.as_str());
        sections.insert(tag.to_string(), result.payload.clone());
    }
    json!({
        "task_id": task_id.to_string(),
        "sections": Value::Object(sections),
    })
}

/// Fallback envelope for unregistered task types: the raw per-subtask
/// result map plus confidences.
fn generic_envelope(
    task_id: &TaskId,
    task_type: &str,
    results: &BTreeMap<SubtaskId, SubtaskResult>,
) -> Value {
    let mut raw = Map::new();
    for (id, result) in results {
        raw.insert(
            id.to_string(),
            json!({
                "payload": result.payload,
                "confidence": result.confidence,
            }),
        );
    }
    json!({
        "task_id": task_id.to_string(),
        "task_type": task_type,
        "subtask_results": Value::Object(raw),
    })
}
