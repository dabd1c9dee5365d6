//! Subtask DAG for dependency-ordered execution.
//!
//! `SubtaskGraph` wraps petgraph's DiGraph: nodes are subtasks, edges
//! point from a dependency to its dependent. Cycle detection happens in
//! `execution_order` — not at build time — because decomposition
//! templates are externally supplied and the scheduler must be able to
//! report a cyclic graph as an explicit error before dispatching
//! anything.

use crate::core::task::{Subtask, SubtaskId};
use crate::error::{Error, Result};
use petgraph::graph::{DiGraph, NodeIndex};
use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap, HashSet};

/// The subtask dependency graph of one composite task.
pub struct SubtaskGraph {
    /// The underlying directed graph; edge A→B means B depends on A.
    graph: DiGraph<Subtask, ()>,
    /// Index mapping from SubtaskId to NodeIndex for fast lookups.
    index: HashMap<SubtaskId, NodeIndex>,
}

impl SubtaskGraph {
    /// Build a graph from a decomposed subtask list.
    ///
    /// # Errors
    /// Returns a validation error when two subtasks share an id or a
    /// dependency references an id outside the graph. A cyclic edge set
    /// is accepted here and reported by `execution_order`.
    pub fn from_subtasks(subtasks: Vec<Subtask>) -> Result<Self> {
        let mut graph = DiGraph::new();
        let mut index = HashMap::new();

        for subtask in &subtasks {
            if index.contains_key(&subtask.id) {
                return Err(Error::Validation(format!(
                    "Duplicate subtask id: {}",
                    subtask.id
                )));
            }
            let node = graph.add_node(subtask.clone());
            index.insert(subtask.id.clone(), node);
        }

        for subtask in &subtasks {
            let to = index[&subtask.id];
            for dep in &subtask.depends_on {
                let from = *index.get(dep).ok_or_else(|| {
                    Error::Validation(format!(
                        "Subtask {} depends on unknown subtask {}",
                        subtask.id, dep
                    ))
                })?;
                graph.add_edge(from, to, ());
            }
        }

        Ok(Self { graph, index })
    }

    /// Number of subtasks in the graph.
    pub fn len(&self) -> usize {
        self.graph.node_count()
    }

    /// Check if the graph has no subtasks.
    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    /// Look up a subtask by id.
    pub fn subtask(&self, id: &SubtaskId) -> Option<&Subtask> {
        self.index
            .get(id)
            .and_then(|&node| self.graph.node_weight(node))
    }

    /// All subtasks, in arbitrary order.
    pub fn subtasks(&self) -> Vec<&Subtask> {
        self.graph.node_weights().collect()
    }

    /// Subtasks whose dependencies are all in the completed set and that
    /// are not themselves completed.
    pub fn ready_subtasks<'a>(&'a self, completed: &HashSet<SubtaskId>) -> Vec<&'a Subtask> {
        self.graph
            .node_indices()
            .filter_map(|node| {
                let subtask = self.graph.node_weight(node)?;
                if completed.contains(&subtask.id) {
                    return None;
                }
                let deps_satisfied = self
                    .graph
                    .neighbors_directed(node, petgraph::Direction::Incoming)
                    .all(|dep| {
                        self.graph
                            .node_weight(dep)
                            .map(|s| completed.contains(&s.id))
                            .unwrap_or(false)
                    });
                deps_satisfied.then_some(subtask)
            })
            .collect()
    }

    /// Compute a total execution order respecting all dependencies.
    ///
    /// Kahn's algorithm with an explicit remaining-count guard: track an
    /// in-degree per subtask, repeatedly emit a zero-in-degree subtask
    /// (lowest id first, for determinism), decrement its dependents. If
    /// the queue empties while subtasks remain, those subtasks form or
    /// depend on a cycle and the sort fails instead of spinning.
    ///
    /// # Errors
    /// `CyclicDependency` naming the stuck subtasks.
    pub fn execution_order(&self) -> Result<Vec<SubtaskId>> {
        let mut in_degree: HashMap<NodeIndex, usize> = self
            .graph
            .node_indices()
            .map(|node| {
                (
                    node,
                    self.graph
                        .neighbors_directed(node, petgraph::Direction::Incoming)
                        .count(),
                )
            })
            .collect();

        // Min-heap on subtask id keeps the order deterministic when
        // several subtasks are simultaneously ready.
        let mut queue: BinaryHeap<Reverse<(SubtaskId, NodeIndex)>> = in_degree
            .iter()
            .filter(|(_, &degree)| degree == 0)
            .filter_map(|(&node, _)| {
                self.graph
                    .node_weight(node)
                    .map(|s| Reverse((s.id.clone(), node)))
            })
            .collect();

        let mut order = Vec::with_capacity(self.len());
        while let Some(Reverse((id, node))) = queue.pop() {
            order.push(id);
            for dependent in self
                .graph
                .neighbors_directed(node, petgraph::Direction::Outgoing)
            {
                let degree = in_degree
                    .get_mut(&dependent)
                    .ok_or_else(|| Error::Validation("graph index out of sync".to_string()))?;
                *degree -= 1;
                if *degree == 0 {
                    if let Some(subtask) = self.graph.node_weight(dependent) {
                        queue.push(Reverse((subtask.id.clone(), dependent)));
                    }
                }
            }
        }

        if order.len() < self.len() {
            let scheduled: HashSet<&SubtaskId> = order.iter().collect();
            let mut stuck: Vec<String> = self
                .graph
                .node_weights()
                .filter(|s| !scheduled.contains(&s.id))
                .map(|s| s.id.to_string())
                .collect();
            stuck.sort();
            return Err(Error::CyclicDependency { stuck });
        }

        Ok(order)
    }
}

impl std::fmt::Debug for SubtaskGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubtaskGraph")
            .field("subtasks", &self.graph.node_count())
            .field("dependencies", &self.graph.edge_count())
            .finish()
    }
}
