//! Dependency graph for tasks
//!
//! Indexes tasks by position and records predecessor links as
//! `predecessor -> successor` edges weighted by lag. Uses petgraph for
//! graph operations.
//!
//! The graph mirrors the input as-is: cycles are representable here and are
//! reported by the scheduler, while [`DependencyGraph::link`] refuses to
//! introduce new ones.

use petgraph::algo::has_path_connecting;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use thiserror::Error;

use super::id::TaskId;
use super::task::Task;

#[derive(Debug, Error, PartialEq)]
pub enum GraphError {
    #[error("Linking would create a cycle: {0} -> {1}")]
    CycleDetected(TaskId, TaskId),

    #[error("Task not found: {0}")]
    TaskNotFound(TaskId),

    #[error("Self-dependency not allowed: {0}")]
    SelfDependency(TaskId),
}

/// A predecessor → successor link, as drawn by timeline renderers
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Connector {
    pub from: TaskId,
    pub to: TaskId,
    pub lag: i64,
}

/// A dependency graph for tasks
#[derive(Debug, Default)]
pub struct DependencyGraph {
    /// The underlying directed graph; node `i` is the `i`-th input task
    graph: DiGraph<TaskId, i64>,

    /// Map from TaskId to node index (first occurrence wins)
    node_map: HashMap<TaskId, NodeIndex>,

    /// Links whose predecessor is not in the graph: (task, missing predecessor)
    dangling: Vec<(TaskId, TaskId)>,
}

impl DependencyGraph {
    /// Creates an empty dependency graph
    pub fn new() -> Self {
        Self {
            graph: DiGraph::new(),
            node_map: HashMap::new(),
            dangling: Vec::new(),
        }
    }

    /// Builds a graph from a slice of tasks
    ///
    /// Node indices follow slice positions. Predecessors that name a missing
    /// task are recorded as dangling instead of becoming edges.
    pub fn from_tasks(tasks: &[Task]) -> Self {
        let mut graph = Self::new();

        // First pass: add all nodes
        for task in tasks {
            let idx = graph.graph.add_node(task.id.clone());
            graph.node_map.entry(task.id.clone()).or_insert(idx);
        }

        // Second pass: add all edges
        for (pos, task) in tasks.iter().enumerate() {
            let Some(pred_id) = task.predecessor.id() else {
                continue;
            };
            match graph.node_map.get(pred_id) {
                Some(&pred_idx) => {
                    graph
                        .graph
                        .add_edge(pred_idx, NodeIndex::new(pos), task.lag);
                }
                None => graph.dangling.push((task.id.clone(), pred_id.clone())),
            }
        }

        graph
    }

    /// Returns the node index for a task
    pub fn index_of(&self, task_id: &TaskId) -> Option<NodeIndex> {
        self.node_map.get(task_id).copied()
    }

    /// Returns the predecessor node of the task at `idx`, if it resolved
    pub fn predecessor_index(&self, idx: NodeIndex) -> Option<NodeIndex> {
        self.graph
            .neighbors_directed(idx, Direction::Incoming)
            .next()
    }

    /// Returns the task ID stored at `idx`
    pub fn task_id(&self, idx: NodeIndex) -> Option<&TaskId> {
        self.graph.node_weight(idx)
    }

    /// Returns the direct predecessor of a task, if it exists in the graph
    pub fn predecessor(&self, task_id: &TaskId) -> Option<TaskId> {
        let idx = self.index_of(task_id)?;
        self.predecessor_index(idx)
            .and_then(|p| self.task_id(p).cloned())
    }

    /// Returns the direct successors of a task (tasks waiting on it)
    pub fn successors(&self, task_id: &TaskId) -> Vec<TaskId> {
        let Some(idx) = self.index_of(task_id) else {
            return vec![];
        };

        let mut ids: Vec<_> = self
            .graph
            .neighbors_directed(idx, Direction::Outgoing)
            .filter_map(|n| self.task_id(n).cloned())
            .collect();
        ids.sort();
        ids
    }

    /// Walks predecessors from `task_id`, nearest first
    ///
    /// Stops at the first task without a predecessor or at the first repeat,
    /// so cyclic input yields a finite chain.
    pub fn chain(&self, task_id: &TaskId) -> Vec<TaskId> {
        let mut chain = Vec::new();
        let mut seen = HashSet::new();
        let Some(mut current) = self.index_of(task_id) else {
            return chain;
        };
        seen.insert(current);

        while let Some(pred) = self.predecessor_index(current) {
            if !seen.insert(pred) {
                break;
            }
            if let Some(id) = self.task_id(pred) {
                chain.push(id.clone());
            }
            current = pred;
        }

        chain
    }

    /// All predecessor links, ordered by (from, to)
    pub fn connectors(&self) -> Vec<Connector> {
        let mut connectors: Vec<_> = self
            .graph
            .edge_references()
            .filter_map(|edge| {
                Some(Connector {
                    from: self.task_id(edge.source())?.clone(),
                    to: self.task_id(edge.target())?.clone(),
                    lag: *edge.weight(),
                })
            })
            .collect();
        connectors.sort_by(|a, b| a.from.cmp(&b.from).then_with(|| a.to.cmp(&b.to)));
        connectors
    }

    /// Links whose predecessor is missing
    pub fn dangling(&self) -> &[(TaskId, TaskId)] {
        &self.dangling
    }

    /// Sets `predecessor` as the predecessor of `task`, replacing any prior link
    ///
    /// The edge direction is: predecessor -> task
    /// This means "predecessor must finish before task starts"
    pub fn link(&mut self, task: &TaskId, predecessor: &TaskId, lag: i64) -> Result<(), GraphError> {
        if task == predecessor {
            return Err(GraphError::SelfDependency(task.clone()));
        }

        let task_idx = self
            .index_of(task)
            .ok_or_else(|| GraphError::TaskNotFound(task.clone()))?;

        let pred_idx = self
            .index_of(predecessor)
            .ok_or_else(|| GraphError::TaskNotFound(predecessor.clone()))?;

        // A path task -> ... -> predecessor means the new edge closes a loop
        if has_path_connecting(&self.graph, task_idx, pred_idx, None) {
            return Err(GraphError::CycleDetected(task.clone(), predecessor.clone()));
        }

        self.unlink(task);
        self.graph.add_edge(pred_idx, task_idx, lag);

        Ok(())
    }

    /// Removes the predecessor link of `task`; returns true if one existed
    pub fn unlink(&mut self, task: &TaskId) -> bool {
        let Some(task_idx) = self.index_of(task) else {
            return false;
        };

        // Edge removal reindexes the last edge, so look up afresh each time
        let mut removed = false;
        while let Some(edge) = self
            .graph
            .edges_directed(task_idx, Direction::Incoming)
            .next()
            .map(|edge| edge.id())
        {
            self.graph.remove_edge(edge);
            removed = true;
        }
        self.dangling.retain(|(id, _)| id != task);

        removed
    }

    /// Returns the number of tasks in the graph
    pub fn len(&self) -> usize {
        self.graph.node_count()
    }

    /// Returns true if the graph is empty
    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }
}
