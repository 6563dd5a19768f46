//! Dependency-aware scheduling
//!
//! Resolves planned task windows into concrete start/end instants. Each task
//! starts at the later of its planned start and its predecessor's scheduled
//! end plus lag, and lasts its planned duration (at least one unit).
//!
//! Resolution walks predecessor chains depth-first with an explicit stack and
//! an index-based memo, so long chains never grow the call stack. A chain
//! that revisits a task on the current walk aborts the whole batch with
//! [`ScheduleError::CycleDetected`].
//!
//! Preconditions: task IDs are unique. Duplicates are not removed; links
//! naming a duplicated ID bind to its first occurrence.

use chrono::{DateTime, Utc};
use petgraph::graph::NodeIndex;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, trace, warn};

use super::graph::DependencyGraph;
use super::id::TaskId;
use super::task::{Task, TimeUnit};

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ScheduleError {
    #[error("Dependency cycle detected: {}", join_path(.path))]
    CycleDetected {
        /// The task whose revisit closed the loop
        id: TaskId,
        /// The loop in predecessor order, starting and ending at `id`
        path: Vec<TaskId>,
    },
}

fn join_path(path: &[TaskId]) -> String {
    path.iter()
        .map(TaskId::as_str)
        .collect::<Vec<_>>()
        .join(" -> ")
}

/// Knobs for one resolution pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ScheduleOptions {
    /// Unit for durations and lag
    pub unit: TimeUnit,

    /// Floor planned starts and ceil planned ends to unit boundaries first
    pub snap: bool,
}

/// A task paired with its computed window
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedTask {
    pub id: TaskId,
    pub task: Task,
    pub scheduled_start: DateTime<Utc>,
    pub scheduled_end: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Window {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl ResolvedTask {
    fn new(task: &Task, window: Window) -> Self {
        Self {
            id: task.id.clone(),
            task: task.clone(),
            scheduled_start: window.start,
            scheduled_end: window.end,
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Mark {
    Unvisited,
    Visiting,
    Done(Window),
}

/// Resolves task sets into schedules
///
/// Holds only options; every call works on its own memo, so one scheduler
/// can be shared freely across threads.
#[derive(Debug, Clone, Copy, Default)]
pub struct Scheduler {
    options: ScheduleOptions,
}

impl Scheduler {
    pub fn new(options: ScheduleOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> ScheduleOptions {
        self.options
    }

    /// Resolves every task, ordered by `(scheduled_start, name)`
    ///
    /// Equal starts and names fall back to ID order so the result does not
    /// depend on input order. A missing predecessor counts as none.
    pub fn resolve(&self, tasks: &[Task]) -> Result<Vec<ResolvedTask>, ScheduleError> {
        let graph = DependencyGraph::from_tasks(tasks);
        for (task, missing) in graph.dangling() {
            debug!(task = %task, predecessor = %missing, "predecessor not found, scheduling as unconstrained");
        }

        let mut marks = vec![Mark::Unvisited; tasks.len()];
        let mut stack: Vec<NodeIndex> = Vec::new();
        let mut resolved = Vec::with_capacity(tasks.len());

        for root in 0..tasks.len() {
            if matches!(marks[root], Mark::Done(_)) {
                continue;
            }

            // Descend until a task whose predecessor window is known
            let mut current = NodeIndex::new(root);
            let mut pred_window = loop {
                marks[current.index()] = Mark::Visiting;
                stack.push(current);

                match graph.predecessor_index(current) {
                    None => break None,
                    Some(pred) => match marks[pred.index()] {
                        Mark::Done(window) => break Some(window),
                        Mark::Visiting => return Err(cycle_error(&graph, &stack, pred)),
                        Mark::Unvisited => current = pred,
                    },
                }
            };

            // Unwind: each entry's predecessor is the one pushed after it.
            // Every task passes through the stack exactly once.
            while let Some(idx) = stack.pop() {
                let task = &tasks[idx.index()];
                let window = self.window(task, pred_window);
                trace!(task = %task.id, start = %window.start, end = %window.end, "resolved");
                marks[idx.index()] = Mark::Done(window);
                pred_window = Some(window);
                resolved.push(ResolvedTask::new(task, window));
            }
        }
        debug_assert_eq!(resolved.len(), tasks.len());

        sort_schedule(&mut resolved);
        Ok(resolved)
    }

    /// Places every task at its own planned window, ignoring predecessors
    ///
    /// This is the fallback hosts show when [`Scheduler::resolve`] fails.
    pub fn planned(&self, tasks: &[Task]) -> Vec<ResolvedTask> {
        let mut planned: Vec<_> = tasks
            .iter()
            .map(|task| ResolvedTask::new(task, self.window(task, None)))
            .collect();

        sort_schedule(&mut planned);
        planned
    }

    fn window(&self, task: &Task, pred: Option<Window>) -> Window {
        let unit = self.options.unit;
        let (planned_start, duration) = if self.options.snap {
            let start = unit.floor(task.planned_start);
            let end = unit.ceil(task.clamped_end());
            (start, unit.units_between(start, end).max(1))
        } else {
            (task.planned_start, task.duration_units(unit))
        };

        let start = match pred {
            Some(pred) => planned_start.max(unit.shift(pred.end, task.lag)),
            None => planned_start,
        };

        Window {
            start,
            end: unit.shift(start, duration),
        }
    }
}

/// Resolves with day units and no snapping
pub fn resolve(tasks: &[Task]) -> Result<Vec<ResolvedTask>, ScheduleError> {
    Scheduler::default().resolve(tasks)
}

fn sort_schedule(items: &mut [ResolvedTask]) {
    items.sort_by(|a, b| {
        a.scheduled_start
            .cmp(&b.scheduled_start)
            .then_with(|| a.task.name.cmp(&b.task.name))
            .then_with(|| a.id.cmp(&b.id))
    });
}

fn cycle_error(graph: &DependencyGraph, stack: &[NodeIndex], closing: NodeIndex) -> ScheduleError {
    let from = stack.iter().position(|&idx| idx == closing).unwrap_or(0);
    let mut path: Vec<TaskId> = stack[from..]
        .iter()
        .filter_map(|&idx| graph.task_id(idx).cloned())
        .collect();

    let id = graph
        .task_id(closing)
        .cloned()
        .unwrap_or_else(|| path[0].clone());
    path.push(id.clone());

    warn!(task = %id, path = %join_path(&path), "dependency cycle");
    ScheduleError::CycleDetected { id, path }
}
