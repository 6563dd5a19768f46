//! Domain models for Ganttiek
//!
//! Contains the scheduling logic without any I/O concerns.

mod id;
mod task;
mod graph;
mod schedule;

pub use id::{IdError, TaskId};
pub use task::{Predecessor, Task, TimeUnit};
pub use graph::{Connector, DependencyGraph, GraphError};
pub use schedule::{resolve, ResolvedTask, ScheduleError, ScheduleOptions, Scheduler};
