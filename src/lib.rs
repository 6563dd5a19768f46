//! Ganttiek - dependency-aware scheduling for Gantt-style plans
//!
//! Tasks carry a planned window and at most one finish-to-start predecessor
//! with a lag. [`Scheduler::resolve`] turns them into concrete, ordered
//! start/end instants and rejects predecessor cycles.

pub mod domain;
pub mod storage;
pub mod cli;
pub mod logging;

pub use domain::{resolve, ResolvedTask, ScheduleError, ScheduleOptions, Scheduler, Task, TaskId, TimeUnit};
