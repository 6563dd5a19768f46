//! Scheduling commands (schedule, deps)

use anyhow::{Context, Result};

use super::output::Output;
use super::task::format_instant;
use crate::domain::{DependencyGraph, ResolvedTask, Scheduler, Task, TaskId, TimeUnit};
use crate::storage::{CyclePolicy, Project};

/// Overrides for the project's schedule settings
#[derive(Debug, Default)]
pub struct ScheduleArgs {
    pub unit: Option<TimeUnit>,
    pub snap: bool,
    pub fallback: bool,
}

/// Resolve and print the project schedule
pub fn schedule(output: &Output, args: ScheduleArgs) -> Result<()> {
    let project = Project::open_current()?;
    let settings = &project.config().project.schedule;

    let mut options = settings.options();
    if let Some(unit) = args.unit {
        options.unit = unit;
    }
    options.snap |= args.snap;
    let policy = if args.fallback {
        CyclePolicy::Planned
    } else {
        settings.on_cycle
    };
    output.verbose_ctx(
        "schedule",
        &format!("unit={} snap={} on_cycle={}", options.unit.as_str(), options.snap, policy.as_str()),
    );

    let tasks = project.task_store().list()?;
    output.verbose_ctx("schedule", &format!("Loaded {} tasks", tasks.len()));

    let scheduler = Scheduler::new(options);
    let (items, failure) = match scheduler.resolve(&tasks) {
        Ok(items) => (items, None),
        Err(err) if policy == CyclePolicy::Planned => {
            output.warn(&format!("{}; showing planned windows", err));
            (scheduler.planned(&tasks), Some(err.to_string()))
        }
        Err(err) => return Err(err).context("Cannot schedule plan"),
    };

    if output.is_json() {
        let entries: Vec<_> = items.iter().map(|item| entry_json(item, options.unit)).collect();
        let connectors = DependencyGraph::from_tasks(&tasks).connectors();
        output.data(&serde_json::json!({
            "unit": options.unit.as_str(),
            "fallback": failure.is_some(),
            "error": failure,
            "tasks": entries,
            "connectors": connectors,
        }));
    } else if items.is_empty() {
        println!("No tasks to schedule.");
    } else {
        let title = if failure.is_some() { "Planned windows" } else { "Schedule" };
        println!("{} ({} tasks, unit: {}):", title, items.len(), options.unit.as_str());
        println!(
            "{:<12} {:<24} {:<17} {:<17} AFTER",
            "ID", "NAME", "START", "END"
        );
        println!("{}", "-".repeat(84));
        for item in &items {
            println!(
                "{:<12} {:<24} {:<17} {:<17} {}",
                item.id,
                item.task.name,
                format_instant(item.scheduled_start),
                format_instant(item.scheduled_end),
                item.task
                    .predecessor
                    .id()
                    .map(|p| p.to_string())
                    .unwrap_or_default(),
            );
        }

        if let (Some(first), Some(last)) = (items.first(), items.iter().map(|i| i.scheduled_end).max()) {
            println!();
            println!(
                "Span: {} -> {}",
                format_instant(first.scheduled_start),
                format_instant(last)
            );
        }
    }

    Ok(())
}

fn entry_json(item: &ResolvedTask, unit: TimeUnit) -> serde_json::Value {
    serde_json::json!({
        "id": item.id.to_string(),
        "name": item.task.name,
        "scheduled_start": item.scheduled_start,
        "scheduled_end": item.scheduled_end,
        "planned_start": item.task.planned_start,
        "planned_end": item.task.planned_end,
        "duration_units": unit.units_between(item.scheduled_start, item.scheduled_end),
        "predecessor": item.task.predecessor.id().map(|p| p.to_string()),
        "lag": item.task.lag,
    })
}

fn name_of<'a>(tasks: &'a [Task], id: &TaskId) -> &'a str {
    tasks
        .iter()
        .find(|t| &t.id == id)
        .map(|t| t.name.as_str())
        .unwrap_or("?")
}

/// Show a task's predecessor chain and successors
pub fn deps(output: &Output, id_str: &str) -> Result<()> {
    let project = Project::open_current()?;
    let id: TaskId = id_str.parse()?;
    let tasks = project.task_store().list()?;

    if !tasks.iter().any(|t| t.id == id) {
        anyhow::bail!("Task not found: {}", id);
    }

    let graph = DependencyGraph::from_tasks(&tasks);
    let chain = graph.chain(&id);
    let successors = graph.successors(&id);

    if output.is_json() {
        output.data(&serde_json::json!({
            "id": id.to_string(),
            "chain": chain.iter().map(|c| c.to_string()).collect::<Vec<_>>(),
            "successors": successors.iter().map(|s| s.to_string()).collect::<Vec<_>>(),
        }));
    } else {
        println!("{} - {}", id, name_of(&tasks, &id));

        if chain.is_empty() {
            println!("\nNo predecessors.");
        } else {
            println!("\nWaits on (nearest first):");
            for pred in &chain {
                println!("  {} - {}", pred, name_of(&tasks, pred));
            }
        }

        if !successors.is_empty() {
            println!("\nSuccessors:");
            for succ in &successors {
                println!("  {} - {}", succ, name_of(&tasks, succ));
            }
        }
    }

    Ok(())
}
