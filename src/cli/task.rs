//! Task CLI commands

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use clap::Subcommand;

use super::output::Output;
use crate::domain::{DependencyGraph, Task, TaskId, TimeUnit};
use crate::storage::Project;

#[derive(Subcommand)]
pub enum TaskCommands {
    /// Add a task with a planned window
    ///
    /// Examples:
    ///   ganttiek task add "Analysis" --start 2025-01-06 --end 2025-01-09
    ///   ganttiek task add "Design" --start 2025-01-08 --units 5 --after t-1a2b3c4 --lag 1
    Add {
        /// Task name
        name: String,

        /// Planned start (YYYY-MM-DD, YYYY-MM-DDTHH:MM or RFC 3339)
        #[arg(long)]
        start: String,

        /// Planned end (same formats as --start)
        #[arg(long, conflicts_with = "units", required_unless_present = "units")]
        end: Option<String>,

        /// Planned length in schedule units instead of --end
        #[arg(long)]
        units: Option<i64>,

        /// Predecessor task that must finish first
        #[arg(long)]
        after: Option<String>,

        /// Units to wait after the predecessor ends (needs --after)
        #[arg(long, requires = "after", allow_hyphen_values = true)]
        lag: Option<i64>,
    },

    /// List tasks
    List,

    /// Show task details
    Show {
        /// Task ID
        id: String,
    },

    /// Change a task's name or planned window
    Edit {
        /// Task ID
        id: String,

        /// New name
        #[arg(long)]
        name: Option<String>,

        /// New planned start
        #[arg(long)]
        start: Option<String>,

        /// New planned end
        #[arg(long)]
        end: Option<String>,
    },

    /// Remove a task (successors lose their predecessor)
    Remove {
        /// Task ID
        id: String,
    },

    /// Make a task wait for a predecessor
    Link {
        /// Task that will wait
        task: String,

        /// Task that must finish first
        predecessor: String,

        /// Units to wait after the predecessor ends
        #[arg(long, default_value = "0", allow_hyphen_values = true)]
        lag: i64,
    },

    /// Remove a task's predecessor
    Unlink {
        /// Task ID
        task: String,
    },
}

pub fn run(cmd: TaskCommands, output: &Output) -> Result<()> {
    match cmd {
        TaskCommands::Add { name, start, end, units, after, lag } => {
            add_task(output, &name, &start, end.as_deref(), units, after.as_deref(), lag.unwrap_or(0))
        }
        TaskCommands::List => list_tasks(output),
        TaskCommands::Show { id } => show_task(output, &id),
        TaskCommands::Edit { id, name, start, end } => {
            edit_task(output, &id, name, start.as_deref(), end.as_deref())
        }
        TaskCommands::Remove { id } => remove_task(output, &id),
        TaskCommands::Link { task, predecessor, lag } => link_task(output, &task, &predecessor, lag),
        TaskCommands::Unlink { task } => unlink_task(output, &task),
    }
}

/// Parses a CLI instant; bare dates mean midnight UTC
pub fn parse_instant(s: &str) -> Result<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M") {
        return Ok(dt.and_utc());
    }
    let date = NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .with_context(|| format!("Invalid date '{}': expected YYYY-MM-DD, YYYY-MM-DDTHH:MM or RFC 3339", s))?;
    Ok(date.and_hms_opt(0, 0, 0).unwrap_or_default().and_utc())
}

pub fn format_instant(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%d %H:%M").to_string()
}

fn task_json(task: &Task) -> serde_json::Value {
    serde_json::json!({
        "id": task.id.to_string(),
        "name": task.name,
        "planned_start": task.planned_start,
        "planned_end": task.planned_end,
        "predecessor": task.predecessor.id().map(|p| p.to_string()),
        "lag": task.lag,
    })
}

fn add_task(
    output: &Output,
    name: &str,
    start: &str,
    end: Option<&str>,
    units: Option<i64>,
    after: Option<&str>,
    lag: i64,
) -> Result<()> {
    let project = Project::open_current()?;
    let store = project.task_store();
    let unit = project.config().project.schedule.unit;

    let planned_start = parse_instant(start)?;
    let planned_end = match (end, units) {
        (Some(end), _) => parse_instant(end)?,
        (None, Some(units)) => unit.shift(planned_start, units),
        (None, None) => anyhow::bail!("Either --end or --units is required"),
    };
    if planned_end < planned_start {
        output.verbose_ctx("task", "Planned end precedes start; the task will be scheduled for one unit");
    }

    let mut task = Task::new(TaskId::generate(name, Utc::now()), name, planned_start, planned_end);

    if let Some(after) = after {
        let predecessor: TaskId = after.parse()?;
        let mut tasks = store.list()?;
        tasks.push(task.clone());

        // Validate against the graph before storing
        let mut graph = DependencyGraph::from_tasks(&tasks);
        graph.link(&task.id, &predecessor, lag)?;
        task.set_predecessor(predecessor, lag);
    }

    store.append(&task)?;

    if output.is_json() {
        output.data(&task_json(&task));
    } else {
        output.success(&format!("Created task: {} - {}", task.id, task.name));
    }

    Ok(())
}

fn list_tasks(output: &Output) -> Result<()> {
    let project = Project::open_current()?;
    let unit = project.config().project.schedule.unit;
    let tasks = project.task_store().list()?;

    if output.is_json() {
        let items: Vec<_> = tasks.iter().map(task_json).collect();
        output.data(&items);
    } else if tasks.is_empty() {
        println!("No tasks");
    } else {
        println!("{:<12} {:<24} {:<17} {:<17} AFTER", "ID", "NAME", "PLANNED START", "PLANNED END");
        println!("{}", "-".repeat(84));

        for task in &tasks {
            println!(
                "{:<12} {:<24} {:<17} {:<17} {}",
                task.id,
                task.name,
                format_instant(task.planned_start),
                format_instant(task.planned_end),
                describe_predecessor(task, unit),
            );
        }
    }

    Ok(())
}

fn describe_predecessor(task: &Task, unit: TimeUnit) -> String {
    match task.predecessor.id() {
        Some(pred) if task.lag != 0 => format!("{} {:+}{}", pred, task.lag, unit.suffix()),
        Some(pred) => pred.to_string(),
        None => String::new(),
    }
}

fn show_task(output: &Output, id_str: &str) -> Result<()> {
    let project = Project::open_current()?;
    let unit = project.config().project.schedule.unit;

    let id: TaskId = id_str.parse()?;
    let tasks = project.task_store().list()?;

    let task = tasks
        .iter()
        .find(|t| t.id == id)
        .ok_or_else(|| anyhow::anyhow!("Task not found: {}", id))?;

    let graph = DependencyGraph::from_tasks(&tasks);
    let successors = graph.successors(&id);
    let dangling = task.predecessor.id().is_some() && graph.predecessor(&id).is_none();

    if output.is_json() {
        let mut value = task_json(task);
        value["duration_units"] = task.duration_units(unit).into();
        value["unit"] = unit.as_str().into();
        value["successors"] = successors.iter().map(|s| s.to_string()).collect::<Vec<_>>().into();
        value["dangling_predecessor"] = dangling.into();
        output.data(&value);
    } else {
        println!("Task: {}", task.id);
        println!("Name: {}", task.name);
        println!("Planned: {} -> {}", format_instant(task.planned_start), format_instant(task.planned_end));
        println!("Duration: {}{}", task.duration_units(unit), unit.suffix());

        if let Some(pred) = task.predecessor.id() {
            let note = if dangling { " (missing, ignored)" } else { "" };
            println!("After: {}{} (lag {}{})", pred, note, task.lag, unit.suffix());
        }

        if !successors.is_empty() {
            println!("\nSuccessors:");
            for succ in &successors {
                println!("  {}", succ);
            }
        }
    }

    Ok(())
}

fn edit_task(
    output: &Output,
    id_str: &str,
    name: Option<String>,
    start: Option<&str>,
    end: Option<&str>,
) -> Result<()> {
    let project = Project::open_current()?;
    let store = project.task_store();

    let id: TaskId = id_str.parse()?;
    let mut task = store
        .get(&id)?
        .ok_or_else(|| anyhow::anyhow!("Task not found: {}", id))?;

    if let Some(name) = name {
        task.name = name;
    }
    if let Some(start) = start {
        task.planned_start = parse_instant(start)?;
    }
    if let Some(end) = end {
        task.planned_end = parse_instant(end)?;
    }
    store.update(&task)?;

    if output.is_json() {
        output.data(&task_json(&task));
    } else {
        output.success(&format!("Updated task: {} - {}", task.id, task.name));
    }

    Ok(())
}

fn remove_task(output: &Output, id_str: &str) -> Result<()> {
    let project = Project::open_current()?;
    let store = project.task_store();

    let id: TaskId = id_str.parse()?;
    let detached = store
        .remove(&id)?
        .ok_or_else(|| anyhow::anyhow!("Task not found: {}", id))?;

    output.verbose_ctx("task", &format!("Detached {} successor(s)", detached.len()));

    if output.is_json() {
        output.data(&serde_json::json!({
            "removed": id.to_string(),
            "detached": detached.iter().map(|d| d.to_string()).collect::<Vec<_>>(),
        }));
    } else {
        output.success(&format!("Removed task: {}", id));
        for succ in &detached {
            println!("  {} no longer has a predecessor", succ);
        }
    }

    Ok(())
}

fn link_task(output: &Output, task_str: &str, predecessor_str: &str, lag: i64) -> Result<()> {
    let project = Project::open_current()?;
    let store = project.task_store();

    let task_id: TaskId = task_str.parse()?;
    let predecessor_id: TaskId = predecessor_str.parse()?;

    let tasks = store.list()?;

    // Check for self-links, unknown tasks and cycles using the graph
    let mut graph = DependencyGraph::from_tasks(&tasks);
    graph.link(&task_id, &predecessor_id, lag)?;

    let mut task = tasks
        .into_iter()
        .find(|t| t.id == task_id)
        .ok_or_else(|| anyhow::anyhow!("Task not found: {}", task_id))?;
    task.set_predecessor(predecessor_id.clone(), lag);
    store.update(&task)?;

    if output.is_json() {
        output.data(&serde_json::json!({
            "task": task_id.to_string(),
            "predecessor": predecessor_id.to_string(),
            "lag": lag,
        }));
    } else {
        output.success(&format!("{} now starts after {}", task_id, predecessor_id));
    }

    Ok(())
}

fn unlink_task(output: &Output, task_str: &str) -> Result<()> {
    let project = Project::open_current()?;
    let store = project.task_store();

    let task_id: TaskId = task_str.parse()?;
    let mut task = store
        .get(&task_id)?
        .ok_or_else(|| anyhow::anyhow!("Task not found: {}", task_id))?;

    let previous = task.predecessor.id().cloned();
    if task.clear_predecessor() {
        store.update(&task)?;
    }

    if output.is_json() {
        output.data(&serde_json::json!({
            "task": task_id.to_string(),
            "removed_predecessor": previous.map(|p| p.to_string()),
        }));
    } else if let Some(previous) = previous {
        output.success(&format!("{} no longer waits for {}", task_id, previous));
    } else {
        output.success(&format!("{} had no predecessor", task_id));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn parses_bare_date_as_utc_midnight() {
        assert_eq!(
            parse_instant("2025-01-06").unwrap(),
            Utc.with_ymd_and_hms(2025, 1, 6, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn parses_date_and_time() {
        assert_eq!(
            parse_instant("2025-01-06T18:00").unwrap(),
            Utc.with_ymd_and_hms(2025, 1, 6, 18, 0, 0).unwrap()
        );
    }

    #[test]
    fn parses_rfc3339_with_offset() {
        assert_eq!(
            parse_instant("2025-01-06T02:00:00+02:00").unwrap(),
            Utc.with_ymd_and_hms(2025, 1, 6, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn rejects_garbage_dates() {
        let err = parse_instant("next tuesday").unwrap_err();
        assert!(err.to_string().contains("Invalid date"));
    }

    #[test]
    fn predecessor_description_includes_lag() {
        let start = Utc.with_ymd_and_hms(2025, 1, 6, 0, 0, 0).unwrap();
        let task = Task::new("t-2".parse().unwrap(), "B", start, start)
            .after("t-1".parse().unwrap(), 2);

        assert_eq!(describe_predecessor(&task, TimeUnit::Day), "t-1 +2d");
        assert_eq!(describe_predecessor(&task, TimeUnit::QuarterDay), "t-1 +2q");
    }
}
