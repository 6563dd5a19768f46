//! Config CLI commands

use anyhow::Result;
use clap::Subcommand;

use super::output::Output;
use crate::storage::Project;

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Show the effective project configuration
    Show,

    /// Set a schedule option
    ///
    /// Keys: schedule.unit (day, quarter_day), schedule.snap (true, false),
    /// schedule.on_cycle (fail, planned)
    Set {
        /// Option key, e.g. schedule.unit
        key: String,

        /// New value
        value: String,
    },
}

pub fn run(cmd: ConfigCommands, output: &Output) -> Result<()> {
    match cmd {
        ConfigCommands::Show => show(output),
        ConfigCommands::Set { key, value } => set(output, &key, &value),
    }
}

fn show(output: &Output) -> Result<()> {
    let project = Project::open_current()?;
    let schedule = &project.config().project.schedule;

    if output.is_json() {
        output.data(&project.config().project);
    } else {
        println!("Project: {}", project.root().display());
        println!("schedule.unit     = {}", schedule.unit.as_str());
        println!("schedule.snap     = {}", schedule.snap);
        println!("schedule.on_cycle = {}", schedule.on_cycle.as_str());
    }

    Ok(())
}

fn set(output: &Output, key: &str, value: &str) -> Result<()> {
    let mut project = Project::open_current()?;

    let name = key
        .strip_prefix("schedule.")
        .ok_or_else(|| anyhow::anyhow!("Unknown config key: {} (expected schedule.*)", key))?;

    let config = project.config_mut();
    config.set_schedule_value(name, value)?;
    config.save_project()?;

    output.verbose_ctx("config", &format!("Saved {} = {}", key, value));
    output.success(&format!("Set {} = {}", key, value));

    Ok(())
}
