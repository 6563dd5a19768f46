//! Main CLI application structure

use anyhow::Result;
use clap::{Parser, Subcommand};

use super::output::{Output, OutputFormat};
use super::schedule::ScheduleArgs;
use super::{config_cmd, schedule, task};
use crate::domain::TimeUnit;
use crate::logging;
use crate::storage::{Config, Project};

#[derive(Parser)]
#[command(name = "ganttiek")]
#[command(author, version, about = "Dependency-aware task scheduling for Gantt-style plans")]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output format (defaults to the global config, then text)
    #[arg(long, short = 'f', global = true)]
    pub format: Option<OutputFormat>,

    /// Enable verbose output for debugging
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new ganttiek project
    Init {
        /// Path to initialize (defaults to current directory)
        #[arg(default_value = ".")]
        path: String,
    },

    /// Manage tasks
    #[command(subcommand)]
    Task(task::TaskCommands),

    /// Resolve dependencies and show the schedule
    Schedule {
        /// Unit for durations and lag (overrides config)
        #[arg(long, value_enum)]
        unit: Option<TimeUnit>,

        /// Round planned windows out to unit boundaries
        #[arg(long)]
        snap: bool,

        /// On a dependency cycle, show planned windows instead of failing
        #[arg(long)]
        fallback: bool,
    },

    /// Show a task's predecessor chain and successors
    Deps {
        /// Task ID
        id: String,
    },

    /// View or change project configuration
    #[command(subcommand)]
    Config(config_cmd::ConfigCommands),
}

/// Main entry point for the CLI
pub fn run() -> Result<()> {
    let cli = Cli::parse();
    logging::init_logging(cli.verbose)?;

    let format = match cli.format {
        Some(format) => format,
        None => Config::load_global()?.default_format,
    };
    let output = Output::new(format, cli.verbose);

    output.verbose("Ganttiek starting");

    match cli.command {
        Commands::Init { path } => {
            output.verbose_ctx("init", &format!("Initializing project at: {}", path));
            let project = Project::init(&path)?;
            output.verbose_ctx("init", &format!("Created .ganttiek directory at: {}", project.data_dir().display()));
            output.success(&format!("Initialized ganttiek project at {}", project.root().display()));
        }

        Commands::Task(cmd) => task::run(cmd, &output)?,

        Commands::Schedule { unit, snap, fallback } => {
            output.verbose_ctx("schedule", &format!("Overrides: unit={:?} snap={} fallback={}", unit, snap, fallback));
            schedule::schedule(&output, ScheduleArgs { unit, snap, fallback })?
        }

        Commands::Deps { id } => schedule::deps(&output, &id)?,

        Commands::Config(cmd) => config_cmd::run(cmd, &output)?,
    }

    Ok(())
}
