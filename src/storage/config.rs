//! Configuration handling for Ganttiek
//!
//! Configuration is stored in `.ganttiek/config.toml` (project) and
//! `~/.config/ganttiek/config.toml` (global).

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::ValueEnum;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{ScheduleOptions, TimeUnit};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Failed to parse configuration: {0}")]
    Parse(String),
}

/// What the host shows when the plan contains a predecessor cycle
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum CyclePolicy {
    /// Report the cycle and fail
    #[default]
    Fail,
    /// Show every task at its own planned window
    Planned,
}

impl CyclePolicy {
    pub fn as_str(&self) -> &str {
        match self {
            CyclePolicy::Fail => "fail",
            CyclePolicy::Planned => "planned",
        }
    }
}

/// Scheduling settings
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(default)]
pub struct ScheduleConfig {
    /// Unit for durations and lag
    pub unit: TimeUnit,

    /// Round planned windows out to unit boundaries before scheduling
    pub snap: bool,

    /// Behaviour when a cycle is found
    pub on_cycle: CyclePolicy,
}

impl ScheduleConfig {
    /// Scheduler options derived from this configuration
    pub fn options(&self) -> ScheduleOptions {
        ScheduleOptions {
            unit: self.unit,
            snap: self.snap,
        }
    }
}

/// Project-level configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ProjectConfig {
    /// Scheduling settings
    pub schedule: ScheduleConfig,
}

/// Global user configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct GlobalConfig {
    /// Default output format (text or json)
    pub default_format: OutputFormat,
}

/// Output format for commands
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Combined configuration (global + project)
#[derive(Debug, Clone)]
pub struct Config {
    pub project: ProjectConfig,
    pub global: GlobalConfig,
    pub project_root: Option<PathBuf>,
}

impl Config {
    /// Loads configuration for a specific project
    pub fn for_project(project_root: &Path) -> Result<Self> {
        let global = Self::load_global()?;
        let project = Self::load_project_config(project_root)?;

        Ok(Self {
            project,
            global,
            project_root: Some(project_root.to_path_buf()),
        })
    }

    /// Returns the global config directory
    pub fn global_config_dir() -> Option<PathBuf> {
        ProjectDirs::from("dev", "ganttiek", "ganttiek").map(|dirs| dirs.config_dir().to_path_buf())
    }

    /// Loads global configuration
    pub fn load_global() -> Result<GlobalConfig> {
        let config_dir = match Self::global_config_dir() {
            Some(dir) => dir,
            None => return Ok(GlobalConfig::default()),
        };

        let config_path = config_dir.join("config.toml");
        if !config_path.exists() {
            return Ok(GlobalConfig::default());
        }

        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read global config: {}", config_path.display()))?;

        toml::from_str(&content)
            .map_err(|e| ConfigError::Parse(e.to_string()))
            .context("Failed to parse global config")
    }

    /// Loads project configuration from a specific root
    fn load_project_config(project_root: &Path) -> Result<ProjectConfig> {
        let config_path = project_root.join(".ganttiek").join("config.toml");

        if !config_path.exists() {
            return Ok(ProjectConfig::default());
        }

        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read project config: {}", config_path.display()))?;

        toml::from_str(&content)
            .map_err(|e| ConfigError::Parse(e.to_string()))
            .context("Failed to parse project config")
    }

    /// Finds the project root by looking for `.ganttiek/` directory
    pub fn find_project_root() -> Option<PathBuf> {
        let mut current = std::env::current_dir().ok()?;

        loop {
            if current.join(".ganttiek").is_dir() {
                return Some(current);
            }

            if !current.pop() {
                return None;
            }
        }
    }

    /// Returns the project root, or an error if not in a project
    pub fn require_project_root(&self) -> Result<&Path> {
        self.project_root
            .as_deref()
            .ok_or_else(|| anyhow::anyhow!("Not in a ganttiek project. Run 'ganttiek init' first."))
    }

    /// Saves the project configuration
    pub fn save_project(&self) -> Result<()> {
        let root = self.require_project_root()?;
        let config_path = root.join(".ganttiek").join("config.toml");

        let content =
            toml::to_string_pretty(&self.project).context("Failed to serialize project config")?;

        fs::write(&config_path, content)
            .with_context(|| format!("Failed to write project config: {}", config_path.display()))
    }

    /// Updates one `schedule.*` key from its string form
    pub fn set_schedule_value(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let schedule = &mut self.project.schedule;
        match key {
            "unit" => schedule.unit = parse_choice(key, value)?,
            "snap" => {
                schedule.snap = value.parse().map_err(|_| {
                    ConfigError::Invalid(format!("snap must be true or false, got '{}'", value))
                })?
            }
            "on_cycle" => schedule.on_cycle = parse_choice(key, value)?,
            other => {
                return Err(ConfigError::Invalid(format!(
                    "unknown key 'schedule.{}'",
                    other
                )))
            }
        }
        Ok(())
    }
}

/// Parses a value with the same rules as the matching command-line flag
fn parse_choice<T: ValueEnum>(key: &str, value: &str) -> Result<T, ConfigError> {
    T::from_str(value, true).map_err(|_| {
        let choices: Vec<_> = T::value_variants()
            .iter()
            .filter_map(|v| v.to_possible_value())
            .map(|v| v.get_name().to_string())
            .collect();
        ConfigError::Invalid(format!(
            "schedule.{} must be one of {}, got '{}'",
            key,
            choices.join(", "),
            value
        ))
    })
}
