//! Project management
//!
//! Handles project initialization and provides access to stores.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use thiserror::Error;

use super::{Config, TaskStore};

#[derive(Debug, Error)]
pub enum ProjectError {
    #[error("Not in a ganttiek project. Run 'ganttiek init' first.")]
    NotInProject,
}

/// A Ganttiek project
pub struct Project {
    root: PathBuf,
    config: Config,
}

impl Project {
    /// Opens an existing project at the given path
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        let data_dir = root.join(".ganttiek");

        if !data_dir.is_dir() {
            return Err(ProjectError::NotInProject.into());
        }

        let config = Config::for_project(&root)?;

        Ok(Self { root, config })
    }

    /// Opens the project at the current directory or a parent
    pub fn open_current() -> Result<Self> {
        let root = Config::find_project_root().ok_or(ProjectError::NotInProject)?;

        Self::open(root)
    }

    /// Initializes a new project at the given path
    pub fn init(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        let data_dir = root.join(".ganttiek");

        // Create directory structure
        fs::create_dir_all(&data_dir).with_context(|| {
            format!("Failed to create .ganttiek directory: {}", data_dir.display())
        })?;

        // Create default config
        let config_path = data_dir.join("config.toml");
        if !config_path.exists() {
            let default_config = r#"# Ganttiek configuration

[schedule]
# Unit for durations and lag: "day" or "quarter_day"
unit = "day"

# Round planned windows out to unit boundaries before scheduling
snap = false

# On a dependency cycle: "fail" or "planned" (show planned windows)
on_cycle = "fail"
"#;
            fs::write(&config_path, default_config)
                .with_context(|| format!("Failed to write config: {}", config_path.display()))?;
        }

        // Create .gitignore for .ganttiek
        let gitignore_path = data_dir.join(".gitignore");
        if !gitignore_path.exists() {
            let gitignore = r#"# Ignore interrupted writes
*.tmp
"#;
            fs::write(&gitignore_path, gitignore).with_context(|| {
                format!("Failed to write .gitignore: {}", gitignore_path.display())
            })?;
        }

        Self::open(root)
    }

    /// Returns the project root path
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns the .ganttiek directory path
    pub fn data_dir(&self) -> PathBuf {
        self.root.join(".ganttiek")
    }

    /// Returns the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Returns a mutable reference to the configuration
    pub fn config_mut(&mut self) -> &mut Config {
        &mut self.config
    }

    /// Returns the task store
    pub fn task_store(&self) -> TaskStore {
        TaskStore::for_project(&self.root)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::TimeUnit;
    use tempfile::TempDir;

    #[test]
    fn init_creates_structure() {
        let dir = TempDir::new().unwrap();
        let project = Project::init(dir.path()).unwrap();

        assert!(project.data_dir().is_dir());
        assert!(project.data_dir().join("config.toml").is_file());
        assert!(project.data_dir().join(".gitignore").is_file());
    }

    #[test]
    fn init_is_idempotent() {
        let dir = TempDir::new().unwrap();

        Project::init(dir.path()).unwrap();
        Project::init(dir.path()).unwrap(); // Should not fail

        assert!(dir.path().join(".ganttiek").is_dir());
    }

    #[test]
    fn default_config_parses() {
        let dir = TempDir::new().unwrap();
        let project = Project::init(dir.path()).unwrap();

        assert_eq!(project.config().project.schedule.unit, TimeUnit::Day);
        assert_eq!(project.config().project.schedule.options().unit, TimeUnit::Day);
    }

    #[test]
    fn open_existing_project() {
        let dir = TempDir::new().unwrap();
        Project::init(dir.path()).unwrap();

        let project = Project::open(dir.path()).unwrap();
        assert_eq!(project.root(), dir.path());
    }

    #[test]
    fn open_non_project_fails() {
        let dir = TempDir::new().unwrap();
        let result = Project::open(dir.path());

        assert!(result.is_err());
    }

    #[test]
    fn task_store_lives_in_data_dir() {
        let dir = TempDir::new().unwrap();
        let project = Project::init(dir.path()).unwrap();

        let store = project.task_store();
        assert!(store.path().ends_with(".ganttiek/tasks.jsonl"));
    }
}
