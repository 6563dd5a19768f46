//! # Storage Layer
//!
//! Persistence for Ganttiek projects with git-friendly file formats.
//!
//! ## Storage Formats
//!
//! | Data | Format | Location |
//! |------|--------|----------|
//! | Tasks | JSONL (one JSON per line) | `.ganttiek/tasks.jsonl` |
//! | Config | TOML | `.ganttiek/config.toml` |
//!
//! ## Concurrency Safety
//!
//! - [`TaskStore`] uses file locking (`fs2`) for concurrent access
//! - Full rewrites are atomic (temp file + rename)
//!
//! ## Key Types
//!
//! - [`Project`] - Entry point for accessing a Ganttiek project
//! - [`TaskStore`] - Read/write tasks as JSONL
//! - [`Config`] - Project and global configuration

mod jsonl;
mod config;
mod project;

pub use jsonl::TaskStore;
pub use config::{Config, ConfigError, CyclePolicy, GlobalConfig, OutputFormat, ProjectConfig, ScheduleConfig};
pub use project::{Project, ProjectError};
