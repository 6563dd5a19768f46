//! # Command-Line Interface
//!
//! User-facing CLI commands and output formatting.
//!
//! ## Command Groups
//!
//! | Group | Purpose | Examples |
//! |-------|---------|----------|
//! | Core | Project setup | `init`, `config show`, `config set` |
//! | Task | Planned windows and links | `task add`, `task link`, `task unlink` |
//! | Schedule | Dependency resolution | `schedule`, `schedule --fallback`, `deps` |
//!
//! ## Output Formats
//!
//! All commands support `--format` flag:
//! - `text` (default) - Human-readable output
//! - `json` - Machine-parseable JSON
//!
//! ## Verbose Mode
//!
//! Use `--verbose` (or `-v`) for debug output and scheduler diagnostics:
//! ```bash
//! ganttiek --verbose schedule
//! ```
//!
//! ## Entry Point
//!
//! Call [`run()`] to parse arguments and execute the appropriate command.

mod app;
mod output;
mod task;
mod schedule;
mod config_cmd;

pub use app::{Cli, Commands, run};
pub use output::{Output, OutputFormat};
