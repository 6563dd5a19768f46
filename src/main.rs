//! Ganttiek CLI - dependency-aware task scheduling

use std::process::ExitCode;

fn main() -> ExitCode {
    if let Err(e) = ganttiek::cli::run() {
        eprintln!("Error: {:#}", e);
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
