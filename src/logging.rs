//! Logging setup using `tracing` + `tracing-subscriber`.
//!
//! Priority for determining the log level:
//! 1. `--verbose` (debug)
//! 2. `GANTTIEK_LOG` environment variable (e.g. "info", "trace")
//! 3. default to `warn`
//!
//! Logs go to STDERR so stdout stays parseable in `--format json` mode.

use anyhow::Result;
use tracing_subscriber::fmt;

/// Initialise the global logging subscriber.
///
/// Safe to call more than once; later calls are ignored.
pub fn init_logging(verbose: bool) -> Result<()> {
    let level = if verbose {
        tracing::Level::DEBUG
    } else {
        std::env::var("GANTTIEK_LOG")
            .ok()
            .and_then(|s| parse_level_str(&s))
            .unwrap_or(tracing::Level::WARN)
    };

    // An already-installed subscriber (e.g. in tests) is not an error
    let _ = fmt()
        .with_max_level(level)
        .with_target(true)
        .with_writer(std::io::stderr)
        .try_init();

    Ok(())
}

fn parse_level_str(s: &str) -> Option<tracing::Level> {
    match s.trim().to_lowercase().as_str() {
        "error" => Some(tracing::Level::ERROR),
        "warn" | "warning" => Some(tracing::Level::WARN),
        "info" => Some(tracing::Level::INFO),
        "debug" => Some(tracing::Level::DEBUG),
        "trace" => Some(tracing::Level::TRACE),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_levels() {
        assert_eq!(parse_level_str("debug"), Some(tracing::Level::DEBUG));
        assert_eq!(parse_level_str(" WARNING "), Some(tracing::Level::WARN));
        assert_eq!(parse_level_str("loud"), None);
    }

    #[test]
    fn repeated_init_is_harmless() {
        init_logging(false).unwrap();
        init_logging(true).unwrap();
    }
}
