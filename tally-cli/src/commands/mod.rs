//! CLI command implementations

pub mod detect;
pub mod import;
pub mod logs;
pub mod profile;
pub mod rules;

use std::path::PathBuf;

use anyhow::{Context, Result};
use tally_core::{EntryPoint, LogEvent, LoggingService, TallyContext};

/// Get the logging service for CLI operations
///
/// Returns None if logging fails to initialize (shouldn't block operations)
pub fn get_logger() -> Option<LoggingService> {
    let tally_dir = get_tally_dir().ok()?;
    LoggingService::new(&tally_dir, EntryPoint::Cli, env!("CARGO_PKG_VERSION")).ok()
}

/// Log an event, ignoring any errors (logging should never break the app)
pub fn log_event(logger: &Option<LoggingService>, event: LogEvent) {
    if let Some(l) = logger {
        if let Err(e) = l.log(event) {
            tracing::debug!(error = %e, "Failed to write log event");
        }
    }
}

/// Get the tally directory from TALLY_DIR or ~/.tally
pub fn get_tally_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var("TALLY_DIR") {
        return Ok(PathBuf::from(dir));
    }
    dirs::home_dir()
        .map(|home| home.join(".tally"))
        .context("Could not find home directory (set TALLY_DIR)")
}

/// Get or create the tally context
pub fn get_context() -> Result<TallyContext> {
    let tally_dir = get_tally_dir()?;
    std::fs::create_dir_all(&tally_dir)
        .with_context(|| format!("Failed to create tally directory: {:?}", tally_dir))?;
    Ok(TallyContext::new(&tally_dir))
}
