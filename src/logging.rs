//! Tracing setup for the binary.
//!
//! The dashboard owns the terminal, so it logs to a daily rolling file under
//! the data dir. One-shot commands log to stderr.

use std::path::PathBuf;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use crate::error::{Error, Result};

/// Filter directives are read from this variable, `info` when unset.
pub const LOG_ENV: &str = "SKYINTEL_LOG";

fn filter() -> EnvFilter {
  EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Directory holding the dashboard's log files.
pub fn log_dir() -> Result<PathBuf> {
  let data_dir =
    dirs::data_dir().ok_or_else(|| Error::Config("Could not determine data directory".into()))?;
  Ok(data_dir.join("skyintel").join("logs"))
}

/// Log to `<data dir>/skyintel/logs/skyintel.log.<date>`.
///
/// Keep the returned guard alive for the life of the program; dropping it
/// flushes and stops the writer thread.
pub fn init_file() -> Result<WorkerGuard> {
  let dir = log_dir()?;
  std::fs::create_dir_all(&dir).map_err(|e| {
    Error::Config(format!(
      "Failed to create log directory {}: {}",
      dir.display(),
      e
    ))
  })?;

  let appender = tracing_appender::rolling::daily(&dir, "skyintel.log");
  let (writer, guard) = tracing_appender::non_blocking(appender);
  let _ = tracing_subscriber::fmt()
    .with_env_filter(filter())
    .with_writer(writer)
    .with_ansi(false)
    .try_init();

  Ok(guard)
}

pub fn init_stderr() {
  let _ = tracing_subscriber::fmt()
    .with_env_filter(filter())
    .with_writer(std::io::stderr)
    .try_init();
}
