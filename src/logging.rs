use color_eyre::{eyre::eyre, Result};
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

pub const LOG_ENV: &str = "CINEVERSE_LOG";

/// Send tracing output to a daily log file under `log_dir`.
///
/// Stdout is left for command output. The returned guard flushes the
/// writer on drop and must be held until exit.
pub fn init(log_dir: &Path) -> Result<WorkerGuard> {
  std::fs::create_dir_all(log_dir)
    .map_err(|e| eyre!("Failed to create log directory {}: {}", log_dir.display(), e))?;

  let appender = tracing_appender::rolling::daily(log_dir, "cineverse.log");
  let (writer, guard) = tracing_appender::non_blocking(appender);

  let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("info"));

  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(writer)
    .with_ansi(false)
    .try_init()
    .map_err(|e| eyre!("Failed to initialize logging: {}", e))?;

  Ok(guard)
}
