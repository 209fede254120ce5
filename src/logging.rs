//! Tracing setup for the binary.
//!
//! Events go to stderr and to `azan.log` in the log directory. `RUST_LOG`
//! overrides the configured level.

use std::fs;
use std::io;
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

pub const LOG_FILE_NAME: &str = "azan.log";

pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Keeps the file writer alive. Dropping it flushes the log file.
pub struct LoggingGuard {
  _file_guard: WorkerGuard,
}

/// `RUST_LOG` when set and valid, else `default_level`, else `info`
pub fn build_filter(default_level: &str) -> EnvFilter {
  EnvFilter::try_from_default_env()
    .or_else(|_| EnvFilter::try_new(default_level))
    .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_LEVEL))
}

/// Install the global subscriber.
///
/// The log file is appended to across runs so a long-running daemon and
/// one-shot commands share one history.
pub fn init_logging(log_dir: &Path, level: &str) -> Result<LoggingGuard, io::Error> {
  fs::create_dir_all(log_dir)?;

  let file_appender = tracing_appender::rolling::never(log_dir, LOG_FILE_NAME);
  let (non_blocking_file, file_guard) = tracing_appender::non_blocking(file_appender);

  let file_layer = tracing_subscriber::fmt::layer()
    .with_writer(non_blocking_file)
    .with_ansi(false);

  let stderr_layer = tracing_subscriber::fmt::layer()
    .with_writer(io::stderr)
    .with_target(false);

  tracing_subscriber::registry()
    .with(build_filter(level))
    .with(file_layer)
    .with(stderr_layer)
    .try_init()
    .map_err(io::Error::other)?;

  Ok(LoggingGuard {
    _file_guard: file_guard,
  })
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_invalid_level_falls_back() {
    // Only meaningful when RUST_LOG is unset; either way it must not panic
    let filter = build_filter("not a [valid directive");
    assert!(!filter.to_string().is_empty());
  }

  #[test]
  fn test_configured_level_is_used() {
    if std::env::var_os("RUST_LOG").is_some() {
      return;
    }
    assert_eq!(build_filter("debug").to_string(), "debug");
  }
}
