use color_eyre::{eyre::eyre, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use crate::config::{Config, LogConfig};

/// Where log lines go
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogTarget {
  /// Daily-rotated file in the data directory (the TUI owns the terminal)
  File,
  Stderr,
}

/// Install the global subscriber.
///
/// `RUST_LOG` wins over the configured level. The returned guard flushes the
/// file writer on drop and must be held until exit.
pub fn init(config: &LogConfig, target: LogTarget) -> Result<Option<WorkerGuard>> {
  let filter = EnvFilter::try_from_default_env()
    .or_else(|_| EnvFilter::try_new(&config.level))
    .map_err(|e| eyre!("Invalid log level {:?}: {}", config.level, e))?;

  match target {
    LogTarget::Stderr => {
      tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
      Ok(None)
    }
    LogTarget::File => {
      let dir = Config::log_dir()?;
      std::fs::create_dir_all(&dir)
        .map_err(|e| eyre!("Failed to create log directory {}: {}", dir.display(), e))?;

      let appender = tracing_appender::rolling::daily(&dir, "issuedeck.log");
      let (writer, guard) = tracing_appender::non_blocking(appender);
      tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(false)
        .init();
      Ok(Some(guard))
    }
  }
}
