//! File logging. The terminal belongs to the UI, so everything goes to a
//! daily rotating file under the configured log directory.

use crate::config::LogConfig;
use color_eyre::{eyre::eyre, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const LOG_FILE_PREFIX: &str = "p9s.log";

/// Install the global subscriber.
///
/// `RUST_LOG` takes precedence over `log.level`. The returned guard flushes
/// the writer on drop and must be held until exit.
pub fn init(config: &LogConfig) -> Result<WorkerGuard> {
  let dir = config.dir();
  std::fs::create_dir_all(&dir)
    .map_err(|e| eyre!("Failed to create log directory {}: {}", dir.display(), e))?;

  let appender = RollingFileAppender::new(Rotation::DAILY, &dir, LOG_FILE_PREFIX);
  let (writer, guard) = tracing_appender::non_blocking(appender);

  let env_filter =
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

  tracing_subscriber::registry()
    .with(env_filter)
    .with(
      fmt::layer()
        .with_writer(writer)
        .with_ansi(false)
        .with_target(true),
    )
    .try_init()
    .map_err(|e| eyre!("Failed to initialize logging: {}", e))?;

  tracing::info!(dir = %dir.display(), "logging initialized");
  Ok(guard)
}
