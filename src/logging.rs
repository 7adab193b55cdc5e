//! Tracing subscriber setup.

use std::path::Path;

use color_eyre::{eyre::eyre, Result};
use tracing::level_filters::LevelFilter;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use crate::config::LoggingConfig;

/// Install the global subscriber.
///
/// `RUST_LOG` overrides the configured level. Output goes to stderr unless a
/// log file is configured; in that case the returned guard must be held until
/// exit so buffered lines get flushed.
pub fn init(config: &LoggingConfig) -> Result<Option<WorkerGuard>> {
  let level: LevelFilter = config
    .level
    .parse()
    .map_err(|_| eyre!("invalid log level '{}'", config.level))?;
  let filter = EnvFilter::builder()
    .with_default_directive(level.into())
    .from_env_lossy();

  match &config.file {
    Some(path) => {
      let (dir, name) = split_path(path)?;
      let appender = tracing_appender::rolling::never(dir, name);
      let (writer, guard) = tracing_appender::non_blocking(appender);
      tracing_subscriber::registry()
        .with(filter)
        .with(
          tracing_subscriber::fmt::layer()
            .with_writer(writer)
            .with_ansi(false)
            .with_target(true),
        )
        .try_init()?;
      Ok(Some(guard))
    }
    None => {
      tracing_subscriber::registry()
        .with(filter)
        .with(
          tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false),
        )
        .try_init()?;
      Ok(None)
    }
  }
}

fn split_path(path: &Path) -> Result<(&Path, &std::ffi::OsStr)> {
  let name = path
    .file_name()
    .ok_or_else(|| eyre!("log file path has no file name: {}", path.display()))?;
  let dir = path
    .parent()
    .filter(|p| !p.as_os_str().is_empty())
    .unwrap_or_else(|| Path::new("."));
  Ok((dir, name))
}
