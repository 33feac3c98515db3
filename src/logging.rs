#![forbid(unsafe_code)]

use anyhow::Context as _;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt as _, util::SubscriberInitExt as _};

use crate::config::{self, LogConfig};
use crate::error::TaskboardError;

pub const LOG_FILE: &str = "taskboard.log";

/// Routes tracing output to `<log.dir>/taskboard.log`. The terminal belongs to the TUI, so
/// nothing is written to stdout/stderr. `RUST_LOG` overrides `log.level`.
///
/// Keep the returned guard alive for the life of the process; dropping it flushes the writer.
pub fn init(cfg: &LogConfig) -> anyhow::Result<Option<WorkerGuard>> {
    if tracing::dispatcher::has_been_set() || cfg.level.trim() == "off" {
        return Ok(None);
    }

    let dir = config::expand_path(&cfg.dir)?;
    std::fs::create_dir_all(&dir).map_err(|source| TaskboardError::IoPath {
        path: dir.clone(),
        source,
    })?;

    let appender = tracing_appender::rolling::never(&dir, LOG_FILE);
    let (writer, guard) = tracing_appender::non_blocking(appender);

    let filter = match std::env::var("RUST_LOG") {
        Ok(v) if !v.trim().is_empty() => EnvFilter::try_new(v),
        _ => EnvFilter::try_new(cfg.level.trim()),
    }
    .context("invalid log filter")?;

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_writer(writer)
        .with_ansi(false)
        .with_target(false);

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init()
        .context("failed to install tracing subscriber")?;

    tracing::debug!(dir = %dir.display(), "logging initialised");
    Ok(Some(guard))
}
