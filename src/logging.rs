// src/logging.rs

//! Logging setup for `wrapngo` using `tracing` + `tracing-subscriber`.
//!
//! Priority for determining the log level:
//! 1. `--log-level` CLI flag (if provided)
//! 2. `WRAPNGO_LOG` environment variable (e.g. "info", "debug")
//! 3. `Debug = true` in `[GeneralSettings]`
//! 4. default to `info`
//!
//! The subscriber is installed before the configuration is read, so the
//! level sits behind a reload layer and [`LoggingHandle::apply_debug_setting`]
//! raises it once `[GeneralSettings]` is known.
//!
//! Logs are sent to STDERR. Captured process output is routed through an
//! [`OutputSink`], which by default emits one tracing event per line on a
//! dedicated target so the subscriber serialises concurrent writers.

use std::fmt;

use anyhow::{Context, Result};
use tracing::{debug, info};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt as subscriber_fmt, reload, Registry};

use crate::cli::LogLevel;

/// Environment variable consulted when no `--log-level` flag is given.
pub const LOG_ENV: &str = "WRAPNGO_LOG";

/// Handle to the installed subscriber's level.
#[derive(Debug, Clone)]
pub struct LoggingHandle {
    /// Level came from the CLI or the environment and must not change.
    explicit: bool,
    level: reload::Handle<LevelFilter, Registry>,
}

impl LoggingHandle {
    /// Switch to `debug` when `Debug = true` and nothing more specific was
    /// requested.
    pub fn apply_debug_setting(&self, debug_setting: bool) -> Result<()> {
        if self.explicit || !debug_setting {
            return Ok(());
        }
        self.level
            .modify(|filter| *filter = LevelFilter::DEBUG)
            .context("raising log level to debug")?;
        debug!("debug logging enabled by [GeneralSettings]");
        Ok(())
    }
}

/// Initialise global logging subscriber.
///
/// Safe to call once at startup.
pub fn init_logging(cli_level: Option<LogLevel>) -> Result<LoggingHandle> {
    let explicit = cli_level
        .map(level_from_log_level)
        .or_else(|| std::env::var(LOG_ENV).ok().and_then(|s| parse_level_str(&s)));
    let level = explicit.unwrap_or(tracing::Level::INFO);

    let (filter, handle) = reload::Layer::new(LevelFilter::from_level(level));
    tracing_subscriber::registry()
        .with(filter)
        .with(
            subscriber_fmt::layer()
                .with_target(true)
                .with_thread_ids(false)
                .with_thread_names(false)
                .with_writer(std::io::stderr),
        )
        .try_init()
        .context("installing tracing subscriber")?;

    Ok(LoggingHandle {
        explicit: explicit.is_some(),
        level: handle,
    })
}

fn level_from_log_level(lvl: LogLevel) -> tracing::Level {
    match lvl {
        LogLevel::Error => tracing::Level::ERROR,
        LogLevel::Warn => tracing::Level::WARN,
        LogLevel::Info => tracing::Level::INFO,
        LogLevel::Debug => tracing::Level::DEBUG,
        LogLevel::Trace => tracing::Level::TRACE,
    }
}

pub fn parse_level_str(s: &str) -> Option<tracing::Level> {
    match s.trim().to_lowercase().as_str() {
        "error" => Some(tracing::Level::ERROR),
        "warn" | "warning" => Some(tracing::Level::WARN),
        "info" => Some(tracing::Level::INFO),
        "debug" => Some(tracing::Level::DEBUG),
        "trace" => Some(tracing::Level::TRACE),
        _ => None,
    }
}

/// Which of the two captured output streams a line belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutputStream {
    /// Stdout of a pre- or post-operation with `CaptureStdOut = true`.
    Operation,
    /// Stdout of the job.
    Job,
}

impl fmt::Display for OutputStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputStream::Operation => f.write_str("operation"),
            OutputStream::Job => f.write_str("job"),
        }
    }
}

/// Destination for captured process output.
///
/// Implementations are shared between concurrently running processes and
/// must keep whole lines intact.
pub trait OutputSink: Send + Sync + fmt::Debug {
    /// `origin` identifies the writer, e.g. `"backup: PreOperation #1"`.
    fn write_line(&self, stream: OutputStream, origin: &str, line: &str);
}

/// Default sink: one `info!` event per line.
#[derive(Debug, Clone, Default)]
pub struct TracingSink;

impl OutputSink for TracingSink {
    fn write_line(&self, stream: OutputStream, origin: &str, line: &str) {
        match stream {
            OutputStream::Operation => {
                info!(target: "wrapngo::output::operation", origin = %origin, "{}", line)
            }
            OutputStream::Job => info!(target: "wrapngo::output::job", origin = %origin, "{}", line),
        }
    }
}
