//! Logging and tracing initialization
//!
//! Console layer for interactive runs plus a daily-rolling file layer in the
//! configured log directory. The same directory backs the /logs API routes.

use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::Rotation;
use tracing_subscriber::{
    fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter,
};

use crate::config::LogConfig;

/// Initialize structured logging; the returned guard must live for the
/// process lifetime or buffered log lines are lost
pub fn init(config: &LogConfig) -> anyhow::Result<WorkerGuard> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let appender = tracing_appender::rolling::Builder::new()
        .rotation(Rotation::DAILY)
        .filename_prefix(&config.prefix)
        .filename_suffix("log")
        .max_log_files(config.max_files)
        .build(&config.dir)?;

    let (file_writer, guard) = tracing_appender::non_blocking(appender);

    let console_layer = fmt::layer()
        .with_target(true)
        .compact();

    let file_layer = fmt::layer()
        .with_writer(file_writer)
        .with_target(true)
        .with_ansi(false);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .init();

    Ok(guard)
}
