use anyhow::Result;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use crate::config::LoggingConfig;

/// Flushes the background log file writer when dropped; hold it until shutdown.
pub struct LogGuard {
    _file: Option<WorkerGuard>,
}

pub fn init_logger(config: &LoggingConfig) -> Result<LogGuard> {
    // RUST_LOG overrides the configured directive
    let directive = std::env::var("RUST_LOG").unwrap_or_else(|_| config.level.clone());
    let filter = EnvFilter::try_new(&directive)?;
    let json = config.format.eq_ignore_ascii_case("json");

    let stdout_layer = if json {
        fmt::layer()
            .json()
            .with_writer(std::io::stdout)
            .with_target(true)
            .with_thread_ids(true)
            .boxed()
    } else {
        fmt::layer()
            .pretty()
            .with_writer(std::io::stdout)
            .with_target(true)
            .with_thread_ids(false)
            .boxed()
    };

    // <directory>/context.<date>.log; an empty directory turns file output off
    let (file_layer, guard) = if config.directory.trim().is_empty() {
        (None, None)
    } else {
        let appender = RollingFileAppender::builder()
            .rotation(Rotation::DAILY)
            .filename_prefix("context")
            .filename_suffix("log")
            .build(&config.directory)?;
        let (writer, guard) = tracing_appender::non_blocking(appender);

        let layer = if json {
            fmt::layer()
                .json()
                .with_writer(writer)
                .with_target(true)
                .with_thread_ids(true)
                .boxed()
        } else {
            fmt::layer()
                .with_writer(writer)
                .with_target(true)
                .with_ansi(false)
                .boxed()
        };
        (Some(layer), Some(guard))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stdout_layer)
        .with(file_layer)
        .try_init()?;

    Ok(LogGuard { _file: guard })
}
