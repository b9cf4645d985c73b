use std::env;

use tracing_appender::non_blocking::NonBlocking;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::{ConfigPaths, GeneralConfig, LogFormat};

/// Environment variable overriding the configured console log format.
pub const LOG_FORMAT_ENV: &str = "APP_STORAGE_LOG_FORMAT";

const DAYS_TO_KEEP: usize = 7;

/// Initialize tracing for the application
///
/// `RUST_LOG` takes precedence over the configured level. The console format
/// comes from `APP_STORAGE_LOG_FORMAT` when set, otherwise from the
/// configuration. Console output goes to stderr so command output on stdout
/// stays clean. With `log_to_file` enabled, logs are also written to a daily
/// rolling file in the log directory.
///
/// # Errors
/// Returns error if the log file cannot be created or a subscriber is already installed
pub fn init(config: &GeneralConfig) -> Result<(), Box<dyn std::error::Error>> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level.to_string()));

    let format = resolve_format(config.log_format, env::var(LOG_FORMAT_ENV).ok());
    let file_writer = if config.log_to_file {
        Some(file_writer()?)
    } else {
        None
    };

    let registry = tracing_subscriber::registry().with(env_filter);

    match format {
        LogFormat::Json => {
            registry
                .with(
                    fmt::layer()
                        .json()
                        .with_target(true)
                        .with_level(true)
                        .with_writer(std::io::stderr),
                )
                .with(file_writer.map(|writer| {
                    fmt::layer()
                        .json()
                        .with_target(true)
                        .with_level(true)
                        .with_writer(writer)
                        .with_ansi(false)
                }))
                .try_init()?;
        }
        LogFormat::Pretty => {
            registry
                .with(
                    fmt::layer()
                        .pretty()
                        .with_target(true)
                        .with_level(true)
                        .with_thread_ids(true)
                        .with_thread_names(true)
                        .with_writer(std::io::stderr),
                )
                .with(file_writer.map(|writer| {
                    fmt::layer()
                        .compact()
                        .with_target(true)
                        .with_level(true)
                        .with_writer(writer)
                        .with_ansi(false)
                }))
                .try_init()?;
        }
    }

    Ok(())
}

fn resolve_format(configured: LogFormat, env_value: Option<String>) -> LogFormat {
    env_value
        .and_then(|value| value.parse().ok())
        .unwrap_or(configured)
}

fn file_writer() -> Result<NonBlocking, Box<dyn std::error::Error>> {
    let log_dir = ConfigPaths::log_dir()?;

    let file_appender = tracing_appender::rolling::Builder::new()
        .rotation(tracing_appender::rolling::Rotation::DAILY)
        .max_log_files(DAYS_TO_KEEP)
        .filename_prefix("app-storage")
        .filename_suffix("log")
        .build(&log_dir)?;
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    // The writer thread must outlive every log call in the process.
    std::mem::forget(guard);

    Ok(non_blocking)
}
