pub mod config;
pub mod middleware;
pub mod paths;

use std::time::Duration;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

pub use config::LogConfig;
pub use middleware::{access_log_middleware, request_id_middleware, RequestId, SlowRequestThreshold};

use crate::audio::spawn_sweeper;

/// How often rolled log files are checked against retention
const LOG_SWEEP_INTERVAL: Duration = Duration::from_secs(3600);

/// Keeps the non-blocking log writers alive; dropping it flushes and closes
/// the log files.
pub struct LoggingGuard {
    _guards: Vec<WorkerGuard>,
}

/// Initialize console logging plus JSON access and application logs
///
/// This sets up:
/// - Console logging filtered by `RUST_LOG`
/// - Access log file (JSON format) for HTTP request tracking
/// - Application log file (JSON format) for server events
/// - Daily rotation, with a background sweep enforcing retention
///
/// Must be called from within a Tokio runtime when cleanup is enabled.
pub fn init_logging(config: &LogConfig) -> Result<LoggingGuard, Box<dyn std::error::Error>> {
    let console_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .compact()
        .with_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.console_log_level)),
        );

    if !config.file_logging_enabled {
        tracing_subscriber::registry().with(console_layer).try_init()?;
        tracing::info!("Logging initialized (console only)");
        return Ok(LoggingGuard { _guards: Vec::new() });
    }

    let log_dir = paths::get_log_directory(config.custom_log_dir.as_deref())?;

    let access_appender = tracing_appender::rolling::daily(&log_dir, "access.log");
    let app_appender = tracing_appender::rolling::daily(&log_dir, "application.log");

    let (access_writer, access_guard) = tracing_appender::non_blocking(access_appender);
    let (app_writer, app_guard) = tracing_appender::non_blocking(app_appender);

    // Only events with target "access_log"
    let access_layer = tracing_subscriber::fmt::layer()
        .json()
        .with_writer(access_writer)
        .with_filter(EnvFilter::new("off,access_log=info"));

    let app_layer = tracing_subscriber::fmt::layer()
        .json()
        .with_writer(app_writer)
        .with_filter(
            EnvFilter::new(&config.file_log_level).add_directive("access_log=off".parse()?),
        );

    tracing_subscriber::registry()
        .with(console_layer)
        .with(access_layer)
        .with(app_layer)
        .try_init()?;

    tracing::info!(log_dir = ?log_dir, "Logging initialized - access: access.log, application: application.log");

    if config.enable_cleanup {
        spawn_sweeper(log_dir, config.retention_policy(), LOG_SWEEP_INTERVAL);
        tracing::info!(
            "Log cleanup task started (retention: {} days, max size: {} MB)",
            config.retention_days,
            config.max_total_size_mb
        );
    }

    Ok(LoggingGuard {
        _guards: vec![access_guard, app_guard],
    })
}

/// Log platform-specific information on startup
pub fn log_platform_info() {
    tracing::info!(
        platform = std::env::consts::OS,
        architecture = std::env::consts::ARCH,
        version = env!("CARGO_PKG_VERSION"),
        "Server starting on platform"
    );
}
