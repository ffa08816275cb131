//! Rotating log system
//!
//! Logs to stderr and to rotating files in ./logs/. Stdout stays free for
//! command output.

use std::path::Path;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize console + daily rotating file logging
///
/// Falls back to console-only output when the log directory can't be created.
pub fn init_logging(log_dir: &str) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,parcel_map=debug,tower_http=debug"));

    let console_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true);

    if let Err(e) = std::fs::create_dir_all(Path::new(log_dir)) {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(console_layer)
            .init();
        tracing::warn!("Log directory {} unavailable ({}), logging to console only", log_dir, e);
        return;
    }

    // Rotates daily: parcel_map.log.YYYY-MM-DD
    let file_appender = RollingFileAppender::new(Rotation::DAILY, log_dir, "parcel_map.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    // Leaked: the writer must outlive every log call
    std::mem::forget(_guard);

    // File layer - no ANSI colors
    let file_layer = fmt::layer()
        .with_writer(non_blocking)
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .with_ansi(false);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .init();

    tracing::info!("Logging initialized. Log directory: {}", log_dir);
}
