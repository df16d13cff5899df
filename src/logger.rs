use std::env;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Initialize tracing with a stdout layer and, when `LOG_FILE` is set, a
/// second plain-text layer appending to that file.
///
/// The returned guard must be held for the lifetime of the process so the
/// file writer gets flushed.
pub fn init_logging() -> Option<WorkerGuard> {
    let level = env::var("LOG_LEVEL").unwrap_or_else(|_| "INFO".to_string());
    let level = level.to_lowercase();

    let filter = match env::var("RUST_LOG") {
        Ok(rust_log) => EnvFilter::new(rust_log),
        Err(_) => EnvFilter::new(level),
    };

    let (file_layer, guard) = match env::var("LOG_FILE") {
        Ok(path) => {
            let appender = tracing_appender::rolling::never(".", path);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_ansi(false)
                .with_writer(writer);
            (Some(layer), Some(guard))
        }
        Err(_) => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .with(file_layer)
        .init();

    guard
}
