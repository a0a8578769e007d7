//! Logging setup.
//!
//! The host shows whatever the hook writes to stderr, so stderr carries only the
//! outcome message. Logs go to a daily rolling file under the storage root. With
//! debug enabled they are mirrored to stderr as well.

use fs_err as fs;
use lintgate_core::StorageConfig;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

const LOG_FILE_PREFIX: &str = "lintgate.log";

fn filter(debug: bool) -> EnvFilter {
    if debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    }
}

fn file_appender(storage: &StorageConfig) -> Option<RollingFileAppender> {
    let dir = storage.logs_dir();
    fs::create_dir_all(&dir).ok()?;
    RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(LOG_FILE_PREFIX)
        .build(&dir)
        .ok()
}

/// Installs the global subscriber. Keep the guard alive until exit so buffered
/// lines are flushed.
pub fn init(storage: &StorageConfig, debug: bool) -> Option<WorkerGuard> {
    let (file_layer, guard) = match file_appender(storage) {
        Some(appender) => {
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer().with_writer(writer).with_ansi(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    let stderr_layer = debug.then(|| {
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false)
    });

    // A subscriber may already be set (tests); logging is best effort.
    let _ = tracing_subscriber::registry()
        .with(filter(debug))
        .with(file_layer)
        .with(stderr_layer)
        .try_init();

    guard
}
