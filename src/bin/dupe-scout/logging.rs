use dupe_scout::monitor::ACTIVITY_TARGET;
use std::env;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::filter::filter_fn;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

/// Keeps the non-blocking writers flushing until dropped.
pub struct LogGuards {
    _main: WorkerGuard,
    _activity: Option<WorkerGuard>,
}

/// Pretty stdout plus a plain log file per command, `./logs/dupe-scout-<command>.log`
/// unless `LOG_FILE_PATH` is set. With `mirror_activity` the monitor's activity
/// entries also go to their own file (`ACTIVITY_LOG_PATH`, default
/// `./logs/activity.log`).
pub fn init_logger(command: &str, mirror_activity: bool) -> LogGuards {
    let filter = env::var("TRACING_LEVEL").unwrap_or_else(|_| "info".to_string());
    let filter_layer = EnvFilter::new(filter);

    let log_file_path = env::var("LOG_FILE_PATH")
        .unwrap_or_else(|_| format!("./logs/dupe-scout-{}.log", command));
    let file_appender = tracing_appender::rolling::never("./", log_file_path);
    let (non_blocking, main_guard) = tracing_appender::non_blocking(file_appender);

    let (activity_layer, activity_guard) = if mirror_activity {
        let activity_path =
            env::var("ACTIVITY_LOG_PATH").unwrap_or_else(|_| "./logs/activity.log".to_string());
        let appender = tracing_appender::rolling::never("./", activity_path);
        let (writer, guard) = tracing_appender::non_blocking(appender);
        let layer = fmt::layer()
            .with_writer(writer)
            .with_ansi(false)
            .with_target(false)
            .with_filter(filter_fn(|metadata| metadata.target() == ACTIVITY_TARGET));
        (Some(layer), Some(guard))
    } else {
        (None, None)
    };

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::io::stdout)
                .pretty()
                .with_file(false)
                .without_time()
                .with_ansi(true),
        )
        .with(fmt::layer().with_writer(non_blocking).with_ansi(false))
        .with(activity_layer)
        .with(filter_layer)
        .init();

    info!(command, mirror_activity, "Logging to stdout and file");

    LogGuards {
        _main: main_guard,
        _activity: activity_guard,
    }
}
