use anyhow::{Context, Result};
use camino::Utf8PathBuf;
use std::fs;
use tracing_appender::rolling;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Directory the daily-rotated log files land in.
///
/// Prefers the XDG state directory, then the local data directory, then a
/// `logs/` directory next to the working directory.
pub fn default_log_dir() -> Utf8PathBuf {
    dirs::state_dir()
        .or_else(dirs::data_local_dir)
        .and_then(|p| Utf8PathBuf::from_path_buf(p).ok())
        .map(|p| p.join("wine-chroot/logs"))
        .unwrap_or_else(|| Utf8PathBuf::from("logs"))
}

/// Setup logging with a console layer and a daily-rotating file appender.
///
/// Console output is meant for humans (ANSI, no targets); the file keeps the
/// full detail. `RUST_LOG` overrides the level chosen by `verbose`.
///
/// # Returns
/// A guard that must be held for the duration of the program to keep the
/// file writer flushing.
pub fn setup_logging(verbose: bool) -> Result<tracing_appender::non_blocking::WorkerGuard> {
    let log_dir = default_log_dir();
    if !log_dir.as_std_path().exists() {
        fs::create_dir_all(&log_dir)
            .with_context(|| format!("Failed to create log directory: {log_dir}"))?;
    }

    let file_appender = rolling::daily(log_dir.as_std_path(), "wine-chroot");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new("info")
        }
    });

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking)
        .with_ansi(false) // No ANSI codes in log files
        .with_target(true)
        .with_file(true)
        .with_line_number(true);

    let console_layer = tracing_subscriber::fmt::layer()
        .with_ansi(true)
        .with_target(false)
        .without_time();

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(console_layer)
        .init();

    tracing::debug!("Logging initialized: dir={}, verbose={}", log_dir, verbose);

    Ok(guard)
}
