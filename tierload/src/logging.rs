//! Logging setup for processes embedding the resolver.
//!
//! - Writes to `<log_dir>/tierload.log` (truncated at startup)
//! - Mirrors to stdout
//! - Filter from `RUST_LOG`, `info` when unset
//!
//! Job-level events are `debug`/`trace` with `order`, `stage`, `data_source`,
//! `key` and `elapsed_ms` fields, so `RUST_LOG=tierload=trace` shows every
//! tier transition and timing.

use std::fs;
use std::io;
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Guard that must be kept alive for the duration of logging.
///
/// Dropping this guard will flush and close the log file writer.
pub struct LoggingGuard {
    _file_guard: WorkerGuard,
}

/// Initialize the global subscriber with a file layer and a stdout layer.
///
/// # Errors
///
/// Returns an error if the log directory cannot be created, the log file
/// cannot be truncated, or a global subscriber is already installed.
pub fn init_logging(log_dir: &Path, log_file: &str) -> Result<LoggingGuard, io::Error> {
    fs::create_dir_all(log_dir)?;
    fs::write(log_dir.join(log_file), "")?;

    let file_appender = tracing_appender::rolling::never(log_dir, log_file);
    let (non_blocking_file, file_guard) = tracing_appender::non_blocking(file_appender);

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking_file)
        .with_ansi(false)
        .with_thread_names(true);

    let stdout_layer = tracing_subscriber::fmt::layer()
        .with_writer(io::stdout)
        .with_ansi(true)
        .compact();

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(stdout_layer)
        .try_init()
        .map_err(io::Error::other)?;

    Ok(LoggingGuard {
        _file_guard: file_guard,
    })
}

/// Get default log directory path.
pub fn default_log_dir() -> &'static str {
    "logs"
}

/// Get default log file name.
pub fn default_log_file() -> &'static str {
    "tierload.log"
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_paths() {
        assert_eq!(default_log_dir(), "logs");
        assert_eq!(default_log_file(), "tierload.log");
    }

    #[test]
    fn test_creates_directory_and_truncates_file() {
        let temp_dir = TempDir::new().unwrap();
        let log_dir = temp_dir.path().join("nested").join("logs");
        fs::create_dir_all(&log_dir).unwrap();
        fs::write(log_dir.join("tierload.log"), "previous session").unwrap();

        // A subscriber may already be installed by another test; the file
        // work happens before installation either way.
        let _guard = init_logging(&log_dir, "tierload.log");

        assert!(log_dir.exists());
        let content = fs::read_to_string(log_dir.join("tierload.log")).unwrap();
        assert!(!content.contains("previous session"));
    }
}
