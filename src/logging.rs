use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use time::macros::format_description;
use time::UtcOffset;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{self, fmt, prelude::*};

const LOG_RETENTION_DAYS: u64 = 7;

/// Log directory in the user-specific OS cache directory:
/// - Linux: ~/.cache/tapestry-tools/tapestry-language-server/
/// - macOS: ~/Library/Caches/tapestry-tools/tapestry-language-server/
/// - Windows: %LOCALAPPDATA%\tapestry-tools\tapestry-language-server\
fn log_dir() -> io::Result<PathBuf> {
    let cache_dir = dirs::cache_dir().ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::NotFound,
            "Unable to determine user cache directory",
        )
    })?;

    let mut dir = cache_dir;
    dir.push("tapestry-tools");
    dir.push("tapestry-language-server");
    if !dir.exists() {
        fs::create_dir_all(&dir)?;
    }
    Ok(dir)
}

/// Removes session logs older than `LOG_RETENTION_DAYS`.
fn cleanup_old_logs(dir: &Path) {
    let now = std::time::SystemTime::now();
    let retention = std::time::Duration::from_secs(LOG_RETENTION_DAYS * 24 * 60 * 60);

    let Ok(entries) = fs::read_dir(dir) else {
        return;
    };
    for entry in entries.flatten() {
        let Ok(metadata) = entry.metadata() else {
            continue;
        };
        if !metadata.is_file() {
            continue;
        }
        let name = entry.file_name();
        let Some(name) = name.to_str() else {
            continue;
        };
        if !(name.starts_with("session-") && name.ends_with(".log")) {
            continue;
        }
        let expired = metadata
            .modified()
            .ok()
            .and_then(|modified| now.duration_since(modified).ok())
            .is_some_and(|age| age > retention);
        if expired {
            if let Err(err) = fs::remove_file(entry.path()) {
                eprintln!("Failed to remove old log file {:?}: {}", entry.path(), err);
            }
        }
    }
}

/// Initializes tracing with a stderr layer and, unless disabled, a per-session
/// debug-level file layer in the cache directory. The returned guard must be
/// kept alive for the duration of the process.
///
/// Stderr honors `log_level` when given, falling back to `RUST_LOG` and then
/// to `info`; the session file always logs at debug.
pub fn init_logger(
    no_color: bool,
    log_level: Option<&str>,
    enable_file_logging: bool,
) -> io::Result<WorkerGuard> {
    let timer = fmt::time::OffsetTime::new(
        UtcOffset::UTC,
        format_description!(
            "[[[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond digits:3]Z]"
        ),
    );

    let stderr_filter = match log_level {
        Some(level) => tracing_subscriber::EnvFilter::new(level),
        None => tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
    };

    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_timer(timer.clone())
        .with_ansi(!no_color)
        .with_filter(stderr_filter);

    if enable_file_logging {
        let dir = log_dir()?;
        cleanup_old_logs(&dir);

        let timestamp = time::OffsetDateTime::now_utc()
            .format(&time::format_description::parse(
                "[year][month][day]-[hour][minute][second]",
            ).map_err(|e| io::Error::new(io::ErrorKind::Other, e))?)
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;
        let log_path = dir.join(format!("session-{}-{}.log", timestamp, std::process::id()));

        let file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_path)?;
        let (non_blocking, guard) = tracing_appender::non_blocking(file);
        let file_layer = fmt::layer()
            .with_writer(non_blocking)
            .with_timer(timer)
            .with_ansi(false)
            .with_filter(tracing_subscriber::EnvFilter::new("debug"));

        let result = tracing_subscriber::registry()
            .with(stderr_layer)
            .with(file_layer)
            .try_init();
        match result {
            Ok(()) => {
                eprintln!("Logging to file: {:?}", log_path);
                Ok(guard)
            }
            // A subscriber installed earlier (tests) is not an error.
            Err(e) if e.to_string().contains("already been set") => Ok(guard),
            Err(e) => Err(io::Error::new(io::ErrorKind::Other, e)),
        }
    } else {
        let (_, guard) = tracing_appender::non_blocking(std::io::sink());
        let result = tracing_subscriber::registry().with(stderr_layer).try_init();
        match result {
            Ok(()) => Ok(guard),
            Err(e) if e.to_string().contains("already been set") => Ok(guard),
            Err(e) => Err(io::Error::new(io::ErrorKind::Other, e)),
        }
    }
}
