//! Logging system with file output and log retention.
//!
//! Console and daily-rolling file output. File output is skipped when the
//! log directory cannot be created. `log` macros used throughout the
//! crate are bridged into `tracing`.

use std::fs;
use std::io;
use std::path::Path;

use chrono::Local;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Base name of the rolling log files.
pub const LOG_FILE_NAME: &str = "hdhr-gateway.log";

/// Initialize the logging system with console and, when possible, file output.
///
/// # Arguments
/// * `log_dir` - Directory where log files will be stored
/// * `retention_days` - Number of days to keep log files
/// * `verbose` - Whether to enable debug-level logging
/// * `level` - Default filter when neither `verbose` nor `RUST_LOG` is set
pub fn init_logging(
    log_dir: &Path,
    retention_days: u64,
    verbose: bool,
    level: Option<&str>,
) -> Result<(), Box<dyn std::error::Error>> {
    let file_writer = if prepare_log_dir(log_dir, retention_days) {
        let file_appender = tracing_appender::rolling::daily(log_dir, LOG_FILE_NAME);
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
        // Keep the writer alive for the program lifetime
        let _ = Box::leak(Box::new(guard));
        Some(non_blocking)
    } else {
        None
    };

    let default_level = if verbose { "debug" } else { level.unwrap_or("info") };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let subscriber = tracing_subscriber::registry()
        .with(env_filter)
        .with(
            fmt::layer()
                .with_writer(io::stdout)
                .with_target(true)
                .with_level(true)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false)
                .with_timer(LocalTimeTimer),
        )
        .with(file_writer.map(|writer| {
            fmt::layer()
                .with_writer(writer)
                .with_target(true)
                .with_level(true)
                .with_thread_ids(true)
                .with_file(true)
                .with_line_number(true)
                .with_ansi(false)
                .with_timer(LocalTimeTimer)
        }));

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| format!("Failed to set default subscriber: {}", e))?;

    tracing_log::LogTracer::init()
        .map_err(|e| format!("Failed to initialize LogTracer: {}", e))?;

    Ok(())
}

/// Create the log directory and prune stale files. Returns false when the
/// directory is unusable, in which case logging stays console-only.
fn prepare_log_dir(log_dir: &Path, retention_days: u64) -> bool {
    if let Err(e) = fs::create_dir_all(log_dir) {
        eprintln!(
            "Cannot create log directory {:?}: {}; logging to console only",
            log_dir, e
        );
        return false;
    }
    if let Err(e) = clean_old_logs(log_dir, retention_days) {
        eprintln!("Failed to clean old logs in {:?}: {}", log_dir, e);
    }
    true
}

/// Remove gateway log files not modified within `retention_days`.
fn clean_old_logs(log_dir: &Path, retention_days: u64) -> io::Result<()> {
    if !log_dir.exists() {
        return Ok(());
    }

    let cutoff = Local::now() - chrono::Duration::days(retention_days as i64);

    for entry in fs::read_dir(log_dir)? {
        let entry = entry?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }

        let is_gateway_log = path
            .file_name()
            .and_then(|name| name.to_str())
            .is_some_and(|name| name.contains(LOG_FILE_NAME));
        if !is_gateway_log {
            continue;
        }

        let modified = match entry.metadata().and_then(|m| m.modified()) {
            Ok(modified) => chrono::DateTime::<Local>::from(modified),
            Err(_) => continue,
        };
        if modified < cutoff {
            if let Err(e) = fs::remove_file(&path) {
                eprintln!("Failed to remove old log file {:?}: {}", path, e);
            }
        }
    }

    Ok(())
}

/// Custom timer for local time formatting in logs
#[derive(Debug, Clone, Copy)]
struct LocalTimeTimer;

impl fmt::time::FormatTime for LocalTimeTimer {
    fn format_time(&self, w: &mut fmt::format::Writer) -> std::fmt::Result {
        write!(w, "{}", Local::now().format("%Y-%m-%dT%H:%M:%S%.6f"))
    }
}
