use crate::error::LabelVoteError;
use std::path::Path;
use tracing::Level;
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter, Layer,
};

/// Initialize logging system
///
/// Sets up logging to both stderr and a file
///
/// # Arguments
/// * `log_dir` - Directory where log files will be stored
/// * `log_level` - Log level (trace, debug, info, warn, error)
pub fn setup_logging(log_dir: &Path, log_level: &str) -> Result<(), LabelVoteError> {
    // Create log directory
    if !log_dir.exists() {
        std::fs::create_dir_all(log_dir).map_err(|e| {
            LabelVoteError::config(format!(
                "Failed to create log directory {}: {}",
                log_dir.display(),
                e
            ))
        })?;
    }

    // Log file path
    let log_file_path = log_dir.join("labelvote.log");
    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_file_path)
        .map_err(|e| {
            LabelVoteError::config(format!(
                "Failed to open log file {}: {}",
                log_file_path.display(),
                e
            ))
        })?;

    // Environment filter setup (RUST_LOG env var takes precedence)
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level));

    // Console output layer; stdout is reserved for command output
    let console_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_line_number(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_filter(env_filter.clone());

    // File output layer
    let file_layer = fmt::layer()
        .with_writer(log_file)
        .with_target(true)
        .with_thread_ids(true)
        .with_line_number(true)
        .with_ansi(false) // Remove ANSI color codes in files
        .with_span_events(FmtSpan::FULL)
        .with_filter(env_filter);

    tracing_subscriber::registry()
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| LabelVoteError::config(format!("Failed to install logger: {}", e)))?;

    tracing::info!("Logging initialized: level={}, log_file={}", log_level, log_file_path.display());

    Ok(())
}

/// Simple logging setup (stderr only)
///
/// Used by the CLI when no log directory is configured
pub fn setup_console_logging(log_level: &str) -> Result<(), LabelVoteError> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level));

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_line_number(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_env_filter(env_filter)
        .try_init()
        .map_err(|e| LabelVoteError::config(format!("Failed to install logger: {}", e)))?;

    tracing::debug!("Console logging initialized: level={}", log_level);

    Ok(())
}

/// Parse string to tracing Level
pub fn parse_log_level(level: &str) -> Level {
    match level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" | "warning" => Level::WARN,
        "error" => Level::ERROR,
        _ => {
            eprintln!("Invalid log level '{}', defaulting to INFO", level);
            Level::INFO
        }
    }
}

/// Map the CLI verbosity counter onto a level name, keeping the configured level as the floor
pub fn level_for_verbosity(configured: &str, verbose: u8) -> String {
    let level = match verbose {
        0 => return configured.to_string(),
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };
    if parse_log_level(configured) >= level {
        // Level ordering: TRACE is the greatest
        configured.to_string()
    } else {
        level.as_str().to_lowercase()
    }
}
