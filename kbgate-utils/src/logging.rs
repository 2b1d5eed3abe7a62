//! Logging infrastructure for kbgate
//!
//! stdout carries protocol frames, so logs go to a file by default and
//! to stderr only on request.

use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

use crate::{paths, KbgateError, Result};

/// Env var holding the log filter
pub const LOG_FILTER_ENV: &str = "KBGATE_LOG";

/// Env var that switches logging to stderr when set to `1` or `true`
pub const LOG_STDERR_ENV: &str = "KBGATE_LOG_STDERR";

/// Log file name under [`paths::log_dir`]
pub const LOG_FILE_NAME: &str = "kbgate.log";

/// Log output destination
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogOutput {
    /// Log to stderr
    Stderr,
    /// Log to file under the state directory
    File,
}

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Output destination
    pub output: LogOutput,
    /// Log level filter (e.g., "info", "kbgate_server=debug,reqwest=warn")
    pub filter: String,
    /// Include span events (enter/exit)
    pub span_events: bool,
    /// Include file/line in logs
    pub file_line: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            output: LogOutput::Stderr,
            filter: "info".into(),
            span_events: false,
            file_line: false,
        }
    }
}

impl LogConfig {
    /// Create config for the MCP server process
    ///
    /// File logging unless `KBGATE_LOG_STDERR` is set.
    pub fn server() -> Self {
        Self::server_from(|key| std::env::var(key).ok())
    }

    /// Same as [`LogConfig::server`] with an injectable env lookup
    pub fn server_from(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let to_stderr = lookup(LOG_STDERR_ENV)
            .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
            .unwrap_or(false);

        Self {
            output: if to_stderr {
                LogOutput::Stderr
            } else {
                LogOutput::File
            },
            filter: lookup(LOG_FILTER_ENV).unwrap_or_else(|| "info".into()),
            span_events: false,
            file_line: true,
        }
    }

    /// Create config for development (verbose stderr)
    pub fn development() -> Self {
        Self {
            output: LogOutput::Stderr,
            filter: "debug".into(),
            span_events: true,
            file_line: true,
        }
    }
}

/// Initialize logging with custom configuration
pub fn init_logging_with_config(config: LogConfig) -> Result<()> {
    let filter = EnvFilter::try_new(&config.filter)
        .map_err(|e| KbgateError::config(format!("Invalid log filter: {}", e)))?;

    let fmt_layer = fmt::layer()
        .with_target(true)
        .with_thread_ids(false)
        .with_thread_names(false);

    let fmt_layer = if config.span_events {
        fmt_layer.with_span_events(FmtSpan::ENTER | FmtSpan::EXIT)
    } else {
        fmt_layer
    };

    let fmt_layer = if config.file_line {
        fmt_layer.with_file(true).with_line_number(true)
    } else {
        fmt_layer.with_file(false).with_line_number(false)
    };

    match config.output {
        LogOutput::Stderr => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt_layer.with_writer(std::io::stderr))
                .try_init()
                .map_err(|e| KbgateError::internal(format!("Failed to init logging: {}", e)))?;
        }
        LogOutput::File => {
            let log_dir = paths::log_dir();
            std::fs::create_dir_all(&log_dir).map_err(|e| KbgateError::FileWrite {
                path: log_dir.clone(),
                source: e,
            })?;

            let log_path = log_dir.join(LOG_FILE_NAME);
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&log_path)
                .map_err(|e| KbgateError::FileWrite {
                    path: log_path,
                    source: e,
                })?;

            tracing_subscriber::registry()
                .with(filter)
                .with(fmt_layer.with_writer(file).with_ansi(false))
                .try_init()
                .map_err(|e| KbgateError::internal(format!("Failed to init logging: {}", e)))?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    // ==================== LogConfig Default Tests ====================

    #[test]
    fn test_log_config_defaults() {
        let config = LogConfig::default();
        assert_eq!(config.output, LogOutput::Stderr);
        assert_eq!(config.filter, "info");
        assert!(!config.span_events);
        assert!(!config.file_line);
    }

    // ==================== LogConfig::server() Tests ====================

    #[test]
    fn test_log_config_server_defaults_to_file() {
        let config = LogConfig::server_from(lookup(&[]));
        assert_eq!(config.output, LogOutput::File);
        assert_eq!(config.filter, "info");
        assert!(config.file_line);
    }

    #[test]
    fn test_log_config_server_filter_from_env() {
        let config = LogConfig::server_from(lookup(&[(LOG_FILTER_ENV, "kbgate_server=debug")]));
        assert_eq!(config.filter, "kbgate_server=debug");
    }

    #[test]
    fn test_log_config_server_stderr_switch() {
        let config = LogConfig::server_from(lookup(&[(LOG_STDERR_ENV, "1")]));
        assert_eq!(config.output, LogOutput::Stderr);

        let config = LogConfig::server_from(lookup(&[(LOG_STDERR_ENV, "TRUE")]));
        assert_eq!(config.output, LogOutput::Stderr);

        let config = LogConfig::server_from(lookup(&[(LOG_STDERR_ENV, "0")]));
        assert_eq!(config.output, LogOutput::File);
    }

    // ==================== LogConfig::development() Tests ====================

    #[test]
    fn test_log_config_development() {
        let config = LogConfig::development();
        assert_eq!(config.output, LogOutput::Stderr);
        assert_eq!(config.filter, "debug");
        assert!(config.span_events);
    }

    // ==================== init_logging Tests ====================

    #[test]
    fn test_init_logging_rejects_bad_filter() {
        let config = LogConfig {
            filter: "kbgate=notalevel".into(),
            ..LogConfig::default()
        };
        let result = init_logging_with_config(config);
        assert!(matches!(result, Err(KbgateError::Config(_))));
    }
}
