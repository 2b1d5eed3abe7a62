//! Error types for kbgate
//!
//! Startup-level failures (configuration, logging, file access). Per-call
//! failures live with the dispatcher in `kbgate-server`.

use std::path::PathBuf;

/// Main error type for kbgate startup and infrastructure
#[derive(Debug, thiserror::Error)]
pub enum KbgateError {
    // === IO Errors ===

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to read file {path}: {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to write file {path}: {source}")]
    FileWrite {
        path: PathBuf,
        source: std::io::Error,
    },

    // === Configuration Errors ===

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid configuration at {path}: {message}")]
    ConfigInvalid { path: PathBuf, message: String },

    #[error("Missing required setting: {0}")]
    MissingSetting(String),

    // === Internal Errors ===

    #[error("Internal error: {0}")]
    Internal(String),
}

impl KbgateError {
    /// Create a config error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Whether this error comes from configuration loading or validation
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            Self::Config(_) | Self::ConfigInvalid { .. } | Self::MissingSetting(_)
        )
    }
}

/// Result type alias using KbgateError
pub type Result<T> = std::result::Result<T, KbgateError>;

#[cfg(test)]
mod tests {
    use super::*;

    // ==================== Display Tests ====================

    #[test]
    fn test_error_display_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err = KbgateError::Io(io_err);
        assert!(err.to_string().contains("IO error"));
    }

    #[test]
    fn test_error_display_file_read() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "permission denied");
        let err = KbgateError::FileRead {
            path: PathBuf::from("/etc/kbgate/config.toml"),
            source: io_err,
        };
        let msg = err.to_string();
        assert!(msg.contains("Failed to read file"));
        assert!(msg.contains("/etc/kbgate/config.toml"));
    }

    #[test]
    fn test_error_display_config_invalid() {
        let err = KbgateError::ConfigInvalid {
            path: PathBuf::from("/home/user/.config/kbgate/config.toml"),
            message: "syntax error".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("Invalid configuration"));
        assert!(msg.contains("config.toml"));
        assert!(msg.contains("syntax error"));
    }

    #[test]
    fn test_error_display_missing_setting() {
        let err = KbgateError::MissingSetting("BEDROCK_KNOWLEDGE_BASE_ID".into());
        assert_eq!(
            err.to_string(),
            "Missing required setting: BEDROCK_KNOWLEDGE_BASE_ID"
        );
    }

    #[test]
    fn test_error_display_internal() {
        let err = KbgateError::Internal("unexpected state".into());
        assert_eq!(err.to_string(), "Internal error: unexpected state");
    }

    // ==================== Classification Tests ====================

    #[test]
    fn test_config_errors_classified() {
        assert!(KbgateError::config("bad").is_config_error());
        assert!(KbgateError::MissingSetting("x".into()).is_config_error());
        assert!(KbgateError::ConfigInvalid {
            path: PathBuf::from("/test"),
            message: "bad".into(),
        }
        .is_config_error());
    }

    #[test]
    fn test_non_config_errors_classified() {
        assert!(!KbgateError::internal("boom").is_config_error());
        let io_err = std::io::Error::new(std::io::ErrorKind::Other, "io");
        assert!(!KbgateError::from(io_err).is_config_error());
    }

    // ==================== From Trait Tests ====================

    #[test]
    fn test_from_io_error_preserves_kind() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err: KbgateError = io_err.into();
        if let KbgateError::Io(inner) = err {
            assert_eq!(inner.kind(), std::io::ErrorKind::PermissionDenied);
        } else {
            panic!("Expected Io variant");
        }
    }
}
