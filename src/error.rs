//! Error types for rclone-worker
//!
//! Every fallible operation in the crate returns [`Result`]. Errors never
//! escape [`crate::EphemeralWorker::do_work`]; they are logged and mapped onto a
//! [`FailureReason`] there.

use crate::types::{FailureReason, OperationKind};
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for rclone-worker operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for rclone-worker
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "rclone.binary_path")
        key: Option<String>,
    },

    /// Host input is missing a key or carries an unusable value
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Operation kind is recognised but has no implementation
    #[error("operation {0} is not implemented")]
    NotImplemented(OperationKind),

    /// The engine process could not be spawned
    #[error("failed to launch {program}: {source}")]
    ProcessLaunch {
        /// Program that was being launched
        program: PathBuf,
        /// Underlying spawn error
        #[source]
        source: std::io::Error,
    },

    /// The engine ran but reported failure
    #[error("external tool error: {0}")]
    ExternalTool(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Failure reason this error surfaces as when it ends a run
    pub fn failure_reason(&self) -> FailureReason {
        match self {
            Error::InvalidRequest(_) | Error::NotImplemented(_) => FailureReason::NoTask,
            Error::ProcessLaunch { .. } | Error::ExternalTool(_) => FailureReason::RcloneError,
            Error::Config { .. } | Error::Io(_) | Error::Serialization(_) => {
                FailureReason::RcloneError
            }
        }
    }

    /// Machine-readable error code used in structured log fields
    pub fn error_code(&self) -> &'static str {
        match self {
            Error::Config { .. } => "config_error",
            Error::InvalidRequest(_) => "invalid_request",
            Error::NotImplemented(_) => "not_implemented",
            Error::ProcessLaunch { .. } => "process_launch_error",
            Error::ExternalTool(_) => "external_tool_error",
            Error::Io(_) => "io_error",
            Error::Serialization(_) => "serialization_error",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn all_error_variants() -> Vec<(Error, FailureReason, &'static str)> {
        vec![
            (
                Error::Config {
                    message: "bad value".into(),
                    key: Some("rclone.binary_path".into()),
                },
                FailureReason::RcloneError,
                "config_error",
            ),
            (
                Error::InvalidRequest("missing TASK_EPHEMERAL_TYPE".into()),
                FailureReason::NoTask,
                "invalid_request",
            ),
            (
                Error::NotImplemented(OperationKind::Upload),
                FailureReason::NoTask,
                "not_implemented",
            ),
            (
                Error::ProcessLaunch {
                    program: PathBuf::from("/nonexistent/rclone"),
                    source: std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
                },
                FailureReason::RcloneError,
                "process_launch_error",
            ),
            (
                Error::ExternalTool("exit status 1".into()),
                FailureReason::RcloneError,
                "external_tool_error",
            ),
            (
                Error::Io(std::io::Error::other("pipe closed")),
                FailureReason::RcloneError,
                "io_error",
            ),
        ]
    }

    #[test]
    fn every_variant_maps_to_reason_and_code() {
        for (error, reason, code) in all_error_variants() {
            assert_eq!(error.failure_reason(), reason, "reason for {error}");
            assert_eq!(error.error_code(), code, "code for {error}");
        }
    }

    #[test]
    fn not_implemented_names_the_operation() {
        let error = Error::NotImplemented(OperationKind::Move);
        assert_eq!(error.to_string(), "operation MOVE is not implemented");
    }

    #[test]
    fn launch_error_keeps_source() {
        let error = Error::ProcessLaunch {
            program: PathBuf::from("rclone"),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        };
        assert!(std::error::Error::source(&error).is_some());
        assert!(error.to_string().starts_with("failed to launch rclone"));
    }
}
