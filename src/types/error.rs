use anyhow::Error;
use thiserror::Error;

/// Application-level error types for s3backup-rs.
///
/// ## Exit Codes
///
/// Each variant maps to an exit code (via `exit_code()`):
/// - 1: Run failures (SubprocessFailure, ListFailure, DeleteFailure, PutFailure, Notification)
/// - 2: Configuration errors (InvalidConfig)
#[derive(Error, Debug, PartialEq)]
pub enum S3BackupError {
    /// The transfer subprocess exited non-zero, could not be spawned, or timed out.
    #[error("Transfer failed: {message}")]
    SubprocessFailure {
        exit_code: Option<i32>,
        message: String,
    },

    /// Listing objects or common prefixes failed.
    #[error("List failure: {0}")]
    ListFailure(String),

    /// Uploading an object failed.
    #[error("Put failure: {0}")]
    PutFailure(String),

    /// A DeleteObjects batch failed, fully or for some keys.
    #[error("Delete failure: {0}")]
    DeleteFailure(String),

    /// Sending a notification failed.
    #[error("Notification failure: {0}")]
    Notification(String),

    /// Configuration error (non-retryable).
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl S3BackupError {
    /// Get the process exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            S3BackupError::InvalidConfig(_) => 2,
            _ => 1,
        }
    }

}

/// Check if an anyhow::Error wraps a subprocess failure.
pub fn is_subprocess_failure(e: &Error) -> bool {
    matches!(
        e.downcast_ref::<S3BackupError>(),
        Some(S3BackupError::SubprocessFailure { .. })
    )
}

/// Extract the exit code from an anyhow::Error, defaulting to 1.
pub fn exit_code_from_error(e: &Error) -> i32 {
    if let Some(err) = e.downcast_ref::<S3BackupError>() {
        return err.exit_code();
    }
    1
}
