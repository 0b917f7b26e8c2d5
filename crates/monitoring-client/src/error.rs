//! Backend Error Types

use serde::Serialize;
use thiserror::Error;

/// Errors returned by a monitoring backend call
#[derive(Debug, Clone, Error, PartialEq, Eq, Serialize)]
pub enum BackendError {
    /// Transport or authentication failure reaching the backend
    #[error("Monitoring backend unavailable: {0}")]
    Unavailable(String),

    /// Request rejected by the backend's rate limiter
    #[error("Request throttled by backend: {0}")]
    Throttled(String),

    /// An alarm with the same name already exists
    #[error("Alarm already exists: {0}")]
    AlreadyExists(String),

    /// Request reached the backend and was refused
    #[error("Request rejected: {0}")]
    Rejected(String),

    /// No response within the caller-supplied deadline
    #[error("Timed out waiting for backend response after {0}ms")]
    Timeout(u64),
}

impl BackendError {
    /// Whether the failure is likely to clear up on a later run
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            BackendError::Unavailable(_) | BackendError::Throttled(_) | BackendError::Timeout(_)
        )
    }
}
