//! Error types for surface drivers

use thiserror::Error;

/// Driver error enumeration
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DriverError {
    /// Operation exceeded its time budget
    #[error("{operation} timed out after {timeout_ms}ms")]
    Timeout { operation: String, timeout_ms: u64 },

    /// Navigation failed for a reason other than a timeout
    #[error("Navigation failed: {0}")]
    Navigation(String),

    /// Element handle no longer refers to a live element
    #[error("Stale element: {0}")]
    StaleElement(String),

    /// Element exists but the interaction was rejected
    #[error("Interaction failed: {0}")]
    Interaction(String),

    /// Wire-level failure talking to the automation backend
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Local I/O failure (screenshots, session files)
    #[error("I/O error: {0}")]
    Io(String),
}

impl DriverError {
    pub fn timeout(operation: impl Into<String>, timeout_ms: u64) -> Self {
        DriverError::Timeout {
            operation: operation.into(),
            timeout_ms,
        }
    }

    /// Check if this error is a timeout
    pub fn is_timeout(&self) -> bool {
        matches!(self, DriverError::Timeout { .. })
    }
}

impl From<std::io::Error> for DriverError {
    fn from(err: std::io::Error) -> Self {
        DriverError::Io(err.to_string())
    }
}
