//! Error types for locator system

use surface_driver::DriverError;
use thiserror::Error;

use crate::types::CandidateKind;

/// Locator error enumeration
#[derive(Debug, Error, Clone, PartialEq)]
pub enum LocatorError {
    /// No tier produced a visible match
    #[error("No {kind} element found for '{target}'")]
    ElementNotFound { target: String, kind: CandidateKind },

    /// Target is empty after normalization
    #[error("Invalid target: {0}")]
    InvalidTarget(String),

    /// Every lookup failed at the driver level
    #[error("Driver error during resolution: {0}")]
    Driver(#[from] DriverError),
}

impl LocatorError {
    pub fn not_found(target: &str, kind: CandidateKind) -> Self {
        LocatorError::ElementNotFound {
            target: target.to_string(),
            kind,
        }
    }

    /// Check if error is retryable
    pub fn is_retryable(&self) -> bool {
        matches!(self, LocatorError::Driver(err) if err.is_timeout())
    }
}
