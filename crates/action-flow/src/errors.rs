//! Engine error types

use action_locator::LocatorError;
use softlight_snapshot_store::CaptureError;
use surface_driver::DriverError;
use thiserror::Error;

/// Failure of a single step. Never escapes the step boundary: the engine turns
/// it into a failure capture and a repair request.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum StepError {
    /// No element matched the target
    #[error(transparent)]
    Resolution(#[from] LocatorError),

    /// Navigation, timeout or interaction failure
    #[error("driver failure: {0}")]
    Driver(#[from] DriverError),

    /// Unverified expectation under the strict expect policy
    #[error("verification failed: {0}")]
    Verification(String),
}

impl StepError {
    pub fn category(&self) -> &'static str {
        match self {
            StepError::Resolution(_) => "resolution",
            StepError::Driver(_) => "driver",
            StepError::Verification(_) => "verification",
        }
    }
}

/// Failure talking to a planning or repair oracle
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum OracleError {
    #[error("oracle not configured: {0}")]
    Unavailable(String),

    #[error("oracle request failed: {0}")]
    Request(String),

    #[error("oracle timed out after {0}ms")]
    Timeout(u64),

    #[error("oracle returned an empty response")]
    EmptyResponse,

    #[error("oracle response malformed: {0}")]
    Malformed(String),
}

/// Errors setting up a run
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("capture setup failed: {0}")]
    Capture(#[from] CaptureError),
}
