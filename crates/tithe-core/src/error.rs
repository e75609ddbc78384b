//! Unified error types for the donation flow

use thiserror::Error;

/// Unified error type for all donation flow operations
#[derive(Error, Debug)]
pub enum TitheError {
    // Precondition failures - reported before any network activity
    #[error("Missing credentials: {0}")]
    MissingCredentials(String),

    #[error("Invalid donation amount: {0}")]
    InvalidAmount(String),

    // Fatal for the run - the session is released before this propagates
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    // Non-fatal - absorbed by the driver, which continues speculatively
    #[error("Step advance uncertain: {0}")]
    StepAdvanceUncertain(String),

    // Browser errors (launch, navigation, CDP, element lookup)
    #[error("Browser error: {0}")]
    Browser(String),

    // I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // Generic
    #[error("{0}")]
    Other(String),
}

/// Result type alias using TitheError
pub type Result<T> = std::result::Result<T, TitheError>;

impl TitheError {
    /// Whether the driver may keep going after this error.
    ///
    /// Only [`TitheError::StepAdvanceUncertain`] is absorbed locally; every
    /// other variant aborts the remaining protocol steps.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::StepAdvanceUncertain(_))
    }
}
