use thiserror::Error;

/// Errors produced by pure core logic.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Input failed a validation rule.
    #[error("Validation error: {0}")]
    Validation(String),

    /// A status id read from storage is outside the closed set.
    #[error("Unknown status id: {0}")]
    UnknownStatus(i16),
}
