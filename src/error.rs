//! Errors surfaced by coreset selection.

use thiserror::Error;

/// Failures detected while validating a selection request.
///
/// Both variants are raised before any selection work starts and are not
/// retryable without changing the input.
#[derive(Debug, Error, PartialEq)]
pub enum CoresetError {
    /// Invalid distortion tolerance, or parameters the projection cannot satisfy.
    #[error("configuration error: {0}")]
    Configuration(String),
    /// Coreset size out of range, or an empty/malformed feature matrix.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

/// Result type used across the crate.
pub type Result<T> = std::result::Result<T, CoresetError>;
