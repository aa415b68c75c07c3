//! # AppError
//!
//! Centralized error handling for the Rusty-Writers ecosystem.
//! Maps domain-specific failures to actionable error types.

use thiserror::Error;

/// The primary error type for all rw-core operations.
///
/// Absent entities on read paths are reported as `Ok(None)`, not as
/// [`AppError::NotFound`]; the variant is reserved for mutations that
/// address a user or story that must exist.
#[derive(Error, Debug)]
pub enum AppError {
    /// Resource not found (e.g., User, Story)
    #[error("{0} not found with ID {1}")]
    NotFound(String, String),

    /// Validation failure (e.g., empty title, empty comment)
    #[error("validation error: {0}")]
    ValidationError(String),

    /// Security/Auth failure (e.g., wrong password)
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Resource already exists (e.g., duplicate registration email)
    #[error("conflict: {0}")]
    Conflict(String),

    /// The document store could not be hydrated
    #[error("store unavailable: {0}")]
    StoreUnavailable(String),

    /// Infrastructure failure (e.g., persistence write failed)
    #[error("internal service error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn validation(msg: impl Into<String>) -> Self {
        AppError::ValidationError(msg.into())
    }

    pub fn not_found(entity: &str, id: &str) -> Self {
        AppError::NotFound(entity.to_string(), id.to_string())
    }
}

/// A specialized Result type for Rusty-Writers logic.
pub type Result<T> = std::result::Result<T, AppError>;
