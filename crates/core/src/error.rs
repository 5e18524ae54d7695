//! Domain error taxonomy.

use thiserror::Error;

/// Result type used across the core crate.
pub type CoreResult<T> = Result<T, CoreError>;

/// Deterministic domain failures.
///
/// Storage failures are not represented here; the storefront wraps these in its
/// own store error alongside persistence errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// A referenced entity does not exist.
    #[error("{0} not found")]
    NotFound(String),

    /// Input failed validation (malformed configuration, bad quantity, ...).
    #[error("validation failed: {0}")]
    Validation(String),

    /// State changed underneath the caller.
    #[error("conflict: {0}")]
    Conflict(String),
}

impl CoreError {
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }
}
