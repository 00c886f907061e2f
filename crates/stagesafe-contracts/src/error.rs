//! Error types for the StageSafe trust core.
//!
//! All fallible operations across the workspace return `TrustResult<T>`.
//! Variants carry the offending key or value so callers can surface them
//! without re-deriving context.

use thiserror::Error;

/// The unified error type for the trust core.
#[derive(Debug, Error)]
pub enum TrustError {
    /// Malformed input: a score out of range, an unknown severity, an empty key.
    ///
    /// Always surfaced to the caller and never retried by the core.
    #[error("validation failed for '{field}': {reason}")]
    Validation { field: String, reason: String },

    /// A check-in duration fell outside the configured bounds.
    #[error("duration of {minutes} minutes is outside the allowed range {min}..={max}")]
    InvalidDuration { minutes: i64, min: i64, max: i64 },

    /// The requested session or venue does not exist.
    #[error("{resource} '{id}' not found")]
    NotFound { resource: String, id: String },

    /// A check-in was started with an id that is already registered.
    #[error("session '{session_id}' already exists")]
    DuplicateSession { session_id: String },

    /// The backing store could not be reached or its lock was poisoned.
    ///
    /// Transient: the monitor retries on its next sweep, synchronous callers
    /// may retry at their discretion.
    #[error("storage unavailable: {reason}")]
    StorageUnavailable { reason: String },

    /// A status transition would have moved a session backwards.
    #[error("illegal session transition: {reason}")]
    StateMachine { reason: String },

    /// A required configuration value is missing or invalid.
    #[error("configuration error: {reason}")]
    Config { reason: String },
}

impl TrustError {
    /// Shorthand for a `Validation` error.
    pub fn validation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Shorthand for `StorageUnavailable`, typically built from a poisoned lock.
    pub fn storage<E: std::fmt::Display>(reason: E) -> Self {
        Self::StorageUnavailable {
            reason: reason.to_string(),
        }
    }

    /// True for errors worth retrying later without changing the input.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::StorageUnavailable { .. })
    }
}

/// Convenience alias used throughout the StageSafe crates.
pub type TrustResult<T> = Result<T, TrustError>;
