//! Core domain errors.

use thiserror::Error;

/// Request store errors.
///
/// A closed set: the HTTP boundary matches every variant explicitly when
/// mapping to status codes.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    /// The request id does not exist.
    #[error("request not found")]
    NotFound,

    /// A completion was attempted on a request that is no longer pending.
    #[error("request already completed")]
    AlreadyCompleted,

    /// A bounded wait elapsed before the request completed. Means "still
    /// pending", not failure.
    #[error("timeout waiting for response")]
    WaitTimeout,

    /// A create parameter was missing or invalid.
    #[error("invalid request: {0}")]
    Validation(String),
}
