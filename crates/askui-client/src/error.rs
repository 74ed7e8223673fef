//! Error types for the askui client.

use thiserror::Error;

/// Errors that can occur when talking to the askui server.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Transport-level HTTP error (connect, timeout, protocol).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered with a non-success status other than the
    /// long-poll retry signal.
    #[error("server returned {status}: {body}")]
    Api {
        status: reqwest::StatusCode,
        body: String,
    },

    /// The overall wait budget was exhausted before the request completed.
    #[error("wait budget exhausted before completion")]
    WaitBudgetExceeded,

    /// Failed to encode or decode a payload.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Failed to read a local file for upload.
    #[error("read upload file: {0}")]
    UploadRead(#[source] std::io::Error),
}
