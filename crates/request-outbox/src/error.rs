//! Outbox error types.

use thiserror::Error;

/// Outbox error type.
#[derive(Error, Debug)]
pub enum OutboxError {
    /// Key-value store could not be read or written
    #[error("Storage error: {0}")]
    Storage(String),

    /// IO error (file-backed store)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP client error (connect, DNS, timeout, body read)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The stored HTTP verb is not a valid method token
    #[error("Invalid HTTP method: {0}")]
    InvalidMethod(String),

    /// A stored header name or value cannot be sent
    #[error("Invalid header: {0}")]
    InvalidHeader(String),

    /// The remote answered with a non-success status
    #[error("HTTP error! status: {status}, message: {body}")]
    Rejected { status: u16, body: String },

    /// Other transport-level failure
    #[error("Transport error: {0}")]
    Transport(String),
}

/// Result type alias using OutboxError.
pub type OutboxResult<T> = Result<T, OutboxError>;
