//! Server error types.

use thiserror::Error;

/// Errors raised while running the server.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ServerError {
    /// Failed to bind to the configured address.
    #[error("Bind error: {0}")]
    BindError(String),

    /// I/O error during server operation.
    #[error("I/O error: {0}")]
    IoError(String),
}

/// Errors raised when sending a response through a [`Responder`](crate::Responder).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResponseError {
    /// A response was already sent for this request.
    #[error("a response was already sent")]
    AlreadySent,

    /// The connection stopped waiting (timeout or client gone).
    #[error("the response is no longer awaited")]
    Closed,

    /// The response could not be built.
    #[error("failed to build response: {0}")]
    Build(String),
}
