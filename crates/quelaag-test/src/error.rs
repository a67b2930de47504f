//! Test error types.

use std::fmt;

/// Errors that can occur in test utilities.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TestError {
    /// A deferred value was rejected.
    Rejected(String),
    /// The resolver was dropped without settling.
    Abandoned,
    /// Request building failed.
    RequestBuild(String),
}

impl fmt::Display for TestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rejected(reason) => write!(f, "deferred rejected: {reason}"),
            Self::Abandoned => write!(f, "deferred resolver dropped before settling"),
            Self::RequestBuild(msg) => write!(f, "request build error: {msg}"),
        }
    }
}

impl std::error::Error for TestError {}
