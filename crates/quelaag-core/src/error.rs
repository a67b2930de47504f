//! Error types for middleware evaluation.
//!
//! Every failure that can escape an accessor is a [`MiddlewareError`]. The
//! type is `Clone` so that a failed asynchronous value can be observed by
//! every caller awaiting the same shared computation.

use std::any::Any;
use std::error::Error as StdError;
use std::sync::Arc;

use thiserror::Error;

/// Boxed error produced by user supplied derivers and callbacks.
pub type BoxError = Box<dyn StdError + Send + Sync + 'static>;

/// Reference counted error, cloneable across every holder of a failure.
pub type SharedError = Arc<dyn StdError + Send + Sync + 'static>;

/// Result alias for middleware operations.
pub type MiddlewareResult<T> = Result<T, MiddlewareError>;

/// Errors raised while calling a middleware accessor.
#[derive(Debug, Clone, Error)]
pub enum MiddlewareError {
    /// No deriver is registered under the requested name.
    #[error("unknown middleware `{name}`")]
    Unknown {
        /// Requested name.
        name: String,
    },

    /// The value exists but is not of the requested type.
    #[error("middleware `{name}` does not produce a value of type `{expected}`")]
    TypeMismatch {
        /// Name of the middleware (or parent key).
        name: String,
        /// Type the caller asked for.
        expected: &'static str,
    },

    /// The value is produced asynchronously and has not settled yet.
    #[error("middleware `{name}` has not settled yet")]
    Pending {
        /// Name of the middleware.
        name: String,
    },

    /// The deriver returned an error, or its asynchronous value failed.
    #[error("middleware `{name}` failed: {source}")]
    Failed {
        /// Name of the middleware.
        name: String,
        /// Underlying failure.
        #[source]
        source: SharedError,
    },

    /// The asynchronous value panicked while being polled.
    #[error("middleware `{name}` panicked: {message}")]
    Panicked {
        /// Name of the middleware.
        name: String,
        /// Panic payload rendered as text.
        message: String,
    },

    /// A multi-parent context has no inventory under the requested key.
    #[error("no parent inventory registered under `{key}`")]
    MissingParent {
        /// Requested parent key.
        key: String,
    },
}

impl MiddlewareError {
    /// Creates an [`MiddlewareError::Unknown`] error.
    pub fn unknown(name: impl Into<String>) -> Self {
        Self::Unknown { name: name.into() }
    }

    /// Creates a [`MiddlewareError::TypeMismatch`] error for the type `T`.
    pub fn type_mismatch<T: ?Sized>(name: impl Into<String>) -> Self {
        Self::TypeMismatch {
            name: name.into(),
            expected: std::any::type_name::<T>(),
        }
    }

    /// Creates a [`MiddlewareError::Pending`] error.
    pub fn pending(name: impl Into<String>) -> Self {
        Self::Pending { name: name.into() }
    }

    /// Wraps a deriver failure.
    pub fn failed(name: impl Into<String>, source: BoxError) -> Self {
        Self::Failed {
            name: name.into(),
            source: Arc::from(source),
        }
    }

    /// Creates a [`MiddlewareError::Panicked`] error.
    pub fn panicked(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Panicked {
            name: name.into(),
            message: message.into(),
        }
    }

    /// Creates a [`MiddlewareError::MissingParent`] error.
    pub fn missing_parent(key: impl Into<String>) -> Self {
        Self::MissingParent { key: key.into() }
    }

    /// Returns the middleware name (or parent key) the error refers to.
    pub fn name(&self) -> &str {
        match self {
            Self::Unknown { name }
            | Self::TypeMismatch { name, .. }
            | Self::Pending { name }
            | Self::Failed { name, .. }
            | Self::Panicked { name, .. } => name,
            Self::MissingParent { key } => key,
        }
    }
}

/// Renders a panic payload as text.
///
/// Payloads raised through `panic!` are either `&'static str` or `String`;
/// anything else is reported generically.
pub fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failed_keeps_source() {
        let err = MiddlewareError::failed("user", "lookup failed".into());
        assert_eq!(err.name(), "user");
        assert!(err.to_string().contains("lookup failed"));
        assert!(err.source().is_some());
    }

    #[test]
    fn test_clone_shares_source() {
        let err = MiddlewareError::failed("user", "boom".into());
        let copy = err.clone();
        match (&err, &copy) {
            (
                MiddlewareError::Failed { source: a, .. },
                MiddlewareError::Failed { source: b, .. },
            ) => assert!(Arc::ptr_eq(a, b)),
            _ => panic!("expected Failed"),
        }
    }

    #[test]
    fn test_type_mismatch_names_type() {
        let err = MiddlewareError::type_mismatch::<u32>("count");
        assert!(err.to_string().contains("u32"));
    }

    #[test]
    fn test_panic_message() {
        let payload: Box<dyn Any + Send> = Box::new("static");
        assert_eq!(panic_message(payload.as_ref()), "static");

        let payload: Box<dyn Any + Send> = Box::new(String::from("owned"));
        assert_eq!(panic_message(payload.as_ref()), "owned");

        let payload: Box<dyn Any + Send> = Box::new(7_u8);
        assert_eq!(panic_message(payload.as_ref()), "non-string panic payload");
    }
}
