//! Return types of predicates, handlers and error handlers.
//!
//! Callbacks registered on a [`Dispatcher`](crate::Dispatcher) may complete
//! synchronously or hand back a future. The `Into*` traits let a closure
//! return whichever shape is natural:
//!
//! | Callback          | Accepted return types                                  |
//! |-------------------|--------------------------------------------------------|
//! | predicate         | `bool`, `Check`, `Result<bool, E>`, `Result<Check, E>` |
//! | handler / action  | `()`, `Completion`, `Result<(), E>`, `Result<Completion, E>` |
//! | error handler     | `()`, `Result<(), E>`                                  |

use std::fmt;
use std::future::Future;

use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use quelaag_core::BoxError;

/// Outcome of a predicate.
pub enum Check {
    /// The predicate decided synchronously.
    Ready(bool),
    /// The predicate decides when the future settles.
    Pending(BoxFuture<'static, Result<bool, BoxError>>),
}

impl Check {
    /// Wraps an asynchronous decision.
    pub fn pending<F, E>(future: F) -> Self
    where
        F: Future<Output = Result<bool, E>> + Send + 'static,
        E: Into<BoxError>,
    {
        Self::Pending(async move { future.await.map_err(Into::into) }.boxed())
    }
}

impl From<bool> for Check {
    fn from(matched: bool) -> Self {
        Self::Ready(matched)
    }
}

impl fmt::Debug for Check {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ready(matched) => f.debug_tuple("Check::Ready").field(matched).finish(),
            Self::Pending(_) => f.write_str("Check::Pending(..)"),
        }
    }
}

/// Outcome of a handler or observer action.
pub enum Completion {
    /// The handler finished synchronously.
    Done,
    /// The handler finishes when the future settles.
    Pending(BoxFuture<'static, Result<(), BoxError>>),
}

impl Completion {
    /// Wraps asynchronous completion.
    pub fn pending<F, E>(future: F) -> Self
    where
        F: Future<Output = Result<(), E>> + Send + 'static,
        E: Into<BoxError>,
    {
        Self::Pending(async move { future.await.map_err(Into::into) }.boxed())
    }
}

impl fmt::Debug for Completion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Done => f.write_str("Completion::Done"),
            Self::Pending(_) => f.write_str("Completion::Pending(..)"),
        }
    }
}

/// Conversion into a predicate outcome.
pub trait IntoCheck {
    /// Performs the conversion.
    fn into_check(self) -> Result<Check, BoxError>;
}

impl IntoCheck for bool {
    fn into_check(self) -> Result<Check, BoxError> {
        Ok(Check::Ready(self))
    }
}

impl IntoCheck for Check {
    fn into_check(self) -> Result<Check, BoxError> {
        Ok(self)
    }
}

impl<E: Into<BoxError>> IntoCheck for Result<bool, E> {
    fn into_check(self) -> Result<Check, BoxError> {
        self.map(Check::Ready).map_err(Into::into)
    }
}

impl<E: Into<BoxError>> IntoCheck for Result<Check, E> {
    fn into_check(self) -> Result<Check, BoxError> {
        self.map_err(Into::into)
    }
}

/// Conversion into a handler outcome.
pub trait IntoCompletion {
    /// Performs the conversion.
    fn into_completion(self) -> Result<Completion, BoxError>;
}

impl IntoCompletion for () {
    fn into_completion(self) -> Result<Completion, BoxError> {
        Ok(Completion::Done)
    }
}

impl IntoCompletion for Completion {
    fn into_completion(self) -> Result<Completion, BoxError> {
        Ok(self)
    }
}

impl<E: Into<BoxError>> IntoCompletion for Result<(), E> {
    fn into_completion(self) -> Result<Completion, BoxError> {
        self.map(|()| Completion::Done).map_err(Into::into)
    }
}

impl<E: Into<BoxError>> IntoCompletion for Result<Completion, E> {
    fn into_completion(self) -> Result<Completion, BoxError> {
        self.map_err(Into::into)
    }
}

/// Conversion into an error handler outcome.
pub trait IntoCaught {
    /// Performs the conversion.
    fn into_caught(self) -> Result<(), BoxError>;
}

impl IntoCaught for () {
    fn into_caught(self) -> Result<(), BoxError> {
        Ok(())
    }
}

impl<E: Into<BoxError>> IntoCaught for Result<(), E> {
    fn into_caught(self) -> Result<(), BoxError> {
        self.map_err(Into::into)
    }
}
