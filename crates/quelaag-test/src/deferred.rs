//! Externally settled futures.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use parking_lot::Mutex;
use tokio::sync::oneshot;

use crate::error::TestError;

/// Creates a pending future and the handle that settles it.
pub fn defer<T>() -> (Resolver<T>, Deferred<T>) {
    let (sender, receiver) = oneshot::channel();
    (
        Resolver {
            sender: Arc::new(Mutex::new(Some(sender))),
        },
        Deferred { receiver },
    )
}

/// Settles a [`Deferred`]. Only the first call has an effect.
pub struct Resolver<T> {
    sender: Arc<Mutex<Option<oneshot::Sender<Result<T, TestError>>>>>,
}

impl<T> Resolver<T> {
    /// Resolves with `value`. Returns `false` if already settled.
    pub fn resolve(&self, value: T) -> bool {
        self.settle(Ok(value))
    }

    /// Rejects with `reason`. Returns `false` if already settled.
    pub fn reject(&self, reason: impl Into<String>) -> bool {
        self.settle(Err(TestError::Rejected(reason.into())))
    }

    /// Returns `true` once resolved or rejected.
    pub fn is_settled(&self) -> bool {
        self.sender.lock().is_none()
    }

    fn settle(&self, outcome: Result<T, TestError>) -> bool {
        match self.sender.lock().take() {
            Some(sender) => {
                // The receiver may already be gone; the value is simply dropped.
                let _ = sender.send(outcome);
                true
            }
            None => false,
        }
    }
}

impl<T> Clone for Resolver<T> {
    fn clone(&self) -> Self {
        Self {
            sender: Arc::clone(&self.sender),
        }
    }
}

/// A future that completes when its [`Resolver`] settles it.
pub struct Deferred<T> {
    receiver: oneshot::Receiver<Result<T, TestError>>,
}

impl<T> Future for Deferred<T> {
    type Output = Result<T, TestError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.receiver)
            .poll(cx)
            .map(|outcome| outcome.unwrap_or(Err(TestError::Abandoned)))
    }
}
