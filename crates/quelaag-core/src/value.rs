//! Values produced by derivers and cached in an inventory.

use std::any::{self, Any};
use std::fmt;
use std::future::Future;
use std::marker::PhantomData;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures_util::future::{BoxFuture, Shared};
use futures_util::FutureExt;

use crate::error::{panic_message, BoxError, MiddlewareError, MiddlewareResult};
use crate::inventory::Inventory;

/// Type-erased middleware value.
pub type Value = Arc<dyn Any + Send + Sync>;

/// An asynchronous middleware value shared by every caller.
///
/// Polling any clone drives the single underlying computation.
pub type PendingValue = Shared<BoxFuture<'static, MiddlewareResult<Value>>>;

/// Outcome of running a deriver.
pub enum Derived {
    /// A value available immediately.
    Ready(Value),
    /// A value that settles later.
    Pending(BoxFuture<'static, Result<Value, BoxError>>),
}

impl Derived {
    /// Wraps an immediately available value.
    pub fn ready<T: Any + Send + Sync>(value: T) -> Self {
        Self::Ready(Arc::new(value))
    }

    /// Wraps a future that produces the value.
    pub fn pending<F, T, E>(future: F) -> Self
    where
        F: Future<Output = Result<T, E>> + Send + 'static,
        T: Any + Send + Sync,
        E: Into<BoxError>,
    {
        Self::Pending(
            async move {
                future
                    .await
                    .map(|value| Arc::new(value) as Value)
                    .map_err(Into::into)
            }
            .boxed(),
        )
    }

    pub(crate) fn into_memo(self, name: &str) -> Memo {
        match self {
            Self::Ready(value) => Memo::Ready(value),
            Self::Pending(future) => {
                let name = name.to_string();
                let shared = async move {
                    match AssertUnwindSafe(future).catch_unwind().await {
                        Ok(Ok(value)) => Ok(value),
                        Ok(Err(err)) => Err(MiddlewareError::failed(name, err)),
                        Err(payload) => Err(MiddlewareError::panicked(
                            name,
                            panic_message(payload.as_ref()),
                        )),
                    }
                }
                .boxed()
                .shared();
                Memo::Pending(shared)
            }
        }
    }
}

impl fmt::Debug for Derived {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ready(_) => f.write_str("Derived::Ready(..)"),
            Self::Pending(_) => f.write_str("Derived::Pending(..)"),
        }
    }
}

/// The memoized result of a middleware for one request.
///
/// Cloning a memo is cheap and every clone refers to the same value or the
/// same in-flight computation.
#[derive(Clone)]
pub enum Memo {
    /// Value computed synchronously.
    Ready(Value),
    /// Value computed asynchronously.
    Pending(PendingValue),
}

impl Memo {
    /// Returns `true` while an asynchronous value has not settled.
    pub fn is_pending(&self) -> bool {
        match self {
            Self::Ready(_) => false,
            Self::Pending(shared) => shared.peek().is_none(),
        }
    }

    /// Returns the settled result without waiting, if available.
    pub fn peek(&self) -> Option<MiddlewareResult<Value>> {
        match self {
            Self::Ready(value) => Some(Ok(Arc::clone(value))),
            Self::Pending(shared) => shared.peek().cloned(),
        }
    }

    /// Waits for the value.
    pub async fn settle(self) -> MiddlewareResult<Value> {
        match self {
            Self::Ready(value) => Ok(value),
            Self::Pending(shared) => shared.await,
        }
    }

    /// Waits for the value and downcasts it to `T`.
    pub async fn settle_as<T: Any + Send + Sync>(self, name: &str) -> MiddlewareResult<Arc<T>> {
        downcast(name, self.settle().await?)
    }

    /// Returns `true` if both memos refer to the same value or computation.
    pub fn same_as(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Ready(a), Self::Ready(b)) => Arc::ptr_eq(a, b),
            (Self::Pending(a), Self::Pending(b)) => a.ptr_eq(b),
            _ => false,
        }
    }
}

impl fmt::Debug for Memo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ready(_) => f.write_str("Memo::Ready(..)"),
            Self::Pending(_) if self.is_pending() => f.write_str("Memo::Pending(..)"),
            Self::Pending(_) => f.write_str("Memo::Pending(settled)"),
        }
    }
}

/// Downcasts a type-erased value.
pub(crate) fn downcast<T: Any + Send + Sync>(name: &str, value: Value) -> MiddlewareResult<Arc<T>> {
    value
        .downcast::<T>()
        .map_err(|_| MiddlewareError::type_mismatch::<T>(name))
}

/// A typed handle to a middleware name.
///
/// ```
/// use quelaag_core::{Key, MiddlewareSpec, Quelaag};
///
/// const GREETING: Key<String> = Key::new("greeting");
///
/// let spec = MiddlewareSpec::<String>::new()
///     .value(GREETING.name(), |inv| format!("hello {}", inv.request()));
/// let inventory = Quelaag::new(spec).build("world".to_string(), ());
///
/// assert_eq!(GREETING.get(&inventory).unwrap().as_str(), "hello world");
/// ```
pub struct Key<T> {
    name: &'static str,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Any + Send + Sync> Key<T> {
    /// Creates a key for `name`.
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            _marker: PhantomData,
        }
    }

    /// Returns the middleware name.
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// Reads a ready value through the key.
    pub fn get<Req, Ctx>(&self, inventory: &Inventory<Req, Ctx>) -> MiddlewareResult<Arc<T>> {
        inventory.get::<T>(self.name)
    }

    /// Waits for the value through the key.
    pub async fn resolve<Req, Ctx>(&self, inventory: &Inventory<Req, Ctx>) -> MiddlewareResult<Arc<T>> {
        inventory.resolve::<T>(self.name).await
    }
}

impl<T> Clone for Key<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Key<T> {}

impl<T> fmt::Debug for Key<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Key")
            .field("name", &self.name)
            .field("type", &any::type_name::<T>())
            .finish()
    }
}
