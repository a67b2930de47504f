//! Middleware specifications.
//!
//! A [`MiddlewareSpec`] maps names to derivers. A deriver receives the
//! inventory being evaluated, so it can read the request, the context, and
//! any sibling middleware through the same memoizing accessors.

use std::any::Any;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use indexmap::IndexMap;

use crate::error::BoxError;
use crate::inventory::Inventory;
use crate::value::Derived;

/// A type-erased deriver.
pub type Deriver<Req, Ctx> =
    Arc<dyn Fn(&Inventory<Req, Ctx>) -> Result<Derived, BoxError> + Send + Sync>;

/// Named derivers, evaluated lazily per request.
///
/// Registration order is preserved. Registering a name twice replaces the
/// earlier deriver in place.
pub struct MiddlewareSpec<Req, Ctx = ()> {
    derivers: IndexMap<String, Deriver<Req, Ctx>>,
}

impl<Req: 'static, Ctx: 'static> MiddlewareSpec<Req, Ctx> {
    /// Creates an empty specification.
    pub fn new() -> Self {
        Self {
            derivers: IndexMap::new(),
        }
    }

    /// Registers a raw deriver.
    #[must_use]
    pub fn derive<F>(mut self, name: impl Into<String>, deriver: F) -> Self
    where
        F: Fn(&Inventory<Req, Ctx>) -> Result<Derived, BoxError> + Send + Sync + 'static,
    {
        self.insert(name, Arc::new(deriver));
        self
    }

    /// Registers an infallible, synchronous deriver.
    #[must_use]
    pub fn value<F, T>(self, name: impl Into<String>, deriver: F) -> Self
    where
        F: Fn(&Inventory<Req, Ctx>) -> T + Send + Sync + 'static,
        T: Any + Send + Sync,
    {
        self.derive(name, move |inventory| Ok(Derived::ready(deriver(inventory))))
    }

    /// Registers a fallible, synchronous deriver.
    #[must_use]
    pub fn try_value<F, T, E>(self, name: impl Into<String>, deriver: F) -> Self
    where
        F: Fn(&Inventory<Req, Ctx>) -> Result<T, E> + Send + Sync + 'static,
        T: Any + Send + Sync,
        E: Into<BoxError>,
    {
        self.derive(name, move |inventory| {
            deriver(inventory).map(Derived::ready).map_err(Into::into)
        })
    }

    /// Registers an asynchronous deriver.
    ///
    /// The closure runs synchronously on first access and must capture what
    /// it needs from the inventory before returning its future.
    #[must_use]
    pub fn future<F, Fut, T, E>(self, name: impl Into<String>, deriver: F) -> Self
    where
        F: Fn(&Inventory<Req, Ctx>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
        T: Any + Send + Sync,
        E: Into<BoxError>,
    {
        self.derive(name, move |inventory| Ok(Derived::pending(deriver(inventory))))
    }

    /// Inserts a deriver, returning the one it replaced.
    pub fn insert(
        &mut self,
        name: impl Into<String>,
        deriver: Deriver<Req, Ctx>,
    ) -> Option<Deriver<Req, Ctx>> {
        self.derivers.insert(name.into(), deriver)
    }

    /// Returns `true` if `name` is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.derivers.contains_key(name)
    }

    /// Returns the number of registered derivers.
    pub fn len(&self) -> usize {
        self.derivers.len()
    }

    /// Returns `true` if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.derivers.is_empty()
    }

    /// Iterates over registered names in registration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.derivers.keys().map(String::as_str)
    }

    pub(crate) fn into_derivers(self) -> IndexMap<String, Deriver<Req, Ctx>> {
        self.derivers
    }
}

impl<Req: 'static, Ctx: 'static> Default for MiddlewareSpec<Req, Ctx> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Req, Ctx> Clone for MiddlewareSpec<Req, Ctx> {
    fn clone(&self) -> Self {
        Self {
            derivers: self.derivers.clone(),
        }
    }
}

impl<Req, Ctx> fmt::Debug for MiddlewareSpec<Req, Ctx> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MiddlewareSpec")
            .field("names", &self.derivers.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registration_order_is_kept() {
        let spec = MiddlewareSpec::<()>::new()
            .value("b", |_| 1_u8)
            .value("a", |_| 2_u8)
            .value("c", |_| 3_u8);
        assert_eq!(spec.names().collect::<Vec<_>>(), vec!["b", "a", "c"]);
    }

    #[test]
    fn test_duplicate_name_replaces() {
        let spec = MiddlewareSpec::<()>::new()
            .value("a", |_| 1_u8)
            .value("b", |_| 2_u8)
            .value("a", |_| 3_u8);
        assert_eq!(spec.len(), 2);
        assert_eq!(spec.names().collect::<Vec<_>>(), vec!["a", "b"]);
    }

    #[test]
    fn test_empty_spec() {
        let spec = MiddlewareSpec::<(), ()>::default();
        assert!(spec.is_empty());
        assert!(!spec.contains("anything"));
    }
}
