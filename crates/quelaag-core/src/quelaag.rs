//! The inventory factory.

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;

use crate::inventory::Inventory;
use crate::spec::{Deriver, MiddlewareSpec};

/// Builds a fresh [`Inventory`] for every request.
///
/// The factory is cheap to clone; all clones share one frozen set of
/// derivers.
///
/// ```
/// use quelaag_core::{MiddlewareSpec, Quelaag};
///
/// let factory = Quelaag::new(
///     MiddlewareSpec::<String>::new().value("length", |inv| inv.request().len()),
/// );
///
/// let inventory = factory.build("hello".to_string(), ());
/// assert_eq!(*inventory.get::<usize>("length").unwrap(), 5);
/// ```
pub struct Quelaag<Req, Ctx = ()> {
    derivers: Arc<IndexMap<String, Deriver<Req, Ctx>>>,
}

impl<Req: 'static, Ctx: 'static> Quelaag<Req, Ctx> {
    /// Freezes a specification into a factory.
    pub fn new(spec: MiddlewareSpec<Req, Ctx>) -> Self {
        Self {
            derivers: Arc::new(spec.into_derivers()),
        }
    }

    /// Builds the inventory of one request.
    pub fn build(&self, request: impl Into<Arc<Req>>, context: Ctx) -> Arc<Inventory<Req, Ctx>> {
        let inventory = Inventory::new(Arc::clone(&self.derivers), request.into(), context);
        tracing::trace!(middleware = self.derivers.len(), "inventory built");
        Arc::new(inventory)
    }

    /// Iterates over accessor names in registration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.derivers.keys().map(String::as_str)
    }

    /// Returns the number of accessors.
    pub fn len(&self) -> usize {
        self.derivers.len()
    }

    /// Returns `true` if the factory has no accessors.
    pub fn is_empty(&self) -> bool {
        self.derivers.is_empty()
    }
}

impl<Req, Ctx> Clone for Quelaag<Req, Ctx> {
    fn clone(&self) -> Self {
        Self {
            derivers: Arc::clone(&self.derivers),
        }
    }
}

impl<Req: 'static, Ctx: 'static> From<MiddlewareSpec<Req, Ctx>> for Quelaag<Req, Ctx> {
    fn from(spec: MiddlewareSpec<Req, Ctx>) -> Self {
        Self::new(spec)
    }
}

impl<Req, Ctx> fmt::Debug for Quelaag<Req, Ctx> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Quelaag")
            .field("names", &self.derivers.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Freezes a specification into a factory.
pub fn quelaag<Req: 'static, Ctx: 'static>(spec: MiddlewareSpec<Req, Ctx>) -> Quelaag<Req, Ctx> {
    Quelaag::new(spec)
}
