//! Layering inventories.
//!
//! A child factory reaches its parent's middleware through its context:
//!
//! - [`subquelaag`] takes the already built parent inventory.
//! - [`lazy_subquelaag`] takes a [`LazyParent`] that builds the parent on
//!   first use.
//! - [`multi_parent_subquelaag`] takes a keyed set of [`Parents`].
//!
//! In every case the parent memoizes independently of the child, so a value
//! read through several children is still computed once.

use std::any::{self, Any};
use std::fmt;
use std::sync::{Arc, OnceLock};

use indexmap::IndexMap;

use crate::error::{MiddlewareError, MiddlewareResult};
use crate::inventory::Inventory;
use crate::quelaag::Quelaag;
use crate::spec::MiddlewareSpec;

/// Context of a child whose parent inventory is passed eagerly.
pub type ParentInventory<Req, PCtx> = Arc<Inventory<Req, PCtx>>;

/// Context of a child whose parent inventory is built on demand.
pub type LazyParentInventory<Req, PCtx> = LazyParent<Arc<Inventory<Req, PCtx>>>;

/// Builds a child factory whose context is the parent's inventory.
///
/// `parent` fixes the context type; the child is built with the parent
/// inventory of the same request. Derivers read parent values through
/// `inv.context()`.
pub fn subquelaag<Req: 'static, PCtx: 'static>(
    _parent: &Quelaag<Req, PCtx>,
    spec: MiddlewareSpec<Req, ParentInventory<Req, PCtx>>,
) -> Quelaag<Req, ParentInventory<Req, PCtx>> {
    Quelaag::new(spec)
}

/// Builds a child factory whose parent inventory is computed lazily.
pub fn lazy_subquelaag<Req: 'static, PCtx: 'static>(
    _parent: &Quelaag<Req, PCtx>,
    spec: MiddlewareSpec<Req, LazyParentInventory<Req, PCtx>>,
) -> Quelaag<Req, LazyParentInventory<Req, PCtx>> {
    Quelaag::new(spec)
}

/// Builds a child factory over several keyed parents.
pub fn multi_parent_subquelaag<Req: 'static>(
    spec: MiddlewareSpec<Req, Parents>,
) -> Quelaag<Req, Parents> {
    Quelaag::new(spec)
}

/// A value computed on first access and shared by every clone.
pub struct LazyParent<P> {
    inner: Arc<LazyInner<P>>,
}

struct LazyInner<P> {
    cell: OnceLock<P>,
    init: Box<dyn Fn() -> P + Send + Sync>,
}

impl<P> LazyParent<P> {
    /// Wraps an initializer. It runs at most once.
    pub fn new(init: impl Fn() -> P + Send + Sync + 'static) -> Self {
        Self {
            inner: Arc::new(LazyInner {
                cell: OnceLock::new(),
                init: Box::new(init),
            }),
        }
    }

    /// Returns the value, computing it on first access.
    pub fn get(&self) -> &P {
        self.inner.cell.get_or_init(|| (self.inner.init)())
    }

    /// Returns `true` once the value has been computed.
    pub fn is_initialized(&self) -> bool {
        self.inner.cell.get().is_some()
    }
}

impl<Req: 'static, PCtx: Clone + Send + Sync + 'static> LazyParent<Arc<Inventory<Req, PCtx>>> {
    /// Builds the parent inventory of `request` on first access.
    pub fn from_factory(factory: &Quelaag<Req, PCtx>, request: Arc<Req>, context: PCtx) -> Self
    where
        Req: Send + Sync,
    {
        let factory = factory.clone();
        Self::new(move || factory.build(Arc::clone(&request), context.clone()))
    }
}

impl<P> Clone for LazyParent<P> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<P> fmt::Debug for LazyParent<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LazyParent")
            .field("initialized", &self.is_initialized())
            .finish()
    }
}

/// Keyed parent inventories of a multi-parent child.
#[derive(Clone, Default)]
pub struct Parents {
    inventories: IndexMap<String, Arc<dyn Any + Send + Sync>>,
}

impl Parents {
    /// Creates an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a parent inventory under `key`.
    #[must_use]
    pub fn with<Req, Ctx>(mut self, key: impl Into<String>, inventory: Arc<Inventory<Req, Ctx>>) -> Self
    where
        Req: Send + Sync + 'static,
        Ctx: Send + Sync + 'static,
    {
        self.inventories.insert(key.into(), inventory);
        self
    }

    /// Returns the parent inventory under `key`.
    pub fn inventory<Req, Ctx>(&self, key: &str) -> MiddlewareResult<Arc<Inventory<Req, Ctx>>>
    where
        Req: Send + Sync + 'static,
        Ctx: Send + Sync + 'static,
    {
        let parent = self
            .inventories
            .get(key)
            .ok_or_else(|| MiddlewareError::missing_parent(key))?;
        Arc::clone(parent)
            .downcast::<Inventory<Req, Ctx>>()
            .map_err(|_| MiddlewareError::TypeMismatch {
                name: key.to_string(),
                expected: any::type_name::<Inventory<Req, Ctx>>(),
            })
    }

    /// Iterates over parent keys in insertion order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.inventories.keys().map(String::as_str)
    }

    /// Returns the number of parents.
    pub fn len(&self) -> usize {
        self.inventories.len()
    }

    /// Returns `true` if there are no parents.
    pub fn is_empty(&self) -> bool {
        self.inventories.is_empty()
    }
}

impl fmt::Debug for Parents {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Parents")
            .field("keys", &self.inventories.keys().collect::<Vec<_>>())
            .finish()
    }
}
