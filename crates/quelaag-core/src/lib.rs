//! # Quelaag Core
//!
//! Lazily evaluated, per-request memoized middleware.
//!
//! A [`MiddlewareSpec`] names a set of derivers. Freezing it into a
//! [`Quelaag`] factory yields one [`Inventory`] per request; each accessor in
//! the inventory runs its deriver on first call and returns the cached value
//! afterwards. Derivers may read other accessors of the same inventory, and
//! asynchronous derivers produce a shared future that every caller awaits.
//!
//! ## Example
//!
//! ```
//! use quelaag_core::{MiddlewareSpec, Quelaag};
//!
//! let spec = MiddlewareSpec::<String>::new()
//!     .value("path", |inv| inv.request().clone())
//!     .value("is_root", |inv| {
//!         inv.get::<String>("path").map(|p| p.as_str() == "/").unwrap_or(false)
//!     });
//!
//! let inventory = Quelaag::new(spec).build("/".to_string(), ());
//! assert!(*inventory.get::<bool>("is_root").unwrap());
//! ```
//!
//! ## Composition
//!
//! Child factories read a parent inventory through their context, see
//! [`subquelaag`], [`lazy_subquelaag`] and [`multi_parent_subquelaag`].

#![doc(html_root_url = "https://docs.rs/quelaag-core/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod compose;
pub mod error;
pub mod inventory;
pub mod quelaag;
pub mod spec;
pub mod value;

pub use compose::{
    lazy_subquelaag, multi_parent_subquelaag, subquelaag, LazyParent, LazyParentInventory,
    ParentInventory, Parents,
};
pub use error::{panic_message, BoxError, MiddlewareError, MiddlewareResult, SharedError};
pub use inventory::Inventory;
pub use quelaag::{quelaag, Quelaag};
pub use spec::{Deriver, MiddlewareSpec};
pub use value::{Derived, Key, Memo, PendingValue, Value};
