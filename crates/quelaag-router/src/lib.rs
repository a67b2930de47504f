//! # Quelaag Router
//!
//! Ordered, asynchronous-aware dispatch of requests to handlers.
//!
//! A [`Dispatcher`] owns a [`Quelaag`](quelaag_core::Quelaag) factory and
//! three kinds of entries:
//!
//! - **Endpoints**, scanned in registration order; the first whose predicate
//!   matches handles the request. A pending predicate is awaited before the
//!   next endpoint is considered.
//! - **Observers**, every one of which is offered the request without
//!   blocking dispatch or each other.
//! - A single optional **fallback**, selected when no endpoint matches.
//!
//! Sub-routes delegate to another dispatcher whose context is this
//! dispatcher's inventory.
//!
//! ## Error handling
//!
//! Failures from predicates and handlers, including panics, go to the
//! entry's own `catch` first, then to the dispatcher-wide catcher. A failure
//! neither accepts is returned from [`Dispatcher::dispatch`], or, when it
//! occurs in background work, reported by [`Dispatched::settled`] and
//! logged through `tracing`.
//!
//! ## Example
//!
//! ```
//! use quelaag_core::{MiddlewareSpec, Quelaag};
//! use quelaag_router::{Dispatcher, Endpoint, Observer};
//!
//! # tokio_test::block_on(async {
//! let quelaag = Quelaag::new(
//!     MiddlewareSpec::<u32>::new().value("even", |inv| inv.request() % 2 == 0),
//! );
//!
//! let dispatcher = Dispatcher::<u32, ()>::builder(quelaag)
//!     .observer(Observer::new(|_req, _inv| true, |req, _inv| {
//!         tracing::info!(request = *req, "seen");
//!     }))
//!     .endpoint(Endpoint::new(
//!         |_req, inv| inv.get::<bool>("even").map(|even| *even),
//!         |_req, _res, _inv| (),
//!     ))
//!     .build();
//!
//! let dispatched = dispatcher.dispatch(4, ()).await.unwrap();
//! assert!(dispatched.route().is_handled());
//! # });
//! ```

#![doc(html_root_url = "https://docs.rs/quelaag-router/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod dispatcher;
pub mod entry;
pub mod error;
pub mod outcome;

pub use dispatcher::{
    DispatchId, DispatchOptions, Dispatched, Dispatcher, DispatcherBuilder, PredicateFailure, Route,
};
pub use entry::{Endpoint, Fallback, Observer, SharedInventory, SubRoute};
pub use error::{DispatchError, PanicError, Phase, Target};
pub use outcome::{Check, Completion, IntoCaught, IntoCheck, IntoCompletion};
