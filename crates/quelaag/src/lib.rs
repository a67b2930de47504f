//! # Quelaag
//!
//! **Memoized request middleware and predicate dispatch**
//!
//! Quelaag splits request handling into two halves:
//!
//! - **Inventories**: named middleware derived lazily from the request and
//!   computed at most once per request, whether synchronous or asynchronous
//! - **Dispatchers**: ordered endpoints guarded by predicates, passive
//!   observers, a fallback, and sub-routers that see the parent inventory
//!
//! An HTTP server, layered configuration and telemetry are provided on top.
//!
//! ## Quick Start
//!
//! ```
//! use quelaag::prelude::*;
//!
//! # tokio_test::block_on(async {
//! let quelaag = Quelaag::new(MiddlewareSpec::<u32>::new().value("double", |inv| *inv.request() * 2));
//!
//! let mut dispatcher: Dispatcher<u32, ()> = Dispatcher::new(quelaag);
//! dispatcher.add_endpoint(Endpoint::new(
//!     |_req, inv| inv.get::<u32>("double").map(|double| *double > 10),
//!     |_req, _res, _inv| (),
//! ));
//!
//! let dispatched = dispatcher.dispatch(6_u32, ()).await.unwrap();
//! assert_eq!(dispatched.route(), Route::Endpoint(0));
//! # });
//! ```
//!
//! ## Architecture
//!
//! ```text
//! Request → Inventory (lazy, memoized) → observers
//!                   ↓
//!           endpoint predicates in order → handler | sub-router | fallback
//!                   ↓
//! failure → entry catch → global catcher → caller
//! ```

#![doc(html_root_url = "https://docs.rs/quelaag/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

// Inventories and middleware specifications
pub use quelaag_core as core;

// Predicate dispatch
pub use quelaag_router as router;

// HTTP serving
pub use quelaag_server as server;

// Layered configuration
pub use quelaag_config as config;

// Logging and metrics
pub use quelaag_telemetry as telemetry;

/// Prelude module for convenient imports.
///
/// # Example
///
/// ```
/// use quelaag::prelude::*;
///
/// let spec = MiddlewareSpec::<()>::new().value("answer", |_| 42_u8);
/// assert!(spec.contains("answer"));
/// ```
pub mod prelude {
    pub use quelaag_core::{
        lazy_subquelaag, multi_parent_subquelaag, subquelaag, BoxError, Inventory, Key,
        LazyParent, LazyParentInventory, MiddlewareError, MiddlewareResult, MiddlewareSpec,
        ParentInventory, Parents, Quelaag,
    };

    pub use quelaag_router::{
        Check, Completion, DispatchError, DispatchOptions, Dispatched, Dispatcher, Endpoint,
        Fallback, Observer, PredicateFailure, Route, SharedInventory, SubRoute,
    };

    pub use quelaag_server::{
        HttpDispatcher, HttpRequest, HttpResponse, Responder, Server, ServerConfig,
        ShutdownSignal,
    };

    pub use quelaag_config::{ConfigLoader, QuelaagConfig};

    pub use quelaag_telemetry::{init_telemetry, TelemetryConfig};
}
