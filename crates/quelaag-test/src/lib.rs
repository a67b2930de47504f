//! # Quelaag Test
//!
//! Test utilities for Quelaag inventories and dispatchers.
//!
//! ## Key Features
//!
//! - **Deferred values**: futures resolved or rejected by the test body, for
//!   controlling exactly when an asynchronous predicate or deriver settles
//! - **Probes**: shared call counters and ordered event recorders that can be
//!   moved into callbacks
//! - **Request builder**: fluent construction of `http::Request<Bytes>`
//!
//! ## Example
//!
//! ```
//! use quelaag_test::{defer, CallCounter};
//!
//! # tokio_test::block_on(async {
//! let (resolver, pending) = defer::<u32>();
//! let counter = CallCounter::new();
//!
//! counter.hit();
//! resolver.resolve(7);
//!
//! assert_eq!(pending.await.unwrap(), 7);
//! assert_eq!(counter.count(), 1);
//! # });
//! ```

#![doc(html_root_url = "https://docs.rs/quelaag-test/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod deferred;
mod error;
mod request;
mod tally;

pub use deferred::{defer, Deferred, Resolver};
pub use error::TestError;
pub use request::{TestRequest, TestRequestBuilder};
pub use tally::{CallCounter, Recorder};

/// Lets spawned tasks run until they block.
///
/// Yields to the scheduler a fixed number of times; on a current-thread
/// runtime this drives every ready task forward.
pub async fn flush() {
    for _ in 0..32 {
        tokio::task::yield_now().await;
    }
}
