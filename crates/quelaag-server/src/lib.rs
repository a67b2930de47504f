//! # Quelaag Server
//!
//! An HTTP/1.1 transport for Quelaag dispatchers, built on Hyper and Tokio.
//!
//! The dispatcher core never touches the network. This crate accepts
//! connections, turns each request into an [`HttpRequest`] plus a
//! [`Responder`], and runs them through a root
//! [`Dispatcher`](quelaag_router::Dispatcher):
//!
//! - [`Server`]: accept loop, response timeout, graceful shutdown
//! - [`Responder`]: the respond-once response handle handlers receive
//! - [`predicates`]: method and path checks for `when` closures
//!
//! ## Example
//!
//! ```rust,no_run
//! use quelaag_core::{MiddlewareSpec, Quelaag};
//! use quelaag_router::Endpoint;
//! use quelaag_server::predicates::{is_get, is_path};
//! use quelaag_server::{HttpDispatcher, HttpRequest, Responder, Server, ServerConfig};
//!
//! # async fn run() -> Result<(), quelaag_server::ServerError> {
//! let quelaag = Quelaag::new(MiddlewareSpec::<HttpRequest>::new());
//! let mut dispatcher = HttpDispatcher::new(quelaag);
//! dispatcher.add_endpoint(Endpoint::new(
//!     |req: &HttpRequest, _inv| is_get(req) && is_path(req, "/"),
//!     |_req, res: Responder, _inv| res.text(http::StatusCode::OK, "hello"),
//! ));
//!
//! Server::new(ServerConfig::default(), dispatcher).run().await
//! # }
//! ```

#![doc(html_root_url = "https://docs.rs/quelaag-server/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod config;
pub mod error;
pub mod predicates;
pub mod responder;
pub mod server;
pub mod shutdown;

pub use config::{ServerConfig, ServerConfigBuilder};
pub use error::{ResponseError, ServerError};
pub use responder::{HttpResponse, Responder, ResponseBody, ResponseReceiver};
pub use server::{HttpDispatcher, HttpRequest, Server};
pub use shutdown::{ConnectionToken, ConnectionTracker, ShutdownReceiver, ShutdownSignal};
