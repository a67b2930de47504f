//! Request predicates for endpoint and observer conditions.
//!
//! Plain boolean tests over an HTTP request, meant to be combined inside a
//! `when` closure:
//!
//! ```
//! use quelaag_server::predicates::{is_get, is_path};
//!
//! let request = http::Request::get("/health").body(()).unwrap();
//! assert!(is_get(&request) && is_path(&request, "/health"));
//! ```

use http::Request;

/// Returns `true` if the request method equals `method`.
pub fn is_method<B>(req: &Request<B>, method: &str) -> bool {
    req.method().as_str() == method
}

/// Returns `true` for `GET`.
pub fn is_get<B>(req: &Request<B>) -> bool {
    is_method(req, "GET")
}

/// Returns `true` for `POST`.
pub fn is_post<B>(req: &Request<B>) -> bool {
    is_method(req, "POST")
}

/// Returns `true` for `PUT`.
pub fn is_put<B>(req: &Request<B>) -> bool {
    is_method(req, "PUT")
}

/// Returns `true` for `DELETE`.
pub fn is_delete<B>(req: &Request<B>) -> bool {
    is_method(req, "DELETE")
}

/// Returns `true` for `PATCH`.
pub fn is_patch<B>(req: &Request<B>) -> bool {
    is_method(req, "PATCH")
}

/// Returns `true` for `HEAD`.
pub fn is_head<B>(req: &Request<B>) -> bool {
    is_method(req, "HEAD")
}

/// Returns `true` for `OPTIONS`.
pub fn is_options<B>(req: &Request<B>) -> bool {
    is_method(req, "OPTIONS")
}

/// Returns `true` for `CONNECT`.
pub fn is_connect<B>(req: &Request<B>) -> bool {
    is_method(req, "CONNECT")
}

/// Returns `true` for `TRACE`.
pub fn is_trace<B>(req: &Request<B>) -> bool {
    is_method(req, "TRACE")
}

/// Returns `true` if the path and query equal `url` exactly.
pub fn is_url<B>(req: &Request<B>, url: &str) -> bool {
    req.uri()
        .path_and_query()
        .is_some_and(|path_and_query| path_and_query.as_str() == url)
}

/// Returns `true` if the path, without query, equals `path`.
pub fn is_path<B>(req: &Request<B>, path: &str) -> bool {
    req.uri().path() == path
}

/// Returns `true` if the path starts with `prefix`.
pub fn has_path_prefix<B>(req: &Request<B>, prefix: &str) -> bool {
    req.uri().path().starts_with(prefix)
}
