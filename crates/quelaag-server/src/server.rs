//! HTTP server feeding requests into a dispatcher.
//!
//! Each request's body is collected into an [`HttpRequest`], handed to the
//! root dispatcher together with a fresh [`Responder`], and the exchange is
//! finished with whatever the selected handler sends. When nothing is sent,
//! the server answers for it:
//!
//! | Outcome                                         | Status             |
//! |-------------------------------------------------|--------------------|
//! | handler sent a response                         | handler's          |
//! | dispatch or the handler failed unhandled        | `500`              |
//! | no route, or the handler finished silently      | `not_found_status` |
//! | nothing within `response_timeout`               | `504`              |

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use bytes::Bytes;
use http::{Request, StatusCode};
use http_body_util::{BodyExt, Full, LengthLimitError, Limited};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use quelaag_router::{DispatchError, Dispatcher, Route};
use quelaag_telemetry::fields;
use quelaag_telemetry::metrics::{record_request, render_metrics, InFlightGuard};
use tokio::net::{TcpListener, TcpStream};

use crate::config::ServerConfig;
use crate::error::ServerError;
use crate::responder::{build, HttpResponse, Responder, ResponseReceiver};
use crate::shutdown::{ConnectionTracker, ShutdownSignal};

/// The request type dispatched by the server.
pub type HttpRequest = Request<Bytes>;

/// The root dispatcher type served over HTTP.
pub type HttpDispatcher<Ctx = ()> = Dispatcher<HttpRequest, Responder, Ctx>;

/// HTTP/1.1 server for one root dispatcher.
pub struct Server<Ctx = ()> {
    config: ServerConfig,
    dispatcher: Arc<HttpDispatcher<Ctx>>,
}

impl<Ctx> Server<Ctx>
where
    Ctx: Default + Send + Sync + 'static,
{
    /// Creates a server for `dispatcher`.
    pub fn new(config: ServerConfig, dispatcher: impl Into<Arc<HttpDispatcher<Ctx>>>) -> Self {
        Self {
            config,
            dispatcher: dispatcher.into(),
        }
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Returns the root dispatcher.
    #[must_use]
    pub fn dispatcher(&self) -> &Arc<HttpDispatcher<Ctx>> {
        &self.dispatcher
    }

    /// Runs until SIGINT or SIGTERM.
    ///
    /// # Errors
    ///
    /// Returns `ServerError::BindError` if the address cannot be bound.
    pub async fn run(self) -> Result<(), ServerError> {
        self.run_with_shutdown(ShutdownSignal::with_os_signals()).await
    }

    /// Binds the configured address and runs until `shutdown` triggers.
    ///
    /// # Errors
    ///
    /// Returns `ServerError::BindError` if the address is invalid or in use.
    pub async fn run_with_shutdown(self, shutdown: ShutdownSignal) -> Result<(), ServerError> {
        let addr = self.config.socket_addr().map_err(|e| {
            ServerError::BindError(format!("Invalid address '{}': {e}", self.config.http_addr()))
        })?;
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| ServerError::BindError(format!("Failed to bind to {addr}: {e}")))?;
        self.serve(listener, shutdown).await
    }

    /// Accepts connections from `listener` until `shutdown` triggers, then
    /// waits up to the shutdown timeout for open connections.
    ///
    /// # Errors
    ///
    /// Returns `ServerError::IoError` if the listener has no local address.
    pub async fn serve(self, listener: TcpListener, shutdown: ShutdownSignal) -> Result<(), ServerError> {
        let local = listener
            .local_addr()
            .map_err(|e| ServerError::IoError(e.to_string()))?;
        tracing::info!(addr = %local, "Server listening");

        let server = Arc::new(self);
        let tracker = ConnectionTracker::new();

        loop {
            tokio::select! {
                accepted = listener.accept() => match accepted {
                    Ok((stream, remote_addr)) => {
                        let server = Arc::clone(&server);
                        let token = tracker.acquire();
                        let shutdown = shutdown.clone();
                        tokio::spawn(async move {
                            if let Err(e) = server.handle_connection(stream, remote_addr, shutdown).await {
                                tracing::debug!(remote = %remote_addr, error = %e, "connection error");
                            }
                            drop(token);
                        });
                    }
                    Err(e) => tracing::error!(error = %e, "Failed to accept connection"),
                },
                () = shutdown.recv() => {
                    tracing::info!("Shutdown signal received, stopping server");
                    break;
                }
            }
        }

        let timeout = server.config.shutdown_timeout();
        tokio::select! {
            () = tracker.wait_for_shutdown() => tracing::info!("All connections closed"),
            () = tokio::time::sleep(timeout) => tracing::warn!(
                active = tracker.active_connections(),
                "Shutdown timeout reached with connections still open"
            ),
        }

        tracing::info!("Server stopped");
        Ok(())
    }

    /// Runs one exchange through the dispatcher.
    ///
    /// Always produces a response; see the module docs for the status used
    /// when the handler sends none.
    pub async fn respond(&self, request: HttpRequest) -> HttpResponse {
        let started = Instant::now();
        let method = request.method().clone();
        let path = request.uri().path().to_string();

        let response = if self.is_metrics_request(&request) {
            metrics_response()
        } else {
            let (responder, receiver) = Responder::channel();
            match tokio::time::timeout(
                self.config.response_timeout(),
                self.exchange(request, responder, receiver),
            )
            .await
            {
                Ok(response) => response,
                Err(_) => {
                    tracing::warn!(
                        { fields::HTTP_METHOD } = %method,
                        { fields::HTTP_PATH } = %path,
                        "response timed out"
                    );
                    error_response(
                        StatusCode::GATEWAY_TIMEOUT,
                        "RESPONSE_TIMEOUT",
                        "No response within the configured timeout",
                    )
                }
            }
        };

        tracing::debug!(
            { fields::HTTP_METHOD } = %method,
            { fields::HTTP_PATH } = %path,
            { fields::HTTP_STATUS } = response.status().as_u16(),
            "request served"
        );
        record_request(method.as_str(), response.status().as_u16(), started.elapsed());
        response
    }

    async fn exchange(
        &self,
        request: HttpRequest,
        responder: Responder,
        receiver: ResponseReceiver,
    ) -> HttpResponse {
        let path = request.uri().path().to_string();
        let mut dispatched = match self.dispatcher.dispatch(request, responder).await {
            Ok(dispatched) => dispatched,
            Err(err) => {
                // A handler may have responded before failing.
                return match receiver.await {
                    Ok(response) => response,
                    Err(_) => failure_response(&err),
                };
            }
        };

        let route = dispatched.route();
        match receiver.await {
            Ok(response) => response,
            // Every responder clone is gone, so the handler is done.
            Err(_) => match dispatched.handler_settled().await {
                Err(err) => failure_response(&err),
                Ok(()) => self.no_response(route, &path),
            },
        }
    }

    fn is_metrics_request(&self, request: &HttpRequest) -> bool {
        self.config
            .metrics_path()
            .is_some_and(|metrics| request.method() == http::Method::GET && request.uri().path() == metrics)
    }

    fn no_response(&self, route: Route, path: &str) -> HttpResponse {
        tracing::debug!(route = route.kind(), { fields::HTTP_PATH } = %path, "no response sent");
        let status = self.config.not_found_status();
        let body = serde_json::json!({
            "error": status.canonical_reason().unwrap_or("No Response"),
            "path": path,
        });
        json_response(status, &body)
    }

    async fn handle_connection(
        self: &Arc<Self>,
        stream: TcpStream,
        remote_addr: SocketAddr,
        shutdown: ShutdownSignal,
    ) -> Result<(), hyper::Error> {
        let io = TokioIo::new(stream);
        let server = Arc::clone(self);

        let service = service_fn(move |req: Request<Incoming>| {
            let server = Arc::clone(&server);
            async move { server.handle_request(req).await }
        });

        let conn = http1::Builder::new().serve_connection(io, service);
        tokio::pin!(conn);

        tokio::select! {
            result = conn.as_mut() => result,
            () = shutdown.recv() => {
                tracing::debug!(remote = %remote_addr, "draining connection for shutdown");
                conn.as_mut().graceful_shutdown();
                conn.as_mut().await
            }
        }
    }

    async fn handle_request(self: &Arc<Self>, req: Request<Incoming>) -> Result<HttpResponse, Infallible> {
        let _in_flight = InFlightGuard::new();
        let (parts, body) = req.into_parts();

        let body = match Limited::new(body, self.config.max_body_bytes()).collect().await {
            Ok(collected) => collected.to_bytes(),
            Err(e) if e.downcast_ref::<LengthLimitError>().is_some() => {
                return Ok(error_response(
                    StatusCode::PAYLOAD_TOO_LARGE,
                    "BODY_TOO_LARGE",
                    "Request body exceeds the configured limit",
                ));
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to collect request body");
                return Ok(error_response(
                    StatusCode::BAD_REQUEST,
                    "BODY_READ_ERROR",
                    "Failed to read request body",
                ));
            }
        };

        Ok(self.respond(Request::from_parts(parts, body)).await)
    }
}

impl<Ctx> std::fmt::Debug for Server<Ctx> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Server")
            .field("config", &self.config)
            .field("dispatcher", &self.dispatcher)
            .finish()
    }
}

fn failure_response(err: &DispatchError) -> HttpResponse {
    tracing::error!(
        { fields::ERROR } = %err,
        { fields::ENTRY } = err.target().map_or("dispatcher", |target| target.kind()),
        "dispatch failed"
    );
    error_response(
        StatusCode::INTERNAL_SERVER_ERROR,
        "DISPATCH_FAILED",
        "Internal Server Error",
    )
}

fn metrics_response() -> HttpResponse {
    let body = render_metrics().unwrap_or_default();
    build(
        StatusCode::OK,
        Some("text/plain; version=0.0.4"),
        Bytes::from(body),
    )
    .unwrap_or_else(|_| HttpResponse::new(Full::new(Bytes::new())))
}

fn error_response(status: StatusCode, code: &str, message: &str) -> HttpResponse {
    let body = serde_json::json!({
        "error": {
            "code": code,
            "message": message
        }
    });
    json_response(status, &body)
}

fn json_response(status: StatusCode, body: &serde_json::Value) -> HttpResponse {
    build(status, Some("application/json"), Bytes::from(body.to_string())).unwrap_or_else(|_| {
        let mut response = HttpResponse::new(Full::new(Bytes::new()));
        *response.status_mut() = status;
        response
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use quelaag_core::{MiddlewareSpec, Quelaag};
    use quelaag_router::Endpoint;
    use quelaag_test::TestRequest;
    use std::time::Duration;

    fn server(dispatcher: HttpDispatcher) -> Server {
        Server::new(
            ServerConfig::builder()
                .response_timeout(Duration::from_millis(200))
                .metrics_path(Some("/metrics".to_string()))
                .build(),
            dispatcher,
        )
    }

    #[tokio::test]
    async fn test_no_route_uses_not_found_status() {
        let dispatcher = HttpDispatcher::new(Quelaag::new(MiddlewareSpec::<HttpRequest>::new()));
        let response = server(dispatcher).respond(TestRequest::get("/missing").build()).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_sync_handler_failure_is_500() {
        let mut dispatcher = HttpDispatcher::new(Quelaag::new(MiddlewareSpec::<HttpRequest>::new()));
        dispatcher.add_endpoint(Endpoint::new(
            |_req, _inv| true,
            |_req, _res, _inv| Err::<(), _>("boom"),
        ));
        let response = server(dispatcher).respond(TestRequest::get("/").build()).await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_metrics_path_bypasses_dispatch() {
        let mut dispatcher = HttpDispatcher::new(Quelaag::new(MiddlewareSpec::<HttpRequest>::new()));
        dispatcher.add_endpoint(Endpoint::new(
            |_req, _inv| true,
            |_req, res: Responder, _inv| res.status(StatusCode::IM_A_TEAPOT),
        ));
        let server = server(dispatcher);
        let response = server.respond(TestRequest::get("/metrics").build()).await;
        assert_eq!(response.status(), StatusCode::OK);
        let response = server.respond(TestRequest::post("/metrics").build()).await;
        assert_eq!(response.status(), StatusCode::IM_A_TEAPOT);
    }

    #[tokio::test]
    async fn test_run_invalid_address() {
        let dispatcher = HttpDispatcher::new(Quelaag::new(MiddlewareSpec::<HttpRequest>::new()));
        let server = Server::new(ServerConfig::builder().http_addr("not-an-addr").build(), dispatcher);
        let result = server.run_with_shutdown(ShutdownSignal::new()).await;
        assert!(matches!(result, Err(ServerError::BindError(msg)) if msg.contains("Invalid address")));
    }
}
