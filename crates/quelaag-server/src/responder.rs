//! The response handle passed through dispatch.
//!
//! A [`Responder`] is the opaque response value a dispatcher hands to the
//! selected handler. Clones share one slot, and the first successful send
//! wins. When every clone is dropped without a send, the waiting connection
//! learns that no response is coming.

use std::sync::Arc;

use bytes::Bytes;
use http::header::CONTENT_TYPE;
use http::{Response, StatusCode};
use http_body_util::Full;
use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::oneshot;

use crate::error::ResponseError;

/// Response body type.
pub type ResponseBody = Full<Bytes>;

/// HTTP response type.
pub type HttpResponse = Response<ResponseBody>;

/// Receiving half of [`Responder::channel`].
pub type ResponseReceiver = oneshot::Receiver<HttpResponse>;

/// A cloneable, respond-once handle for one HTTP exchange.
#[derive(Debug, Clone)]
pub struct Responder {
    slot: Arc<Mutex<Option<oneshot::Sender<HttpResponse>>>>,
}

impl Responder {
    /// Creates a responder and the receiver the transport waits on.
    #[must_use]
    pub fn channel() -> (Self, ResponseReceiver) {
        let (sender, receiver) = oneshot::channel();
        (
            Self {
                slot: Arc::new(Mutex::new(Some(sender))),
            },
            receiver,
        )
    }

    /// Sends a fully built response.
    ///
    /// # Errors
    ///
    /// Returns `ResponseError::AlreadySent` after the first send and
    /// `ResponseError::Closed` if the transport stopped waiting.
    pub fn send(&self, response: HttpResponse) -> Result<(), ResponseError> {
        let sender = self.slot.lock().take().ok_or(ResponseError::AlreadySent)?;
        sender.send(response).map_err(|_| ResponseError::Closed)
    }

    /// Sends a response with no body.
    ///
    /// # Errors
    ///
    /// See [`send`](Self::send).
    pub fn status(&self, status: StatusCode) -> Result<(), ResponseError> {
        self.send(build(status, None, Bytes::new())?)
    }

    /// Sends a `text/plain` response.
    ///
    /// # Errors
    ///
    /// See [`send`](Self::send).
    pub fn text(&self, status: StatusCode, body: impl Into<String>) -> Result<(), ResponseError> {
        let body = Bytes::from(body.into());
        self.send(build(status, Some("text/plain; charset=utf-8"), body)?)
    }

    /// Sends an `application/json` response.
    ///
    /// # Errors
    ///
    /// Returns `ResponseError::Build` if `value` cannot be serialized;
    /// otherwise see [`send`](Self::send).
    pub fn json<T: Serialize>(&self, status: StatusCode, value: &T) -> Result<(), ResponseError> {
        let body = serde_json::to_vec(value).map_err(|e| ResponseError::Build(e.to_string()))?;
        self.send(build(status, Some("application/json"), Bytes::from(body))?)
    }

    /// Returns `true` once a response was sent.
    #[must_use]
    pub fn is_sent(&self) -> bool {
        self.slot.lock().is_none()
    }
}

pub(crate) fn build(
    status: StatusCode,
    content_type: Option<&'static str>,
    body: Bytes,
) -> Result<HttpResponse, ResponseError> {
    let mut builder = Response::builder().status(status);
    if let Some(content_type) = content_type {
        builder = builder.header(CONTENT_TYPE, content_type);
    }
    builder
        .body(Full::new(body))
        .map_err(|e| ResponseError::Build(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    #[tokio::test]
    async fn test_first_send_wins() {
        let (responder, receiver) = Responder::channel();
        let clone = responder.clone();

        responder.text(StatusCode::CREATED, "made").unwrap();
        assert!(clone.is_sent());
        assert_eq!(clone.status(StatusCode::OK), Err(ResponseError::AlreadySent));

        let response = receiver.await.unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&body[..], b"made");
    }

    #[tokio::test]
    async fn test_dropping_all_clones_closes() {
        let (responder, receiver) = Responder::channel();
        let clone = responder.clone();
        drop(responder);
        drop(clone);
        assert!(receiver.await.is_err());
    }

    #[test]
    fn test_send_after_receiver_dropped() {
        let (responder, receiver) = Responder::channel();
        drop(receiver);
        assert_eq!(responder.status(StatusCode::OK), Err(ResponseError::Closed));
    }

    #[tokio::test]
    async fn test_json_sets_content_type() {
        let (responder, receiver) = Responder::channel();
        responder
            .json(StatusCode::OK, &serde_json::json!({ "hello": "world" }))
            .unwrap();
        let response = receiver.await.unwrap();
        assert_eq!(response.headers()[CONTENT_TYPE], "application/json");
    }
}
