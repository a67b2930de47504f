//! Test request building.

use bytes::Bytes;
use http::{header, HeaderMap, HeaderName, HeaderValue, Method};
use serde::Serialize;

use crate::error::TestError;

/// Entry point for building `http::Request<Bytes>` values.
pub struct TestRequest;

impl TestRequest {
    /// Starts a GET request.
    pub fn get(uri: impl AsRef<str>) -> TestRequestBuilder {
        TestRequestBuilder::new(Method::GET, uri)
    }

    /// Starts a POST request.
    pub fn post(uri: impl AsRef<str>) -> TestRequestBuilder {
        TestRequestBuilder::new(Method::POST, uri)
    }

    /// Starts a PUT request.
    pub fn put(uri: impl AsRef<str>) -> TestRequestBuilder {
        TestRequestBuilder::new(Method::PUT, uri)
    }

    /// Starts a PATCH request.
    pub fn patch(uri: impl AsRef<str>) -> TestRequestBuilder {
        TestRequestBuilder::new(Method::PATCH, uri)
    }

    /// Starts a DELETE request.
    pub fn delete(uri: impl AsRef<str>) -> TestRequestBuilder {
        TestRequestBuilder::new(Method::DELETE, uri)
    }
}

/// Builder for test requests.
#[must_use]
pub struct TestRequestBuilder {
    method: Method,
    uri: String,
    headers: HeaderMap,
    body: Bytes,
}

impl TestRequestBuilder {
    /// Creates a builder for `method` and `uri`.
    pub fn new(method: Method, uri: impl AsRef<str>) -> Self {
        Self {
            method,
            uri: uri.as_ref().to_string(),
            headers: HeaderMap::new(),
            body: Bytes::new(),
        }
    }

    /// Sets a header.
    pub fn header(mut self, name: impl AsRef<str>, value: impl AsRef<str>) -> Self {
        let name = HeaderName::try_from(name.as_ref()).expect("valid header name");
        let value = HeaderValue::try_from(value.as_ref()).expect("valid header value");
        self.headers.insert(name, value);
        self
    }

    /// Sets the `Cookie` header.
    pub fn cookie(self, cookie: impl AsRef<str>) -> Self {
        self.header(header::COOKIE.as_str(), cookie)
    }

    /// Sets the raw body.
    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Sets a JSON body and the matching `Content-Type`.
    pub fn json<T: Serialize>(mut self, value: &T) -> Self {
        self.body = Bytes::from(serde_json::to_vec(value).expect("serializable body"));
        self.header(header::CONTENT_TYPE.as_str(), "application/json")
    }

    /// Builds the request, reporting invalid parts.
    pub fn try_build(self) -> Result<http::Request<Bytes>, TestError> {
        let mut builder = http::Request::builder().method(self.method).uri(self.uri);
        for (name, value) in &self.headers {
            builder = builder.header(name, value);
        }
        builder
            .body(self.body)
            .map_err(|e| TestError::RequestBuild(e.to_string()))
    }

    /// Builds the request.
    pub fn build(self) -> http::Request<Bytes> {
        self.try_build().expect("valid request")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builds_request() {
        let request = TestRequest::post("/users?active=1")
            .header("x-trace", "abc")
            .body("payload")
            .build();

        assert_eq!(request.method(), Method::POST);
        assert_eq!(request.uri().path(), "/users");
        assert_eq!(request.headers()["x-trace"], "abc");
        assert_eq!(request.body().as_ref(), b"payload");
    }

    #[test]
    fn test_json_sets_content_type() {
        let request = TestRequest::put("/items/1")
            .json(&serde_json::json!({"name": "lamp"}))
            .build();
        assert_eq!(request.headers()[header::CONTENT_TYPE], "application/json");
    }

    #[test]
    fn test_invalid_uri_reports_error() {
        let result = TestRequest::get("not a uri").try_build();
        assert!(matches!(result, Err(TestError::RequestBuild(_))));
    }
}
