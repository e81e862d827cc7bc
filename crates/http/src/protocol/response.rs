//! HTTP response description.
//!
//! A [`ResponseSpec`] is a plain value: status, ordered header lines and body. It is assembled
//! by the caller and handed once to [`render`](crate::codec::render), nothing is mutated in place.

use bytes::Bytes;
use http::StatusCode;

const TEXT_PLAIN: &str = "text/plain; charset=utf-8";
const APPLICATION_JSON: &str = "application/json";

/// A response as handed to [`render`](crate::codec::render).
///
/// Headers are written in the order they are stored. Nothing is added during rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseSpec {
    pub status: StatusCode,
    /// Header lines in emission order, rendered as `name: value`.
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
}

impl ResponseSpec {
    /// Creates a response from its raw parts, no header is added.
    pub fn new(status: StatusCode, headers: Vec<(String, String)>, body: Bytes) -> Self {
        Self { status, headers, body }
    }

    /// A response carrying `body` with `Content-Type` and `Content-Length` set.
    pub fn with_body(status: StatusCode, content_type: &str, body: impl Into<Bytes>) -> Self {
        let body = body.into();
        let headers = vec![
            ("Content-Type".to_string(), content_type.to_string()),
            ("Content-Length".to_string(), body.len().to_string()),
        ];
        Self { status, headers, body }
    }

    /// A `text/plain` response with the given status.
    pub fn text(status: StatusCode, body: impl Into<Bytes>) -> Self {
        Self::with_body(status, TEXT_PLAIN, body)
    }

    /// A `200` response.
    ///
    /// # Arguments
    ///
    /// * `content_type` - value of the `Content-Type` header
    /// * `body` - the body, its length becomes `Content-Length`
    pub fn ok(content_type: &str, body: impl Into<Bytes>) -> Self {
        Self::with_body(StatusCode::OK, content_type, body)
    }

    /// A `200` with an already serialized json body.
    pub fn json(body: impl Into<Bytes>) -> Self {
        Self::ok(APPLICATION_JSON, body)
    }

    /// The `404` answered for unknown routes and missing files.
    pub fn not_found() -> Self {
        Self::text(StatusCode::NOT_FOUND, "404 not found")
    }

    /// The `400` answered for requests that can not be parsed.
    pub fn bad_request() -> Self {
        Self::text(StatusCode::BAD_REQUEST, "400 bad request")
    }

    /// The `500` answered when a handler fails.
    pub fn internal_error() -> Self {
        Self::text(StatusCode::INTERNAL_SERVER_ERROR, "500 internal server error")
    }

    /// The reason phrase written on the status line.
    ///
    /// Only 200 reads `OK`; every other code, including 101 and 400, reads `Not Found`.
    pub fn reason(&self) -> &'static str {
        if self.status == StatusCode::OK { "OK" } else { "Not Found" }
    }

    /// The first value of header `name`, compared exactly.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.iter().find(|(key, _)| key == name).map(|(_, value)| value.as_str())
    }
}
