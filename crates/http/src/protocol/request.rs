//! HTTP request representation.
//!
//! A request is produced once by [`parse`](crate::codec::parse) and is read-only from then on.
//! The only later addition is the wildcard capture, bound by the router through
//! [`HttpRequest::with_param`] before the request reaches a handler.

use std::collections::HashMap;

use bytes::Bytes;

/// Must equal `websocket` for a websocket handshake.
pub const UPGRADE: &str = "Upgrade";
/// Must equal `Upgrade` for a websocket handshake.
pub const CONNECTION: &str = "Connection";
/// Carries the nonce the accept key is derived from.
pub const SEC_WEBSOCKET_KEY: &str = "Sec-WebSocket-Key";
/// Announces the body length. Matched case-insensitively while framing.
pub const CONTENT_LENGTH: &str = "Content-Length";

/// A parsed HTTP request.
///
/// Header names keep the case they were received with and lookups are exact,
/// a later duplicate header replaces an earlier one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    method: String,
    path: String,
    headers: HashMap<String, String>,
    param: Option<String>,
    body: Bytes,
}

impl HttpRequest {
    /// Creates a request with no wildcard capture.
    ///
    /// # Arguments
    ///
    /// * `method` - the method token of the start line
    /// * `path` - the target as received, query string included
    /// * `headers` - header names mapped to their values, names in received case
    /// * `body` - the body bytes, empty when no `Content-Length` was sent
    pub fn new(method: impl Into<String>, path: impl Into<String>, headers: HashMap<String, String>, body: Bytes) -> Self {
        Self { method: method.into(), path: path.into(), headers, param: None, body }
    }

    /// Returns the request method exactly as it appeared on the start line.
    pub fn method(&self) -> &str {
        &self.method
    }

    /// Returns the raw request target, including any query string.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Returns the request target without its query string, the part used for routing.
    pub fn route_path(&self) -> &str {
        match self.path.split_once('?') {
            Some((path, _query)) => path,
            None => &self.path,
        }
    }

    /// Returns the query string, if any.
    pub fn query(&self) -> Option<&str> {
        self.path.split_once('?').map(|(_path, query)| query)
    }

    /// All headers of the request.
    ///
    /// Names keep their received case. A name sent twice holds the later value.
    pub fn headers(&self) -> &HashMap<String, String> {
        &self.headers
    }

    /// Looks up one header value.
    ///
    /// # Arguments
    ///
    /// * `name` - the header name, compared exactly
    ///
    /// # Returns
    ///
    /// `None` if no header with exactly this name was received.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(String::as_str)
    }

    /// The path remainder captured by a wildcard route, if the request was routed through one.
    pub fn param(&self) -> Option<&str> {
        self.param.as_deref()
    }

    /// The body bytes, bounded by `Content-Length`. Empty for requests without one.
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Binds the wildcard capture, consuming the request.
    #[must_use]
    pub fn with_param(self, param: Option<String>) -> Self {
        Self { param, ..self }
    }

    /// A request is a websocket handshake iff `Upgrade: websocket` and `Connection: Upgrade`
    /// are present verbatim and a `Sec-WebSocket-Key` is supplied.
    pub fn is_websocket_handshake(&self) -> bool {
        self.header(UPGRADE) == Some("websocket")
            && self.header(CONNECTION) == Some("Upgrade")
            && self.headers.contains_key(SEC_WEBSOCKET_KEY)
    }

    /// The `Sec-WebSocket-Key` value, if present.
    pub fn websocket_key(&self) -> Option<&str> {
        self.header(SEC_WEBSOCKET_KEY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(headers: &[(&str, &str)]) -> HttpRequest {
        let headers = headers.iter().map(|(name, value)| ((*name).to_string(), (*value).to_string())).collect();
        HttpRequest::new("GET", "/chat?room=1", headers, Bytes::new())
    }

    #[test]
    fn split_path_and_query() {
        let req = request(&[]);
        assert_eq!(req.path(), "/chat?room=1");
        assert_eq!(req.route_path(), "/chat");
        assert_eq!(req.query(), Some("room=1"));
    }

    #[test]
    fn detect_handshake() {
        let req = request(&[("Upgrade", "websocket"), ("Connection", "Upgrade"), ("Sec-WebSocket-Key", "abc")]);
        assert!(req.is_websocket_handshake());
        assert_eq!(req.websocket_key(), Some("abc"));
    }

    #[test]
    fn handshake_headers_are_case_sensitive() {
        let req = request(&[("Upgrade", "WebSocket"), ("Connection", "Upgrade"), ("Sec-WebSocket-Key", "abc")]);
        assert!(!req.is_websocket_handshake());

        let req = request(&[("upgrade", "websocket"), ("Connection", "Upgrade"), ("Sec-WebSocket-Key", "abc")]);
        assert!(!req.is_websocket_handshake());
    }

    #[test]
    fn handshake_needs_key() {
        let req = request(&[("Upgrade", "websocket"), ("Connection", "Upgrade")]);
        assert!(!req.is_websocket_handshake());
    }

    #[test]
    fn bind_param() {
        let req = request(&[]).with_param(Some("app.js".into()));
        assert_eq!(req.param(), Some("app.js"));
    }
}
