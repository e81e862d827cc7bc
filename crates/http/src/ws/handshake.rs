//! WebSocket opening handshake.
//!
//! The server answers an upgrade request with `101`, echoing a `Sec-WebSocket-Accept`
//! derived from the client's `Sec-WebSocket-Key`.

use base64::Engine;
use bytes::Bytes;
use http::StatusCode;
use sha1::{Digest, Sha1};

use crate::protocol::ResponseSpec;

/// The GUID RFC 6455 appends to the client key before hashing.
pub const WS_GUID: &str = "258EAFA5-E914-47DA-95CA-C5AB0DC85B11";

/// Generate the Sec-WebSocket-Accept key
///
/// This computes: Base64(SHA-1(key + GUID))
#[inline]
pub fn handshake_accept(key: &str) -> String {
    let mut hasher = Sha1::new();
    hasher.update(key.as_bytes());
    hasher.update(WS_GUID.as_bytes());
    let hash = hasher.finalize();
    base64::engine::general_purpose::STANDARD.encode(hash)
}

/// Build the `101` upgrade response for `key`.
pub fn handshake_response(key: &str) -> ResponseSpec {
    ResponseSpec::new(
        StatusCode::SWITCHING_PROTOCOLS,
        vec![
            ("Upgrade".to_string(), "websocket".to_string()),
            ("Connection".to_string(), "Upgrade".to_string()),
            ("Sec-WebSocket-Accept".to_string(), handshake_accept(key)),
        ],
        Bytes::new(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rfc_sample_nonce() {
        assert_eq!(handshake_accept("dGhlIHNhbXBsZSBub25jZQ=="), "s3pPLMBiTxaQ9kYGzzhZRbK+xOo=");
    }

    #[test]
    fn upgrade_response() {
        let response = handshake_response("dGhlIHNhbXBsZSBub25jZQ==");
        assert_eq!(response.status, StatusCode::SWITCHING_PROTOCOLS);
        assert_eq!(response.header("Upgrade"), Some("websocket"));
        assert_eq!(response.header("Connection"), Some("Upgrade"));
        assert_eq!(response.header("Sec-WebSocket-Accept"), Some("s3pPLMBiTxaQ9kYGzzhZRbK+xOo="));
        assert!(response.body.is_empty());
    }
}
