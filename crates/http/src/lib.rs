//! Codecs for the rook server
//!
//! This crate holds the protocol half of rook: turning raw socket bytes into HTTP requests and
//! WebSocket frames, and turning responses and outbound frames back into bytes. Nothing here
//! touches a socket; the event loop lives in `rook-web`.
//!
//! # Architecture
//!
//! - [`byte_order`]: big-endian integer reads and writes used by the frame codec
//! - [`protocol`]: [`HttpRequest`](protocol::HttpRequest), [`ResponseSpec`](protocol::ResponseSpec)
//!   and the error types
//! - [`codec`]: HTTP/1.1 request parsing and response rendering
//! - [`ws`]: the WebSocket handshake and frame codec
//!
//! Every codec exists both as plain functions over byte slices and as a
//! [`tokio_util::codec`] `Decoder`/`Encoder` for use with `FramedRead`/`FramedWrite`.
//!
//! # Example
//!
//! ```
//! use rook_http::codec::parse;
//! use rook_http::ws::{handshake_response, OutboundFrame};
//!
//! let raw = b"GET /ws HTTP/1.1\r\nUpgrade: websocket\r\nConnection: Upgrade\r\nSec-WebSocket-Key: dGhlIHNhbXBsZSBub25jZQ==\r\n\r\n";
//! let request = parse(raw).unwrap();
//! assert!(request.is_websocket_handshake());
//!
//! let response = handshake_response(request.websocket_key().unwrap());
//! assert_eq!(response.header("Sec-WebSocket-Accept"), Some("s3pPLMBiTxaQ9kYGzzhZRbK+xOo="));
//!
//! assert_eq!(&OutboundFrame::text("hi").encode()[..], &[0x81, 0x02, b'h', b'i']);
//! ```
//!
//! # Limitations
//!
//! - one request per connection, no keep-alive
//! - no chunked transfer encoding
//! - no TLS, no extensions, no fragmented message reassembly

pub mod byte_order;
pub mod codec;
pub mod protocol;
pub mod ws;

mod utils;
pub(crate) use utils::ensure;
