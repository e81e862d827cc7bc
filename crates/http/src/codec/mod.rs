//! HTTP codec module for decoding requests and encoding responses
//!
//! # Components
//!
//! - Request handling:
//!   - [`parse`]: parses one complete request
//!   - [`request_len`] / [`head_len`]: measure how much of a buffer a request occupies
//!   - [`RequestDecoder`]: streaming [`Decoder`](tokio_util::codec::Decoder) on top of both
//!
//! - Response handling:
//!   - [`render`]: renders a [`ResponseSpec`](crate::protocol::ResponseSpec) into wire bytes
//!   - [`render_head`]: the head alone, for protocol switches
//!   - [`ResponseEncoder`]: the same as an [`Encoder`](tokio_util::codec::Encoder)
//!
//! # Example
//!
//! ```
//! use rook_http::codec::{parse, render};
//! use rook_http::protocol::ResponseSpec;
//!
//! let request = parse(b"GET /heartbeat HTTP/1.1\r\n\r\n").unwrap();
//! assert_eq!(request.method(), "GET");
//!
//! let bytes = render(&ResponseSpec::ok("text/plain", "ok"));
//! assert!(bytes.starts_with(b"HTTP/1.1 200 OK\r\n"));
//! ```

mod request_decoder;
mod response_encoder;

pub use request_decoder::{DEFAULT_MAX_REQUEST_BYTES, RequestDecoder, head_len, parse, request_len};
pub use response_encoder::{ResponseEncoder, render, render_head};
