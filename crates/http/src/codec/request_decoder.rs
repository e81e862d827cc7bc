//! HTTP request decoder module
//!
//! This module turns raw request bytes into an [`HttpRequest`]. The parsing rules are
//! intentionally small:
//!
//! - the head ends at the first blank line (`\r\n\r\n`)
//! - the start line holds the method and the path, optionally followed by the http version
//! - every header line is split on the first `": "`
//! - bytes after the head are the body, bounded by `Content-Length` when present
//!
//! [`parse`] works on a complete message. [`RequestDecoder`] wraps it in a streaming
//! [`Decoder`] which waits until [`request_len`] reports a complete message.
//!
//! # Example
//!
//! ```
//! use rook_http::codec::RequestDecoder;
//! use tokio_util::codec::Decoder;
//! use bytes::BytesMut;
//!
//! let mut decoder = RequestDecoder::new();
//! let mut buffer = BytesMut::from("GET /index.html HTTP/1.1\r\nHost: localhost\r\n\r\n");
//! let request = decoder.decode(&mut buffer).unwrap().unwrap();
//! assert_eq!(request.path(), "/index.html");
//! ```

use std::collections::HashMap;

use bytes::{Bytes, BytesMut};
use tokio_util::codec::Decoder;
use tracing::trace;

use crate::ensure;
use crate::protocol::{CONTENT_LENGTH, CodecError, HttpRequest, ParseError};

/// Default limit for a whole request, head and body together.
pub const DEFAULT_MAX_REQUEST_BYTES: usize = 8 * 1024;

const HEAD_TERMINATOR: &[u8] = b"\r\n\r\n";

/// Returns the length of the request head including its terminating blank line,
/// or `None` while the blank line has not arrived.
pub fn head_len(src: &[u8]) -> Option<usize> {
    src.windows(HEAD_TERMINATOR.len()).position(|window| window == HEAD_TERMINATOR).map(|pos| pos + HEAD_TERMINATOR.len())
}

/// Returns the number of bytes the request at the start of `src` occupies, head plus the body
/// announced by `Content-Length`, or `None` while it is incomplete.
///
/// # Errors
///
/// - [`ParseError::MalformedRequest`] if the head is not utf-8
/// - [`ParseError::MalformedHeader`] if `Content-Length` is not a number, is repeated, or
///   announces more bytes than fit in memory
pub fn request_len(src: &[u8]) -> Result<Option<usize>, ParseError> {
    Ok(announced_len(src)?.filter(|&total| src.len() >= total))
}

/// The total length announced by a complete head, whether or not the body has arrived yet.
fn announced_len(src: &[u8]) -> Result<Option<usize>, ParseError> {
    let Some(head_len) = head_len(src) else {
        return Ok(None);
    };

    let head = std::str::from_utf8(&src[..head_len]).map_err(|_utf8| ParseError::malformed_request("request head is not utf-8"))?;
    let body_len = declared_body_len(head.split("\r\n").skip(1))?.unwrap_or(0);
    let total = head_len
        .checked_add(body_len)
        .ok_or_else(|| ParseError::malformed_header(format!("{CONTENT_LENGTH}: {body_len}")))?;

    trace!(head_len, body_len, buffered = src.len(), "measured request");
    Ok(Some(total))
}

/// Parses one complete request.
///
/// # Errors
///
/// - [`ParseError::MalformedRequest`] if the start line does not hold a method and a path
///   (optionally followed by an http version), or the head is not utf-8
/// - [`ParseError::MalformedHeader`] if a header line has no `": "` separator, or
///   `Content-Length` is not a number or is repeated
pub fn parse(src: &[u8]) -> Result<HttpRequest, ParseError> {
    let (head, body) = match head_len(src) {
        Some(len) => (&src[..len - HEAD_TERMINATOR.len()], &src[len..]),
        None => (src, &[][..]),
    };

    let head = std::str::from_utf8(head).map_err(|_utf8| ParseError::malformed_request("request head is not utf-8"))?;
    let mut lines = head.split("\r\n");

    let start_line = lines.next().unwrap_or_default();
    let (method, path) = parse_start_line(start_line)?;

    let mut headers = HashMap::new();
    for line in lines.clone().filter(|line| !line.is_empty()) {
        let (name, value) = line.split_once(": ").ok_or_else(|| ParseError::malformed_header(line))?;
        headers.insert(name.to_string(), value.to_string());
    }

    let body = match declared_body_len(lines)? {
        Some(declared) => &body[..declared.min(body.len())],
        None => body,
    };

    Ok(HttpRequest::new(method, path, headers, Bytes::copy_from_slice(body)))
}

fn parse_start_line(line: &str) -> Result<(&str, &str), ParseError> {
    let tokens = line.split(' ').filter(|token| !token.is_empty()).collect::<Vec<_>>();
    match tokens.as_slice() {
        [method, path] => Ok((*method, *path)),
        [method, path, version] if version.starts_with("HTTP/") => Ok((*method, *path)),
        [_, _, version] => Err(ParseError::malformed_request(format!("invalid http version {version:?}"))),
        _ => Err(ParseError::malformed_request(format!("start line needs method and path, got {} tokens", tokens.len()))),
    }
}

/// The body length announced by the header lines. The name matches case-insensitively and
/// may appear at most once.
fn declared_body_len<'a>(lines: impl Iterator<Item = &'a str>) -> Result<Option<usize>, ParseError> {
    let mut declared = None;
    for line in lines {
        let Some((name, value)) = line.split_once(": ") else {
            continue;
        };
        if !name.eq_ignore_ascii_case(CONTENT_LENGTH) {
            continue;
        }
        ensure!(declared.is_none(), ParseError::malformed_header(line));
        declared = Some(value.trim().parse::<usize>().map_err(|_e| ParseError::malformed_header(line))?);
    }
    Ok(declared)
}

/// A streaming decoder yielding one [`HttpRequest`] once a complete message is buffered.
///
/// The decoder refuses to buffer more than `max_request_bytes`, so a peer can not grow the
/// receive buffer without bound by never finishing its request.
#[derive(Debug, Clone, Copy)]
pub struct RequestDecoder {
    max_request_bytes: usize,
}

impl RequestDecoder {
    /// Creates a new `RequestDecoder` with the default size limit
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a decoder refusing requests larger than `max_request_bytes`.
    ///
    /// The limit covers the head and the announced body together.
    pub fn with_max_request_bytes(max_request_bytes: usize) -> Self {
        Self { max_request_bytes }
    }
}

impl Default for RequestDecoder {
    fn default() -> Self {
        Self { max_request_bytes: DEFAULT_MAX_REQUEST_BYTES }
    }
}

impl Decoder for RequestDecoder {
    type Item = HttpRequest;
    type Error = CodecError;

    /// Attempts to decode a request from the provided buffer
    ///
    /// # Returns
    ///
    /// - `Ok(Some(request))`: a complete request was consumed from `src`
    /// - `Ok(None)`: need more data to proceed
    /// - `Err(_)`: the request is malformed or exceeds the size limit
    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        match announced_len(src)? {
            Some(len) => {
                // an announced body that can never fit is refused before it is buffered
                ensure!(len <= self.max_request_bytes, ParseError::too_large(len, self.max_request_bytes).into());
                if src.len() < len {
                    return Ok(None);
                }
                let raw = src.split_to(len);
                Ok(Some(parse(&raw)?))
            }
            None => {
                ensure!(src.len() <= self.max_request_bytes, ParseError::too_large(src.len(), self.max_request_bytes).into());
                Ok(None)
            }
        }
    }
}
