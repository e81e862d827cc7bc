use std::io;
use thiserror::Error;

/// Errors raised while turning raw bytes into an [`HttpRequest`](crate::protocol::HttpRequest).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("malformed request: {reason}")]
    MalformedRequest { reason: String },

    #[error("malformed header line: {line:?}")]
    MalformedHeader { line: String },

    #[error("request size too large, current: {current_size} exceed the limit {max_size}")]
    TooLarge { current_size: usize, max_size: usize },
}

impl ParseError {
    pub fn malformed_request<S: ToString>(reason: S) -> Self {
        Self::MalformedRequest { reason: reason.to_string() }
    }

    pub fn malformed_header<S: ToString>(line: S) -> Self {
        Self::MalformedHeader { line: line.to_string() }
    }

    pub fn too_large(current_size: usize, max_size: usize) -> Self {
        Self::TooLarge { current_size, max_size }
    }
}

/// Errors raised while decoding a client websocket frame.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FrameError {
    /// The buffer ends before the frame does. `needed` is the number of bytes the
    /// frame occupies as far as the header already tells.
    #[error("truncated frame, need {needed} bytes but only {available} available")]
    TruncatedFrame { needed: u64, available: usize },

    #[error("websocket protocol violation: {reason}")]
    ProtocolViolation { reason: &'static str },
}

impl FrameError {
    pub fn truncated(needed: u64, available: usize) -> Self {
        Self::TruncatedFrame { needed, available }
    }

    pub fn violation(reason: &'static str) -> Self {
        Self::ProtocolViolation { reason }
    }
}

/// Errors surfaced by the `tokio_util` codec adapters, which also have to carry io failures.
#[derive(Error, Debug)]
pub enum CodecError {
    #[error("request error: {source}")]
    Request {
        #[from]
        source: ParseError,
    },

    #[error("frame error: {source}")]
    Frame {
        #[from]
        source: FrameError,
    },

    #[error("io error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },
}
