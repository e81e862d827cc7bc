//! Core HTTP protocol values.
//!
//! - [`HttpRequest`]: a parsed request, immutable once built
//! - [`ResponseSpec`]: a response description consumed once by the renderer
//! - [`ParseError`] / [`FrameError`] / [`CodecError`]: the error taxonomy of the codecs

mod request;
pub use request::HttpRequest;
pub use request::{CONNECTION, CONTENT_LENGTH, SEC_WEBSOCKET_KEY, UPGRADE};

mod response;
pub use response::ResponseSpec;

mod error;
pub use error::CodecError;
pub use error::FrameError;
pub use error::ParseError;
