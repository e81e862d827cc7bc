//! WebSocket support (the RFC 6455 subset the server speaks)
//!
//! - [`handshake`]: `Sec-WebSocket-Accept` derivation and the `101` upgrade response
//! - [`frame`]: single frame decoding, server frame encoding, payload masking
//! - [`FrameCodec`]: the frame functions as a streaming codec
//!
//! Fragmentation is not reassembled and control frames get no special treatment here,
//! every frame is handed to the caller as decoded.

mod codec;
pub mod frame;
pub mod handshake;

pub use codec::{DEFAULT_MAX_FRAME_BYTES, FrameCodec};
pub use frame::{Frame, OpCode, OutboundFrame, decode, encode, mask};
pub use handshake::{WS_GUID, handshake_accept, handshake_response};
