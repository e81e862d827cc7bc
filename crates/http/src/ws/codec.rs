use bytes::{Buf, BytesMut};
use tokio_util::codec::{Decoder, Encoder};
use tracing::trace;

use crate::protocol::{CodecError, FrameError};
use crate::ws::frame::{Frame, OutboundFrame, decode, encode_into};

/// Default limit for a single client frame, header included.
pub const DEFAULT_MAX_FRAME_BYTES: usize = 1024 * 1024;

/// Streaming websocket codec: decodes masked client frames, encodes unmasked server frames.
///
/// A frame that is only partly buffered is not an error while it fits in `max_frame_bytes`,
/// the decoder asks for more data instead. A frame that declares more than the limit can never
/// be buffered and surfaces as [`FrameError::TruncatedFrame`].
#[derive(Debug, Clone, Copy)]
pub struct FrameCodec {
    max_frame_bytes: usize,
}

impl FrameCodec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a codec refusing frames larger than `max_frame_bytes`, header included.
    ///
    /// Smaller frames that are cut short wait for more bytes.
    pub fn with_max_frame_bytes(max_frame_bytes: usize) -> Self {
        Self { max_frame_bytes }
    }
}

impl Default for FrameCodec {
    fn default() -> Self {
        Self { max_frame_bytes: DEFAULT_MAX_FRAME_BYTES }
    }
}

impl Decoder for FrameCodec {
    type Item = Frame;
    type Error = CodecError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if src.is_empty() {
            return Ok(None);
        }

        match decode(src) {
            Ok(frame) => {
                src.advance(frame.wire_len());
                Ok(Some(frame))
            }
            Err(FrameError::TruncatedFrame { needed, available }) if needed <= self.max_frame_bytes as u64 => {
                trace!(needed, available, "wait for the rest of the frame");
                #[allow(clippy::cast_possible_truncation, reason = "needed is bounded by max_frame_bytes")]
                let missing = needed as usize - available;
                src.reserve(missing);
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }
}

impl Encoder<OutboundFrame> for FrameCodec {
    type Error = CodecError;

    fn encode(&mut self, item: OutboundFrame, dst: &mut BytesMut) -> Result<(), Self::Error> {
        encode_into(&item.payload, item.opcode, item.fin, dst);
        Ok(())
    }
}
