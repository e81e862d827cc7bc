//! WebSocket frame parsing and serialization
//!
//! This module implements the RFC 6455 frame layout used between browsers and this server:
//!
//! ```text
//! [FIN:1][RSV:3][OPCODE:4] [MASK:1][LEN7:7] [extended length: 0, 2 or 8 bytes] [mask key: 4 bytes, client only] [payload]
//! ```
//!
//! Client frames are always masked and are decoded with [`decode`]. Server frames are never
//! masked and are produced with [`encode`]. Fragmentation is not reassembled here, the FIN bit
//! and opcode are handed through untouched.

use bytes::{BufMut, Bytes, BytesMut};

use crate::byte_order::{put_u16_be, put_u64_be, read_u16_be, read_u64_be};
use crate::ensure;
use crate::protocol::FrameError;

const FIN_BIT: u8 = 0b1000_0000;
const OPCODE_BITS: u8 = 0b0000_1111;
const MASK_BIT: u8 = 0b1000_0000;
const LEN_BITS: u8 = 0b0111_1111;

/// Largest payload length that fits in the 7-bit length field.
pub const MAX_SHORT_PAYLOAD: usize = 125;
const LEN_U16_MARKER: u8 = 126;
const LEN_U64_MARKER: u8 = 127;

const BASE_HEADER_LEN: usize = 2;
const MASK_KEY_LEN: usize = 4;

/// Longest possible server frame header: two base bytes and an 8-byte length.
const MAX_SERVER_HEADER_LEN: usize = BASE_HEADER_LEN + 8;

/// WebSocket opcode, the low nibble of the first frame byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OpCode {
    Continuation,
    Text,
    Binary,
    Close,
    Ping,
    Pong,
    /// Any opcode RFC 6455 reserves for future use, kept as received.
    Reserved(u8),
}

impl OpCode {
    /// Reads an opcode from the low nibble of `byte`.
    #[inline]
    pub fn from_u8(byte: u8) -> Self {
        match byte & OPCODE_BITS {
            0x0 => OpCode::Continuation,
            0x1 => OpCode::Text,
            0x2 => OpCode::Binary,
            0x8 => OpCode::Close,
            0x9 => OpCode::Ping,
            0xA => OpCode::Pong,
            other => OpCode::Reserved(other),
        }
    }

    #[inline]
    pub fn as_u8(self) -> u8 {
        match self {
            OpCode::Continuation => 0x0,
            OpCode::Text => 0x1,
            OpCode::Binary => 0x2,
            OpCode::Close => 0x8,
            OpCode::Ping => 0x9,
            OpCode::Pong => 0xA,
            OpCode::Reserved(other) => other & OPCODE_BITS,
        }
    }

    /// Check if this is a control frame
    #[inline]
    pub fn is_control(self) -> bool {
        self.as_u8() >= 0x8
    }
}

/// A decoded client frame, payload already unmasked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    fin: bool,
    opcode: OpCode,
    masked: bool,
    payload_len: u64,
    mask_key: Option<[u8; 4]>,
    payload: Bytes,
    wire_len: usize,
}

impl Frame {
    #[inline]
    pub fn fin(&self) -> bool {
        self.fin
    }

    /// The opcode of the frame, reserved values included.
    #[inline]
    pub fn opcode(&self) -> OpCode {
        self.opcode
    }

    #[inline]
    pub fn is_masked(&self) -> bool {
        self.masked
    }

    /// The payload length declared in the header.
    #[inline]
    pub fn payload_len(&self) -> u64 {
        self.payload_len
    }

    /// The masking key the client sent, `None` for server frames.
    #[inline]
    pub fn mask_key(&self) -> Option<[u8; 4]> {
        self.mask_key
    }

    /// The unmasked payload.
    #[inline]
    pub fn payload(&self) -> &Bytes {
        &self.payload
    }

    pub fn into_payload(self) -> Bytes {
        self.payload
    }

    /// Number of bytes this frame occupied on the wire.
    #[inline]
    pub fn wire_len(&self) -> usize {
        self.wire_len
    }

    /// The payload as text, if it is valid utf-8.
    pub fn as_text(&self) -> Option<&str> {
        std::str::from_utf8(&self.payload).ok()
    }
}

/// A server frame waiting to be encoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundFrame {
    pub payload: Bytes,
    pub opcode: OpCode,
    pub fin: bool,
}

impl OutboundFrame {
    /// Creates an outbound frame.
    ///
    /// # Arguments
    ///
    /// * `payload` - sent unmasked
    /// * `opcode` - written to the low bits of the first byte
    /// * `fin` - whether this is the last fragment of a message
    pub fn new(payload: impl Into<Bytes>, opcode: OpCode, fin: bool) -> Self {
        Self { payload: payload.into(), opcode, fin }
    }

    /// Create a final text frame
    pub fn text(payload: impl Into<Bytes>) -> Self {
        Self::new(payload, OpCode::Text, true)
    }

    /// Create a final binary frame
    pub fn binary(payload: impl Into<Bytes>) -> Self {
        Self::new(payload, OpCode::Binary, true)
    }

    pub fn pong(payload: impl Into<Bytes>) -> Self {
        Self::new(payload, OpCode::Pong, true)
    }

    /// Encodes the frame for the wire, see [`encode`].
    pub fn encode(&self) -> Bytes {
        encode(&self.payload, self.opcode, self.fin)
    }
}

/// Decodes one masked client frame from the start of `src`.
///
/// # Errors
///
/// - [`FrameError::ProtocolViolation`] if the mask bit is clear, or a 64-bit length has its
///   most significant bit set
/// - [`FrameError::TruncatedFrame`] if `src` ends before the header, mask key or payload do;
///   nothing past `src.len()` is read
pub fn decode(src: &[u8]) -> Result<Frame, FrameError> {
    let available = src.len();
    let &[first, second, ..] = src else {
        return Err(FrameError::truncated((BASE_HEADER_LEN + MASK_KEY_LEN) as u64, available));
    };

    let fin = first & FIN_BIT != 0;
    let opcode = OpCode::from_u8(first);
    ensure!(second & MASK_BIT != 0, FrameError::violation("client frame is not masked"));

    let extended = &src[BASE_HEADER_LEN..];
    let (payload_len, mask_offset) = match second & LEN_BITS {
        LEN_U16_MARKER => {
            let mask_offset = BASE_HEADER_LEN + 2;
            let len = read_u16_be(extended).ok_or_else(|| FrameError::truncated((mask_offset + MASK_KEY_LEN) as u64, available))?;
            (u64::from(len), mask_offset)
        }
        LEN_U64_MARKER => {
            let mask_offset = BASE_HEADER_LEN + 8;
            let len = read_u64_be(extended).ok_or_else(|| FrameError::truncated((mask_offset + MASK_KEY_LEN) as u64, available))?;
            ensure!(len >> 63 == 0, FrameError::violation("64-bit payload length has its most significant bit set"));
            (len, mask_offset)
        }
        len => (u64::from(len), BASE_HEADER_LEN),
    };

    let payload_offset = mask_offset + MASK_KEY_LEN;
    let needed = payload_offset as u64 + payload_len;
    ensure!(available as u64 >= needed, FrameError::truncated(needed, available));

    #[allow(clippy::cast_possible_truncation, reason = "needed fits in usize, it is at most src.len()")]
    let wire_len = needed as usize;

    let mask_key = [src[mask_offset], src[mask_offset + 1], src[mask_offset + 2], src[mask_offset + 3]];
    let payload = mask(&src[payload_offset..wire_len], mask_key);

    Ok(Frame { fin, opcode, masked: true, payload_len, mask_key: Some(mask_key), payload, wire_len })
}

/// Encodes an unmasked server frame.
///
/// The shortest length encoding is chosen: up to 125 bytes inline, up to 65535 bytes as a
/// 16-bit extended length, anything larger as a 64-bit extended length.
pub fn encode(payload: &[u8], opcode: OpCode, fin: bool) -> Bytes {
    let mut dst = BytesMut::with_capacity(MAX_SERVER_HEADER_LEN + payload.len());
    encode_into(payload, opcode, fin, &mut dst);
    dst.freeze()
}

pub(crate) fn encode_into(payload: &[u8], opcode: OpCode, fin: bool, dst: &mut BytesMut) {
    dst.reserve(MAX_SERVER_HEADER_LEN + payload.len());

    let fin_bit = if fin { FIN_BIT } else { 0 };
    dst.put_u8(fin_bit | opcode.as_u8());

    let len = payload.len();
    let short_len = u8::try_from(len).ok().filter(|short| usize::from(*short) <= MAX_SHORT_PAYLOAD);
    if let Some(short_len) = short_len {
        dst.put_u8(short_len);
    } else if let Ok(len) = u16::try_from(len) {
        dst.put_u8(LEN_U16_MARKER);
        put_u16_be(dst, len);
    } else {
        dst.put_u8(LEN_U64_MARKER);
        put_u64_be(dst, len as u64);
    }

    dst.put_slice(payload);
}

/// XORs `payload` with the repeating 4-byte `mask_key`. Applying it twice restores the input.
pub fn mask(payload: &[u8], mask_key: [u8; 4]) -> Bytes {
    payload.iter().zip(mask_key.iter().cycle()).map(|(byte, key)| byte ^ key).collect::<Vec<_>>().into()
}
