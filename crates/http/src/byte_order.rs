//! Network byte order helpers.
//!
//! Every multi-byte length on the websocket wire is big-endian. These helpers spell the byte
//! order out with shifts so the convention is visible at each call site.

use bytes::{BufMut, BytesMut};

/// Reads a big-endian `u16` from the first two bytes of `src`.
#[inline]
pub fn read_u16_be(src: &[u8]) -> Option<u16> {
    match src {
        [hi, lo, ..] => Some((u16::from(*hi) << 8) | u16::from(*lo)),
        _ => None,
    }
}

/// Reads a big-endian `u64` from the first eight bytes of `src`.
#[inline]
pub fn read_u64_be(src: &[u8]) -> Option<u64> {
    let bytes = src.get(..8)?;
    Some(bytes.iter().fold(0u64, |acc, byte| (acc << 8) | u64::from(*byte)))
}

/// Appends `value` most significant byte first.
#[inline]
#[allow(clippy::cast_possible_truncation, reason = "truncation selects the byte")]
pub fn put_u16_be(dst: &mut BytesMut, value: u16) {
    dst.put_u8((value >> 8) as u8);
    dst.put_u8(value as u8);
}

/// Appends `value` most significant byte first.
#[inline]
#[allow(clippy::cast_possible_truncation, reason = "truncation selects the byte")]
pub fn put_u64_be(dst: &mut BytesMut, value: u64) {
    for shift in (0..8).rev() {
        dst.put_u8((value >> (shift * 8)) as u8);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn u16_layout() {
        let mut buf = BytesMut::new();
        put_u16_be(&mut buf, 0x1234);
        assert_eq!(&buf[..], &[0x12, 0x34]);
        assert_eq!(read_u16_be(&buf), Some(0x1234));
        assert_eq!(read_u16_be(&[0xFF, 0xFF, 0x00]), Some(65535));
    }

    #[test]
    fn u64_layout() {
        let mut buf = BytesMut::new();
        put_u64_be(&mut buf, 0x0102_0304_0506_0708);
        assert_eq!(&buf[..], &[1, 2, 3, 4, 5, 6, 7, 8]);
        assert_eq!(read_u64_be(&buf), Some(0x0102_0304_0506_0708));
        assert_eq!(read_u64_be(&[0, 0, 0, 0, 0, 1, 0, 0]), Some(65536));
    }

    #[test]
    fn short_input() {
        assert_eq!(read_u16_be(&[0x01]), None);
        assert_eq!(read_u64_be(&[0; 7]), None);
    }
}
