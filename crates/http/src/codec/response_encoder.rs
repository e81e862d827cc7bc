use crate::protocol::{CodecError, ResponseSpec};

use bytes::{BufMut, Bytes, BytesMut};
use tokio_util::codec::Encoder;

/// Initial buffer size allocated for the status line and header serialization
const INIT_HEADER_SIZE: usize = 256;

/// Renders `response` into wire bytes.
///
/// The output is the status line, one `name: value` line per header, a blank line, the body,
/// and a trailing `\r\n\r\n`. `Content-Length` is never computed here, the caller supplies it.
pub fn render(response: &ResponseSpec) -> Bytes {
    let mut dst = BytesMut::new();
    render_into(response, &mut dst);
    dst.freeze()
}

/// Renders only the status line, the headers and the blank line ending the head.
///
/// Used for `101 Switching Protocols`: after the head the connection carries websocket
/// frames, so nothing else may follow it.
pub fn render_head(response: &ResponseSpec) -> Bytes {
    let mut dst = BytesMut::new();
    render_head_into(response, &mut dst, 0);
    dst.freeze()
}

fn render_into(response: &ResponseSpec, dst: &mut BytesMut) {
    render_head_into(response, dst, response.body.len() + 4);
    dst.put_slice(&response.body);
    dst.put_slice(b"\r\n\r\n");
}

fn render_head_into(response: &ResponseSpec, dst: &mut BytesMut, additional: usize) {
    let headers_size = response.headers.iter().map(|(name, value)| name.len() + value.len() + 4).sum::<usize>();
    dst.reserve(INIT_HEADER_SIZE + headers_size + additional);

    dst.put_slice(b"HTTP/1.1 ");
    dst.put_slice(response.status.as_str().as_bytes());
    dst.put_slice(b" ");
    dst.put_slice(response.reason().as_bytes());
    dst.put_slice(b"\r\n");

    for (name, value) in &response.headers {
        dst.put_slice(name.as_bytes());
        dst.put_slice(b": ");
        dst.put_slice(value.as_bytes());
        dst.put_slice(b"\r\n");
    }
    dst.put_slice(b"\r\n");
}

/// Encoder for [`ResponseSpec`] implementing the [`Encoder`] trait, for use with `FramedWrite`.
#[derive(Debug, Default, Clone, Copy)]
pub struct ResponseEncoder;

impl ResponseEncoder {
    pub fn new() -> Self {
        Self
    }
}

impl Encoder<ResponseSpec> for ResponseEncoder {
    type Error = CodecError;

    fn encode(&mut self, item: ResponseSpec, dst: &mut BytesMut) -> Result<(), Self::Error> {
        render_into(&item, dst);
        Ok(())
    }
}
