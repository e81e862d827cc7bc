//! Per connection state owned by the multiplexer.

use std::fmt;
use std::io;
use std::net::SocketAddr;

use bytes::{Bytes, BytesMut};
use futures::stream::{self, AbortHandle, Abortable, BoxStream};
use futures::{StreamExt, future};
use tokio::io::AsyncWriteExt;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio_util::io::ReaderStream;

/// Identifies a connection for its whole lifetime. Ids are never reused by one server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Wraps a raw id. The multiplexer hands them out in increasing order.
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// `Pending → HttpReady → WebSocketEstablished`, any state may end in `Closed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Accepted, the request is not complete yet.
    Pending,
    /// A complete request was read and is being answered.
    HttpReady,
    /// The upgrade was accepted, the buffer holds websocket frames.
    WebSocketEstablished,
    Closed,
}

/// What a read on one connection produced.
#[derive(Debug)]
pub(crate) enum ReadEvent {
    Data(Bytes),
    Eof,
    Failed(io::Error),
}

/// The read side of a connection as it is polled by the multiplexer.
pub(crate) type ReadEvents = BoxStream<'static, (ConnectionId, ReadEvent)>;

/// Turns the read half into a stream of [`ReadEvent`]s that ends with `Eof` and can be
/// stopped from the outside through the returned [`AbortHandle`].
pub(crate) fn read_events(id: ConnectionId, reader: OwnedReadHalf) -> (ReadEvents, AbortHandle) {
    let (abort_handle, registration) = AbortHandle::new_pair();

    let events = ReaderStream::new(reader)
        .map(|chunk| match chunk {
            Ok(bytes) => ReadEvent::Data(bytes),
            Err(e) => ReadEvent::Failed(e),
        })
        .chain(stream::once(future::ready(ReadEvent::Eof)));

    let events = Abortable::new(events, registration).map(move |event| (id, event)).boxed();
    (events, abort_handle)
}

#[derive(Debug)]
pub(crate) struct Connection {
    pub(crate) id: ConnectionId,
    pub(crate) state: ConnectionState,
    pub(crate) buffer: BytesMut,
    pub(crate) peer: SocketAddr,
    writer: OwnedWriteHalf,
    reader: AbortHandle,
}

impl Connection {
    pub(crate) fn new(id: ConnectionId, peer: SocketAddr, writer: OwnedWriteHalf, reader: AbortHandle) -> Self {
        Self { id, state: ConnectionState::Pending, buffer: BytesMut::new(), peer, writer, reader }
    }

    pub(crate) async fn send(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.writer.write_all(bytes).await
    }

    /// Stops reading and shuts the write side down. The socket is released once the read
    /// stream is dropped by the multiplexer.
    pub(crate) async fn close(&mut self) -> io::Result<()> {
        self.state = ConnectionState::Closed;
        self.reader.abort();
        self.writer.shutdown().await
    }
}
