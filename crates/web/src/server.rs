//! The server and its connection multiplexer.
//!
//! One task owns the listener, every live connection and the router. Each iteration of
//! [`Multiplexer::run`] waits until either the listener can accept or one connection has
//! bytes (or an end of stream) to deliver, and then handles exactly that event:
//!
//! - a new connection is checked against the [`ConnectionLimiter`] and registered as `Pending`
//! - bytes are appended to the connection buffer and fed to the codec matching its state
//! - an end of stream or a read error deregisters the connection
//!
//! HTTP connections answer one request and are closed. A websocket handshake moves the
//! connection to `WebSocketEstablished`, from then on its buffer is decoded as frames.
//!
//! A frame that has only partly arrived does not close the connection. While its total size
//! is within `max_frame_bytes` the connection waits for the rest, so frames split across TCP
//! segments still decode. A larger frame, an unmasked frame or a malformed length closes it.
//!
//! Handlers run inline on the loop task: while one is awaited no other connection is served.

use std::collections::HashMap;
use std::fmt;
use std::io;
use std::net::SocketAddr;

use futures::StreamExt;
use futures::stream::SelectAll;
use rook_http::codec::{RequestDecoder, render, render_head};
use rook_http::protocol::ResponseSpec;
use rook_http::ws::{FrameCodec, handshake_response};
use tokio::net::{TcpListener, TcpSocket, TcpStream};
use tokio_util::codec::Decoder;
use tracing::{debug, error, info, trace, warn};

use crate::config::{ServerConfig, ServerError};
use crate::connection::{Connection, ConnectionId, ConnectionState, ReadEvent, ReadEvents, read_events};
use crate::handler::{FrameAction, FrameHandler, RouteHandler};
use crate::limit::ConnectionLimiter;
use crate::router::Router;

/// Collects routes, the frame handler and the configuration of a [`Server`].
///
/// Obtained from [`Server::builder`].
pub struct ServerBuilder {
    router: Router<Box<dyn RouteHandler>>,
    frame_handler: Option<Box<dyn FrameHandler>>,
    config: ServerConfig,
}

impl ServerBuilder {
    fn new() -> Self {
        Self { router: Router::new(), frame_handler: None, config: ServerConfig::default() }
    }

    /// Registers `handler` for `pattern`. Registering the same pattern again replaces the handler.
    pub fn route(mut self, pattern: &str, handler: impl RouteHandler + 'static) -> Self {
        if self.router.insert(pattern, Box::new(handler)).is_some() {
            warn!(pattern, "route registered twice, keeping the later handler");
        }
        self
    }

    /// Sets the handler for upgraded connections. Without one, handshakes are routed like
    /// any other request.
    pub fn frame_handler(mut self, handler: impl FrameHandler + 'static) -> Self {
        self.frame_handler = Some(Box::new(handler));
        self
    }

    /// Replaces the default configuration. It is validated by [`build`](Self::build).
    pub fn config(mut self, config: ServerConfig) -> Self {
        self.config = config;
        self
    }

    /// # Errors
    ///
    /// Returns [`ServerError::Config`] if the configuration is invalid or there is nothing to serve.
    pub fn build(self) -> Result<Server, ServerError> {
        self.config.validate()?;
        if self.router.is_empty() && self.frame_handler.is_none() {
            return Err(ServerError::config("neither a route nor a frame handler is registered"));
        }
        Ok(Server { router: self.router, frame_handler: self.frame_handler, config: self.config })
    }
}

impl fmt::Debug for ServerBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerBuilder")
            .field("router", &self.router)
            .field("frame_handler", &self.frame_handler.is_some())
            .field("config", &self.config)
            .finish()
    }
}

/// A validated server that is not listening yet.
pub struct Server {
    router: Router<Box<dyn RouteHandler>>,
    frame_handler: Option<Box<dyn FrameHandler>>,
    config: ServerConfig,
}

impl Server {
    /// Starts a builder with no routes and the default configuration.
    pub fn builder() -> ServerBuilder {
        ServerBuilder::new()
    }

    /// The configuration the server was built with.
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Binds the listening socket with `SO_REUSEADDR` and the configured backlog.
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Socket`] if the socket can not be created, bound or put in
    /// listening state.
    pub fn bind(self) -> Result<Multiplexer, ServerError> {
        let address = self.config.address;
        let socket = if address.is_ipv4() { TcpSocket::new_v4()? } else { TcpSocket::new_v6()? };
        socket.set_reuseaddr(true)?;
        socket.bind(address)?;
        let listener = socket.listen(self.config.backlog)?;

        info!(address = %listener.local_addr()?, backlog = self.config.backlog, "start listening");
        Ok(Multiplexer::new(listener, self))
    }

    /// Binds and serves until the task is dropped.
    ///
    /// # Errors
    ///
    /// Only startup fails, see [`Server::bind`]. Errors of single connections are logged and
    /// close that connection.
    pub async fn start(self) -> Result<(), ServerError> {
        let multiplexer = self.bind()?;
        multiplexer.run().await;
        Ok(())
    }
}

impl fmt::Debug for Server {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Server")
            .field("router", &self.router)
            .field("frame_handler", &self.frame_handler.is_some())
            .field("config", &self.config)
            .finish()
    }
}

enum Event {
    Accepted(io::Result<(TcpStream, SocketAddr)>),
    Readable(ConnectionId, ReadEvent),
}

/// Whether a connection survives the bytes it just delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Keep,
    Close,
}

/// The bound server: a readiness loop over the listener and every live connection.
pub struct Multiplexer {
    listener: TcpListener,
    router: Router<Box<dyn RouteHandler>>,
    frame_handler: Option<Box<dyn FrameHandler>>,
    request_decoder: RequestDecoder,
    frame_codec: FrameCodec,
    limiter: ConnectionLimiter,
    connections: HashMap<ConnectionId, Connection>,
    readers: SelectAll<ReadEvents>,
    next_id: u64,
}

impl Multiplexer {
    fn new(listener: TcpListener, server: Server) -> Self {
        let Server { router, frame_handler, config } = server;
        Self {
            listener,
            router,
            frame_handler,
            request_decoder: RequestDecoder::with_max_request_bytes(config.max_request_bytes),
            frame_codec: FrameCodec::with_max_frame_bytes(config.max_frame_bytes),
            limiter: ConnectionLimiter::new(config.max_connections, config.max_connections_per_ip),
            connections: HashMap::new(),
            readers: SelectAll::new(),
            next_id: 0,
        }
    }

    /// # Errors
    ///
    /// Returns the error of the underlying `getsockname`.
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Number of live connections.
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// Serves forever.
    pub async fn run(mut self) {
        loop {
            let event = tokio::select! {
                accepted = self.listener.accept() => Event::Accepted(accepted),
                Some((id, read)) = self.readers.next() => Event::Readable(id, read),
            };

            match event {
                Event::Accepted(Ok((stream, peer))) => self.register(stream, peer),
                Event::Accepted(Err(e)) => warn!(cause = %e, "failed to accept"),
                Event::Readable(id, ReadEvent::Data(bytes)) => self.on_readable(id, &bytes).await,
                Event::Readable(id, ReadEvent::Eof) => {
                    debug!(%id, "peer closed connection");
                    self.deregister(id).await;
                }
                Event::Readable(id, ReadEvent::Failed(e)) => {
                    warn!(%id, cause = %e, "read failed");
                    self.deregister(id).await;
                }
            }
        }
    }

    fn register(&mut self, stream: TcpStream, peer: SocketAddr) {
        if !self.limiter.acquire(peer.ip()) {
            warn!(%peer, active = self.limiter.active(), "connection limit reached, dropping connection");
            return;
        }

        let id = ConnectionId::new(self.next_id);
        self.next_id += 1;

        let (reader, writer) = stream.into_split();
        let (events, abort_handle) = read_events(id, reader);
        self.readers.push(events);
        self.connections.insert(id, Connection::new(id, peer, writer, abort_handle));
        debug!(%id, %peer, active = self.limiter.active(), "accepted connection");
    }

    async fn deregister(&mut self, id: ConnectionId) {
        // a stream may still report Eof after its connection was closed
        let Some(mut connection) = self.connections.remove(&id) else {
            return;
        };

        let upgraded = connection.state == ConnectionState::WebSocketEstablished;
        if let Err(e) = connection.close().await {
            debug!(%id, cause = %e, "shutdown failed");
        }
        self.limiter.release(connection.peer.ip());

        if upgraded && let Some(handler) = &self.frame_handler {
            handler.on_close(id).await;
        }
        debug!(%id, active = self.limiter.active(), "closed connection");
    }

    async fn on_readable(&mut self, id: ConnectionId, bytes: &[u8]) {
        let Self { router, frame_handler, request_decoder, frame_codec, connections, .. } = &mut *self;
        let Some(connection) = connections.get_mut(&id) else {
            return;
        };

        connection.buffer.extend_from_slice(bytes);
        trace!(%id, read = bytes.len(), buffered = connection.buffer.len(), state = ?connection.state, "readable");

        let outcome = match connection.state {
            ConnectionState::Pending | ConnectionState::HttpReady => {
                drive_http(connection, router, frame_handler.as_deref(), request_decoder, frame_codec).await
            }
            ConnectionState::WebSocketEstablished => match frame_handler.as_deref() {
                Some(handler) => drive_websocket(connection, handler, frame_codec).await,
                None => Outcome::Close,
            },
            ConnectionState::Closed => Outcome::Close,
        };

        if outcome == Outcome::Close {
            self.deregister(id).await;
        }
    }
}

impl fmt::Debug for Multiplexer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Multiplexer")
            .field("listener", &self.listener)
            .field("router", &self.router)
            .field("connections", &self.connections.len())
            .field("limiter", &self.limiter)
            .finish_non_exhaustive()
    }
}

async fn drive_http(
    connection: &mut Connection,
    router: &Router<Box<dyn RouteHandler>>,
    frame_handler: Option<&dyn FrameHandler>,
    request_decoder: &mut RequestDecoder,
    frame_codec: &mut FrameCodec,
) -> Outcome {
    let id = connection.id;
    let request = match request_decoder.decode(&mut connection.buffer) {
        Ok(Some(request)) => request,
        Ok(None) => return Outcome::Keep,
        Err(e) => {
            warn!(%id, peer = %connection.peer, cause = %e, "bad request");
            send_response(connection, &ResponseSpec::bad_request()).await;
            return Outcome::Close;
        }
    };

    connection.state = ConnectionState::HttpReady;
    debug!(%id, method = request.method(), path = request.path(), "received request");

    if request.is_websocket_handshake() {
        match (frame_handler, request.websocket_key()) {
            (Some(handler), Some(key)) => return upgrade(connection, key, handler, frame_codec).await,
            _ => debug!(%id, "no frame handler, websocket handshake is routed as http"),
        }
    }

    let response = match router.find(request.route_path()) {
        Some(matched) => {
            let (handler, param) = matched.into_parts();
            match handler.handle(request.with_param(param)).await {
                Ok(response) => response,
                Err(e) => {
                    error!(%id, cause = %e, "handler failed");
                    ResponseSpec::internal_error()
                }
            }
        }
        None => {
            debug!(%id, path = request.route_path(), "route not found");
            ResponseSpec::not_found()
        }
    };

    debug!(%id, status = response.status.as_u16(), "send response");
    send_response(connection, &response).await;
    Outcome::Close
}

async fn upgrade(connection: &mut Connection, key: &str, handler: &dyn FrameHandler, frame_codec: &mut FrameCodec) -> Outcome {
    let id = connection.id;
    if let Err(e) = connection.send(&render_head(&handshake_response(key))).await {
        warn!(%id, cause = %e, "failed to send handshake response");
        return Outcome::Close;
    }

    connection.state = ConnectionState::WebSocketEstablished;
    info!(%id, peer = %connection.peer, "websocket established");
    handler.on_open(id).await;

    // frames sent right behind the handshake are already buffered
    drive_websocket(connection, handler, frame_codec).await
}

async fn drive_websocket(connection: &mut Connection, handler: &dyn FrameHandler, frame_codec: &mut FrameCodec) -> Outcome {
    let id = connection.id;
    loop {
        let frame = match frame_codec.decode(&mut connection.buffer) {
            Ok(Some(frame)) => frame,
            // truncated but within max_frame_bytes
            Ok(None) => return Outcome::Keep,
            Err(e) => {
                warn!(%id, cause = %e, "websocket frame rejected");
                return Outcome::Close;
            }
        };
        trace!(%id, opcode = ?frame.opcode(), len = frame.payload_len(), "received frame");

        match handler.on_frame(id, frame).await {
            FrameAction::Ignore => {}
            FrameAction::Reply(reply) => {
                if let Err(e) = connection.send(&reply.encode()).await {
                    warn!(%id, cause = %e, "failed to send frame");
                    return Outcome::Close;
                }
            }
            FrameAction::Close => {
                debug!(%id, "frame handler closed the connection");
                return Outcome::Close;
            }
        }
    }
}

async fn send_response(connection: &mut Connection, response: &ResponseSpec) {
    if let Err(e) = connection.send(&render(response)).await {
        warn!(id = %connection.id, cause = %e, "failed to send response");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::{BoxError, frame_handler_fn, handler_fn};
    use rook_http::protocol::HttpRequest;
    use rook_http::ws::Frame;

    async fn ok(_request: HttpRequest) -> Result<ResponseSpec, BoxError> {
        Ok(ResponseSpec::text(http::StatusCode::OK, "ok"))
    }

    #[test]
    fn build_requires_something_to_serve() {
        let error = Server::builder().build().unwrap_err();
        assert!(matches!(error, ServerError::Config { .. }));

        Server::builder().route("/", handler_fn(ok)).build().unwrap();
        Server::builder().frame_handler(frame_handler_fn(|_id, _frame: Frame| async { FrameAction::Ignore })).build().unwrap();
    }

    #[test]
    fn build_validates_config() {
        let config = ServerConfig { max_request_bytes: 0, ..ServerConfig::default() };
        let error = Server::builder().route("/", handler_fn(ok)).config(config).build().unwrap_err();
        assert!(matches!(error, ServerError::Config { .. }));
    }

    #[test]
    fn rerouting_replaces() {
        let server = Server::builder().route("/a", handler_fn(ok)).route("/a", handler_fn(ok)).build().unwrap();
        assert_eq!(server.router.len(), 1);
    }

    #[tokio::test]
    async fn bind_ephemeral_port() {
        let config = ServerConfig { address: "127.0.0.1:0".parse().unwrap(), ..ServerConfig::default() };
        let multiplexer = Server::builder().route("/", handler_fn(ok)).config(config).build().unwrap().bind().unwrap();

        assert_ne!(multiplexer.local_addr().unwrap().port(), 0);
        assert_eq!(multiplexer.connection_count(), 0);
    }

    #[tokio::test]
    async fn bind_in_use_fails() {
        let taken = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let config = ServerConfig { address: taken.local_addr().unwrap(), ..ServerConfig::default() };
        let result = Server::builder().route("/", handler_fn(ok)).config(config).build().unwrap().bind();
        assert!(matches!(result, Err(ServerError::Socket { .. })));
    }
}
