//! Application handler traits.
//!
//! [`RouteHandler`] answers one routed HTTP request. [`FrameHandler`] receives the frames of
//! every upgraded websocket connection. Both can be built from async closures with
//! [`handler_fn`] and [`frame_handler_fn`].

use std::error::Error;
use std::fmt;
use std::future::Future;

use async_trait::async_trait;
use rook_http::protocol::{HttpRequest, ResponseSpec};
use rook_http::ws::{Frame, OutboundFrame};

use crate::connection::ConnectionId;

/// Error type handlers may return, any error that can cross threads.
pub type BoxError = Box<dyn Error + Send + Sync>;

#[async_trait]
pub trait RouteHandler: Send + Sync {
    /// Produces the response for `request`. An error is answered with a `500`.
    async fn handle(&self, request: HttpRequest) -> Result<ResponseSpec, BoxError>;
}

/// An async closure holder which acts as a [`RouteHandler`]
pub struct HandlerFn<F> {
    f: F,
}

/// Wraps an async function as a [`RouteHandler`].
///
/// # Arguments
///
/// * `f` - called with the request, its error turns into a `500`
pub fn handler_fn<F, Fut>(f: F) -> HandlerFn<F>
where
    F: Fn(HttpRequest) -> Fut + Send + Sync,
    Fut: Future<Output = Result<ResponseSpec, BoxError>> + Send,
{
    HandlerFn { f }
}

#[async_trait]
impl<F, Fut> RouteHandler for HandlerFn<F>
where
    F: Fn(HttpRequest) -> Fut + Send + Sync,
    Fut: Future<Output = Result<ResponseSpec, BoxError>> + Send,
{
    async fn handle(&self, request: HttpRequest) -> Result<ResponseSpec, BoxError> {
        (self.f)(request).await
    }
}

impl<F> fmt::Debug for HandlerFn<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerFn").finish_non_exhaustive()
    }
}

/// What the server does after a frame was handled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameAction {
    /// Nothing is sent back.
    Ignore,
    /// The frame is encoded and written to the same connection.
    Reply(OutboundFrame),
    /// The connection is closed without a close handshake.
    Close,
}

#[async_trait]
pub trait FrameHandler: Send + Sync {
    async fn on_open(&self, _id: ConnectionId) {}

    async fn on_frame(&self, id: ConnectionId, frame: Frame) -> FrameAction;

    /// Called once when an upgraded connection goes away, whoever closed it.
    async fn on_close(&self, _id: ConnectionId) {}
}

/// An async closure holder which acts as a [`FrameHandler`] with no open/close hooks
pub struct FrameHandlerFn<F> {
    f: F,
}

/// Wraps an async function as a [`FrameHandler`].
///
/// # Arguments
///
/// * `f` - called with the connection id and each decoded frame
///
/// # Returns
///
/// A handler whose `on_open` and `on_close` do nothing.
pub fn frame_handler_fn<F, Fut>(f: F) -> FrameHandlerFn<F>
where
    F: Fn(ConnectionId, Frame) -> Fut + Send + Sync,
    Fut: Future<Output = FrameAction> + Send,
{
    FrameHandlerFn { f }
}

#[async_trait]
impl<F, Fut> FrameHandler for FrameHandlerFn<F>
where
    F: Fn(ConnectionId, Frame) -> Fut + Send + Sync,
    Fut: Future<Output = FrameAction> + Send,
{
    async fn on_frame(&self, id: ConnectionId, frame: Frame) -> FrameAction {
        (self.f)(id, frame).await
    }
}

impl<F> fmt::Debug for FrameHandlerFn<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FrameHandlerFn").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use http::StatusCode;
    use rook_http::ws::{OpCode, decode, mask};
    use std::collections::HashMap;

    fn assert_is_route_handler<T: RouteHandler>(_handler: &T) {
        // no op
    }

    fn assert_is_frame_handler<T: FrameHandler>(_handler: &T) {
        // no op
    }

    fn client_text(text: &str) -> Frame {
        let key = [9, 8, 7, 6];
        let mut bytes = vec![0x81, 0x80 | u8::try_from(text.len()).unwrap()];
        bytes.extend_from_slice(&key);
        bytes.extend_from_slice(&mask(text.as_bytes(), key));
        decode(&bytes).unwrap()
    }

    #[tokio::test]
    async fn closure_route_handler() {
        let handler = handler_fn(|request: HttpRequest| async move {
            Ok(ResponseSpec::text(StatusCode::OK, format!("param={}", request.param().unwrap_or("-"))))
        });
        assert_is_route_handler(&handler);

        let request = HttpRequest::new("GET", "/files/a.txt", HashMap::new(), Bytes::new()).with_param(Some("a.txt".into()));
        let response = handler.handle(request).await.unwrap();
        assert_eq!(response.body, Bytes::from_static(b"param=a.txt"));
    }

    #[tokio::test]
    async fn closure_route_handler_error() {
        let handler = handler_fn(|_request: HttpRequest| async move { Err::<ResponseSpec, BoxError>("boom".into()) });

        let request = HttpRequest::new("GET", "/", HashMap::new(), Bytes::new());
        let error = handler.handle(request).await.unwrap_err();
        assert_eq!(error.to_string(), "boom");
    }

    #[tokio::test]
    async fn closure_frame_handler() {
        let handler = frame_handler_fn(|_id, frame: Frame| async move {
            match frame.opcode() {
                OpCode::Close => FrameAction::Close,
                _ => FrameAction::Reply(OutboundFrame::text(frame.into_payload())),
            }
        });
        assert_is_frame_handler(&handler);

        let id = ConnectionId::new(7);
        handler.on_open(id).await;
        let action = handler.on_frame(id, client_text("ping")).await;
        assert_eq!(action, FrameAction::Reply(OutboundFrame::text("ping")));
        handler.on_close(id).await;
    }
}
