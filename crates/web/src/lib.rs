//! A single threaded HTTP and WebSocket server.
//!
//! `rook-web` puts the `rook-http` codecs behind one readiness loop: a [`Router`] maps request
//! paths to [`RouteHandler`]s, and a [`FrameHandler`] receives the frames of upgraded
//! connections.
//!
//! # Example
//!
//! ```no_run
//! use rook_web::{FrameAction, Server, ServerConfig, frame_handler_fn, handler_fn};
//! use rook_http::protocol::{HttpRequest, ResponseSpec};
//! use rook_http::ws::OutboundFrame;
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() {
//!     let server = Server::builder()
//!         .route("/heartbeat", handler_fn(|_request: HttpRequest| async {
//!             Ok(ResponseSpec::json(r#"{"status":"healthy"}"#))
//!         }))
//!         .frame_handler(frame_handler_fn(|_id, frame| async move {
//!             FrameAction::Reply(OutboundFrame::text(frame.into_payload()))
//!         }))
//!         .config(ServerConfig::default())
//!         .build()
//!         .unwrap();
//!
//!     server.start().await.unwrap();
//! }
//! ```

mod connection;
mod handler;
mod limit;
mod server;

pub mod config;
pub mod files;
pub mod router;

pub use config::ServerConfig;
pub use config::ServerError;
pub use connection::{ConnectionId, ConnectionState};
pub use files::StaticFiles;
pub use handler::{BoxError, FrameAction, FrameHandler, FrameHandlerFn, HandlerFn, RouteHandler};
pub use handler::{frame_handler_fn, handler_fn};
pub use limit::ConnectionLimiter;
pub use router::Router;
pub use server::{Multiplexer, Server, ServerBuilder};
