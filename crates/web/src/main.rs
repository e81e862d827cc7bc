use std::net::SocketAddr;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use async_trait::async_trait;
use clap::Parser;
use rook_http::protocol::{HttpRequest, ResponseSpec};
use rook_http::ws::{Frame, OpCode, OutboundFrame};
use rook_web::{BoxError, ConnectionId, FrameAction, FrameHandler, RouteHandler, Server, ServerConfig, ServerError, StaticFiles, handler_fn};
use serde::Serialize;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};
use uuid::Uuid;

#[derive(Parser, Debug)]
#[command(name = "rook", version, about = "http and websocket server", long_about = None)]
struct Cli {
    /// TOML configuration file, missing keys keep their defaults
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Address to listen on, overrides the configuration file
    #[arg(short, long)]
    address: Option<SocketAddr>,

    /// Directory static files are served from
    #[arg(long)]
    static_root: Option<PathBuf>,
}

impl Cli {
    fn server_config(&self) -> Result<ServerConfig, ServerError> {
        let mut config = match &self.config {
            Some(path) => ServerConfig::load(path)?,
            None => ServerConfig::default(),
        };
        if let Some(address) = self.address {
            config.address = address;
        }
        if let Some(static_root) = &self.static_root {
            config.static_root.clone_from(static_root);
        }
        config.validate()?;
        Ok(config)
    }
}

#[derive(Serialize)]
struct Heartbeat {
    status: &'static str,
}

#[derive(Serialize)]
struct Session {
    id: String,
}

async fn heartbeat(_request: HttpRequest) -> Result<ResponseSpec, BoxError> {
    Ok(ResponseSpec::json(serde_json::to_vec(&Heartbeat { status: "healthy" })?))
}

/// Serves one fixed file of the static root.
struct FixedFile {
    files: Arc<StaticFiles>,
    path: &'static str,
}

#[async_trait]
impl RouteHandler for FixedFile {
    async fn handle(&self, _request: HttpRequest) -> Result<ResponseSpec, BoxError> {
        Ok(self.files.send_file(self.path).await)
    }
}

/// Serves the wildcard capture below `prefix` of the static root.
struct FileTree {
    files: Arc<StaticFiles>,
    prefix: &'static str,
}

#[async_trait]
impl RouteHandler for FileTree {
    async fn handle(&self, request: HttpRequest) -> Result<ResponseSpec, BoxError> {
        let path = format!("{}{}", self.prefix, request.param().unwrap_or_default());
        Ok(self.files.send_file(&path).await)
    }
}

/// Answers every data frame with a fresh session id.
struct SessionIds;

#[async_trait]
impl FrameHandler for SessionIds {
    async fn on_open(&self, id: ConnectionId) {
        info!(%id, "websocket session opened");
    }

    async fn on_frame(&self, id: ConnectionId, frame: Frame) -> FrameAction {
        match frame.opcode() {
            OpCode::Text | OpCode::Binary => match serde_json::to_string(&Session { id: Uuid::new_v4().to_string() }) {
                Ok(body) => FrameAction::Reply(OutboundFrame::text(body)),
                Err(e) => {
                    error!(%id, cause = %e, "failed to encode session");
                    FrameAction::Close
                }
            },
            OpCode::Ping => FrameAction::Reply(OutboundFrame::pong(frame.into_payload())),
            OpCode::Close => FrameAction::Close,
            OpCode::Continuation | OpCode::Pong | OpCode::Reserved(_) => FrameAction::Ignore,
        }
    }

    async fn on_close(&self, id: ConnectionId) {
        info!(%id, "websocket session closed");
    }
}

fn app(config: ServerConfig) -> Result<Server, ServerError> {
    let files = Arc::new(StaticFiles::new(config.static_root.clone()));

    Server::builder()
        .route("/", FixedFile { files: Arc::clone(&files), path: "index.html" })
        .route("/heartbeat", handler_fn(heartbeat))
        .route("/assets/*", FileTree { files: Arc::clone(&files), prefix: "assets/" })
        .route("/*", FileTree { files, prefix: "" })
        .frame_handler(SessionIds)
        .config(config)
        .build()
}

fn main() -> ExitCode {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    let cli = Cli::parse();
    let server = match cli.server_config().and_then(app) {
        Ok(server) => server,
        Err(e) => {
            error!(cause = %e, "can not start server");
            return ExitCode::FAILURE;
        }
    };

    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(e) => {
            error!(cause = %e, "can not build runtime");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(server.start()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(cause = %e, "server stopped");
            ExitCode::FAILURE
        }
    }
}
