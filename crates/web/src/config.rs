//! Server configuration.
//!
//! [`ServerConfig`] is a plain value. Every field has a default, so a TOML file only needs
//! the keys it changes:
//!
//! ```toml
//! address = "127.0.0.1:8080"
//! max_connections_per_ip = 4
//! ```

use std::io;
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::path::{Path, PathBuf};

use rook_http::codec::DEFAULT_MAX_REQUEST_BYTES;
use rook_http::ws::DEFAULT_MAX_FRAME_BYTES;
use serde::Deserialize;
use thiserror::Error;

/// Port of the default listen address `0.0.0.0:9034`.
pub const DEFAULT_PORT: u16 = 9034;
/// Default length of the pending connection queue.
pub const DEFAULT_BACKLOG: u32 = 10;
/// Default cap on live connections in total.
pub const DEFAULT_MAX_CONNECTIONS: usize = 500;
/// Default cap on live connections from one address.
pub const DEFAULT_MAX_CONNECTIONS_PER_IP: usize = 10;

/// Settings of one server, fixed once the server is built.
///
/// Every field has a default, so a TOML file only needs the keys it changes.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    /// Address the listener binds to.
    pub address: SocketAddr,
    /// Length of the pending connection queue handed to `listen`.
    pub backlog: u32,
    /// Upper bound for one buffered HTTP request, head and body.
    pub max_request_bytes: usize,
    /// Upper bound for one buffered websocket frame, header included.
    pub max_frame_bytes: usize,
    pub max_connections: usize,
    pub max_connections_per_ip: usize,
    /// Directory static files are served from.
    pub static_root: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, DEFAULT_PORT)),
            backlog: DEFAULT_BACKLOG,
            max_request_bytes: DEFAULT_MAX_REQUEST_BYTES,
            max_frame_bytes: DEFAULT_MAX_FRAME_BYTES,
            max_connections: DEFAULT_MAX_CONNECTIONS,
            max_connections_per_ip: DEFAULT_MAX_CONNECTIONS_PER_IP,
            static_root: PathBuf::from("dist"),
        }
    }
}

impl ServerConfig {
    /// Parses a TOML document, missing keys keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Config`] on malformed TOML, unknown keys or invalid values.
    pub fn from_toml(content: &str) -> Result<Self, ServerError> {
        let config = toml::from_str::<Self>(content).map_err(|e| ServerError::config(e.message()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reads and parses a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Config`] if the file can not be read or does not parse.
    pub fn load(path: &Path) -> Result<Self, ServerError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| ServerError::config(format!("can not read {}: {e}", path.display())))?;
        Self::from_toml(&content)
    }

    /// Checks the limits are usable.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Config`] naming the first limit that is zero or inconsistent.
    pub fn validate(&self) -> Result<(), ServerError> {
        if self.backlog == 0 {
            return Err(ServerError::config("backlog must be greater than zero"));
        }
        let limits = [
            ("max_request_bytes", self.max_request_bytes),
            ("max_frame_bytes", self.max_frame_bytes),
            ("max_connections", self.max_connections),
            ("max_connections_per_ip", self.max_connections_per_ip),
        ];
        if let Some((name, _)) = limits.iter().find(|(_, value)| *value == 0) {
            return Err(ServerError::config(format!("{name} must be greater than zero")));
        }
        if self.max_connections_per_ip > self.max_connections {
            return Err(ServerError::config("max_connections_per_ip exceeds max_connections"));
        }
        Ok(())
    }
}

/// Errors that stop a server from starting.
///
/// Errors of a single connection never surface here, they are logged and close that connection.
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("socket error: {source}")]
    Socket {
        #[from]
        source: io::Error,
    },

    #[error("invalid configuration: {reason}")]
    Config { reason: String },
}

impl ServerError {
    /// Creates a [`ServerError::Config`] with the given reason.
    pub fn config<S: ToString>(reason: S) -> Self {
        Self::Config { reason: reason.to_string() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;

    #[test]
    fn defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.address.to_string(), "0.0.0.0:9034");
        assert_eq!(config.backlog, 10);
        assert_eq!(config.max_request_bytes, 8 * 1024);
        assert_eq!(config.max_frame_bytes, 1024 * 1024);
        assert_eq!(config.max_connections, 500);
        assert_eq!(config.max_connections_per_ip, 10);
        assert_eq!(config.static_root, PathBuf::from("dist"));
        config.validate().unwrap();
    }

    #[test]
    fn partial_toml() {
        let config = ServerConfig::from_toml(indoc! {r#"
            address = "127.0.0.1:8080"
            max_connections_per_ip = 4
            static_root = "public"
        "#})
        .unwrap();

        assert_eq!(config.address.to_string(), "127.0.0.1:8080");
        assert_eq!(config.max_connections_per_ip, 4);
        assert_eq!(config.static_root, PathBuf::from("public"));
        assert_eq!(config.backlog, DEFAULT_BACKLOG);
    }

    #[test]
    fn empty_toml_is_default() {
        assert_eq!(ServerConfig::from_toml("").unwrap(), ServerConfig::default());
    }

    #[test]
    fn unknown_key() {
        let result = ServerConfig::from_toml("port = 80");
        assert!(matches!(result, Err(ServerError::Config { .. })));
    }

    #[test]
    fn invalid_values() {
        let error = ServerConfig::from_toml("max_frame_bytes = 0").unwrap_err();
        assert_eq!(error.to_string(), "invalid configuration: max_frame_bytes must be greater than zero");

        let error = ServerConfig::from_toml("max_connections = 5\nmax_connections_per_ip = 6").unwrap_err();
        assert!(matches!(error, ServerError::Config { .. }));

        ServerConfig::from_toml(r#"address = "not an address""#).unwrap_err();
    }

    #[test]
    fn missing_file() {
        let result = ServerConfig::load(Path::new("/definitely/not/here.toml"));
        assert!(matches!(result, Err(ServerError::Config { .. })));
    }
}
