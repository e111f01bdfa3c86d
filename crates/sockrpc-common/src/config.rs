//! Client and server configuration.
//!
//! [`RpcConfig`] is the on-disk format (JSON). It is turned into a
//! [`ClientConfig`] or [`ServerConfig`], the builder-style structs the
//! transports consume.
//!
//! # Example
//!
//! ```
//! use sockrpc_common::config::RpcConfig;
//!
//! let config: RpcConfig = serde_json::from_str(r#"{"filepath": "/tmp/rpc.sock"}"#).unwrap();
//! assert_eq!(config.recv_buffer_size, 1024);
//! assert!(config.validate().is_ok());
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::protocol::error::{Result, SockrpcError};
use crate::transport::framing::{
    FrameCodec, Framing, DEFAULT_MAX_MESSAGE_SIZE, DEFAULT_RECV_BUFFER_SIZE,
};

/// Default client read timeout (60 seconds)
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(60);

/// Default listen backlog.
pub const DEFAULT_BACKLOG: i32 = 5;

/// Default cap on concurrently served connections.
pub const DEFAULT_MAX_CONNECTIONS: usize = 128;

fn default_recv_buffer_size() -> usize {
    DEFAULT_RECV_BUFFER_SIZE
}

fn default_read_timeout_ms() -> u64 {
    DEFAULT_READ_TIMEOUT.as_millis() as u64
}

fn default_backlog() -> i32 {
    DEFAULT_BACKLOG
}

fn default_max_message_size() -> usize {
    DEFAULT_MAX_MESSAGE_SIZE
}

fn default_max_connections() -> usize {
    DEFAULT_MAX_CONNECTIONS
}

/// Configuration file contents.
///
/// Only `socket_path` is required. The legacy key `filepath` is accepted
/// for it, so existing `config.json` files keep working.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RpcConfig {
    #[serde(alias = "filepath")]
    pub socket_path: PathBuf,
    #[serde(default = "default_recv_buffer_size")]
    pub recv_buffer_size: usize,
    #[serde(default = "default_read_timeout_ms")]
    pub read_timeout_ms: u64,
    #[serde(default = "default_backlog")]
    pub backlog: i32,
    #[serde(default)]
    pub framing: Framing,
    #[serde(default = "default_max_message_size")]
    pub max_message_size: usize,
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,
    #[serde(default)]
    pub server_read_timeout_ms: Option<u64>,
}

impl RpcConfig {
    /// Creates a configuration with default values for `socket_path`.
    pub fn new(socket_path: impl Into<PathBuf>) -> Self {
        Self {
            socket_path: socket_path.into(),
            recv_buffer_size: DEFAULT_RECV_BUFFER_SIZE,
            read_timeout_ms: default_read_timeout_ms(),
            backlog: DEFAULT_BACKLOG,
            framing: Framing::default(),
            max_message_size: DEFAULT_MAX_MESSAGE_SIZE,
            max_connections: DEFAULT_MAX_CONNECTIONS,
            server_read_timeout_ms: None,
        }
    }

    /// Loads and validates a JSON configuration file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            SockrpcError::Config(format!("Failed to read config file {}: {}", path.display(), e))
        })?;
        let config: RpcConfig = serde_json::from_str(&contents).map_err(|e| {
            SockrpcError::Config(format!("Invalid config file {}: {}", path.display(), e))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The socket path is empty
    /// - The receive buffer size, read timeout, maximum message size or
    ///   maximum connection count is zero
    /// - The backlog is not positive
    pub fn validate(&self) -> Result<()> {
        if self.socket_path.as_os_str().is_empty() {
            return Err(SockrpcError::Config("socket path must not be empty".to_string()));
        }
        if self.recv_buffer_size == 0 {
            return Err(SockrpcError::Config("receive buffer size must be greater than zero".to_string()));
        }
        if self.read_timeout_ms == 0 {
            return Err(SockrpcError::Config("read timeout must be greater than zero".to_string()));
        }
        if self.backlog <= 0 {
            return Err(SockrpcError::Config(format!("backlog must be positive (got {})", self.backlog)));
        }
        if self.max_message_size == 0 {
            return Err(SockrpcError::Config("max message size must be greater than zero".to_string()));
        }
        if self.max_connections == 0 {
            return Err(SockrpcError::Config("max connections must be greater than zero".to_string()));
        }
        if self.server_read_timeout_ms == Some(0) {
            return Err(SockrpcError::Config("server read timeout must be greater than zero".to_string()));
        }
        Ok(())
    }

    pub fn client_config(&self) -> ClientConfig {
        ClientConfig::new(&self.socket_path)
            .with_recv_buffer_size(self.recv_buffer_size)
            .with_read_timeout(Duration::from_millis(self.read_timeout_ms))
            .with_framing(self.framing)
            .with_max_message_size(self.max_message_size)
    }

    pub fn server_config(&self) -> ServerConfig {
        let mut config = ServerConfig::new(&self.socket_path)
            .with_recv_buffer_size(self.recv_buffer_size)
            .with_backlog(self.backlog)
            .with_framing(self.framing)
            .with_max_message_size(self.max_message_size)
            .with_max_connections(self.max_connections);
        if let Some(ms) = self.server_read_timeout_ms {
            config = config.with_read_timeout(Duration::from_millis(ms));
        }
        config
    }
}

/// Settings of a client transport.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    pub socket_path: PathBuf,
    pub recv_buffer_size: usize,
    /// Deadline for every read and write on a connection
    pub read_timeout: Duration,
    pub framing: Framing,
    pub max_message_size: usize,
}

impl ClientConfig {
    pub fn new(socket_path: impl Into<PathBuf>) -> Self {
        Self {
            socket_path: socket_path.into(),
            recv_buffer_size: DEFAULT_RECV_BUFFER_SIZE,
            read_timeout: DEFAULT_READ_TIMEOUT,
            framing: Framing::default(),
            max_message_size: DEFAULT_MAX_MESSAGE_SIZE,
        }
    }

    pub fn with_recv_buffer_size(mut self, size: usize) -> Self {
        self.recv_buffer_size = size;
        self
    }

    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    pub fn with_framing(mut self, framing: Framing) -> Self {
        self.framing = framing;
        self
    }

    pub fn with_max_message_size(mut self, size: usize) -> Self {
        self.max_message_size = size;
        self
    }

    pub fn frame_codec(&self) -> FrameCodec {
        FrameCodec::new(self.framing).with_max_message_size(self.max_message_size)
    }
}

/// Settings of a server.
#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    pub socket_path: PathBuf,
    pub recv_buffer_size: usize,
    pub backlog: i32,
    pub framing: Framing,
    pub max_message_size: usize,
    /// Connections served at once; the accept loop waits when reached
    pub max_connections: usize,
    /// Read deadline for served connections; `None` waits indefinitely
    pub read_timeout: Option<Duration>,
}

impl ServerConfig {
    pub fn new(socket_path: impl Into<PathBuf>) -> Self {
        Self {
            socket_path: socket_path.into(),
            recv_buffer_size: DEFAULT_RECV_BUFFER_SIZE,
            backlog: DEFAULT_BACKLOG,
            framing: Framing::default(),
            max_message_size: DEFAULT_MAX_MESSAGE_SIZE,
            max_connections: DEFAULT_MAX_CONNECTIONS,
            read_timeout: None,
        }
    }

    pub fn with_recv_buffer_size(mut self, size: usize) -> Self {
        self.recv_buffer_size = size;
        self
    }

    pub fn with_backlog(mut self, backlog: i32) -> Self {
        self.backlog = backlog;
        self
    }

    pub fn with_framing(mut self, framing: Framing) -> Self {
        self.framing = framing;
        self
    }

    pub fn with_max_message_size(mut self, size: usize) -> Self {
        self.max_message_size = size;
        self
    }

    pub fn with_max_connections(mut self, max: usize) -> Self {
        self.max_connections = max;
        self
    }

    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = Some(timeout);
        self
    }

    pub fn frame_codec(&self) -> FrameCodec {
        FrameCodec::new(self.framing).with_max_message_size(self.max_message_size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults() {
        let config = RpcConfig::new("/tmp/test.sock");
        assert_eq!(config.recv_buffer_size, 1024);
        assert_eq!(config.read_timeout_ms, 60_000);
        assert_eq!(config.backlog, 5);
        assert_eq!(config.framing, Framing::LengthPrefixed);
        assert_eq!(config.max_connections, 128);
        assert!(config.server_read_timeout_ms.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_legacy_filepath_key() {
        let config: RpcConfig = serde_json::from_str(r#"{"filepath": "./socket_file"}"#).unwrap();
        assert_eq!(config.socket_path, PathBuf::from("./socket_file"));
    }

    #[test]
    fn test_full_config() {
        let config: RpcConfig = serde_json::from_str(
            r#"{
                "socket_path": "/run/rpc.sock",
                "recv_buffer_size": 4096,
                "read_timeout_ms": 500,
                "backlog": 16,
                "framing": "sentinel",
                "max_message_size": 65536,
                "max_connections": 4,
                "server_read_timeout_ms": 30000
            }"#,
        )
        .unwrap();

        assert_eq!(config.framing, Framing::Sentinel);

        let client = config.client_config();
        assert_eq!(client.read_timeout, Duration::from_millis(500));
        assert_eq!(client.recv_buffer_size, 4096);
        assert_eq!(client.frame_codec().max_message_size, 65536);

        let server = config.server_config();
        assert_eq!(server.backlog, 16);
        assert_eq!(server.max_connections, 4);
        assert_eq!(server.read_timeout, Some(Duration::from_secs(30)));
        assert_eq!(server.framing, Framing::Sentinel);
    }

    #[test]
    fn test_missing_socket_path_fails() {
        assert!(serde_json::from_str::<RpcConfig>(r#"{"backlog": 5}"#).is_err());
    }

    #[test]
    fn test_validate_rejects_zero_values() {
        let mut config = RpcConfig::new("/tmp/x.sock");
        config.recv_buffer_size = 0;
        assert!(config.validate().is_err());

        let mut config = RpcConfig::new("/tmp/x.sock");
        config.backlog = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("backlog"));

        let mut config = RpcConfig::new("/tmp/x.sock");
        config.server_read_timeout_ms = Some(0);
        assert!(config.validate().is_err());

        assert!(RpcConfig::new("").validate().is_err());
    }

    #[test]
    fn test_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, r#"{{"filepath": "/tmp/from_file.sock", "backlog": 8}}"#).unwrap();

        let config = RpcConfig::from_file(file.path()).unwrap();
        assert_eq!(config.socket_path, PathBuf::from("/tmp/from_file.sock"));
        assert_eq!(config.backlog, 8);
    }

    #[test]
    fn test_from_missing_file() {
        let err = RpcConfig::from_file("/nonexistent/config.json").unwrap_err();
        assert!(matches!(err, SockrpcError::Config(_)));
    }
}
