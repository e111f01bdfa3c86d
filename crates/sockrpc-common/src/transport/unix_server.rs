use std::os::fd::AsRawFd;
use std::os::unix::fs::FileTypeExt;
use std::os::unix::net::{UnixListener, UnixStream};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use nix::sys::socket::{bind, listen, socket, AddressFamily, Backlog, SockFlag, SockType, UnixAddr};
use tokio::sync::Semaphore;

use crate::config::ServerConfig;
use crate::protocol::error::{Result, SockrpcError};
use crate::protocol::{Request, Response};
use crate::transport::codec::JsonCodec;
use crate::transport::unix::UnixConnection;

/// Pause after a failed `accept` before trying again.
const ACCEPT_RETRY_DELAY: Duration = Duration::from_millis(50);

/// Threaded Unix socket server.
///
/// Each accepted connection is served on its own thread. The number of
/// connections served at once is capped by `max_connections` through a
/// semaphore; when the cap is reached the accept loop waits for a permit
/// and new peers queue in the listen backlog.
pub struct UnixServer {
    listener: UnixListener,
    config: ServerConfig,
    permits: Arc<Semaphore>,
}

impl UnixServer {
    /// Binds a listening socket at the configured path.
    ///
    /// A stale socket file left at the path by a previous run is removed
    /// first. Any other kind of file at the path is an error and is left
    /// untouched.
    pub fn bind(config: ServerConfig) -> Result<Self> {
        remove_stale_socket(&config.socket_path)?;

        tracing::info!("Starting up on {}", config.socket_path.display());
        let listener = bind_listener(&config.socket_path, config.backlog).map_err(|e| {
            SockrpcError::Connection(format!(
                "Failed to bind to {}: {}",
                config.socket_path.display(),
                e
            ))
        })?;

        let permits = Arc::new(Semaphore::new(config.max_connections.max(1)));
        Ok(Self {
            listener,
            config,
            permits,
        })
    }

    pub fn socket_path(&self) -> &Path {
        &self.config.socket_path
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Connection slots in use. While the accept loop runs this includes
    /// the slot reserved for the next peer.
    pub fn active_connections(&self) -> usize {
        self.config.max_connections.max(1) - self.permits.available_permits()
    }

    /// Runs the server with the given request handler.
    ///
    /// Accepts connections forever, serving each on its own thread. A
    /// handler error is sent back to the caller as a failed response;
    /// transport errors, malformed frames and handler panics end only the
    /// affected connection.
    pub fn run_with_handler<F>(&self, handler: F) -> Result<()>
    where
        F: Fn(Request) -> Result<Response> + Send + Sync + 'static,
    {
        let handler = Arc::new(handler);
        let connection_ids = AtomicU64::new(0);

        // Only used to wait for a free permit; connections run on plain threads.
        let runtime = tokio::runtime::Builder::new_current_thread()
            .build()
            .map_err(|e| SockrpcError::Connection(format!("Failed to create runtime: {}", e)))?;

        loop {
            // The permit moves into the connection thread and is released
            // when that thread ends, also by panic.
            let permit = runtime
                .block_on(self.permits.clone().acquire_owned())
                .map_err(|e| SockrpcError::Connection(format!("Connection limit closed: {}", e)))?;

            let stream = match self.listener.accept() {
                Ok((stream, _)) => stream,
                Err(e) => {
                    tracing::warn!("Failed to accept connection: {}", e);
                    thread::sleep(ACCEPT_RETRY_DELAY);
                    continue;
                }
            };

            let conn_id = connection_ids.fetch_add(1, Ordering::Relaxed);
            tracing::debug!(conn_id, "Connection accepted");

            let handler = handler.clone();
            let config = self.config.clone();
            let spawned = thread::Builder::new()
                .name(format!("sockrpc-conn-{}", conn_id))
                .spawn(move || {
                    let _permit = permit;
                    match serve_connection(stream, &config, handler.as_ref()) {
                        Ok(()) => tracing::debug!(conn_id, "Connection closed"),
                        Err(e) => tracing::warn!(conn_id, "Connection error: {}", e),
                    }
                });

            if let Err(e) = spawned {
                tracing::error!(conn_id, "Failed to spawn connection thread: {}", e);
            }
        }
    }
}

impl Drop for UnixServer {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.config.socket_path) {
            tracing::trace!(
                "Failed to remove socket file {}: {}",
                self.config.socket_path.display(),
                e
            );
        }
    }
}

/// Handle a single connection
///
/// Serves request/response exchanges in order until the peer closes.
fn serve_connection<F>(stream: UnixStream, config: &ServerConfig, handler: &F) -> Result<()>
where
    F: Fn(Request) -> Result<Response>,
{
    let mut conn = UnixConnection::new(
        stream,
        config.frame_codec(),
        config.recv_buffer_size,
        config.read_timeout,
    )?;

    loop {
        let frame = match conn.receive_message_or_eof()? {
            Some(frame) => frame,
            None => return Ok(()),
        };

        let request = match JsonCodec::decode_request(&frame) {
            Ok(req) => req,
            Err(e) => {
                tracing::warn!("Failed to decode request: {}", e);
                let id = JsonCodec::peek_id(&frame).unwrap_or_default();
                send_reply(&mut conn, &Response::from_error(id, &e))?;
                continue;
            }
        };

        let request_id = request.id.clone();
        let response = match handler(request) {
            Ok(resp) => resp,
            Err(e) => {
                tracing::debug!("Handler error: {}", e);
                Response::from_error(request_id, &e)
            }
        };

        send_reply(&mut conn, &response)?;
    }
}

/// Sends a response, or a fault in its place when the response cannot be
/// framed (too large, or containing the sentinel). Encoding happens before
/// anything is written, so the fault is the only frame the peer sees.
fn send_reply(conn: &mut UnixConnection, response: &Response) -> Result<()> {
    match conn.send_response(response) {
        Err(e @ (SockrpcError::MalformedMessage(_) | SockrpcError::MessageTooLarge { .. })) => {
            tracing::warn!("Response {} cannot be framed: {}", response.id, e);
            conn.send_response(&Response::from_error(response.id.clone(), &e))
        }
        other => other,
    }
}

fn remove_stale_socket(path: &Path) -> Result<()> {
    match std::fs::symlink_metadata(path) {
        Ok(meta) if meta.file_type().is_socket() => {
            tracing::debug!("Removing stale socket {}", path.display());
            std::fs::remove_file(path)?;
            Ok(())
        }
        Ok(_) => Err(SockrpcError::Config(format!(
            "{} exists and is not a socket",
            path.display()
        ))),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(SockrpcError::Io(e)),
    }
}

/// Creates a listening Unix socket with an explicit backlog, which
/// `UnixListener::bind` does not expose.
fn bind_listener(path: &Path, backlog: i32) -> Result<UnixListener> {
    let fd = socket(AddressFamily::Unix, SockType::Stream, SockFlag::SOCK_CLOEXEC, None)?;
    let addr = UnixAddr::new(path)?;
    bind(fd.as_raw_fd(), &addr)?;
    listen(&fd, Backlog::new(backlog)?)?;
    Ok(UnixListener::from(fd))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ClientConfig;
    use crate::transport::UnixTransport;
    use nix::fcntl::{fcntl, FcntlArg, FdFlag};
    use tempfile::TempDir;

    #[test]
    fn test_bind_creates_socket_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("server.sock");
        let server = UnixServer::bind(ServerConfig::new(&path)).unwrap();

        assert_eq!(server.socket_path(), path.as_path());
        assert!(std::fs::symlink_metadata(&path).unwrap().file_type().is_socket());
        assert_eq!(server.active_connections(), 0);
    }

    #[test]
    fn test_bind_removes_stale_socket() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("stale.sock");

        // A listener that is dropped leaves its socket file behind.
        drop(UnixListener::bind(&path).unwrap());
        assert!(path.exists());

        assert!(UnixServer::bind(ServerConfig::new(&path)).is_ok());
    }

    #[test]
    fn test_bind_refuses_regular_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("not-a-socket");
        std::fs::write(&path, b"data").unwrap();

        let err = UnixServer::bind(ServerConfig::new(&path)).err().unwrap();
        assert!(matches!(err, SockrpcError::Config(_)));
        assert_eq!(std::fs::read(&path).unwrap(), b"data");
    }

    #[test]
    fn test_drop_removes_socket_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cleanup.sock");
        let server = UnixServer::bind(ServerConfig::new(&path)).unwrap();
        drop(server);
        assert!(!path.exists());
    }

    #[test]
    fn test_listener_is_close_on_exec() {
        let dir = TempDir::new().unwrap();
        let server = UnixServer::bind(ServerConfig::new(dir.path().join("cloexec.sock"))).unwrap();

        let flags = fcntl(server.listener.as_raw_fd(), FcntlArg::F_GETFD).unwrap();
        assert!(FdFlag::from_bits_truncate(flags).contains(FdFlag::FD_CLOEXEC));
    }

    #[test]
    fn test_slot_released_after_handler_panic() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("single.sock");
        let server = Arc::new(
            UnixServer::bind(ServerConfig::new(&path).with_max_connections(1)).unwrap(),
        );

        let running = server.clone();
        thread::spawn(move || {
            running
                .run_with_handler(|request: Request| {
                    if request.method == "panic" {
                        panic!("handler blew up");
                    }
                    Ok(Response::success(request.id, serde_json::json!("ok")))
                })
                .unwrap();
        });

        let transport = UnixTransport::new(
            ClientConfig::new(&path).with_read_timeout(Duration::from_secs(5)),
        );

        // The panicking connection dies without a reply.
        let mut conn = transport.connect().unwrap();
        assert!(conn.send_request(&Request::new("panic", vec![])).is_err());
        drop(conn);

        // With a single slot, this is only served if the panic freed it.
        let request = Request::new("echo", vec![]);
        let response = transport.connect().unwrap().send_request(&request).unwrap();
        assert_eq!(response.id, request.id);
    }
}
