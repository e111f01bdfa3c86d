use std::net::Shutdown;
use std::os::fd::AsRawFd;
use std::os::unix::net::UnixStream;
use std::path::Path;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};

use crate::config::ClientConfig;
use crate::protocol::error::{Result, SockrpcError};
use crate::protocol::{Request, Response};
use crate::transport::codec::JsonCodec;
use crate::transport::framing::{map_io_error, FrameBuffer, FrameCodec, FramedStream};

/// One framed Unix socket connection.
///
/// The socket is shut down in both directions and closed when the
/// connection is dropped, whichever way the owner exits. A failing shutdown
/// (the peer may already be gone) is ignored.
pub struct UnixConnection {
    framed: FramedStream<UnixStream>,
}

impl UnixConnection {
    /// Wraps an already connected or accepted stream.
    ///
    /// `read_timeout` is applied to reads and writes on the socket; `None`
    /// blocks indefinitely.
    pub fn new(
        stream: UnixStream,
        codec: FrameCodec,
        recv_buffer_size: usize,
        read_timeout: Option<Duration>,
    ) -> Result<Self> {
        stream
            .set_read_timeout(read_timeout)
            .map_err(|e| SockrpcError::Connection(format!("Failed to set read timeout: {}", e)))?;
        stream
            .set_write_timeout(read_timeout)
            .map_err(|e| SockrpcError::Connection(format!("Failed to set write timeout: {}", e)))?;

        let framed = FramedStream::new(stream, codec, recv_buffer_size).with_read_timeout(read_timeout);
        Ok(Self { framed })
    }

    pub fn send_message(&mut self, payload: &[u8]) -> Result<()> {
        self.framed.send(payload)
    }

    pub fn receive_message(&mut self) -> Result<Vec<u8>> {
        self.framed.receive()
    }

    /// Receives a message, or `None` if the peer closed between messages.
    pub fn receive_message_or_eof(&mut self) -> Result<Option<Vec<u8>>> {
        self.framed.receive_or_eof()
    }

    /// Sends a request and waits for response.
    ///
    /// The response is returned as decoded; matching its id against the
    /// request is left to the caller.
    pub fn send_request(&mut self, request: &Request) -> Result<Response> {
        let encoded = JsonCodec::encode_request(request)?;
        self.send_message(&encoded)?;

        let response_data = self.receive_message()?;
        JsonCodec::decode_response(&response_data)
    }

    pub fn send_response(&mut self, response: &Response) -> Result<()> {
        let encoded = JsonCodec::encode_response(response)?;
        self.send_message(&encoded)
    }

    pub fn stream(&self) -> &UnixStream {
        self.framed.get_ref()
    }
}

impl Drop for UnixConnection {
    fn drop(&mut self) {
        if let Err(e) = self.framed.get_ref().shutdown(Shutdown::Both) {
            tracing::trace!("Socket shutdown failed: {}", e);
        }
    }
}

/// Blocking Unix socket transport used by clients.
///
/// Every [`connect`](Self::connect) opens a fresh connection to the
/// configured socket path.
///
/// # Example
///
/// ```no_run
/// use sockrpc_common::config::ClientConfig;
/// use sockrpc_common::transport::UnixTransport;
/// use sockrpc_common::protocol::Request;
/// use serde_json::json;
///
/// let transport = UnixTransport::new(ClientConfig::new("/tmp/sockrpc.sock"));
/// let mut conn = transport.connect().unwrap();
///
/// let request = Request::new("reverse", vec![json!("hello world")]);
/// let response = conn.send_request(&request).unwrap();
/// ```
pub struct UnixTransport {
    config: ClientConfig,
}

impl UnixTransport {
    pub fn new(config: ClientConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Connects to the configured socket path.
    ///
    /// Fails fast with a `Connection` error if nothing listens there; no
    /// retry is attempted.
    pub fn connect(&self) -> Result<UnixConnection> {
        let path = &self.config.socket_path;
        tracing::debug!("Connecting to {}", path.display());

        let stream = UnixStream::connect(path).map_err(|e| connect_error(path, e))?;

        UnixConnection::new(
            stream,
            self.config.frame_codec(),
            self.config.recv_buffer_size,
            Some(self.config.read_timeout),
        )
    }
}

fn connect_error(path: &Path, err: std::io::Error) -> SockrpcError {
    SockrpcError::Connection(format!("Failed to connect to {}: {}", path.display(), err))
}

/// Async counterpart of [`UnixConnection`] for callers on a tokio runtime.
///
/// Shares the frame decoding state machine with the blocking transport.
pub struct AsyncUnixConnection {
    stream: tokio::net::UnixStream,
    buffer: FrameBuffer,
    recv_buffer_size: usize,
    read_timeout: Duration,
}

impl AsyncUnixConnection {
    pub async fn send_message(&mut self, payload: &[u8]) -> Result<()> {
        let frame = self.buffer.codec().encode(payload)?;
        let timeout = self.read_timeout;

        tokio::time::timeout(timeout, async {
            self.stream.write_all(&frame).await?;
            self.stream.flush().await
        })
        .await
        .map_err(|_| SockrpcError::Timeout(timeout.as_millis() as u64))?
        .map_err(|e| map_io_error(e, "writing frame", Some(timeout)))
    }

    /// Waits for a complete message, bounded by the read timeout.
    pub async fn receive_message(&mut self) -> Result<Vec<u8>> {
        let timeout = self.read_timeout;
        tokio::time::timeout(timeout, self.read_frame())
            .await
            .map_err(|_| SockrpcError::Timeout(timeout.as_millis() as u64))?
    }

    async fn read_frame(&mut self) -> Result<Vec<u8>> {
        let mut chunk = vec![0u8; self.recv_buffer_size.max(1)];

        loop {
            if let Some(frame) = self.buffer.next_frame()? {
                return Ok(frame);
            }

            let n = self
                .stream
                .read(&mut chunk)
                .await
                .map_err(|e| map_io_error(e, "reading frame", Some(self.read_timeout)))?;

            if n == 0 {
                return Err(SockrpcError::ConnectionClosed(format!(
                    "peer closed the connection with {} bytes of an incomplete message buffered",
                    self.buffer.buffered()
                )));
            }

            self.buffer.extend(&chunk[..n]);
        }
    }

    /// Sends a request and waits for response (async).
    pub async fn send_request(&mut self, request: &Request) -> Result<Response> {
        let encoded = JsonCodec::encode_request(request)?;
        self.send_message(&encoded).await?;

        let response_data = self.receive_message().await?;
        JsonCodec::decode_response(&response_data)
    }
}

impl Drop for AsyncUnixConnection {
    fn drop(&mut self) {
        let fd = self.stream.as_raw_fd();
        if let Err(e) = nix::sys::socket::shutdown(fd, nix::sys::socket::Shutdown::Both) {
            tracing::trace!("Socket shutdown failed: {}", e);
        }
    }
}

/// Async Unix socket transport.
///
/// # Example
///
/// ```no_run
/// use sockrpc_common::config::ClientConfig;
/// use sockrpc_common::transport::UnixTransportAsync;
/// use sockrpc_common::protocol::Request;
/// use serde_json::json;
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let transport = UnixTransportAsync::new(ClientConfig::new("/tmp/sockrpc.sock"));
/// let mut conn = transport.connect().await?;
///
/// let request = Request::new("sort", vec![json!(["b", "a"])]);
/// let response = conn.send_request(&request).await?;
/// # Ok(())
/// # }
/// ```
pub struct UnixTransportAsync {
    config: ClientConfig,
}

impl UnixTransportAsync {
    pub fn new(config: ClientConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Connects to the configured socket path (async).
    pub async fn connect(&self) -> Result<AsyncUnixConnection> {
        let path = &self.config.socket_path;
        tracing::debug!("Connecting to {}", path.display());

        let stream = tokio::net::UnixStream::connect(path)
            .await
            .map_err(|e| connect_error(path, e))?;

        Ok(AsyncUnixConnection {
            stream,
            buffer: FrameBuffer::new(self.config.frame_codec()),
            recv_buffer_size: self.config.recv_buffer_size,
            read_timeout: self.config.read_timeout,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::framing::Framing;
    use std::io::{Read, Write};
    use std::os::unix::net::UnixListener;
    use std::thread;
    use tempfile::TempDir;

    #[test]
    fn test_connect_to_missing_socket_fails_fast() {
        let dir = TempDir::new().unwrap();
        let transport = UnixTransport::new(ClientConfig::new(dir.path().join("absent.sock")));

        match transport.connect() {
            Err(SockrpcError::Connection(msg)) => assert!(msg.contains("absent.sock")),
            Err(other) => panic!("expected Connection error, got {:?}", other),
            Ok(_) => panic!("connect to a missing socket succeeded"),
        }
    }

    #[test]
    fn test_read_timeout_closes_connection() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("silent.sock");
        let listener = UnixListener::bind(&path).unwrap();

        // Accept and stay silent until the client gives up.
        let server = thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut buf = Vec::new();
            // Returns once the client shuts the socket down.
            stream.read_to_end(&mut buf).unwrap();
            buf
        });

        let config = ClientConfig::new(&path).with_read_timeout(Duration::from_millis(100));
        let transport = UnixTransport::new(config);
        let mut conn = transport.connect().unwrap();

        let request = Request::new("reverse", vec![serde_json::json!("hello")]);
        match conn.send_request(&request) {
            Err(SockrpcError::Timeout(ms)) => assert_eq!(ms, 100),
            other => panic!("expected Timeout, got {:?}", other),
        }
        drop(conn);

        // The server saw exactly one frame followed by EOF from the shutdown.
        let received = server.join().unwrap();
        let mut buffer = FrameBuffer::new(FrameCodec::default());
        buffer.extend(&received);
        assert!(buffer.next_frame().unwrap().is_some());
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_sentinel_round_trip_over_socket() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("sentinel.sock");
        let listener = UnixListener::bind(&path).unwrap();

        let server = thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            let mut conn = UnixConnection::new(
                stream,
                FrameCodec::new(Framing::Sentinel),
                16,
                None,
            )
            .unwrap();
            let request = JsonCodec::decode_request(&conn.receive_message().unwrap()).unwrap();
            conn.send_response(&Response::success(request.id, serde_json::json!("ok")))
                .unwrap();
        });

        let config = ClientConfig::new(&path).with_framing(Framing::Sentinel);
        let mut conn = UnixTransport::new(config).connect().unwrap();
        let request = Request::new("ping", vec![]);
        let response = conn.send_request(&request).unwrap();

        assert_eq!(response.id, request.id);
        assert_eq!(response.result, serde_json::json!("ok"));
        server.join().unwrap();
    }

    #[test]
    fn test_peer_disconnect_is_connection_closed() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("hangup.sock");
        let listener = UnixListener::bind(&path).unwrap();

        let server = thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            // Half a length prefix, then hang up.
            stream.write_all(&[0, 0]).unwrap();
        });

        let mut conn = UnixTransport::new(ClientConfig::new(&path)).connect().unwrap();
        server.join().unwrap();

        assert!(matches!(
            conn.receive_message(),
            Err(SockrpcError::ConnectionClosed(_))
        ));
    }

    #[tokio::test]
    async fn test_async_connect_to_missing_socket_fails() {
        let dir = TempDir::new().unwrap();
        let transport = UnixTransportAsync::new(ClientConfig::new(dir.path().join("absent.sock")));
        assert!(matches!(
            transport.connect().await,
            Err(SockrpcError::Connection(_))
        ));
    }

    #[tokio::test]
    async fn test_async_read_timeout() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("async-silent.sock");
        let listener = tokio::net::UnixListener::bind(&path).unwrap();

        let server = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut buf = Vec::new();
            let _ = stream.read_to_end(&mut buf).await;
        });

        let config = ClientConfig::new(&path).with_read_timeout(Duration::from_millis(100));
        let mut conn = UnixTransportAsync::new(config).connect().await.unwrap();
        let request = Request::new("reverse", vec![serde_json::json!("x")]);

        assert!(matches!(
            conn.send_request(&request).await,
            Err(SockrpcError::Timeout(100))
        ));
        drop(conn);
        server.await.unwrap();
    }
}
