//! Message framing over a byte stream.
//!
//! A stream socket has no message boundaries, so every payload is framed
//! before it is written:
//!
//! - [`Framing::LengthPrefixed`]: `[4-byte length as u32 big-endian] + [payload]`
//! - [`Framing::Sentinel`]: `[payload] + b"END"`
//!
//! The sentinel scheme only works while no payload contains `END`; the
//! encoder refuses such payloads instead of writing a frame the peer would
//! split in the wrong place. Length prefixing has no such restriction and is
//! the default.
//!
//! [`FrameBuffer`] holds the decoding state and does no I/O, so the blocking
//! [`FramedStream`] and the async transport share it.

use serde::{Deserialize, Serialize};
use std::io::{ErrorKind, Read, Write};
use std::time::Duration;

use crate::protocol::error::{Result, SockrpcError};

/// Terminator of a sentinel-framed message.
pub const SENTINEL: &[u8] = b"END";

/// Size of the length prefix of a length-prefixed frame.
pub const LENGTH_PREFIX_SIZE: usize = 4;

/// Default maximum message size (100 MB)
pub const DEFAULT_MAX_MESSAGE_SIZE: usize = 100 * 1024 * 1024;

/// Default size of a single socket read.
pub const DEFAULT_RECV_BUFFER_SIZE: usize = 1024;

/// How message boundaries are marked on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Framing {
    #[default]
    LengthPrefixed,
    Sentinel,
}

/// Framing scheme plus the size limit applied to incoming and outgoing frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameCodec {
    pub framing: Framing,
    pub max_message_size: usize,
}

impl FrameCodec {
    pub fn new(framing: Framing) -> Self {
        Self {
            framing,
            max_message_size: DEFAULT_MAX_MESSAGE_SIZE,
        }
    }

    pub fn with_max_message_size(mut self, max_message_size: usize) -> Self {
        self.max_message_size = max_message_size;
        self
    }

    /// Wraps `payload` into a frame ready to be written.
    ///
    /// # Errors
    ///
    /// - `MessageTooLarge` if the payload exceeds the size limit
    /// - `MalformedMessage` if sentinel framing is used and the payload
    ///   contains the sentinel
    pub fn encode(&self, payload: &[u8]) -> Result<Vec<u8>> {
        if payload.len() > self.max_message_size {
            return Err(SockrpcError::MessageTooLarge {
                size: payload.len(),
                max: self.max_message_size,
            });
        }

        match self.framing {
            Framing::LengthPrefixed => {
                let len = u32::try_from(payload.len()).map_err(|_| SockrpcError::MessageTooLarge {
                    size: payload.len(),
                    max: u32::MAX as usize,
                })?;
                let mut frame = Vec::with_capacity(LENGTH_PREFIX_SIZE + payload.len());
                frame.extend_from_slice(&len.to_be_bytes());
                frame.extend_from_slice(payload);
                Ok(frame)
            }
            Framing::Sentinel => {
                if find_sentinel(payload, 0).is_some() {
                    return Err(SockrpcError::MalformedMessage(
                        "payload contains the frame sentinel and cannot be sentinel-framed"
                            .to_string(),
                    ));
                }
                let mut frame = Vec::with_capacity(payload.len() + SENTINEL.len());
                frame.extend_from_slice(payload);
                frame.extend_from_slice(SENTINEL);
                Ok(frame)
            }
        }
    }
}

impl Default for FrameCodec {
    fn default() -> Self {
        Self::new(Framing::default())
    }
}

fn find_sentinel(haystack: &[u8], from: usize) -> Option<usize> {
    haystack
        .get(from..)?
        .windows(SENTINEL.len())
        .position(|window| window == SENTINEL)
        .map(|pos| pos + from)
}

/// Accumulates received bytes and cuts complete frames out of them.
///
/// Bytes following a complete frame stay buffered for the next call.
#[derive(Debug)]
pub struct FrameBuffer {
    codec: FrameCodec,
    buf: Vec<u8>,
    // Bytes already searched for the sentinel without a match.
    scanned: usize,
}

impl FrameBuffer {
    pub fn new(codec: FrameCodec) -> Self {
        Self {
            codec,
            buf: Vec::new(),
            scanned: 0,
        }
    }

    pub fn codec(&self) -> FrameCodec {
        self.codec
    }

    pub fn extend(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Number of buffered bytes not yet returned as a frame.
    pub fn buffered(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Returns the next complete payload, or `None` if more bytes are needed.
    pub fn next_frame(&mut self) -> Result<Option<Vec<u8>>> {
        match self.codec.framing {
            Framing::LengthPrefixed => self.next_length_prefixed(),
            Framing::Sentinel => self.next_sentinel(),
        }
    }

    fn next_length_prefixed(&mut self) -> Result<Option<Vec<u8>>> {
        if self.buf.len() < LENGTH_PREFIX_SIZE {
            return Ok(None);
        }

        let mut len_buf = [0u8; LENGTH_PREFIX_SIZE];
        len_buf.copy_from_slice(&self.buf[..LENGTH_PREFIX_SIZE]);
        let len = u32::from_be_bytes(len_buf) as usize;

        // Validate length to prevent buffering excessively large messages
        if len > self.codec.max_message_size {
            return Err(SockrpcError::MessageTooLarge {
                size: len,
                max: self.codec.max_message_size,
            });
        }

        if self.buf.len() < LENGTH_PREFIX_SIZE + len {
            return Ok(None);
        }

        let frame = self.buf[LENGTH_PREFIX_SIZE..LENGTH_PREFIX_SIZE + len].to_vec();
        self.buf.drain(..LENGTH_PREFIX_SIZE + len);
        Ok(Some(frame))
    }

    fn next_sentinel(&mut self) -> Result<Option<Vec<u8>>> {
        // A sentinel may straddle the previous scan boundary.
        let from = self.scanned.saturating_sub(SENTINEL.len() - 1);

        match find_sentinel(&self.buf, from) {
            Some(pos) => {
                let frame = self.buf[..pos].to_vec();
                self.buf.drain(..pos + SENTINEL.len());
                self.scanned = 0;
                Ok(Some(frame))
            }
            None => {
                self.scanned = self.buf.len();
                if self.buf.len() > self.codec.max_message_size + SENTINEL.len() {
                    return Err(SockrpcError::MessageTooLarge {
                        size: self.buf.len(),
                        max: self.codec.max_message_size,
                    });
                }
                Ok(None)
            }
        }
    }
}

/// Maps IO errors to the transport error taxonomy.
///
/// - Timeouts/would block -> `Timeout`
/// - Reset/aborted/broken pipe/EOF -> `ConnectionClosed`
/// - Other IO errors -> `Io`
pub(crate) fn map_io_error(err: std::io::Error, context: &str, timeout: Option<Duration>) -> SockrpcError {
    match err.kind() {
        ErrorKind::TimedOut | ErrorKind::WouldBlock => {
            SockrpcError::Timeout(timeout.map(|t| t.as_millis() as u64).unwrap_or(0))
        }
        ErrorKind::ConnectionReset
        | ErrorKind::ConnectionAborted
        | ErrorKind::NotConnected
        | ErrorKind::BrokenPipe
        | ErrorKind::UnexpectedEof => {
            SockrpcError::ConnectionClosed(format!("{}: {}", context, err))
        }
        _ => SockrpcError::Io(err),
    }
}

/// Blocking framed message stream over any `Read + Write` byte stream.
///
/// # Example
///
/// ```
/// use sockrpc_common::transport::framing::{FrameCodec, FramedStream, Framing};
/// use std::io::Cursor;
///
/// let mut framed = FramedStream::new(Cursor::new(Vec::new()), FrameCodec::new(Framing::Sentinel), 1024);
/// framed.send(b"{}").unwrap();
/// assert_eq!(framed.get_ref().get_ref().as_slice(), b"{}END");
/// ```
pub struct FramedStream<S> {
    stream: S,
    buffer: FrameBuffer,
    chunk_size: usize,
    read_timeout: Option<Duration>,
}

impl<S: Read + Write> FramedStream<S> {
    /// Wraps `stream`; reads are issued in chunks of `chunk_size` bytes.
    pub fn new(stream: S, codec: FrameCodec, chunk_size: usize) -> Self {
        Self {
            stream,
            buffer: FrameBuffer::new(codec),
            chunk_size: chunk_size.max(1),
            read_timeout: None,
        }
    }

    /// Records the read deadline configured on the underlying socket, so
    /// that timeouts are reported with their duration.
    pub fn with_read_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.read_timeout = timeout;
        self
    }

    pub fn get_ref(&self) -> &S {
        &self.stream
    }

    pub fn get_mut(&mut self) -> &mut S {
        &mut self.stream
    }

    /// Frames and writes one message.
    pub fn send(&mut self, payload: &[u8]) -> Result<()> {
        let frame = self.buffer.codec().encode(payload)?;

        self.stream
            .write_all(&frame)
            .map_err(|e| map_io_error(e, "writing frame", self.read_timeout))?;

        // Flush to ensure data is sent
        self.stream
            .flush()
            .map_err(|e| map_io_error(e, "flushing stream", self.read_timeout))?;

        Ok(())
    }

    /// Blocks until a complete message arrives.
    ///
    /// # Errors
    ///
    /// - `ConnectionClosed` if the peer closes before a complete frame
    /// - `Timeout` if the socket read deadline expires
    /// - `MessageTooLarge` if the frame exceeds the size limit
    pub fn receive(&mut self) -> Result<Vec<u8>> {
        match self.receive_or_eof()? {
            Some(frame) => Ok(frame),
            None => Err(SockrpcError::ConnectionClosed(
                "peer closed the connection before sending a message".to_string(),
            )),
        }
    }

    /// Like [`receive`](Self::receive), but a peer closing cleanly between
    /// messages yields `None` instead of an error.
    pub fn receive_or_eof(&mut self) -> Result<Option<Vec<u8>>> {
        let mut chunk = vec![0u8; self.chunk_size];

        loop {
            if let Some(frame) = self.buffer.next_frame()? {
                return Ok(Some(frame));
            }

            let n = match self.stream.read(&mut chunk) {
                Ok(n) => n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(map_io_error(e, "reading frame", self.read_timeout)),
            };

            if n == 0 {
                if self.buffer.is_empty() {
                    return Ok(None);
                }
                return Err(SockrpcError::ConnectionClosed(format!(
                    "peer closed the connection with {} bytes of an incomplete message buffered",
                    self.buffer.buffered()
                )));
            }

            self.buffer.extend(&chunk[..n]);
        }
    }

    pub fn into_inner(self) -> S {
        self.stream
    }
}
