//! sockrpc Transport Layer
//!
//! This module provides framing, codecs and the Unix socket transport for
//! sending/receiving RPC envelopes.
//!
//! # Architecture
//!
//! - **Framing**: [`framing::Framing`] marks message boundaries on the byte
//!   stream (4-byte big-endian length prefix by default, `END` sentinel for
//!   legacy peers)
//! - **Codec**: JSON serialization of request/response envelopes
//! - **Transport**: Unix domain stream sockets, one connection per call on
//!   the client, one thread per connection on the server
//!
//! # Components
//!
//! - **[`JsonCodec`]**: Encode/decode envelopes to JSON
//! - **[`FramedStream`]**: Blocking framed messages over any byte stream
//! - **[`UnixTransport`]**: Blocking client transport
//! - **[`UnixTransportAsync`]**: Async client transport (tokio)
//! - **[`UnixServer`]**: Threaded server
//!
//! # Message Size Limits
//!
//! All transports enforce a maximum message size (100 MB by default) to
//! prevent memory exhaustion.

pub mod codec;
pub mod framing;
pub mod unix;
pub mod unix_server;

pub use codec::JsonCodec;
pub use framing::{FrameBuffer, FrameCodec, FramedStream, Framing};
pub use unix::{AsyncUnixConnection, UnixConnection, UnixTransport, UnixTransportAsync};
pub use unix_server::UnixServer;
