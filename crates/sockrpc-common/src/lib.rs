//! sockrpc Common Types and Transport
//!
//! This crate provides the protocol definitions and Unix socket transport
//! layer shared by the sockrpc server, client and CLI.
//!
//! # Overview
//!
//! sockrpc is a small RPC layer: a client sends a JSON request envelope
//! naming a method and its positional arguments over a local stream socket,
//! and the server answers with a response envelope carrying the result and
//! the request's correlation id.
//!
//! - **Protocol Layer**: Request/Response envelopes, type tags, method
//!   signatures and the error taxonomy
//! - **Transport Layer**: framing, JSON codec, Unix socket client and server
//! - **Configuration**: the JSON configuration file and the client/server
//!   settings derived from it
//!
//! # Architecture
//!
//! - **Transport**: Unix domain stream socket
//! - **Serialization**: JSON
//! - **Message Format**: `[4-byte length prefix as u32 big-endian] + [JSON data]`
//!   (or `[JSON data] + "END"` with sentinel framing)
//! - **Max Message Size**: 100 MB by default
//!
//! # Example
//!
//! ```
//! use sockrpc_common::{Request, Response};
//! use serde_json::json;
//!
//! let request = Request::new("reverse", vec![json!("hello world")]);
//! let response = Response::success(request.id.clone(), json!("dlrow olleh"));
//! assert_eq!(response.id, request.id);
//! ```

pub mod config;
pub mod protocol;
pub mod transport;

pub use protocol::*;
