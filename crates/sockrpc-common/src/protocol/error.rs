use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SockrpcError {
    #[error("Connection closed by peer: {0}")]
    ConnectionClosed(String),

    #[error("Request timeout after {0}ms")]
    Timeout(u64),

    #[error("Malformed message: {0}")]
    MalformedMessage(String),

    #[error("Unknown method: {0}")]
    UnknownMethod(String),

    #[error("Arity mismatch: {0}")]
    ArityMismatch(String),

    #[error("Type mismatch: {0}")]
    TypeMismatch(String),

    #[error("Request id mismatch: sent {expected}, received {actual}")]
    IdMismatch { expected: String, actual: String },

    #[error("Handler error: {0}")]
    Handler(String),

    #[error("Message too large: {size} bytes (max {max} bytes)")]
    MessageTooLarge { size: usize, max: usize },

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("JSON serialization error: {0}")]
    JsonSerialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<nix::Error> for SockrpcError {
    fn from(err: nix::Error) -> Self {
        SockrpcError::Io(std::io::Error::from(err))
    }
}

/// Category of a failure reported inside a response envelope.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FaultKind {
    MalformedMessage,
    UnknownMethod,
    ArityMismatch,
    TypeMismatch,
    Handler,
}

/// Error object carried by a failed response.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RpcFault {
    pub kind: FaultKind,
    pub message: String,
}

impl SockrpcError {
    /// Converts a dispatch failure into the fault sent back to the caller.
    ///
    /// Errors that have no wire representation (transport failures,
    /// configuration problems) are reported as handler faults carrying
    /// their display text.
    pub fn to_fault(&self) -> RpcFault {
        let (kind, message) = match self {
            SockrpcError::MalformedMessage(m) => (FaultKind::MalformedMessage, m.clone()),
            SockrpcError::UnknownMethod(m) => (FaultKind::UnknownMethod, m.clone()),
            SockrpcError::ArityMismatch(m) => (FaultKind::ArityMismatch, m.clone()),
            SockrpcError::TypeMismatch(m) => (FaultKind::TypeMismatch, m.clone()),
            SockrpcError::Handler(m) => (FaultKind::Handler, m.clone()),
            other => (FaultKind::Handler, other.to_string()),
        };
        RpcFault { kind, message }
    }

    /// Rebuilds the error a remote dispatcher reported.
    pub fn from_fault(fault: RpcFault) -> Self {
        match fault.kind {
            FaultKind::MalformedMessage => SockrpcError::MalformedMessage(fault.message),
            FaultKind::UnknownMethod => SockrpcError::UnknownMethod(fault.message),
            FaultKind::ArityMismatch => SockrpcError::ArityMismatch(fault.message),
            FaultKind::TypeMismatch => SockrpcError::TypeMismatch(fault.message),
            FaultKind::Handler => SockrpcError::Handler(fault.message),
        }
    }
}

pub type Result<T> = std::result::Result<T, SockrpcError>;
