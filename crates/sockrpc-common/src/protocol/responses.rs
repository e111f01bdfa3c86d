//! sockrpc Response Types
//!
//! This module defines the response envelope returned by the server.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::error::{Result, RpcFault, SockrpcError};
use super::types::TypeTag;
use super::RequestId;

/// RPC method result (JSON value)
pub type RpcResult = Value;

/// `result_type` of a response that carries a fault instead of a result.
pub const ERROR_RESULT_TYPE: &str = "error";

/// An RPC response returned from the server to the client.
///
/// # Response Flow
///
/// 1. Server receives and dispatches a `Request`
/// 2. Server creates a `Response` (success or fault) carrying the request id
/// 3. Response is serialized to JSON and framed onto the socket
/// 4. Client checks the id, then unwraps the result or the fault
///
/// # Fields
///
/// - `result`: The result value (`null` on failure)
/// - `result_type`: Type tag of `result`, or `"error"` on failure
/// - `id`: The request id this response corresponds to
/// - `error`: Fault details (present on failure only)
///
/// # Example
///
/// ```
/// use sockrpc_common::protocol::responses::Response;
/// use serde_json::json;
///
/// let response = Response::success("abc", json!("dlrow olleh"));
/// assert_eq!(response.result_type, "str");
/// assert!(response.is_success());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Response {
    pub result: RpcResult,
    pub result_type: String,
    pub id: RequestId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcFault>,
}

impl Response {
    /// Creates a successful response, tagging the result with its type.
    pub fn success(id: impl Into<RequestId>, result: RpcResult) -> Self {
        let result_type = TypeTag::of(&result).as_str().to_string();
        Response {
            result,
            result_type,
            id: id.into(),
            error: None,
        }
    }

    /// Creates a failed response carrying `fault`.
    pub fn failure(id: impl Into<RequestId>, fault: RpcFault) -> Self {
        Response {
            result: Value::Null,
            result_type: ERROR_RESULT_TYPE.to_string(),
            id: id.into(),
            error: Some(fault),
        }
    }

    /// Creates a failed response from a dispatch error.
    pub fn from_error(id: impl Into<RequestId>, err: &SockrpcError) -> Self {
        Self::failure(id, err.to_fault())
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    /// Returns the result, or the error the fault describes.
    ///
    /// Callers must check the id before unwrapping.
    pub fn into_result(self) -> Result<RpcResult> {
        match self.error {
            None => Ok(self.result),
            Some(fault) => Err(SockrpcError::from_fault(fault)),
        }
    }
}
