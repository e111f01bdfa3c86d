//! sockrpc Request Types
//!
//! This module defines the request envelope sent from a client to the server.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::types::TypeTag;

pub type RequestId = String;
pub type MethodName = String;
pub type RpcParams = Vec<serde_json::Value>;

/// An RPC request sent from a client to the server.
///
/// # Fields
///
/// - `method`: Name of the remote method to invoke
/// - `params`: Positional arguments, order-significant
/// - `param_types`: Type tag of each argument (advisory, never used for coercion)
/// - `id`: Correlation id echoed by the server in its response
///
/// # Example
///
/// ```
/// use sockrpc_common::protocol::Request;
/// use serde_json::json;
///
/// let request = Request::new("reverse", vec![json!("hello world")]);
/// assert_eq!(request.param_types, vec!["str".to_string()]);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Request {
    pub method: MethodName,
    pub params: RpcParams,
    pub param_types: Vec<String>,
    pub id: RequestId,
}

impl Request {
    /// Creates a request with a freshly generated id.
    ///
    /// `param_types` is derived from the runtime type of each argument.
    pub fn new(method: impl Into<String>, params: RpcParams) -> Self {
        let param_types = params
            .iter()
            .map(|p| TypeTag::of(p).as_str().to_string())
            .collect();

        Request {
            method: method.into(),
            params,
            param_types,
            id: generate_request_id(),
        }
    }

    /// Overrides the generated id.
    pub fn with_id(mut self, id: impl Into<RequestId>) -> Self {
        self.id = id.into();
        self
    }

    pub fn arity(&self) -> usize {
        self.params.len()
    }
}

fn generate_request_id() -> RequestId {
    Uuid::new_v4().to_string()
}
