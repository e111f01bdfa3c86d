use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use serde_json::Value;
use sockrpc_common::protocol::error::{Result, SockrpcError};
use sockrpc_common::protocol::methods::{check_arity, check_types};
use sockrpc_common::protocol::{Request, Response};

use crate::registry::HandlerRegistry;

/// Routes decoded requests to their handlers.
///
/// A request goes through four checks in order: the method must be
/// registered, the argument count must match the declared arity, every
/// argument must match its declared type and the handler must succeed. A
/// request failing any of the first three never reaches its handler.
#[derive(Clone)]
pub struct Dispatcher {
    registry: Arc<HandlerRegistry>,
}

impl Dispatcher {
    pub fn new(registry: Arc<HandlerRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &HandlerRegistry {
        &self.registry
    }

    /// Validates the request and invokes its handler.
    pub fn dispatch(&self, request: &Request) -> Result<Value> {
        let handler = self
            .registry
            .get(&request.method)
            .ok_or_else(|| SockrpcError::UnknownMethod(request.method.clone()))?;

        check_arity(&request.method, handler.params().len(), request.params.len())?;
        check_types(&request.method, handler.params(), &request.params)?;

        tracing::debug!("Calling method: {}", request.method);
        match panic::catch_unwind(AssertUnwindSafe(|| handler.call(&request.params))) {
            Ok(result) => result,
            Err(_) => Err(SockrpcError::Handler(format!(
                "handler for '{}' panicked",
                request.method
            ))),
        }
    }

    /// Handles an incoming RPC request.
    ///
    /// Dispatch failures are returned as failed responses carrying the
    /// request id, so the caller sees the exact error kind.
    pub fn handle_request(&self, request: Request) -> Result<Response> {
        tracing::debug!("Handling request {} for method: {}", request.id, request.method);

        match self.dispatch(&request) {
            Ok(result) => Ok(Response::success(request.id, result)),
            Err(e) => {
                tracing::debug!("Request {} failed: {}", request.id, e);
                Ok(Response::from_error(request.id, &e))
            }
        }
    }
}
