use serde_json::{json, Value};
use sockrpc_common::config::ClientConfig;
use sockrpc_common::protocol::error::Result;
use sockrpc_common::protocol::{methods, Request};
use sockrpc_common::transport::UnixTransportAsync;

use crate::stubs;

/// Async sockrpc client for callers running on tokio.
///
/// Same contract as [`RpcClient`](crate::RpcClient): local validation, a
/// fresh connection per call and an id check before the result is used.
#[derive(Clone)]
pub struct AsyncRpcClient {
    config: ClientConfig,
}

impl AsyncRpcClient {
    pub fn new(config: ClientConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// See [`RpcClient::call`](crate::RpcClient::call).
    pub async fn call(&self, method: impl Into<String>, params: Vec<Value>) -> Result<Value> {
        let request = stubs::prepare(method.into(), params)?;
        self.round_trip(request).await
    }

    /// Like [`call`](Self::call), but leaves all argument validation to the
    /// server.
    pub async fn call_unchecked(
        &self,
        method: impl Into<String>,
        params: Vec<Value>,
    ) -> Result<Value> {
        self.round_trip(stubs::prepare_unchecked(method.into(), params))
            .await
    }

    async fn round_trip(&self, request: Request) -> Result<Value> {
        tracing::debug!("Calling {} ({})", request.method, request.id);

        let transport = UnixTransportAsync::new(self.config.clone());
        let mut conn = transport.connect().await?;
        let response = conn.send_request(&request).await?;

        stubs::finish(&request, response)
    }

    pub async fn floor(&self, x: f64) -> Result<i64> {
        if let Some(n) = stubs::local_floor(x)? {
            return Ok(n);
        }
        let value = self.call(methods::FLOOR.name, vec![json!(x)]).await?;
        stubs::into_i64(methods::FLOOR.name, value)
    }

    pub async fn nroot(&self, n: i64, x: i64) -> Result<f64> {
        let value = self.call(methods::NROOT.name, vec![json!(n), json!(x)]).await?;
        stubs::into_f64(methods::NROOT.name, value)
    }

    pub async fn reverse(&self, s: &str) -> Result<String> {
        let value = self.call(methods::REVERSE.name, vec![json!(s)]).await?;
        stubs::into_string(methods::REVERSE.name, value)
    }

    pub async fn valid_anagram(&self, s: &str, t: &str) -> Result<bool> {
        let value = self
            .call(methods::VALID_ANAGRAM.name, vec![json!(s), json!(t)])
            .await?;
        stubs::into_bool(methods::VALID_ANAGRAM.name, value)
    }

    pub async fn sort<S: AsRef<str>>(&self, items: &[S]) -> Result<Vec<String>> {
        let value = self.call(methods::SORT.name, stubs::sort_params(items)).await?;
        stubs::into_strings(methods::SORT.name, value)
    }
}
