use serde_json::{json, Value};
use sockrpc_common::config::ClientConfig;
use sockrpc_common::protocol::error::Result;
use sockrpc_common::protocol::{methods, Request};
use sockrpc_common::transport::UnixTransport;

use crate::stubs;

/// Blocking sockrpc client
///
/// Opens a fresh connection for each call, so one client can be shared
/// between threads without serializing their calls.
///
/// # Example
///
/// ```no_run
/// use sockrpc_client::RpcClient;
/// use sockrpc_common::config::ClientConfig;
///
/// let client = RpcClient::new(ClientConfig::new("/tmp/sockrpc.sock"));
/// assert_eq!(client.reverse("hello world")?, "dlrow olleh");
/// # Ok::<(), sockrpc_common::SockrpcError>(())
/// ```
#[derive(Clone)]
pub struct RpcClient {
    config: ClientConfig,
}

impl RpcClient {
    pub fn new(config: ClientConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Call an RPC method
    ///
    /// Arguments of stock methods (`floor`, `nroot`, `reverse`,
    /// `valid_anagram`, `sort`) are validated against their stock
    /// signatures before anything is sent. Servers that register their own
    /// handlers under those names with other signatures should be called
    /// through [`call_unchecked`](Self::call_unchecked).
    ///
    /// The response must carry the request's id; a fault reported by the
    /// server comes back as the matching error.
    pub fn call(&self, method: impl Into<String>, params: Vec<Value>) -> Result<Value> {
        let request = stubs::prepare(method.into(), params)?;
        self.round_trip(request)
    }

    /// Like [`call`](Self::call), but leaves all argument validation to the
    /// server.
    pub fn call_unchecked(&self, method: impl Into<String>, params: Vec<Value>) -> Result<Value> {
        self.round_trip(stubs::prepare_unchecked(method.into(), params))
    }

    fn round_trip(&self, request: Request) -> Result<Value> {
        tracing::debug!("Calling {} ({})", request.method, request.id);

        let transport = UnixTransport::new(self.config.clone());
        let mut conn = transport.connect()?;
        let response = conn.send_request(&request)?;

        // Connection is closed here when conn is dropped
        stubs::finish(&request, response)
    }

    /// Largest integer not greater than `x`.
    ///
    /// Integral values are answered without contacting the server.
    pub fn floor(&self, x: f64) -> Result<i64> {
        if let Some(n) = stubs::local_floor(x)? {
            return Ok(n);
        }
        let value = self.call(methods::FLOOR.name, vec![json!(x)])?;
        stubs::into_i64(methods::FLOOR.name, value)
    }

    /// `x` raised to `1/n`.
    pub fn nroot(&self, n: i64, x: i64) -> Result<f64> {
        let value = self.call(methods::NROOT.name, vec![json!(n), json!(x)])?;
        stubs::into_f64(methods::NROOT.name, value)
    }

    pub fn reverse(&self, s: &str) -> Result<String> {
        let value = self.call(methods::REVERSE.name, vec![json!(s)])?;
        stubs::into_string(methods::REVERSE.name, value)
    }

    pub fn valid_anagram(&self, s: &str, t: &str) -> Result<bool> {
        let value = self.call(methods::VALID_ANAGRAM.name, vec![json!(s), json!(t)])?;
        stubs::into_bool(methods::VALID_ANAGRAM.name, value)
    }

    pub fn sort<S: AsRef<str>>(&self, items: &[S]) -> Result<Vec<String>> {
        let value = self.call(methods::SORT.name, stubs::sort_params(items))?;
        stubs::into_strings(methods::SORT.name, value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sockrpc_common::SockrpcError;

    fn unreachable_client() -> RpcClient {
        RpcClient::new(ClientConfig::new("/nonexistent/sockrpc.sock"))
    }

    #[test]
    fn test_floor_fast_path_skips_server() {
        let client = unreachable_client();
        assert_eq!(client.floor(3.0).unwrap(), 3);
        assert_eq!(client.floor(-7.0).unwrap(), -7);
    }

    #[test]
    fn test_non_finite_floor_rejected_locally() {
        let client = unreachable_client();
        assert!(matches!(client.floor(f64::NAN), Err(SockrpcError::TypeMismatch(_))));
        assert!(matches!(
            client.floor(f64::NEG_INFINITY),
            Err(SockrpcError::TypeMismatch(_))
        ));
    }

    #[test]
    fn test_validation_happens_before_connecting() {
        let client = unreachable_client();

        let err = client.call("reverse", vec![json!("a"), json!("b")]).unwrap_err();
        assert!(matches!(err, SockrpcError::ArityMismatch(_)));

        let err = client.call("sort", vec![json!(["a", 2])]).unwrap_err();
        assert!(matches!(err, SockrpcError::TypeMismatch(_)));
    }

    #[test]
    fn test_unchecked_call_skips_local_validation() {
        let client = unreachable_client();

        // Reaches the connect step instead of failing on arity.
        let err = client
            .call_unchecked("reverse", vec![json!("a"), json!("b")])
            .unwrap_err();
        assert!(matches!(err, SockrpcError::Connection(_)));
    }

    #[test]
    fn test_missing_socket_is_connection_error() {
        let err = unreachable_client().reverse("abc").unwrap_err();
        assert!(matches!(err, SockrpcError::Connection(_)));
    }

    #[test]
    fn test_client_is_clonable() {
        let client = unreachable_client();
        let client2 = client.clone();
        assert_eq!(client.config(), client2.config());
    }
}
