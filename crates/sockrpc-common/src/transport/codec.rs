use crate::protocol::error::{Result, SockrpcError};
use crate::protocol::{Request, Response};

/// JSON codec for encoding/decoding RPC envelopes
///
/// Decoding failures (invalid JSON, missing fields, wrong field types,
/// `param_types` out of step with `params`) are all reported as
/// `MalformedMessage`.
pub struct JsonCodec;

impl JsonCodec {
    /// Encode a request to bytes
    pub fn encode_request(request: &Request) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(request)?)
    }

    /// Decode a request from bytes
    ///
    /// # Errors
    ///
    /// Returns `MalformedMessage` if the data is not a complete request
    /// envelope, or if `param_types` and `params` differ in length.
    pub fn decode_request(data: &[u8]) -> Result<Request> {
        let request: Request = serde_json::from_slice(data)
            .map_err(|e| SockrpcError::MalformedMessage(format!("invalid request: {}", e)))?;

        if request.param_types.len() != request.params.len() {
            return Err(SockrpcError::MalformedMessage(format!(
                "request carries {} params but {} param_types",
                request.params.len(),
                request.param_types.len()
            )));
        }

        Ok(request)
    }

    /// Encode a response to bytes
    pub fn encode_response(response: &Response) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(response)?)
    }

    /// Decode a response from bytes
    pub fn decode_response(data: &[u8]) -> Result<Response> {
        serde_json::from_slice(data)
            .map_err(|e| SockrpcError::MalformedMessage(format!("invalid response: {}", e)))
    }

    /// Best-effort extraction of the `id` of an envelope that failed to
    /// decode, so the failure can still be correlated by the caller.
    pub fn peek_id(data: &[u8]) -> Option<String> {
        let value: serde_json::Value = serde_json::from_slice(data).ok()?;
        value.get("id")?.as_str().map(str::to_string)
    }
}
