//! Pieces shared by the blocking and async clients: request preparation,
//! response verification and typed result extraction.

use serde_json::{json, Value};
use sockrpc_common::protocol::error::{Result, SockrpcError};
use sockrpc_common::protocol::{methods, Request, Response, TypeTag};

/// Builds a request, checking arguments of stock methods locally first.
///
/// Methods missing from the signature table are sent unchecked; the server
/// validates them against its own registry.
pub(crate) fn prepare(method: String, params: Vec<Value>) -> Result<Request> {
    if let Some(signature) = methods::lookup(&method) {
        signature.check(&params)?;
    }
    Ok(Request::new(method, params))
}

/// Builds a request without consulting the signature table.
pub(crate) fn prepare_unchecked(method: String, params: Vec<Value>) -> Request {
    Request::new(method, params)
}

/// Checks the response id before trusting anything else in the response.
pub(crate) fn finish(request: &Request, response: Response) -> Result<Value> {
    if response.id != request.id {
        return Err(SockrpcError::IdMismatch {
            expected: request.id.clone(),
            actual: response.id,
        });
    }
    response.into_result()
}

/// Answers `floor` locally when no round trip is needed.
///
/// Non-finite values are rejected since JSON cannot carry them.
pub(crate) fn local_floor(x: f64) -> Result<Option<i64>> {
    if !x.is_finite() {
        return Err(SockrpcError::TypeMismatch(format!(
            "argument 0 of 'floor' must be a finite number, got {}",
            x
        )));
    }
    if x.fract() == 0.0 && x >= i64::MIN as f64 && x < i64::MAX as f64 {
        return Ok(Some(x as i64));
    }
    Ok(None)
}

pub(crate) fn sort_params<S: AsRef<str>>(items: &[S]) -> Vec<Value> {
    let items: Vec<&str> = items.iter().map(AsRef::as_ref).collect();
    vec![json!(items)]
}

fn unexpected(method: &str, expected: TypeTag, value: &Value) -> SockrpcError {
    SockrpcError::MalformedMessage(format!(
        "'{}' returned {} but {} was expected",
        method,
        TypeTag::of(value),
        expected
    ))
}

pub(crate) fn into_i64(method: &str, value: Value) -> Result<i64> {
    value.as_i64().ok_or_else(|| unexpected(method, TypeTag::Int, &value))
}

pub(crate) fn into_f64(method: &str, value: Value) -> Result<f64> {
    value.as_f64().ok_or_else(|| unexpected(method, TypeTag::Float, &value))
}

pub(crate) fn into_bool(method: &str, value: Value) -> Result<bool> {
    value.as_bool().ok_or_else(|| unexpected(method, TypeTag::Bool, &value))
}

pub(crate) fn into_string(method: &str, value: Value) -> Result<String> {
    match value {
        Value::String(s) => Ok(s),
        other => Err(unexpected(method, TypeTag::Str, &other)),
    }
}

pub(crate) fn into_strings(method: &str, value: Value) -> Result<Vec<String>> {
    match value {
        Value::Array(items) => items
            .into_iter()
            .map(|item| into_string(method, item))
            .collect(),
        other => Err(unexpected(method, TypeTag::List, &other)),
    }
}
