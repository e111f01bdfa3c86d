//! Stock handlers.
//!
//! Small string and number utilities registered by
//! [`HandlerRegistry::with_builtin_handlers`](crate::HandlerRegistry::with_builtin_handlers).
//! Their signatures come from [`sockrpc_common::protocol::methods`], the
//! same table the client stubs validate against.

use serde_json::{json, Value};
use sockrpc_common::protocol::error::{Result, SockrpcError};
use sockrpc_common::protocol::methods::{self, MethodSignature};
use sockrpc_common::protocol::{ParamType, TypeTag};

use crate::handler::Handler;

type HandlerFn = fn(&[Value]) -> Result<Value>;

/// Handler whose contract is a [`MethodSignature`] from the shared table.
pub struct StockHandler {
    signature: &'static MethodSignature,
    func: HandlerFn,
}

impl StockHandler {
    pub fn signature(&self) -> &'static MethodSignature {
        self.signature
    }
}

impl Handler for StockHandler {
    fn name(&self) -> &str {
        self.signature.name
    }

    fn params(&self) -> &[ParamType] {
        self.signature.params
    }

    fn call(&self, params: &[Value]) -> Result<Value> {
        (self.func)(params)
    }
}

/// All stock handlers, one per entry of [`methods::STOCK_METHODS`].
pub fn builtin() -> Vec<StockHandler> {
    vec![
        StockHandler { signature: &methods::FLOOR, func: floor },
        StockHandler { signature: &methods::NROOT, func: nroot },
        StockHandler { signature: &methods::REVERSE, func: reverse },
        StockHandler { signature: &methods::VALID_ANAGRAM, func: valid_anagram },
        StockHandler { signature: &methods::SORT, func: sort },
    ]
}

fn arg(params: &[Value], position: usize) -> Result<&Value> {
    params.get(position).ok_or_else(|| {
        SockrpcError::ArityMismatch(format!("missing argument {}", position))
    })
}

fn str_arg(params: &[Value], position: usize) -> Result<&str> {
    let value = arg(params, position)?;
    value.as_str().ok_or_else(|| {
        SockrpcError::TypeMismatch(format!(
            "argument {} must be str but actual type is {}",
            position,
            TypeTag::of(value)
        ))
    })
}

fn f64_arg(params: &[Value], position: usize) -> Result<f64> {
    let value = arg(params, position)?;
    value.as_f64().ok_or_else(|| {
        SockrpcError::TypeMismatch(format!(
            "argument {} must be a number but actual type is {}",
            position,
            TypeTag::of(value)
        ))
    })
}

/// Largest integral value below or equal to the argument. Integers are
/// returned unchanged.
fn floor(params: &[Value]) -> Result<Value> {
    let value = arg(params, 0)?;
    if TypeTag::of(value) == TypeTag::Int {
        return Ok(value.clone());
    }

    let floored = f64_arg(params, 0)?.floor();
    // i64::MAX is not representable as f64; the bound is exclusive.
    if !(floored >= i64::MIN as f64 && floored < i64::MAX as f64) {
        return Err(SockrpcError::Handler(format!(
            "floor of {} does not fit in a 64-bit integer",
            value
        )));
    }
    Ok(json!(floored as i64))
}

/// `x` raised to `1/n`.
fn nroot(params: &[Value]) -> Result<Value> {
    let n = f64_arg(params, 0)?;
    let x = f64_arg(params, 1)?;

    if n == 0.0 {
        return Err(SockrpcError::Handler("root degree must not be zero".to_string()));
    }

    let root = x.powf(1.0 / n);
    if !root.is_finite() {
        return Err(SockrpcError::Handler(format!(
            "root {} of {} is not a finite real number",
            n, x
        )));
    }
    Ok(json!(root))
}

fn reverse(params: &[Value]) -> Result<Value> {
    let s = str_arg(params, 0)?;
    Ok(json!(s.chars().rev().collect::<String>()))
}

/// Whether both strings consist of the same characters with the same
/// multiplicities.
fn valid_anagram(params: &[Value]) -> Result<Value> {
    let s = str_arg(params, 0)?;
    let t = str_arg(params, 1)?;

    if s.chars().count() != t.chars().count() {
        return Ok(json!(false));
    }

    let mut left: Vec<char> = s.chars().collect();
    let mut right: Vec<char> = t.chars().collect();
    left.sort_unstable();
    right.sort_unstable();
    Ok(json!(left == right))
}

/// Sorts strings by code point.
fn sort(params: &[Value]) -> Result<Value> {
    let items = arg(params, 0)?
        .as_array()
        .ok_or_else(|| SockrpcError::TypeMismatch("argument 0 must be list[str]".to_string()))?;

    let mut strings = items
        .iter()
        .enumerate()
        .map(|(i, item)| {
            item.as_str().ok_or_else(|| {
                SockrpcError::TypeMismatch(format!(
                    "element {} of argument 0 must be str but actual type is {}",
                    i,
                    TypeTag::of(item)
                ))
            })
        })
        .collect::<Result<Vec<&str>>>()?;

    strings.sort_unstable();
    Ok(json!(strings))
}
