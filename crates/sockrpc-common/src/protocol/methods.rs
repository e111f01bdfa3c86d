//! Signatures of the stock remote methods.
//!
//! The server's stock handlers and the client stubs both read their
//! contracts from this table, so the two sides cannot drift apart.

use serde_json::Value;

use super::error::{Result, SockrpcError};
use super::types::{ParamType, TypeTag};

const STR: ParamType = ParamType::Str;

/// Name, argument predicates and result type of a remote method.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MethodSignature {
    pub name: &'static str,
    pub params: &'static [ParamType],
    pub returns: TypeTag,
}

pub const FLOOR: MethodSignature = MethodSignature {
    name: "floor",
    params: &[ParamType::Number],
    returns: TypeTag::Int,
};

pub const NROOT: MethodSignature = MethodSignature {
    name: "nroot",
    params: &[ParamType::Int, ParamType::Int],
    returns: TypeTag::Float,
};

pub const REVERSE: MethodSignature = MethodSignature {
    name: "reverse",
    params: &[ParamType::Str],
    returns: TypeTag::Str,
};

pub const VALID_ANAGRAM: MethodSignature = MethodSignature {
    name: "valid_anagram",
    params: &[ParamType::Str, ParamType::Str],
    returns: TypeTag::Bool,
};

pub const SORT: MethodSignature = MethodSignature {
    name: "sort",
    params: &[ParamType::ListOf(&STR)],
    returns: TypeTag::List,
};

pub const STOCK_METHODS: &[MethodSignature] = &[FLOOR, NROOT, REVERSE, VALID_ANAGRAM, SORT];

/// Finds the signature of a stock method by name.
pub fn lookup(name: &str) -> Option<&'static MethodSignature> {
    STOCK_METHODS.iter().find(|sig| sig.name == name)
}

impl MethodSignature {
    pub fn arity(&self) -> usize {
        self.params.len()
    }

    /// Validates arity, then every argument, without touching the values.
    pub fn check(&self, params: &[Value]) -> Result<()> {
        check_arity(self.name, self.params.len(), params.len())?;
        check_types(self.name, self.params, params)
    }
}

pub fn check_arity(method: &str, expected: usize, actual: usize) -> Result<()> {
    if expected != actual {
        return Err(SockrpcError::ArityMismatch(format!(
            "The method '{}' requires {} arguments, but {} arguments were provided",
            method, expected, actual
        )));
    }
    Ok(())
}

/// Checks each argument against its declared predicate, reporting the first
/// position that does not match.
pub fn check_types(method: &str, declared: &[ParamType], params: &[Value]) -> Result<()> {
    for (position, (expected, value)) in declared.iter().zip(params).enumerate() {
        if !expected.matches(value) {
            return Err(SockrpcError::TypeMismatch(format!(
                "argument {} of '{}' must be {} but actual type is {}",
                position,
                method,
                expected,
                TypeTag::of(value)
            )));
        }
    }
    Ok(())
}
