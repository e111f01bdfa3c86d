use serde_json::Value;
use sockrpc_common::protocol::error::Result;
use sockrpc_common::protocol::ParamType;

/// Server-side implementation of one remote method.
///
/// The dispatcher checks arity and argument types against [`params`]
/// before calling [`call`], so an implementation only sees arguments of the
/// declared shape.
///
/// [`params`]: Handler::params
/// [`call`]: Handler::call
pub trait Handler: Send + Sync {
    /// Method name the handler is registered under.
    fn name(&self) -> &str;

    /// Declared type of each positional argument. The arity is its length.
    fn params(&self) -> &[ParamType];

    fn call(&self, params: &[Value]) -> Result<Value>;
}

/// [`Handler`] backed by a closure.
///
/// # Example
///
/// ```
/// use serde_json::json;
/// use sockrpc_common::protocol::ParamType;
/// use sockrpc_server::{FnHandler, Handler};
///
/// let double = FnHandler::new("double", &[ParamType::Int], |params| {
///     Ok(json!(params[0].as_i64().unwrap_or_default() * 2))
/// });
/// assert_eq!(double.call(&[json!(21)]).unwrap(), json!(42));
/// ```
pub struct FnHandler<F> {
    name: String,
    params: &'static [ParamType],
    func: F,
}

impl<F> FnHandler<F>
where
    F: Fn(&[Value]) -> Result<Value> + Send + Sync,
{
    pub fn new(name: impl Into<String>, params: &'static [ParamType], func: F) -> Self {
        Self {
            name: name.into(),
            params,
            func,
        }
    }
}

impl<F> Handler for FnHandler<F>
where
    F: Fn(&[Value]) -> Result<Value> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn params(&self) -> &[ParamType] {
        self.params
    }

    fn call(&self, params: &[Value]) -> Result<Value> {
        (self.func)(params)
    }
}
