use std::collections::HashMap;

use sockrpc_common::protocol::error::{Result, SockrpcError};

use crate::handler::Handler;
use crate::handlers;

/// Method name to handler mapping.
///
/// Built once through [`HandlerRegistryBuilder`] and read-only afterwards,
/// so it can be shared between connection threads behind an `Arc` without
/// locking.
pub struct HandlerRegistry {
    handlers: HashMap<String, Box<dyn Handler>>,
}

impl HandlerRegistry {
    pub fn builder() -> HandlerRegistryBuilder {
        HandlerRegistryBuilder::default()
    }

    /// Registry holding only the stock handlers.
    pub fn with_builtin_handlers() -> Self {
        let handlers = handlers::builtin()
            .into_iter()
            .map(|h| (h.name().to_string(), Box::new(h) as Box<dyn Handler>))
            .collect();
        Self { handlers }
    }

    pub fn get(&self, method: &str) -> Option<&dyn Handler> {
        self.handlers.get(method).map(|h| h.as_ref())
    }

    pub fn contains(&self, method: &str) -> bool {
        self.handlers.contains_key(method)
    }

    /// Registered method names, sorted.
    pub fn methods(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

/// Builder for [`HandlerRegistry`].
///
/// # Example
///
/// ```
/// use serde_json::json;
/// use sockrpc_common::protocol::ParamType;
/// use sockrpc_server::{FnHandler, HandlerRegistry};
///
/// let registry = HandlerRegistry::builder()
///     .builtin_handlers()?
///     .register(FnHandler::new("ping", &[], |_| Ok(json!("pong"))))?
///     .build();
///
/// assert!(registry.contains("reverse"));
/// assert!(registry.contains("ping"));
/// # Ok::<(), sockrpc_common::SockrpcError>(())
/// ```
#[derive(Default)]
pub struct HandlerRegistryBuilder {
    handlers: HashMap<String, Box<dyn Handler>>,
}

impl HandlerRegistryBuilder {
    /// Adds a handler under its own name.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the name is empty or already taken.
    pub fn register(mut self, handler: impl Handler + 'static) -> Result<Self> {
        let name = handler.name().to_string();
        if name.is_empty() {
            return Err(SockrpcError::Config("method name must not be empty".to_string()));
        }
        if self.handlers.contains_key(&name) {
            return Err(SockrpcError::Config(format!(
                "method '{}' is already registered",
                name
            )));
        }

        tracing::debug!("Registered method {} ({} params)", name, handler.params().len());
        self.handlers.insert(name, Box::new(handler));
        Ok(self)
    }

    /// Adds every stock handler.
    pub fn builtin_handlers(self) -> Result<Self> {
        handlers::builtin()
            .into_iter()
            .try_fold(self, |builder, handler| builder.register(handler))
    }

    pub fn build(self) -> HandlerRegistry {
        HandlerRegistry {
            handlers: self.handlers,
        }
    }
}
