//! sockrpc server
//!
//! This crate binds named methods to [`Handler`] implementations, validates
//! incoming requests against the declared signatures and serves them over a
//! Unix domain socket.

pub mod dispatcher;
pub mod handler;
pub mod handlers;
pub mod registry;
pub mod server;

pub use dispatcher::Dispatcher;
pub use handler::{FnHandler, Handler};
pub use registry::{HandlerRegistry, HandlerRegistryBuilder};
pub use server::RpcServer;
