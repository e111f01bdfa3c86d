pub mod async_client;
pub mod client;
mod stubs;

pub use async_client::AsyncRpcClient;
pub use client::RpcClient;
