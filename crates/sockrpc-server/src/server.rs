use std::path::Path;
use std::sync::Arc;

use sockrpc_common::config::ServerConfig;
use sockrpc_common::protocol::error::Result;
use sockrpc_common::transport::UnixServer;

use crate::dispatcher::Dispatcher;
use crate::registry::HandlerRegistry;

/// RPC server: a bound Unix socket plus the dispatcher serving it.
///
/// # Example
///
/// ```no_run
/// use sockrpc_common::config::ServerConfig;
/// use sockrpc_server::{HandlerRegistry, RpcServer};
///
/// let server = RpcServer::bind(
///     ServerConfig::new("/tmp/sockrpc.sock"),
///     HandlerRegistry::with_builtin_handlers(),
/// )?;
/// server.run()?;
/// # Ok::<(), sockrpc_common::SockrpcError>(())
/// ```
pub struct RpcServer {
    server: UnixServer,
    dispatcher: Dispatcher,
}

impl RpcServer {
    /// Binds the socket. Requests are not served until [`run`](Self::run).
    pub fn bind(config: ServerConfig, registry: HandlerRegistry) -> Result<Self> {
        let server = UnixServer::bind(config)?;
        tracing::info!(
            "Serving {} methods: {}",
            registry.len(),
            registry.methods().join(", ")
        );

        Ok(Self {
            server,
            dispatcher: Dispatcher::new(Arc::new(registry)),
        })
    }

    pub fn socket_path(&self) -> &Path {
        self.server.socket_path()
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Serves connections until the process exits.
    pub fn run(&self) -> Result<()> {
        let dispatcher = self.dispatcher.clone();
        self.server
            .run_with_handler(move |request| dispatcher.handle_request(request))
    }
}
