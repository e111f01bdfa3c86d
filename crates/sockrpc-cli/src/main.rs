//! # sockrpc CLI Entry Point
//!
//! ## Usage
//!
//! ```bash
//! # Serve the stock handlers
//! sockrpc serve -s /tmp/sockrpc.sock
//!
//! # Serve with settings from a config file
//! sockrpc serve -c config.json
//!
//! # Make an RPC call (outputs raw JSON)
//! sockrpc call reverse -s /tmp/sockrpc.sock -p '["hello world"]'
//! ```

use anyhow::Result;
use argh::FromArgs;
use sockrpc_cli::settings::{parse_framing, parse_params, resolve_config};
use sockrpc_client::RpcClient;
use sockrpc_common::transport::Framing;
use sockrpc_server::{HandlerRegistry, RpcServer};
use std::time::Duration;

#[derive(FromArgs)]
/// sockrpc - JSON RPC over Unix domain sockets
struct Cli {
    #[argh(subcommand)]
    command: Commands,
}

#[derive(FromArgs)]
#[argh(subcommand)]
enum Commands {
    Serve(ServeArgs),
    Call(CallArgs),
}

/// Arguments for running a server with the stock handlers.
///
/// # Example
///
/// ```bash
/// sockrpc serve -s /tmp/sockrpc.sock --framing sentinel --max-connections 32
/// ```
#[derive(FromArgs)]
#[argh(subcommand, name = "serve")]
/// serve the stock handlers on a Unix socket
struct ServeArgs {
    /// path to a JSON configuration file
    #[argh(option, short = 'c')]
    config: Option<String>,

    /// path of the Unix socket to listen on (overrides the config file)
    #[argh(option, short = 's')]
    socket: Option<String>,

    /// listen backlog
    #[argh(option)]
    backlog: Option<i32>,

    /// message framing: length_prefixed or sentinel
    #[argh(option, from_str_fn(parse_framing))]
    framing: Option<Framing>,

    /// maximum number of connections served at once
    #[argh(option, long = "max-connections")]
    max_connections: Option<usize>,

    /// close connections idle for this many milliseconds
    #[argh(option, long = "read-timeout-ms")]
    read_timeout_ms: Option<u64>,
}

/// Arguments for making a single RPC call.
///
/// Prints the raw JSON result to stdout, so the output can be piped into
/// other tools.
///
/// # Example
///
/// ```bash
/// sockrpc call valid_anagram -s /tmp/sockrpc.sock -p '["knee", "keen"]'
/// ```
#[derive(FromArgs)]
#[argh(subcommand, name = "call")]
/// call an RPC method on a server
struct CallArgs {
    /// name of the RPC method to call
    #[argh(positional)]
    method: String,

    /// path to a JSON configuration file
    #[argh(option, short = 'c')]
    config: Option<String>,

    /// path of the server's Unix socket (overrides the config file)
    #[argh(option, short = 's')]
    socket: Option<String>,

    /// JSON array of positional arguments, defaults to `[]`
    #[argh(option, short = 'p', default = "\"[]\".into()")]
    params: String,

    /// message framing: length_prefixed or sentinel
    #[argh(option, from_str_fn(parse_framing))]
    framing: Option<Framing>,

    /// response timeout in milliseconds
    #[argh(option, long = "timeout-ms")]
    timeout_ms: Option<u64>,
}

fn main() -> Result<()> {
    let cli: Cli = argh::from_env();

    // call keeps stdout clean for piping
    if !matches!(cli.command, Commands::Call(_)) {
        let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }

    match cli.command {
        Commands::Serve(args) => run_serve(args),
        Commands::Call(args) => run_call(args),
    }
}

fn run_serve(args: ServeArgs) -> Result<()> {
    let mut config = resolve_config(args.config.as_deref(), args.socket.as_deref())?;
    if let Some(backlog) = args.backlog {
        config.backlog = backlog;
    }
    if let Some(framing) = args.framing {
        config.framing = framing;
    }
    if let Some(max) = args.max_connections {
        config.max_connections = max;
    }
    if args.read_timeout_ms.is_some() {
        config.server_read_timeout_ms = args.read_timeout_ms;
    }
    config.validate()?;

    tracing::info!(
        "Framing: {:?}, backlog: {}, max connections: {}",
        config.framing,
        config.backlog,
        config.max_connections
    );

    let server = RpcServer::bind(config.server_config(), HandlerRegistry::with_builtin_handlers())?;
    server.run()?;
    Ok(())
}

fn run_call(args: CallArgs) -> Result<()> {
    let mut config = resolve_config(args.config.as_deref(), args.socket.as_deref())?;
    if let Some(framing) = args.framing {
        config.framing = framing;
    }

    let params = parse_params(&args.params)?;

    let mut client_config = config.client_config();
    if let Some(ms) = args.timeout_ms {
        client_config = client_config.with_read_timeout(Duration::from_millis(ms));
    }

    let client = RpcClient::new(client_config);
    let result = client.call(&args.method, params)?;

    // Output raw JSON to stdout
    println!("{}", serde_json::to_string(&result)?);

    Ok(())
}
