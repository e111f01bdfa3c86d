//! Turning command-line options into configuration.

use anyhow::{anyhow, Context, Result};
use serde_json::Value;
use sockrpc_common::config::RpcConfig;
use sockrpc_common::transport::Framing;

/// Builds the effective configuration from an optional config file and an
/// optional socket path. The socket path overrides the file's.
pub fn resolve_config(config_file: Option<&str>, socket: Option<&str>) -> Result<RpcConfig> {
    let mut config = match (config_file, socket) {
        (Some(path), _) => RpcConfig::from_file(path)
            .with_context(|| format!("Failed to load configuration from {}", path))?,
        (None, Some(socket)) => RpcConfig::new(socket),
        (None, None) => return Err(anyhow!("either --config or --socket is required")),
    };

    if let Some(socket) = socket {
        config.socket_path = socket.into();
    }

    config.validate()?;
    Ok(config)
}

/// Parses the `--framing` option.
pub fn parse_framing(value: &str) -> std::result::Result<Framing, String> {
    match value {
        "length_prefixed" | "length-prefixed" => Ok(Framing::LengthPrefixed),
        "sentinel" => Ok(Framing::Sentinel),
        other => Err(format!(
            "unknown framing '{}' (expected length_prefixed or sentinel)",
            other
        )),
    }
}

/// Parses the `--params` option: a JSON array of positional arguments.
pub fn parse_params(raw: &str) -> Result<Vec<Value>> {
    let value: Value =
        serde_json::from_str(raw).map_err(|e| anyhow!("Invalid JSON in params: {}", e))?;

    match value {
        Value::Array(params) => Ok(params),
        other => Err(anyhow!(
            "params must be a JSON array of arguments, got {}",
            other
        )),
    }
}
