//! `quarry serve` - run the MCP server.

use anyhow::{Context, Result};
use clap::{Args, ValueEnum};
use quarry_core::{QuarryConfig, Transport};
use quarry_mcp::McpServer;
use tracing::{info, warn};

use super::Gateway;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TransportArg {
    Stdio,
    Http,
}

impl From<TransportArg> for Transport {
    fn from(arg: TransportArg) -> Self {
        match arg {
            TransportArg::Stdio => Transport::Stdio,
            TransportArg::Http => Transport::Http,
        }
    }
}

/// Arguments for `quarry serve`.
#[derive(Debug, Args)]
pub struct ServeArgs {
    /// Transport type. Overrides config file.
    #[arg(long, value_enum)]
    pub transport: Option<TransportArg>,

    /// HTTP port (only for http transport). Overrides config file.
    #[arg(long)]
    pub port: Option<u16>,
}

pub async fn execute(mut config: QuarryConfig, args: ServeArgs) -> Result<()> {
    if let Some(transport) = args.transport {
        config.mcp.transport = transport.into();
    }
    if let Some(port) = args.port {
        config.mcp.port = port;
    }

    let gateway = Gateway::connect(&config)?;

    // Warm the catalog; a failure here is retried on first use.
    match gateway.catalog.snapshot().await {
        Ok(snapshot) => info!(
            generation = snapshot.generation,
            databases = snapshot.databases.len(),
            "Schema catalog ready"
        ),
        Err(e) => warn!(error = %e, "Schema catalog not yet available"),
    }

    info!(
        transport = ?config.mcp.transport,
        upstream = %config.upstream.display_target(),
        "Starting Quarry MCP server"
    );

    McpServer::new(config.mcp.clone(), gateway.tools)
        .run()
        .await
        .context("MCP server failed")
}
