//! IFS Cloud MCP Server
//!
//! Bridges IFS Cloud maintenance projections (OData) to the Model Context Protocol.

mod api;
mod auth;
mod client;
mod config;
mod debug;
mod error;
mod gateway;
mod mappings;
mod odata;
mod server;
mod transport;

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::client::IfsClient;
use crate::config::Config;
use crate::debug::DebugLogger;
use crate::server::{ApiClients, IfsCloudServer};
use crate::transport::TransportKind;

#[derive(Parser, Debug)]
#[command(name = "ifs-cloud-mcp")]
#[command(author, version, about = "IFS Cloud MCP Server", long_about = None)]
struct Args {
    /// Path to a JSON configuration file; IFS_* environment variables are used when omitted
    #[arg(short, long)]
    config: Option<String>,

    /// Enable debug mode (traces all tool calls to a file)
    #[arg(short, long)]
    debug: bool,

    /// MCP transport to serve
    #[arg(long, env = "MCP_TRANSPORT", value_enum, default_value_t = TransportKind::Stdio)]
    transport: TransportKind,

    /// Port for the HTTP transport
    #[arg(long, env = "MCP_PORT", default_value_t = 3100)]
    port: u16,
}

fn init_tracing(debug: bool) {
    let default_level = if debug { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    // stdout carries the stdio transport
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let config = match args.config.as_deref() {
        Some(path) => Config::load(path).with_context(|| format!("loading config file {}", path))?,
        None => Config::from_env().context(
            "missing IFS configuration; set IFS_BASE_URL, IFS_TOKEN_URL, IFS_CLIENT_ID and \
             IFS_CLIENT_SECRET or pass --config",
        )?,
    };
    let debug_enabled = args.debug || config.debug;
    init_tracing(debug_enabled);

    tracing::info!(
        base_url = %config.base_url,
        default_company = ?config.default_company,
        default_site = ?config.default_site,
        transport = ?args.transport,
        "IFS Cloud MCP Server starting"
    );

    let debug = Arc::new(DebugLogger::new(debug_enabled));
    if debug.is_enabled() {
        if let Some(path) = debug.trace_path() {
            tracing::info!(path = %path.display(), "Tool-call tracing enabled");
        }
    }
    let client = IfsClient::connect(config.connection())?;
    let server = IfsCloudServer::new(ApiClients::new(client), debug);

    match args.transport {
        TransportKind::Stdio => transport::serve_stdio(server).await,
        TransportKind::Http => transport::serve_http(server, args.port).await,
    }
}
