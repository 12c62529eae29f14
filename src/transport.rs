//! MCP front-ends: stdio and streamable HTTP.

use std::net::SocketAddr;

use axum::{extract::State, routing::get, Json, Router};
use rmcp::transport::streamable_http_server::{
    session::local::LocalSessionManager, StreamableHttpService,
};
use rmcp::{transport::stdio, ServiceExt};
use serde_json::{json, Value};

use crate::server::IfsCloudServer;

/// Which front-end to serve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum TransportKind {
    Stdio,
    Http,
}

/// Serve one MCP session over stdin/stdout until the peer disconnects.
pub async fn serve_stdio(server: IfsCloudServer) -> anyhow::Result<()> {
    tracing::info!("Starting MCP server on stdio transport");
    let service = server.serve(stdio()).await?;
    service.waiting().await?;
    tracing::info!("MCP server shutting down");
    Ok(())
}

#[derive(Clone, Copy)]
struct HealthInfo {
    tools: usize,
}

async fn health(State(info): State<HealthInfo>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "transport": "http",
        "tools": info.tools,
    }))
}

/// Router with the MCP endpoint at `/mcp` and a `/health` probe. Each
/// session gets its own server value; all share the same IFS client.
pub fn http_router(server: IfsCloudServer) -> Router {
    let info = HealthInfo {
        tools: server.tool_count(),
    };
    let factory = move || Ok(server.clone());
    let mcp_service = StreamableHttpService::new(
        factory,
        LocalSessionManager::default().into(),
        Default::default(),
    );

    Router::new()
        .route("/health", get(health))
        .nest_service("/mcp", mcp_service)
        .with_state(info)
}

/// Serve HTTP on all interfaces until Ctrl-C.
pub async fn serve_http(server: IfsCloudServer, port: u16) -> anyhow::Result<()> {
    let app = http_router(server);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(addr = %addr, "MCP streamable HTTP listening on /mcp, health on /health");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::warn!(error = %e, "Failed to listen for Ctrl-C");
            }
            tracing::info!("Shutting down HTTP transport");
        })
        .await?;
    Ok(())
}
