use std::net::SocketAddr;

use anyhow::Result;
use axum::routing::get;
use axum::Router;
use tracing::info;

async fn health() -> &'static str {
    "alive"
}

/// Hosting platforms probe an open port to decide the process is alive;
/// this serves exactly that and nothing else.
pub async fn run_health_server(port: u16) -> Result<()> {
    let app = Router::new().route("/", get(health));
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Health endpoint listening on {addr}");
    axum::serve(listener, app).await?;
    Ok(())
}
