use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use artemis_gateway::{AppState, build_router};
use artemis_platform::{ServiceConfig, SqliteProposalRepository, connect_database};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "artemis_gateway=info".to_string()),
        )
        .init();

    let config = ServiceConfig::from_env("0.0.0.0:5000")?;
    let pool = connect_database(&config.database_url, config.max_connections).await?;

    let state = AppState::new(Arc::new(SqliteProposalRepository::new(pool.clone())));
    let router = build_router(state);

    let addr: SocketAddr = config
        .http_addr
        .parse()
        .with_context(|| format!("invalid HTTP_ADDR {}", config.http_addr))?;
    info!("gateway listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    pool.close().await;
    info!("gateway stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(error = %err, "cannot listen for ctrl-c, graceful shutdown disabled");
        std::future::pending::<()>().await;
    }
}
