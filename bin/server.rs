// Courier Dispatch - Web Server
// REST API with Axum

use anyhow::{Context, Result};
use courier_dispatch::api::{router, AppState};
use courier_dispatch::{Config, SqliteStore};
use tower_http::cors::CorsLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    let store = SqliteStore::open(&config.db_path)
        .with_context(|| format!("Failed to open database at {:?}", config.db_path))?;
    tracing::info!(db_path = ?config.db_path, "database opened");

    let app = router(AppState::new(store)).layer(CorsLayer::permissive());

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", config.bind_addr))?;
    tracing::info!(addr = %config.bind_addr, "dispatch server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    tracing::info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(%err, "failed to listen for shutdown signal");
    }
}
