use anyhow::Result;
use std::net::SocketAddr;
use tracing::info;

use trove_context_api::config::Settings;
use trove_context_api::database::DbPool;
use trove_context_api::services::context::sweeper::spawn_idle_sweeper;
use trove_context_api::utils::logger::init_logger;
use trove_context_api::{build_router, AppState};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let settings = Settings::load()?;

    // Initialize logging
    let _log_guard = init_logger(&settings.logging)?;
    info!("🚀 Starting Trove context API...");
    info!("✅ Configuration loaded");

    // Open the context store
    let db_pool = DbPool::new(&settings.storage).await?;
    info!("✅ Context store ready at {}", settings.storage.url);

    let state = AppState::new(settings.clone(), db_pool.clone()).await?;

    // Lock housekeeping always runs; idle expiry only with a TTL
    let ttl = settings.context.session_ttl();
    if ttl.is_none() {
        info!("Idle session expiry disabled");
    }
    let sweeper = spawn_idle_sweeper(state.store.clone(), ttl, settings.context.sweep_interval());

    let app = build_router(state);

    // Server address
    let addr = SocketAddr::from((
        settings.server.host.parse::<std::net::IpAddr>()?,
        settings.server.port,
    ));

    info!("🎯 Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    sweeper.abort();
    db_pool.close().await;
    info!("👋 Shutdown complete");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
    info!("Shutdown signal received");
}
