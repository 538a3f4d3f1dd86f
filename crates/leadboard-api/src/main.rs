//! Leadboard API Service
//!
//! REST API for the lead management dashboard

use anyhow::{Context, Result};
use leadboard_api::{
    create_router, storage, AppState, Config, LeadService, RedisBlobStore, RedisLeadStore,
};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "leadboard_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Configuration
    let config = Config::from_env().context("Failed to load configuration")?;

    info!("Starting Leadboard API Service");
    info!("Redis URL: {}", config.redis_url);
    info!(
        "Admin gate: {}",
        if config.require_admin { "on" } else { "off" }
    );

    // Initialize storage; both stores share one managed connection
    let conn = storage::connect(&config.redis_url)
        .await
        .context("Failed to initialize storage")?;

    let service = LeadService::new(
        Arc::new(RedisLeadStore::new(conn.clone())),
        Arc::new(RedisBlobStore::new(conn)),
    );

    // Create application state
    let state = AppState::new(service, &config);

    // Create router
    let app = create_router(state);

    // Bind and serve
    let addr = config.api_address();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .context("Failed to bind to address")?;

    info!("Leadboard API Service running on http://{}", addr);

    axum::serve(listener, app)
        .await
        .context("Server error")?;

    Ok(())
}
