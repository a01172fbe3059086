//! Mediakit API Server
//!
//! Main entry point for the media storage service.

use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use mediakit_api::{AppState, create_router};
use mediakit_core::{DriverRegistry, MediaFacade};
use mediakit_shared::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mediakit=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = AppConfig::load().context("Failed to load configuration")?;

    for (tag, option) in &config.storage {
        info!(tag = %tag, driver = %option.kind(), "Storage tag configured");
    }
    info!(
        root = %config.media.root.display(),
        base_url = %config.media.base_url,
        "Local media fallback"
    );

    // Build the registry and facade
    let registry = Arc::new(DriverRegistry::new(config.storage, config.media));
    let state = AppState::new(MediaFacade::new(registry));

    // Create router
    let app = create_router(state);

    // Start server
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr).await?;
    info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
