//! Relayer Service
//!
//! Gasless submission bridge in front of the registry node.

use anyhow::{Context, Result};
use relayer_service::{create_router, submitter_from_config, AppState, Config};
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "relayer_service=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Relayer Service");

    let config = Config::from_env().context("Failed to load configuration")?;

    let submitter = submitter_from_config(&config);
    info!("  Mode: {:?}", submitter.mode());

    if let Err(e) = submitter.preflight().await {
        warn!("Registry preflight failed: {}", e);
    }

    let app = create_router(AppState::new(submitter));

    let listener = TcpListener::bind(&config.api_address())
        .await
        .with_context(|| format!("Failed to bind to {}", config.api_address()))?;

    info!("Relayer listening on {}", config.api_address());

    axum::serve(listener, app)
        .await
        .context("Server error")?;

    Ok(())
}
