//! Registry Node
//!
//! REST API over the write-once content hash registry

use anyhow::{Context, Result};
use registry_node::{
    create_router, AppState, Config, MemoryStore, RedisStore, Registry, RegistrationStore,
    StorageBackend, SystemClock,
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
                .unwrap_or_else(|_| "registry_node=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Registry Node");

    let config = Config::from_env().context("Failed to load configuration")?;
    info!("  Admin: {}", config.admin);
    info!("  Storage: {:?}", config.storage_backend);

    let store: Arc<dyn RegistrationStore> = match config.storage_backend {
        StorageBackend::Memory => Arc::new(MemoryStore::new()),
        StorageBackend::Redis => {
            let redis_url = config
                .redis_url
                .as_deref()
                .context("REDIS_URL is required when STORAGE_BACKEND=redis")?;
            Arc::new(
                RedisStore::new(redis_url)
                    .await
                    .context("Failed to initialize storage")?,
            )
        }
    };

    let registry = Registry::deploy(store, config.admin, Arc::new(SystemClock))
        .await
        .context("Failed to deploy registry")?;

    let app = create_router(AppState { registry });

    let addr = config.api_address();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    info!("Registry Node running on http://{}", addr);

    axum::serve(listener, app)
        .await
        .context("Server error")?;

    Ok(())
}
