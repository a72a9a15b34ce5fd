//! RFP Win metering service - usage gate, recorder and monthly reset over HTTP.

use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use rfpwin_service::{create_router, AppState, ServiceConfig};
use rfpwin_store::{PgStore, Store};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,rfpwin=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting RFP Win metering service");

    let config = ServiceConfig::from_env();

    tracing::info!(
        listen_addr = %config.listen_addr,
        postgres_configured = %config.database_url.is_some(),
        stripe_configured = %config.stripe_api_key.is_some(),
        metering_mandatory = %config.metering.mandatory,
        "Service configuration loaded"
    );

    let store = open_store(&config).await?;
    let state = AppState::new(store, config.clone());

    let app = create_router(state);
    tracing::info!("Router configured with all API endpoints");

    tracing::info!(listen_addr = %config.listen_addr, "Starting HTTP server");
    let listener = tokio::net::TcpListener::bind(&config.listen_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Pick the storage backend: PostgreSQL, then `RocksDB`, then memory.
async fn open_store(config: &ServiceConfig) -> Result<Arc<dyn Store>, Box<dyn std::error::Error>> {
    if let Some(url) = &config.database_url {
        let store = PgStore::connect(url, config.database_max_connections).await?;
        store.migrate().await?;
        return Ok(Arc::new(store));
    }

    #[cfg(feature = "rocksdb-backend")]
    let store: Arc<dyn Store> = {
        tracing::info!(path = %config.data_dir, "Opening RocksDB store");
        Arc::new(rfpwin_store::RocksStore::open(&config.data_dir)?)
    };

    #[cfg(not(feature = "rocksdb-backend"))]
    let store: Arc<dyn Store> = {
        tracing::warn!("DATABASE_URL not set - using in-memory store, usage will not be persisted");
        Arc::new(rfpwin_store::MemoryStore::new())
    };

    Ok(store)
}
