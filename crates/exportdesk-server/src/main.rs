//! # exportdesk-server
//!
//! HTTP front end for the export marketplace's RFQ core.
//!
//! This binary provides:
//! - **REST API** (axum) for the catalog, RFQs, message threads and the
//!   admin console
//! - **Server-sent events** streaming live RFQ threads
//! - A choice of **store backend**: SQLite on disk, or process memory with an
//!   optional JSON snapshot
//!
//! Authentication happens upstream: the gateway in front of this server sets
//! the `x-user-id` header, and roles are read from stored profiles.

mod api;
mod config;
mod error;

use std::path::PathBuf;
use std::sync::Arc;

use tracing::info;
use tracing_subscriber::EnvFilter;

use exportdesk_core::Marketplace;
use exportdesk_store::{Database, MemoryStore, Notifier, SqliteStore, Store};

use crate::api::AppState;
use crate::config::{ServerConfig, StoreBackend};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // -----------------------------------------------------------------------
    // 1. Initialize tracing (respects RUST_LOG env var)
    // -----------------------------------------------------------------------
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new("info,exportdesk_server=debug,exportdesk_core=debug")
        }))
        .init();

    info!("Starting exportdesk server v{}", env!("CARGO_PKG_VERSION"));

    // -----------------------------------------------------------------------
    // 2. Load configuration
    // -----------------------------------------------------------------------
    let config = ServerConfig::from_env();
    info!(?config, "Loaded configuration");

    // -----------------------------------------------------------------------
    // 3. Open the store
    // -----------------------------------------------------------------------
    let store = open_store(&config).await?;
    let market = Marketplace::new(store, config.core);

    let app_state = AppState {
        market,
        config: Arc::new(config.clone()),
    };

    // -----------------------------------------------------------------------
    // 4. Run the HTTP API server (blocks until shutdown)
    // -----------------------------------------------------------------------
    tokio::select! {
        result = api::serve(app_state, config.http_addr) => {
            if let Err(e) = result {
                tracing::error!(error = %e, "HTTP server failed");
                return Err(e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down");
        }
    }

    Ok(())
}

async fn open_store(config: &ServerConfig) -> anyhow::Result<Arc<dyn Store>> {
    let notifier = Notifier::new(config.notify_capacity);

    let store: Arc<dyn Store> = match config.store_backend {
        StoreBackend::Sqlite => {
            let path: PathBuf = match &config.database_path {
                Some(path) => path.clone(),
                None => Database::default_path()?,
            };
            info!(path = %path.display(), "Using SQLite store");
            Arc::new(SqliteStore::new(Database::open_at(&path)?, notifier))
        }
        StoreBackend::Memory => match &config.snapshot_path {
            Some(path) => {
                info!(path = %path.display(), "Using memory store with snapshot");
                Arc::new(MemoryStore::open(path.clone(), notifier).await?)
            }
            None => {
                info!("Using memory store without persistence");
                Arc::new(MemoryStore::with_notifier(notifier))
            }
        },
    };

    Ok(store)
}
