mod config;
mod errors;
mod jobs;
mod llm_client;
mod models;
mod portfolio;
mod resume;
mod routes;
mod state;

use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::jobs::sweeper::{spawn_periodic_sweep, sweep_directory, CLEANUP_MAX_FILES};
use crate::jobs::{InMemoryJobStore, JobStore};
use crate::llm_client::ProviderGateway;
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on malformed values, not on missing keys)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting PortfolioGen v{}", env!("CARGO_PKG_VERSION"));

    // Artifact directories
    for dir in [&config.upload_dir, &config.generated_dir] {
        tokio::fs::create_dir_all(dir)
            .await
            .with_context(|| format!("Failed to create {}", dir.display()))?;
        sweep_directory(dir, CLEANUP_MAX_FILES).await;
        info!("Using directory {}", dir.display());
    }

    // Backends (availability is decided here, once)
    let gateway = ProviderGateway::from_config(&config)?;
    for backend in gateway.diagnostics().backends {
        info!(
            "{}: {}",
            backend.name,
            if backend.available { "available" } else { "not available" }
        );
    }

    // Job registry + optional background sweep
    let jobs: Arc<dyn JobStore> = Arc::new(InMemoryJobStore::new());
    let _sweeper = spawn_periodic_sweep(config.clone(), jobs.clone());

    let state = AppState {
        config: config.clone(),
        gateway: Arc::new(gateway),
        jobs,
    };

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
