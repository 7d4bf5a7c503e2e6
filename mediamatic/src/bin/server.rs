//! Media-matic server binary

use anyhow::{Context, Result};
use mediamatic::analysis::AnalysisSettings;
use mediamatic::api::{create_router, ApiState};
use mediamatic::{DashboardConfig, LangflowClient, SessionStore};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("Starting Media-matic server v{}", env!("CARGO_PKG_VERSION"));

    // Load config from file
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config.toml".to_string());

    let config = DashboardConfig::load(&config_path)?;

    info!(
        config_path = config_path,
        base_url = config.flow.base_url,
        endpoint = config.flow.endpoint,
        tweaks = config.flow.tweaks.len(),
        "Loaded configuration"
    );

    let client = LangflowClient::from_config(&config.flow)?;

    // Each client session gets its own ledger
    let sessions = SessionStore::new(Arc::new(client), AnalysisSettings::from_config(&config.flow))
        .with_display_limit(config.history_display_limit);

    let app = create_router(Arc::new(ApiState { sessions }));

    let addr: SocketAddr = config
        .server
        .bind
        .parse()
        .with_context(|| format!("Invalid bind address: {}", config.server.bind))?;
    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
