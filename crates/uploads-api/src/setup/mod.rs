//! Application setup and initialization

pub mod routes;
pub mod server;

use crate::state::AppState;
use anyhow::{Context, Result};
use std::sync::Arc;
use uploads_core::Config;

/// Initialize the entire application
pub async fn initialize_app(config: Config) -> Result<(Arc<AppState>, axum::Router)> {
    // Validate configuration first - fail fast on misconfiguration
    config.validate().context("Configuration validation failed")?;

    crate::telemetry::init_telemetry(config.environment())
        .map_err(|e| anyhow::anyhow!("Failed to initialize telemetry: {}", e))?;

    tracing::info!("Configuration loaded and validated successfully");

    let gateway = uploads_services::create_gateway(&config)
        .await
        .context("Failed to initialize storage gateway")?;

    let state = Arc::new(AppState::new(config.clone(), gateway));

    let router = routes::setup_routes(&config, state.clone())?;

    Ok((state, router))
}
