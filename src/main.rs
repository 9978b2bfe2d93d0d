//! rfmd-gateway server entry point.
//!
//! Starts the Axum HTTP server over the cached homeowners dataset.

use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use rfmd_gateway::api;
use rfmd_gateway::app_state::AppState;
use rfmd_gateway::config::{DataSource, GatewayConfig, LogFormat};
use rfmd_gateway::domain::DatasetCache;
use rfmd_gateway::loader::{BigQueryLoader, DataLoader, JsonFileLoader};
use rfmd_gateway::service::HomeownerService;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let config = GatewayConfig::from_env()?;

    // Initialize tracing
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    match config.log_format {
        LogFormat::Json => tracing_subscriber::fmt().json().with_env_filter(filter).init(),
        LogFormat::Text => tracing_subscriber::fmt().with_env_filter(filter).init(),
    }
    tracing::info!(addr = %config.listen_addr, source = ?config.data_source, "starting rfmd-gateway");

    // Build loader
    let loader: Arc<dyn DataLoader> = match config.data_source {
        DataSource::BigQuery => {
            if config.bigquery.access_token.is_none() {
                tracing::warn!("BQ_ACCESS_TOKEN not set; BigQuery requests will be unauthenticated");
            }
            Arc::new(
                BigQueryLoader::new(config.bigquery.clone())
                    .context("failed to build BigQuery client")?,
            )
        }
        DataSource::File => Arc::new(JsonFileLoader::new(config.data_file.clone())),
    };

    // Build cache and service layer
    let cache = Arc::new(DatasetCache::new(loader, config.cache_ttl));
    if config.cache_warm_on_start {
        let rows = cache.get().await.len();
        tracing::info!(rows, "cache warmed");
    }
    let app_state = AppState::new(HomeownerService::new(cache));

    // Build router
    let app = api::build_app(app_state);

    // Start server
    let listener = tokio::net::TcpListener::bind(config.listen_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.listen_addr))?;
    tracing::info!(addr = %config.listen_addr, "server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
