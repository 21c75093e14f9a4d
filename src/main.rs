// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use anyhow::{anyhow, Result};
use sponsored_rank::{
    api::{start_server, AppState},
    placement::{InMemoryQuotaGate, PlacementConfig, PlacementOrchestrator},
    version,
};
use std::{env, net::SocketAddr, sync::Arc};

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    // Initialize tracing subscriber for logging
    if env::var("RUST_LOG").is_err() {
        env::set_var("RUST_LOG", "info");
    }
    tracing_subscriber::fmt::init();

    tracing::info!("Starting {}", version::get_version_string());

    let config = PlacementConfig::from_env();
    config.validate().map_err(|e| anyhow!(e))?;

    let api_host = env::var("API_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
    let api_port = env::var("API_PORT").unwrap_or_else(|_| "8080".to_string());
    let addr: SocketAddr = format!("{}:{}", api_host, api_port).parse()?;

    let orchestrator = PlacementOrchestrator::from_config(&config)?;
    let quota = Arc::new(InMemoryQuotaGate::from_config(&config.quota));

    tracing::info!(
        "Sponsored placement service: proxy {}, search {}, {} fetches in flight, quota {}/{} days",
        config.proxy_endpoint,
        config.search_base_url,
        orchestrator.max_concurrency(),
        config.quota.max_requests,
        config.quota.reset_days
    );

    start_server(AppState::new(orchestrator, quota), addr).await
}
