// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use axum::{
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use std::{net::SocketAddr, sync::Arc};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use super::placement::{process_handler, quota_handler};
use crate::placement::{PlacementOrchestrator, QuotaGate};

#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<PlacementOrchestrator>,
    pub quota: Arc<dyn QuotaGate>,
}

impl AppState {
    pub fn new(orchestrator: PlacementOrchestrator, quota: Arc<dyn QuotaGate>) -> Self {
        Self {
            orchestrator: Arc::new(orchestrator),
            quota,
        }
    }
}

pub fn create_app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/process", post(process_handler))
        .route("/quota", get(quota_handler))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub async fn start_server(state: AppState, addr: SocketAddr) -> anyhow::Result<()> {
    let app = create_app(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    tracing::info!("API server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

async fn health_handler() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": crate::version::get_version_info(),
    }))
}
