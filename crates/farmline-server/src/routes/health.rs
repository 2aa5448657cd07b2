//! Health check endpoint.

use axum::{extract::State, Json};
use serde::Serialize;
use std::sync::Arc;

use crate::state::AppState;

#[derive(Serialize)]
pub struct HealthStatus {
    pub status: String,
    pub version: String,
    pub uptime_seconds: u64,
    pub components: HealthComponents,
    pub metrics: HealthMetrics,
}

#[derive(Serialize)]
pub struct HealthComponents {
    pub price_dataset: bool,
}

#[derive(Serialize)]
pub struct HealthMetrics {
    pub active_sessions: usize,
}

/// Health check endpoint
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthStatus> {
    // Check the price dataset is readable; the dialogue engine degrades
    // gracefully without it, so this only downgrades status.
    let prices_healthy = state.prices.query(None, None).await.is_ok();

    let active_sessions = state.sessions.active_count().await;

    let status = if prices_healthy { "healthy" } else { "degraded" };

    Json(HealthStatus {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
        components: HealthComponents {
            price_dataset: prices_healthy,
        },
        metrics: HealthMetrics { active_sessions },
    })
}
