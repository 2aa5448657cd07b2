//! API route modules.

pub mod channels;
pub mod health;
pub mod prices;

use axum::{routing::get, Router};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::state::AppState;

/// Create the main router with all routes
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health::health_check))
        .merge(channels::router())
        .merge(prices::router())
        .layer(TraceLayer::new_for_http())
        // The companion mobile app calls from arbitrary origins.
        .layer(CorsLayer::permissive())
        .with_state(state)
}
