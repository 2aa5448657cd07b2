//! farmline-server - Farmline backend server
//!
//! HTTP server for the USSD and IVR access channels.

use tracing::{debug, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod config;
mod routes;
mod state;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env().add_directive("farmline_server=info".parse()?))
        .init();

    info!("farmline-server v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let config = config::Config::load()?;
    info!("Data directory: {}", config.farmline_dir.display());

    if !config.price_data_path.exists() {
        // Not fatal: the dialogue degrades to localized text, and the sync
        // job may deliver the dataset after startup.
        warn!(
            "Price dataset missing at {}; market price lookups will fail until it is synced",
            config.price_data_path.display()
        );
    }

    // Menu catalog validation happens here; a missing template aborts startup.
    let state = state::AppState::new(config)?;

    // Evict idle sessions so the volatile store cannot grow without bound.
    let sweeper_state = state.clone();
    tokio::spawn(async move {
        let ttl = sweeper_state.config.session_ttl;
        let period = (ttl / 2).max(std::time::Duration::from_secs(1));
        let mut interval = tokio::time::interval(period);
        loop {
            interval.tick().await;
            let evicted = sweeper_state.sessions.sweep_idle(ttl).await;
            if evicted > 0 {
                debug!(evicted, "idle session sweep");
            }
        }
    });

    let app = routes::create_router(state.clone());

    let listener = tokio::net::TcpListener::bind(state.config.bind_addr).await?;
    info!("Listening on {}", state.config.bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutting down...");
        })
        .await?;

    Ok(())
}
