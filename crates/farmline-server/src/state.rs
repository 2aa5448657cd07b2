//! Application state.

use std::sync::Arc;
use std::time::Instant;

use farmline_core::{
    DialogueEngine, InMemorySessionStore, JsonPriceBook, MenuCatalog, PriceLookupPort, SessionStore,
};

use crate::config::Config;

/// Shared application state
pub struct AppState {
    /// Server configuration
    pub config: Arc<Config>,
    /// Volatile session store shared by both channels
    pub sessions: Arc<dyn SessionStore>,
    /// Market price supplier
    pub prices: Arc<dyn PriceLookupPort>,
    /// Channel-agnostic dialogue engine
    pub engine: DialogueEngine,
    /// Server start time
    pub start_time: Instant,
}

impl AppState {
    /// Create new application state. Fails when the menu catalog does not
    /// validate; that is a configuration error and must abort startup.
    pub fn new(config: Config) -> anyhow::Result<Arc<Self>> {
        let catalog = MenuCatalog::new()?;
        let prices: Arc<dyn PriceLookupPort> =
            Arc::new(JsonPriceBook::new(&config.price_data_path));
        Self::with_parts(config, catalog, prices)
    }

    /// Assemble state from explicit parts. Tests inject a fixed price book.
    pub fn with_parts(
        config: Config,
        catalog: MenuCatalog,
        prices: Arc<dyn PriceLookupPort>,
    ) -> anyhow::Result<Arc<Self>> {
        let engine = DialogueEngine::new(catalog, Arc::clone(&prices), config.price_lookup_timeout);
        Ok(Arc::new(Self {
            config: Arc::new(config),
            sessions: Arc::new(InMemorySessionStore::new()),
            prices,
            engine,
            start_time: Instant::now(),
        }))
    }
}
