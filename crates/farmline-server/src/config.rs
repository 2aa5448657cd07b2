//! Server configuration.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;

/// Server configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Base directory for runtime data
    pub farmline_dir: PathBuf,
    /// Address the HTTP server binds to
    pub bind_addr: SocketAddr,
    /// Market price dataset, refreshed out-of-band by the sync job
    pub price_data_path: PathBuf,
    /// Idle sessions older than this are evicted
    pub session_ttl: Duration,
    /// Upper bound on a single price lookup
    pub price_lookup_timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        let farmline_dir = home.join(".farmline");

        Self {
            price_data_path: farmline_dir.join("data").join("market_prices.json"),
            farmline_dir,
            bind_addr: ([0, 0, 0, 0], 8000).into(),
            session_ttl: Duration::from_secs(600),
            price_lookup_timeout: Duration::from_secs(5),
        }
    }
}

impl Config {
    /// Load configuration from the environment or defaults
    ///
    /// Standard directory structure:
    /// ```text
    /// ~/.farmline/
    /// └── data/
    ///     └── market_prices.json   # Rewritten by the price sync job
    /// ```
    ///
    /// Environment overrides: `FARMLINE_DIR`, `FARMLINE_BIND`,
    /// `FARMLINE_SESSION_TTL_SECS`, `FARMLINE_PRICE_TIMEOUT_SECS`.
    /// A malformed override is startup-fatal.
    pub fn load() -> anyhow::Result<Self> {
        let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));

        let farmline_dir = std::env::var("FARMLINE_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| home.join(".farmline"));

        let data_dir = farmline_dir.join("data");
        std::fs::create_dir_all(&data_dir)
            .with_context(|| format!("creating {}", data_dir.display()))?;

        let bind_addr = match std::env::var("FARMLINE_BIND") {
            Ok(raw) => raw
                .parse()
                .with_context(|| format!("invalid FARMLINE_BIND: {raw}"))?,
            Err(_) => ([0, 0, 0, 0], 8000).into(),
        };

        let session_ttl = Duration::from_secs(env_secs("FARMLINE_SESSION_TTL_SECS", 600)?);
        let price_lookup_timeout = Duration::from_secs(env_secs("FARMLINE_PRICE_TIMEOUT_SECS", 5)?);

        Ok(Self {
            price_data_path: data_dir.join("market_prices.json"),
            farmline_dir,
            bind_addr,
            session_ttl,
            price_lookup_timeout,
        })
    }
}

fn env_secs(name: &str, default: u64) -> anyhow::Result<u64> {
    match std::env::var(name) {
        Ok(raw) => raw.parse().with_context(|| format!("invalid {name}: {raw}")),
        Err(_) => Ok(default),
    }
}
