use std::{net::SocketAddr, time::Duration};

use anyhow::Context;
use cointracker_chain_data::provider::blockchair::DEFAULT_BASE_URL;

pub struct Config {
    pub listen_addr: SocketAddr,
    pub db_path: String,
    pub cors_allow: Vec<String>,
    pub request_timeout: Duration,
    pub provider_base_url: String,
    /// `None` disables the periodic sync sweep.
    pub sync_interval: Option<Duration>,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        let listen_addr: SocketAddr = env_or("CT_LISTEN_ADDR", "0.0.0.0:8080")
            .parse()
            .context("Invalid CT_LISTEN_ADDR")?;
        let db_path = env_or("CT_DB_PATH", "./db/cointracker.db");
        let cors_allow = env_or("CT_CORS_ALLOW_ORIGINS", "*")
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        let timeout_ms: u64 = env_or("CT_REQUEST_TIMEOUT_MS", "30000")
            .parse()
            .context("Invalid CT_REQUEST_TIMEOUT_MS")?;
        let provider_base_url = env_or("CT_PROVIDER_BASE_URL", DEFAULT_BASE_URL);
        let interval_secs: u64 = env_or("CT_SYNC_INTERVAL_SECS", "21600")
            .parse()
            .context("Invalid CT_SYNC_INTERVAL_SECS")?;

        Ok(Self {
            listen_addr,
            db_path,
            cors_allow,
            request_timeout: Duration::from_millis(timeout_ms),
            provider_base_url,
            sync_interval: (interval_secs > 0).then(|| Duration::from_secs(interval_secs)),
        })
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}
