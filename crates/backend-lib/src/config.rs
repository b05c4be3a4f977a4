// ============================
// chat-backend-lib/src/config.rs
// ============================
//! Configuration management.
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::Deserialize;

/// Application settings
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// Server bind address
    #[serde(default = "default_bind_addr")]
    pub bind_addr: SocketAddr,
    /// Data directory for the flat-file message store
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    /// Log level filter
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Messages per room in the hello event and in history pages
    #[serde(default = "default_history_page_size")]
    pub history_page_size: usize,
    /// Capacity of each connection's outbound delivery queue
    #[serde(default = "default_outbound_queue_capacity")]
    pub outbound_queue_capacity: usize,
    /// Session TTL in seconds
    #[serde(default = "default_session_ttl_secs")]
    pub session_ttl_secs: u64,
}

fn default_bind_addr() -> SocketAddr {
    "127.0.0.1:3000".parse().unwrap()
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

fn default_log_level() -> String {
    "info".to_string()
}

// Matches the history batch size of the reference deployment.
fn default_history_page_size() -> usize {
    100
}

fn default_outbound_queue_capacity() -> usize {
    32
}

fn default_session_ttl_secs() -> u64 {
    60 * 60 * 24 * 7 // 7 days
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            data_dir: default_data_dir(),
            log_level: default_log_level(),
            history_page_size: default_history_page_size(),
            outbound_queue_capacity: default_outbound_queue_capacity(),
            session_ttl_secs: default_session_ttl_secs(),
        }
    }
}

impl Settings {
    /// Load settings from `config.toml` and `CHAT_`-prefixed environment
    /// variables; env vars win.
    pub fn load() -> Result<Self> {
        Self::load_from("config.toml")
    }

    /// Load settings from a specific TOML file plus the environment.
    pub fn load_from(path: &str) -> Result<Self> {
        let settings = Figment::new()
            .merge(Toml::file(path))
            .merge(Env::prefixed("CHAT_"))
            .extract()?;
        Ok(settings)
    }

    pub fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.session_ttl_secs)
    }
}
