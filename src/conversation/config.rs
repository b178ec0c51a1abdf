//! Client configuration

use super::storage::FileStore;
use super::store::DEFAULT_WPM;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_SERVER_URL: &str = "http://localhost:8080";
pub const DEFAULT_RESPONSE_DELAY_MS: u64 = 1000;

/// Settings of the conversation client (`client:` section of config.yaml)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Base URL of the relay server
    pub server_url: String,
    /// Artificial pause between appending the user message and calling the relay
    pub response_delay_ms: u64,
    /// Reading speed assumed until a reply reports one
    pub default_wpm: f64,
    /// Where conversation state is persisted (defaults to the platform data dir)
    pub data_dir: Option<PathBuf>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_url: DEFAULT_SERVER_URL.to_string(),
            response_delay_ms: DEFAULT_RESPONSE_DELAY_MS,
            default_wpm: DEFAULT_WPM,
            data_dir: None,
        }
    }
}

impl ClientConfig {
    /// Defaults overridden by environment variables
    pub fn from_env() -> Self {
        Self::default().with_env_overrides()
    }

    /// Apply `PACECHAT_*` environment overrides on top of `self`
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(url) = std::env::var("PACECHAT_SERVER_URL") {
            if !url.trim().is_empty() {
                self.server_url = url.trim().to_string();
            }
        }
        if let Some(ms) = std::env::var("PACECHAT_RESPONSE_DELAY_MS")
            .ok()
            .and_then(|s| s.parse().ok())
        {
            self.response_delay_ms = ms;
        }
        if let Some(wpm) = std::env::var("PACECHAT_DEFAULT_WPM")
            .ok()
            .and_then(|s| s.parse::<f64>().ok())
            .filter(|w| w.is_finite() && *w > 0.0)
        {
            self.default_wpm = wpm;
        }
        if let Ok(dir) = std::env::var("PACECHAT_DATA_DIR") {
            if !dir.trim().is_empty() {
                self.data_dir = Some(PathBuf::from(dir));
            }
        }
        self
    }

    pub fn response_delay(&self) -> Duration {
        Duration::from_millis(self.response_delay_ms)
    }

    /// File-backed storage at `data_dir`, or the platform data directory
    pub fn file_store(&self) -> anyhow::Result<FileStore> {
        match &self.data_dir {
            Some(dir) => Ok(FileStore::new(dir)),
            None => FileStore::default_location()
                .ok_or_else(|| anyhow::anyhow!("no data directory available; set PACECHAT_DATA_DIR")),
        }
    }
}
