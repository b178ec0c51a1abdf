//! pacechat
//!
//! A speed-reading chat assistant with:
//! - A persisted conversation client (message log, reading statistics, narration)
//! - A relay server forwarding per-session histories to a generative model
//! - Gemini `generateContent` as the default model backend

pub mod api;
pub mod conversation;
pub mod model;
pub mod relay;

#[cfg(test)]
pub(crate) mod test_helpers;

use anyhow::{Context, Result};
use conversation::ClientConfig;
use model::gemini::{ModelSettings, DEFAULT_BASE_URL, DEFAULT_MODEL, DEFAULT_TIMEOUT_SECS};
use model::{GeminiClient, GenerativeModel};
use relay::{HistoryStore, RelayConfig, RelayService};
use serde::Deserialize;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

// ============================================================================
// YAML config structs (deserialization targets)
// ============================================================================

/// Top-level YAML configuration file structure
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct YamlConfig {
    pub server: ServerYamlConfig,
    pub model: ModelYamlConfig,
    pub relay: RelayYamlConfig,
    pub client: ClientConfig,
}

/// Server configuration section
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerYamlConfig {
    pub port: u16,
    pub host: String,
}

impl Default for ServerYamlConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            host: "0.0.0.0".into(),
        }
    }
}

/// Generative model section
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ModelYamlConfig {
    pub base_url: String,
    pub model: String,
    /// Prefer `GEMINI_API_KEY` over storing the key in the file
    pub api_key: Option<String>,
    pub timeout_secs: u64,
}

impl Default for ModelYamlConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.into(),
            model: DEFAULT_MODEL.into(),
            api_key: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

/// Relay section (YAML only; RelayConfig in relay/config.rs is the runtime form)
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RelayYamlConfig {
    pub persona: Option<String>,
    pub session_timeout_secs: Option<u64>,
    pub max_history_turns: Option<usize>,
}

// ============================================================================
// Runtime config (what the application actually uses)
// ============================================================================

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub server_host: String,
    pub server_port: u16,
    pub model: ModelSettings,
    pub relay: RelayConfig,
    pub client: ClientConfig,
}

fn env_parse<T: std::str::FromStr>(var: &str) -> Option<T> {
    std::env::var(var).ok().and_then(|s| s.trim().parse().ok())
}

fn env_non_empty(var: &str) -> Option<String> {
    std::env::var(var).ok().filter(|s| !s.trim().is_empty())
}

impl Config {
    /// Load configuration from environment variables only.
    /// Equivalent to from_yaml_and_env(None).
    pub fn from_env() -> Result<Self> {
        Self::from_yaml_and_env(None)
    }

    /// Load configuration from an optional YAML file, then override with env vars.
    ///
    /// Priority: env var > YAML > default
    ///
    /// If `yaml_path` is None, tries "config.yaml" in CWD. If the file doesn't
    /// exist, falls back to pure env var / defaults.
    pub fn from_yaml_and_env(yaml_path: Option<&Path>) -> Result<Self> {
        // 1. Load YAML config (or defaults if file not found)
        let yaml = Self::load_yaml(yaml_path);

        // 2. Build Config with env var overrides
        let relay_defaults = RelayConfig::default();
        Ok(Self {
            server_host: env_non_empty("SERVER_HOST").unwrap_or(yaml.server.host),
            server_port: env_parse("SERVER_PORT").unwrap_or(yaml.server.port),
            model: ModelSettings {
                base_url: env_non_empty("GEMINI_BASE_URL").unwrap_or(yaml.model.base_url),
                model: env_non_empty("GEMINI_MODEL").unwrap_or(yaml.model.model),
                api_key: env_non_empty("GEMINI_API_KEY").or(yaml.model.api_key),
                timeout: Duration::from_secs(
                    env_parse("GEMINI_TIMEOUT_SECS").unwrap_or(yaml.model.timeout_secs),
                ),
            },
            relay: RelayConfig {
                persona: env_non_empty("RELAY_PERSONA")
                    .or(yaml.relay.persona.filter(|p| !p.trim().is_empty()))
                    .unwrap_or(relay_defaults.persona),
                session_timeout: env_parse("RELAY_SESSION_TIMEOUT_SECS")
                    .or(yaml.relay.session_timeout_secs)
                    .map(Duration::from_secs)
                    .unwrap_or(relay_defaults.session_timeout),
                max_history_turns: env_parse("RELAY_MAX_HISTORY_TURNS")
                    .or(yaml.relay.max_history_turns)
                    .unwrap_or(relay_defaults.max_history_turns),
            },
            client: yaml.client.with_env_overrides(),
        })
    }

    /// Try to load and parse a YAML config file. Returns defaults on any failure.
    fn load_yaml(yaml_path: Option<&Path>) -> YamlConfig {
        let default_path = Path::new("config.yaml");
        let path = yaml_path.unwrap_or(default_path);

        match std::fs::read_to_string(path) {
            Ok(contents) => match serde_yaml::from_str(&contents) {
                Ok(config) => {
                    tracing::info!("Loaded config from {}", path.display());
                    config
                }
                Err(e) => {
                    tracing::warn!("Failed to parse {}: {}. Using defaults.", path.display(), e);
                    YamlConfig::default()
                }
            },
            Err(_) => {
                tracing::debug!(
                    "No config file at {}, using env vars / defaults",
                    path.display()
                );
                YamlConfig::default()
            }
        }
    }
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub relay: Arc<RelayService>,
    pub config: Arc<Config>,
}

impl AppState {
    /// Create application state backed by the Gemini client
    pub fn new(config: Config) -> Result<Self> {
        if config.model.api_key.is_none() {
            tracing::warn!("GEMINI_API_KEY is not set; every relay call will fall back");
        }
        let model = GeminiClient::new(config.model.clone())
            .context("Failed to create generative model client")?;
        Ok(Self::with_model(config, Arc::new(model)))
    }

    /// Create application state around any model implementation
    pub fn with_model(config: Config, model: Arc<dyn GenerativeModel>) -> Self {
        let histories = Arc::new(HistoryStore::new(config.relay.session_timeout));
        let relay = Arc::new(RelayService::new(model, histories, config.relay.clone()));
        Self {
            relay,
            config: Arc::new(config),
        }
    }

    /// Router serving this state
    pub fn router(&self) -> axum::Router {
        api::create_router(Arc::new(api::handlers::ServerState {
            relay: Arc::clone(&self.relay),
        }))
    }
}

/// Run the relay server until Ctrl-C.
pub async fn start_server(config: Config) -> Result<()> {
    let addr = format!("{}:{}", config.server_host, config.server_port);
    let state = AppState::new(config)?;
    state.relay.histories().start_cleanup_task();

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    tracing::info!(
        "Relay listening on {} (model: {})",
        addr,
        state.relay.model_name()
    );

    axum::serve(listener, state.router())
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("Failed to listen for shutdown signal: {}", e);
            }
            tracing::info!("Shutting down");
        })
        .await
        .context("Server error")?;

    Ok(())
}

// ============================================================================
// Tests
// ============================================================================
