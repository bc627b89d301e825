//! Node configuration: TOML file, then environment overrides.

use std::fs;
use std::net::SocketAddr;
use std::path::Path;

use algointent_core::Network;
use algointent_engine::EngineConfig;
use algointent_ledger::{AlgodConfig, DexConfig};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Configuration loading errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    pub listen: String,
    /// Used when `RUST_LOG` is not set.
    pub log_level: String,
    pub algod: AlgodConfig,
    /// Swaps are unavailable without a DEX section.
    pub dex: Option<DexConfig>,
    pub engine: EngineConfig,
    /// Seconds between sweeps for held plans past their validity window.
    pub sweep_interval_secs: u64,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            listen: "0.0.0.0:3000".to_string(),
            log_level: "info".to_string(),
            algod: AlgodConfig::default(),
            dex: None,
            engine: EngineConfig::default(),
            sweep_interval_secs: 60,
        }
    }
}

/// Load config from `path` (defaults when absent), apply environment
/// overrides and validate.
pub fn load_config(path: Option<&Path>) -> Result<NodeConfig, ConfigError> {
    load_config_with(path, |key| std::env::var(key).ok())
}

fn load_config_with(
    path: Option<&Path>,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<NodeConfig, ConfigError> {
    let mut config = match path {
        Some(path) => {
            let content = fs::read_to_string(path)?;
            toml::from_str(&content)?
        }
        None => NodeConfig::default(),
    };
    apply_overrides(&mut config, lookup)?;
    validate_config(&config)?;
    Ok(config)
}

fn apply_overrides(
    config: &mut NodeConfig,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<(), ConfigError> {
    if let Some(url) = lookup("ALGOD_ADDRESS") {
        config.algod.url = url;
    }
    if let Some(token) = lookup("ALGOD_TOKEN") {
        config.algod.token = token;
    }
    if let Some(name) = lookup("ALGOINTENT_NETWORK") {
        let network = Network::parse(&name)
            .ok_or_else(|| ConfigError::Invalid(format!("unknown network '{}'", name)))?;
        config.algod.network = network;
        config.engine.network = network;
    }
    if let Some(listen) = lookup("ALGOINTENT_LISTEN") {
        config.listen = listen;
    }
    Ok(())
}

pub fn validate_config(config: &NodeConfig) -> Result<(), ConfigError> {
    if config.listen.parse::<SocketAddr>().is_err() {
        return Err(ConfigError::Invalid(format!(
            "listen address '{}' is not host:port",
            config.listen
        )));
    }

    if config.algod.url.trim().is_empty() {
        return Err(ConfigError::Invalid("algod.url must not be empty".to_string()));
    }

    if config.algod.network != config.engine.network {
        return Err(ConfigError::Invalid(format!(
            "algod.network ({}) does not match engine.network ({})",
            config.algod.network, config.engine.network
        )));
    }

    if config.engine.max_poll_rounds == 0 {
        return Err(ConfigError::Invalid(
            "engine.max_poll_rounds must be > 0".to_string(),
        ));
    }

    if config.engine.builder.validity_rounds == 0 {
        return Err(ConfigError::Invalid(
            "engine.builder.validity_rounds must be > 0".to_string(),
        ));
    }

    if config.sweep_interval_secs == 0 {
        return Err(ConfigError::Invalid(
            "sweep_interval_secs must be > 0".to_string(),
        ));
    }

    if let Some(dex) = &config.dex {
        if dex.url.trim().is_empty() {
            return Err(ConfigError::Invalid("dex.url must not be empty".to_string()));
        }
    }

    Ok(())
}
