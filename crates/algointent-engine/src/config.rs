//! Engine configuration.

use algointent_core::Network;
use algointent_planner::BuilderConfig;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Network the engine builds for. Must match the node it talks to.
    pub network: Network,

    /// Rounds to wait for confirmation before reporting a timeout.
    pub max_poll_rounds: u64,

    /// Opt the creator in to an asset right after creating it.
    pub auto_opt_in: bool,

    pub builder: BuilderConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            network: Network::TestNet,
            max_poll_rounds: 4,
            auto_opt_in: true,
            builder: BuilderConfig::default(),
        }
    }
}
