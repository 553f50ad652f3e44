//! Engine configuration.
//!
//! `EngineConfig` gathers the per-component configs into one TOML
//! document. Every section and field is optional; missing values take the
//! component defaults.
//!
//! ```toml
//! [self_play]
//! max_moves = 200
//! workers = 4
//!
//! [self_play.mcts]
//! c_puct = 1.5
//!
//! [self_play.exploration]
//! full_simulations = 800
//!
//! [batch]
//! batch_size = 64
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ConfigError;
use crate::mcts::{ExplorationConfig, MCTSConfig};
use crate::nn::BatchConfig;
use crate::training::{ArenaConfig, SelfPlayConfig};

/// All engine settings.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub self_play: SelfPlayConfig,
    pub batch: BatchConfig,
    pub arena: ArenaConfig,
}

impl EngineConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file.
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        debug!(path = %path.display(), "loading engine config");
        Self::from_toml_str(&content)
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        toml::to_string(self).map_err(|e| ConfigError::Invalid(e.to_string()))
    }

    /// Search settings used by self-play.
    #[must_use]
    pub fn mcts(&self) -> &MCTSConfig {
        &self.self_play.mcts
    }

    #[must_use]
    pub fn exploration(&self) -> &ExplorationConfig {
        &self.self_play.exploration
    }

    /// Check value ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_mcts(&self.self_play.mcts, "self_play.mcts")?;
        validate_mcts(&self.arena.mcts, "arena.mcts")?;

        let ex = &self.self_play.exploration;
        if !(0.0..=1.0).contains(&ex.full_search_probability) {
            return Err(invalid("self_play.exploration.full_search_probability must be in [0, 1]"));
        }
        if !(0.0..=1.0).contains(&ex.dirichlet_epsilon) {
            return Err(invalid("self_play.exploration.dirichlet_epsilon must be in [0, 1]"));
        }
        if ex.dirichlet_epsilon > 0.0 && !(ex.dirichlet_alpha > 0.0 && ex.dirichlet_alpha.is_finite()) {
            return Err(invalid(
                "self_play.exploration.dirichlet_alpha must be positive when noise is enabled",
            ));
        }
        if !(ex.forced_playout_k >= 0.0 && ex.forced_playout_k.is_finite()) {
            return Err(invalid("self_play.exploration.forced_playout_k must be non-negative"));
        }
        if ex.full_simulations == 0 {
            return Err(invalid("self_play.exploration.full_simulations must be positive"));
        }

        let sp = &self.self_play;
        if !(sp.temperature >= 0.0 && sp.temperature.is_finite()) {
            return Err(invalid("self_play.temperature must be non-negative"));
        }
        if sp.workers == 0 {
            return Err(invalid("self_play.workers must be positive"));
        }

        if self.batch.batch_size == 0 {
            return Err(invalid("batch.batch_size must be positive"));
        }
        if self.batch.queue_capacity == 0 {
            return Err(invalid("batch.queue_capacity must be positive"));
        }
        if self.arena.simulations == 0 {
            return Err(invalid("arena.simulations must be positive"));
        }
        Ok(())
    }
}

fn validate_mcts(config: &MCTSConfig, section: &str) -> Result<(), ConfigError> {
    if !(config.c_puct > 0.0 && config.c_puct.is_finite()) {
        return Err(invalid(format!("{section}.c_puct must be positive")));
    }
    if !config.fpu_value.is_finite() {
        return Err(invalid(format!("{section}.fpu_value must be finite")));
    }
    if config.max_nodes < 2 {
        return Err(invalid(format!("{section}.max_nodes must be at least 2")));
    }
    Ok(())
}

fn invalid(message: impl Into<String>) -> ConfigError {
    ConfigError::Invalid(message.into())
}
