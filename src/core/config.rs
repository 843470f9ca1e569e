/// Engine configuration — heroic die size and search/chain bounds.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

use crate::core::allocator::{DEFAULT_MAX_POOL, POOL_CEILING};
use crate::core::explosion::DEFAULT_MAX_CHAIN;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("RON deserialization error: {0}")]
    Ron(#[from] ron::error::SpannedError),
    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Face count of every heroic die rolled into the pool.
    pub heroic_die_faces: u32,
    /// Upper bound on the pool the combination search will accept.
    pub max_heroic_pool: usize,
    /// Rerolls allowed in a single explosion chain.
    pub max_chain_length: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            heroic_die_faces: 6,
            max_heroic_pool: DEFAULT_MAX_POOL,
            max_chain_length: DEFAULT_MAX_CHAIN,
        }
    }
}

impl EngineConfig {
    /// Load a config from a RON file.
    pub fn load_from_ron(path: &Path) -> Result<EngineConfig, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse_ron(&contents)
    }

    /// Parse a config from a RON string. Missing fields take defaults.
    pub fn parse_ron(input: &str) -> Result<EngineConfig, ConfigError> {
        let config: EngineConfig = ron::from_str(input)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.heroic_die_faces == 0 {
            return Err(ConfigError::Invalid(
                "heroic_die_faces must be at least 1".to_string(),
            ));
        }
        if self.max_heroic_pool > POOL_CEILING {
            return Err(ConfigError::Invalid(format!(
                "max_heroic_pool must be at most {}, got {}",
                POOL_CEILING, self.max_heroic_pool
            )));
        }
        if self.max_chain_length == 0 {
            return Err(ConfigError::Invalid(
                "max_chain_length must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
