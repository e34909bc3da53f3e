//! Engine configuration

use crate::error::ConfigurationError;
use serde::{Deserialize, Serialize};

/// Seed used when none is configured
pub const DEFAULT_SEED: u64 = 42;

/// Engine-wide settings shared by every run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Upper bound on concurrently evaluated cells
    #[serde(default = "default_max_workers")]
    pub max_workers: usize,

    /// RNG seed for stochastic predictors
    #[serde(default = "default_seed")]
    pub seed: u64,
}

fn default_max_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

fn default_seed() -> u64 {
    DEFAULT_SEED
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_workers: default_max_workers(),
            seed: default_seed(),
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.max_workers == 0 {
            return Err(ConfigurationError::invalid(
                "max_workers",
                "at least one worker is required",
            ));
        }
        Ok(())
    }
}
