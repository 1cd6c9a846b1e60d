//! Engine configuration, loadable from TOML.
//!
//! Every field is defaulted, so a partial document is valid:
//!
//! ```toml
//! seed = 7
//!
//! [orchestrator]
//! max_concurrent_effects = 5
//!
//! [orchestrator.effect_settings.burst]
//! particle_count = 80
//!
//! [optimizer]
//! target_fps = 60.0
//! optimization_interval_ms = 500
//! ```

use std::path::Path;

use flare_core::{FlareError, FlareResult, PoolConfig};
use flare_effects::OrchestratorConfig;
use flare_perf::OptimizerConfig;
use serde::{Deserialize, Serialize};

/// Everything needed to build a [`crate::FlareEngine`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Seed for template samplers.
    pub seed: u64,
    /// Ladder level at startup.
    pub initial_quality_level: u8,
    /// Particle pool floor and ceiling.
    pub pool: PoolConfig,
    /// Orchestrator limits and per-effect settings.
    pub orchestrator: OrchestratorConfig,
    /// Optimizer thresholds and the quality ladder.
    pub optimizer: OptimizerConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            seed: 0x00F1_A4E5,
            initial_quality_level: 3,
            pool: PoolConfig::default(),
            orchestrator: OrchestratorConfig::default(),
            optimizer: OptimizerConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Parses and validates a TOML document.
    ///
    /// # Errors
    ///
    /// - [`FlareError::ConfigLoad`] if the document does not parse
    /// - [`FlareError::InvalidConfig`] if a value is out of range
    pub fn from_toml_str(source: &str) -> FlareResult<Self> {
        let config: Self = toml::from_str(source).map_err(|e| FlareError::ConfigLoad(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a TOML file.
    ///
    /// # Errors
    ///
    /// See [`EngineConfig::from_toml_str`]; read failures are
    /// [`FlareError::ConfigLoad`] too.
    pub fn from_file(path: impl AsRef<Path>) -> FlareResult<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path)
            .map_err(|e| FlareError::ConfigLoad(format!("{}: {e}", path.display())))?;
        let config = Self::from_toml_str(&source)?;
        tracing::info!("Loaded engine config from {}", path.display());
        Ok(config)
    }

    /// Serializes back to TOML.
    ///
    /// # Errors
    ///
    /// Returns [`FlareError::ConfigLoad`] if serialization fails.
    pub fn to_toml_string(&self) -> FlareResult<String> {
        toml::to_string_pretty(self).map_err(|e| FlareError::ConfigLoad(e.to_string()))
    }

    /// Checks every section.
    ///
    /// # Errors
    ///
    /// Returns [`FlareError::InvalidConfig`] naming the first bad value.
    pub fn validate(&self) -> FlareResult<()> {
        self.orchestrator.validate()?;
        self.optimizer.validate()?;
        if self.pool.max_size == 0 || self.pool.min_size > self.pool.max_size {
            return Err(FlareError::InvalidConfig(format!(
                "pool range {}..{} is empty",
                self.pool.min_size, self.pool.max_size
            )));
        }
        if self.initial_quality_level == 0 || self.initial_quality_level > self.optimizer.quality_levels.top() {
            return Err(FlareError::InvalidConfig(format!(
                "initial_quality_level {} is not on the ladder",
                self.initial_quality_level
            )));
        }
        Ok(())
    }
}
