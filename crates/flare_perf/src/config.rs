//! Optimizer configuration.

use serde::{Deserialize, Serialize};

use flare_core::{FlareError, FlareResult, QualityLadder};

/// Continuous quality controller settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdaptiveQualityConfig {
    /// Lowest scalar.
    pub min_quality: f32,
    /// Highest scalar.
    pub max_quality: f32,
    /// Change per adjustment.
    pub step: f32,
    /// Smaller changes are not applied.
    pub hysteresis: f32,
    /// Weight of the newest frame-time ratio (0..1).
    pub smoothing: f32,
    /// Ratio above which quality goes down.
    pub decrease_above: f32,
    /// Ratio below which quality goes up.
    pub increase_below: f32,
}

impl Default for AdaptiveQualityConfig {
    fn default() -> Self {
        Self {
            min_quality: 0.25,
            max_quality: 1.0,
            step: 0.05,
            hysteresis: 0.02,
            smoothing: 0.25,
            decrease_above: 1.2,
            increase_below: 0.8,
        }
    }
}

/// Optimizer and coordinator configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizerConfig {
    /// Frame rate to hold.
    pub target_fps: f32,
    /// Memory fraction above which memory rules fire.
    pub memory_threshold: f32,
    /// Quality presets, lowest first.
    pub quality_levels: QualityLadder,
    /// Run coordinator passes on `tick`.
    pub enable_auto_optimization: bool,
    /// Minimum time between coordinator passes.
    pub optimization_interval_ms: u64,
    /// Reports kept in the coordinator history.
    pub history_capacity: usize,
    /// Floor for the particle budget.
    pub min_particles: usize,
    /// Live particle count above which LOD turns on.
    pub lod_particle_threshold: usize,
    /// Ceiling for the draw batch size.
    pub max_batch_size: usize,
    /// Floor for the pool ceiling.
    pub min_pool_size: usize,
    /// Notifications per second above which batching turns on.
    pub event_rate_threshold: f32,
    /// Buffered notifications above which the batch delay grows.
    pub pending_threshold: usize,
    /// Ceiling for the batch delay.
    pub max_batch_delay_ms: u64,
    /// Frames in a row the renderer may skip.
    pub max_consecutive_skips: u32,
    /// Frame skipping on/off.
    pub enable_frame_skip: bool,
    /// Continuous quality controller.
    pub adaptive: AdaptiveQualityConfig,
}

impl OptimizerConfig {
    /// Checks ranges.
    ///
    /// # Errors
    ///
    /// Returns [`FlareError::InvalidConfig`] naming the first bad field.
    pub fn validate(&self) -> FlareResult<()> {
        let invalid = |msg: &str| Err(FlareError::InvalidConfig(msg.into()));

        if !(self.target_fps > 0.0) {
            return invalid("target_fps must be > 0");
        }
        if !(self.memory_threshold > 0.0 && self.memory_threshold <= 1.0) {
            return invalid("memory_threshold must be in (0, 1]");
        }
        if self.history_capacity == 0 {
            return invalid("history_capacity must be > 0");
        }
        let adaptive = &self.adaptive;
        if !(adaptive.min_quality > 0.0 && adaptive.min_quality <= adaptive.max_quality) {
            return invalid("adaptive quality range is empty");
        }
        if !(adaptive.step > 0.0) || !(0.0..=1.0).contains(&adaptive.smoothing) {
            return invalid("adaptive step must be > 0 and smoothing in [0, 1]");
        }
        if adaptive.increase_below >= adaptive.decrease_above {
            return invalid("adaptive band is inverted");
        }
        self.quality_levels.validate()
    }
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            target_fps: 60.0,
            memory_threshold: 0.8,
            quality_levels: QualityLadder::default(),
            enable_auto_optimization: true,
            optimization_interval_ms: 1000,
            history_capacity: 50,
            min_particles: 100,
            lod_particle_threshold: 800,
            max_batch_size: 800,
            min_pool_size: 64,
            event_rate_threshold: 120.0,
            pending_threshold: 64,
            max_batch_delay_ms: 128,
            max_consecutive_skips: 2,
            enable_frame_skip: true,
            adaptive: AdaptiveQualityConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_valid() {
        assert!(OptimizerConfig::default().validate().is_ok());
    }

    #[test]
    fn test_rejects_bad_values() {
        let config = OptimizerConfig {
            target_fps: 0.0,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = OptimizerConfig {
            memory_threshold: 1.5,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let mut config = OptimizerConfig::default();
        config.adaptive.min_quality = 2.0;
        assert!(config.validate().is_err());
    }
}
