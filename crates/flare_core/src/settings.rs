//! Shared render settings and the quality ladder.
//!
//! The optimizers write these knobs; the orchestrator and the renderer read
//! them on the next frame. Locks are held for one call at a time only.

use std::sync::Arc;

use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use serde::{Deserialize, Serialize};

use crate::error::{FlareError, FlareResult};

/// One rung of the quality ladder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualityPreset {
    /// Particle budget.
    pub max_particles: usize,
    /// LOD culling on/off.
    pub enable_lod: bool,
    /// Particles per draw batch.
    pub batch_size: usize,
    /// Frame rate this preset is tuned for.
    pub target_fps: u32,
}

/// Ordered presets. Level 1 is the lowest, `len()` the highest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QualityLadder {
    presets: Vec<QualityPreset>,
}

impl QualityLadder {
    /// Builds a ladder from lowest to highest preset.
    ///
    /// # Errors
    ///
    /// Returns [`FlareError::InvalidConfig`] for an empty ladder, one with
    /// more than 255 rungs, or a rung with a zero target fps.
    pub fn new(presets: Vec<QualityPreset>) -> FlareResult<Self> {
        let ladder = Self { presets };
        ladder.validate()?;
        Ok(ladder)
    }

    /// Checks the ladder after deserialization.
    ///
    /// # Errors
    ///
    /// See [`QualityLadder::new`].
    pub fn validate(&self) -> FlareResult<()> {
        if self.presets.is_empty() {
            return Err(FlareError::InvalidConfig("quality ladder is empty".into()));
        }
        if self.presets.len() > usize::from(u8::MAX) {
            return Err(FlareError::InvalidConfig("quality ladder has too many levels".into()));
        }
        if self.presets.iter().any(|p| p.target_fps == 0) {
            return Err(FlareError::InvalidConfig("quality preset target_fps must be > 0".into()));
        }
        Ok(())
    }

    /// Highest level.
    #[must_use]
    pub fn top(&self) -> u8 {
        self.presets.len() as u8
    }

    /// Preset for a level (1-based).
    #[must_use]
    pub fn preset(&self, level: u8) -> Option<&QualityPreset> {
        let index = usize::from(level).checked_sub(1)?;
        self.presets.get(index)
    }

    /// Clamps a level onto the ladder.
    #[must_use]
    pub fn clamp(&self, level: u8) -> u8 {
        level.clamp(1, self.top())
    }
}

impl Default for QualityLadder {
    fn default() -> Self {
        Self {
            presets: vec![
                QualityPreset { max_particles: 250, enable_lod: true, batch_size: 400, target_fps: 30 },
                QualityPreset { max_particles: 500, enable_lod: true, batch_size: 200, target_fps: 45 },
                QualityPreset { max_particles: 1000, enable_lod: false, batch_size: 100, target_fps: 60 },
                QualityPreset { max_particles: 2000, enable_lod: false, batch_size: 100, target_fps: 60 },
                QualityPreset { max_particles: 4000, enable_lod: false, batch_size: 50, target_fps: 60 },
            ],
        }
    }
}

/// Knobs read by the orchestrator and renderer every frame.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderSettings {
    /// Global particle budget.
    pub max_particles: usize,
    /// Current rung on the quality ladder.
    pub quality_level: u8,
    /// LOD culling on/off.
    pub enable_lod: bool,
    /// Particles per draw batch.
    pub batch_size: usize,
    /// Frame rate the current ladder level is tuned for.
    pub target_fps: f32,
    /// Continuous quality scalar applied to emission.
    pub quality_scalar: f32,
    /// Buffer notifications and deliver them in one flush.
    pub notification_batching: bool,
    /// Delay before a batched flush.
    pub notification_batch_ms: u64,
    /// Frames the renderer was told to skip.
    pub frames_skipped: u64,
}

impl RenderSettings {
    /// Settings matching one ladder level.
    #[must_use]
    pub fn from_ladder(ladder: &QualityLadder, level: u8) -> Self {
        let level = ladder.clamp(level);
        let mut settings = Self {
            quality_level: 0,
            ..Self::default()
        };
        if let Some(preset) = ladder.preset(level) {
            settings.apply_preset(level, preset);
        }
        settings
    }

    /// Switches to a ladder level. Returns false when already there.
    pub fn apply_preset(&mut self, level: u8, preset: &QualityPreset) -> bool {
        if self.quality_level == level {
            return false;
        }
        self.quality_level = level;
        self.max_particles = preset.max_particles;
        self.enable_lod = preset.enable_lod;
        self.batch_size = preset.batch_size;
        self.target_fps = preset.target_fps as f32;
        true
    }

    /// Frame rate the optimizers should hold: the level's target, never
    /// above `ceiling`.
    #[must_use]
    pub fn effective_target_fps(&self, ceiling: f32) -> f32 {
        if self.target_fps > 0.0 {
            self.target_fps.min(ceiling)
        } else {
            ceiling
        }
    }
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            max_particles: 1000,
            quality_level: 3,
            enable_lod: false,
            batch_size: 100,
            target_fps: 60.0,
            quality_scalar: 1.0,
            notification_batching: false,
            notification_batch_ms: 16,
            frames_skipped: 0,
        }
    }
}

/// Settings shared between the engine and its optimizers.
#[derive(Debug, Clone, Default)]
pub struct SharedSettings {
    inner: Arc<RwLock<RenderSettings>>,
}

impl SharedSettings {
    /// Wraps settings in a shared handle.
    #[must_use]
    pub fn new(settings: RenderSettings) -> Self {
        Self {
            inner: Arc::new(RwLock::new(settings)),
        }
    }

    /// Read access.
    pub fn read(&self) -> RwLockReadGuard<'_, RenderSettings> {
        self.inner.read()
    }

    /// Write access.
    pub fn write(&self) -> RwLockWriteGuard<'_, RenderSettings> {
        self.inner.write()
    }

    /// Copy of the current settings.
    #[must_use]
    pub fn snapshot(&self) -> RenderSettings {
        self.inner.read().clone()
    }

    /// Moves to a ladder level. Idempotent: a repeat call changes nothing.
    pub fn set_quality_level(&self, ladder: &QualityLadder, level: u8) -> bool {
        let level = ladder.clamp(level);
        let Some(preset) = ladder.preset(level) else {
            return false;
        };
        let changed = self.inner.write().apply_preset(level, preset);
        if changed {
            tracing::info!("Quality level -> {} ({} particles)", level, preset.max_particles);
        }
        changed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_ladder() {
        let ladder = QualityLadder::default();
        assert_eq!(ladder.top(), 5);
        assert!(ladder.preset(0).is_none());
        assert_eq!(ladder.preset(1).unwrap().max_particles, 250);
        assert_eq!(ladder.clamp(9), 5);
        assert_eq!(ladder.clamp(0), 1);
    }

    #[test]
    fn test_empty_ladder_rejected() {
        assert!(QualityLadder::new(Vec::new()).is_err());
        let zero = QualityPreset { max_particles: 10, enable_lod: true, batch_size: 10, target_fps: 0 };
        assert!(QualityLadder::new(vec![zero]).is_err());
    }

    #[test]
    fn test_effective_target_follows_level() {
        let ladder = QualityLadder::default();
        let mut settings = RenderSettings::from_ladder(&ladder, 1);
        assert!((settings.effective_target_fps(60.0) - 30.0).abs() < f32::EPSILON);

        settings.target_fps = 60.0;
        assert!((settings.effective_target_fps(50.0) - 50.0).abs() < f32::EPSILON);
        settings.target_fps = 0.0;
        assert!((settings.effective_target_fps(50.0) - 50.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_set_quality_level_idempotent() {
        let ladder = QualityLadder::default();
        let shared = SharedSettings::new(RenderSettings::from_ladder(&ladder, 3));

        assert!(shared.set_quality_level(&ladder, 2));
        let after_first = shared.snapshot();
        assert!((after_first.target_fps - 45.0).abs() < f32::EPSILON);
        assert!(!shared.set_quality_level(&ladder, 2));
        assert_eq!(shared.snapshot(), after_first);

        assert_eq!(after_first.quality_level, 2);
        assert_eq!(after_first.max_particles, 500);
        assert!(after_first.enable_lod);
    }

    #[test]
    fn test_from_ladder_applies_preset() {
        let ladder = QualityLadder::default();
        let settings = RenderSettings::from_ladder(&ladder, 5);
        assert_eq!(settings.quality_level, 5);
        assert_eq!(settings.max_particles, 4000);
        assert_eq!(settings.batch_size, 50);
    }
}
