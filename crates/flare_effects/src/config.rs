//! Effect settings, game parameters and orchestrator configuration.
//!
//! Settings resolve in three layers: call-site overrides beat per-effect
//! settings, which beat the orchestrator defaults.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use flare_core::{FlareError, FlareResult};

use crate::emitter::Lifespan;

/// Fully resolved settings for one effect instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EffectSettings {
    /// Base particle count the recipe scales from.
    pub particle_count: u32,
    /// Duration in milliseconds. Negative means unbounded.
    pub duration_ms: i64,
    /// Restart when the duration elapses.
    pub looping: bool,
    /// Emission multiplier.
    pub intensity: f32,
    /// Base tint (RGBA).
    pub color: [f32; 4],
}

impl EffectSettings {
    /// Applies a patch on top of these settings.
    #[must_use]
    pub fn merge(&self, patch: &EffectSettingsPatch) -> Self {
        Self {
            particle_count: patch.particle_count.unwrap_or(self.particle_count),
            duration_ms: patch.duration_ms.unwrap_or(self.duration_ms),
            looping: patch.looping.unwrap_or(self.looping),
            intensity: patch.intensity.unwrap_or(self.intensity),
            color: patch.color.unwrap_or(self.color),
        }
    }

    /// Duration as a lifespan.
    #[must_use]
    pub fn lifespan(&self) -> Lifespan {
        Lifespan::from_millis(self.duration_ms)
    }
}

impl Default for EffectSettings {
    fn default() -> Self {
        Self {
            particle_count: 60,
            duration_ms: 1000,
            looping: false,
            intensity: 1.0,
            color: [1.0, 1.0, 1.0, 1.0],
        }
    }
}

/// Partial settings. Unset fields fall through to the layer below.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EffectSettingsPatch {
    /// Base particle count.
    pub particle_count: Option<u32>,
    /// Duration in milliseconds.
    pub duration_ms: Option<i64>,
    /// Looping.
    pub looping: Option<bool>,
    /// Intensity.
    pub intensity: Option<f32>,
    /// Tint.
    pub color: Option<[f32; 4]>,
}

impl EffectSettingsPatch {
    /// Sets the particle count.
    #[must_use]
    pub const fn particle_count(mut self, count: u32) -> Self {
        self.particle_count = Some(count);
        self
    }

    /// Sets the duration.
    #[must_use]
    pub const fn duration_ms(mut self, millis: i64) -> Self {
        self.duration_ms = Some(millis);
        self
    }

    /// Sets looping.
    #[must_use]
    pub const fn looping(mut self, looping: bool) -> Self {
        self.looping = Some(looping);
        self
    }

    /// Sets intensity.
    #[must_use]
    pub const fn intensity(mut self, intensity: f32) -> Self {
        self.intensity = Some(intensity);
        self
    }

    /// Sets the tint.
    #[must_use]
    pub const fn color(mut self, color: [f32; 4]) -> Self {
        self.color = Some(color);
        self
    }

    /// Layers `other` on top of `self`.
    #[must_use]
    pub fn overlay(&self, other: &Self) -> Self {
        Self {
            particle_count: other.particle_count.or(self.particle_count),
            duration_ms: other.duration_ms.or(self.duration_ms),
            looping: other.looping.or(self.looping),
            intensity: other.intensity.or(self.intensity),
            color: other.color.or(self.color),
        }
    }
}

/// Kind of rotation that completed a placement.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpinKind {
    /// Plain rotation.
    #[default]
    None,
    /// Mini spin.
    Mini,
    /// Full spin.
    Full,
}

/// Game-event parameters a recipe may read.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct EffectParams {
    /// Lines cleared (1..=4).
    pub lines: u8,
    /// Spin kind.
    pub spin: SpinKind,
    /// Score awarded.
    pub score: u64,
    /// Combo counter.
    pub combo: u32,
    /// Level reached.
    pub level: u32,
}

/// One call to `play_effect`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlayRequest {
    /// Where to play. `None` keeps each emitter's own position.
    pub position: Option<[f32; 2]>,
    /// Game parameters.
    pub params: EffectParams,
    /// Call-site setting overrides.
    pub overrides: EffectSettingsPatch,
}

impl PlayRequest {
    /// A request at a position.
    #[must_use]
    pub fn at(x: f32, y: f32) -> Self {
        Self {
            position: Some([x, y]),
            ..Self::default()
        }
    }

    /// Sets the game parameters.
    #[must_use]
    pub const fn with_params(mut self, params: EffectParams) -> Self {
        self.params = params;
        self
    }

    /// Sets the call-site overrides.
    #[must_use]
    pub fn with_overrides(mut self, overrides: EffectSettingsPatch) -> Self {
        self.overrides = overrides;
        self
    }
}

/// Orchestrator configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestratorConfig {
    /// Ceiling on live effects.
    pub max_concurrent_effects: usize,
    /// Master switch.
    pub enable_effects: bool,
    /// Overflow queue bound. Requests beyond it are dropped.
    pub max_queued_effects: usize,
    /// Time an inactive effect lingers so its particles can fade.
    pub settle_grace_ms: u32,
    /// Capacity of each typed subscriber channel.
    pub subscriber_capacity: usize,
    /// Bottom settings layer.
    pub defaults: EffectSettings,
    /// Per-effect settings, keyed by registered name.
    pub effect_settings: HashMap<String, EffectSettingsPatch>,
}

impl OrchestratorConfig {
    /// Checks limits.
    ///
    /// # Errors
    ///
    /// Returns [`FlareError::InvalidConfig`] for a zero concurrency ceiling
    /// or subscriber capacity.
    pub fn validate(&self) -> FlareResult<()> {
        if self.max_concurrent_effects == 0 {
            return Err(FlareError::InvalidConfig(
                "max_concurrent_effects must be > 0".into(),
            ));
        }
        if self.subscriber_capacity == 0 {
            return Err(FlareError::InvalidConfig("subscriber_capacity must be > 0".into()));
        }
        Ok(())
    }

    /// Resolves settings for one play call.
    #[must_use]
    pub fn resolve(&self, name: &str, overrides: &EffectSettingsPatch) -> EffectSettings {
        let layered = match self.effect_settings.get(name) {
            Some(per_effect) => self.defaults.merge(per_effect),
            None => self.defaults.clone(),
        };
        layered.merge(overrides)
    }

    /// Applies a partial update.
    pub fn apply(&mut self, patch: &OrchestratorConfigPatch) {
        if let Some(max) = patch.max_concurrent_effects {
            self.max_concurrent_effects = max;
        }
        if let Some(enabled) = patch.enable_effects {
            self.enable_effects = enabled;
        }
        if let Some(max) = patch.max_queued_effects {
            self.max_queued_effects = max;
        }
        if let Some(grace) = patch.settle_grace_ms {
            self.settle_grace_ms = grace;
        }
        if let Some(defaults) = &patch.defaults {
            self.defaults = self.defaults.merge(defaults);
        }
        for (name, settings) in &patch.effect_settings {
            let merged = self
                .effect_settings
                .get(name)
                .map_or_else(|| settings.clone(), |existing| existing.overlay(settings));
            self.effect_settings.insert(name.clone(), merged);
        }
    }
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            max_concurrent_effects: 10,
            enable_effects: true,
            max_queued_effects: 32,
            settle_grace_ms: 250,
            subscriber_capacity: 256,
            defaults: EffectSettings::default(),
            effect_settings: HashMap::new(),
        }
    }
}

/// Partial orchestrator configuration for `update_config`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestratorConfigPatch {
    /// New concurrency ceiling.
    pub max_concurrent_effects: Option<usize>,
    /// New master switch.
    pub enable_effects: Option<bool>,
    /// New queue bound.
    pub max_queued_effects: Option<usize>,
    /// New grace period.
    pub settle_grace_ms: Option<u32>,
    /// Patch for the defaults layer.
    pub defaults: Option<EffectSettingsPatch>,
    /// Per-effect patches, merged key by key.
    pub effect_settings: HashMap<String, EffectSettingsPatch>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_three_layer_precedence() {
        let mut config = OrchestratorConfig::default();
        config.effect_settings.insert(
            "burst".into(),
            EffectSettingsPatch::default().particle_count(80).duration_ms(400),
        );

        let call = EffectSettingsPatch::default().duration_ms(150);
        let resolved = config.resolve("burst", &call);

        assert_eq!(resolved.particle_count, 80);
        assert_eq!(resolved.duration_ms, 150);
        assert_eq!(resolved.intensity, 1.0);

        let other = config.resolve("spin", &EffectSettingsPatch::default());
        assert_eq!(other, EffectSettings::default());
    }

    #[test]
    fn test_apply_patch_merges_per_effect() {
        let mut config = OrchestratorConfig::default();
        config
            .effect_settings
            .insert("burst".into(), EffectSettingsPatch::default().particle_count(80));

        let mut patch = OrchestratorConfigPatch {
            max_concurrent_effects: Some(3),
            ..Default::default()
        };
        patch
            .effect_settings
            .insert("burst".into(), EffectSettingsPatch::default().looping(true));
        config.apply(&patch);

        assert_eq!(config.max_concurrent_effects, 3);
        let burst = &config.effect_settings["burst"];
        assert_eq!(burst.particle_count, Some(80));
        assert_eq!(burst.looping, Some(true));
    }

    #[test]
    fn test_validate() {
        let config = OrchestratorConfig {
            max_concurrent_effects: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
        assert!(OrchestratorConfig::default().validate().is_ok());
    }

    #[test]
    fn test_negative_duration_is_unbounded() {
        let settings = EffectSettings {
            duration_ms: -1,
            ..Default::default()
        };
        assert_eq!(settings.lifespan(), Lifespan::Unbounded);
    }
}
