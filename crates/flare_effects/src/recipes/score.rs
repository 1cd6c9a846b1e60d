use flare_core::SharedRng;

use super::{drift, radial, scaled, tint};
use crate::config::EffectParams;
use crate::effect::{EffectCore, VisualEffect};
use crate::emitter::{Emitter, Lifespan};
use crate::registry::EffectSpawn;

/// `1 + log10(score) + combo × 0.25`.
#[must_use]
pub fn score_multiplier(params: &EffectParams) -> f32 {
    let score = params.score.max(1) as f32;
    1.0 + score.log10() + params.combo as f32 * 0.25
}

/// Sparkle burst plus falling glitter.
#[derive(Debug)]
pub struct ScoreEffect {
    core: EffectCore,
    base: u32,
    multiplier: f32,
    color: [f32; 4],
    rng: SharedRng,
}

impl ScoreEffect {
    /// Builds the recipe, scaled by score and combo.
    #[must_use]
    pub fn new(spawn: EffectSpawn) -> Self {
        let multiplier = score_multiplier(&spawn.params) * spawn.settings.intensity;
        Self {
            core: EffectCore::new(spawn.name, spawn.id, &spawn.settings),
            base: spawn.settings.particle_count,
            multiplier,
            color: spawn.settings.color,
            rng: spawn.rng,
        }
    }
}

impl VisualEffect for ScoreEffect {
    fn core(&self) -> &EffectCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut EffectCore {
        &mut self.core
    }

    fn build_emitters(&self) -> Vec<Emitter> {
        let gold = tint(self.color, [1.0, 0.85, 0.2]);
        let sparkle = radial(&self.rng, gold, (80.0, 200.0), (0.4, 0.8), (1.5, 3.5));
        let mut glitter = drift(&self.rng, gold, [40.0, 10.0], -40.0, (0.6, 1.0));
        glitter.gravity = 90.0.into();

        vec![
            Emitter::burst("sparkle", sparkle, scaled(self.base / 2, self.multiplier)),
            Emitter::continuous(
                "glitter",
                glitter,
                scaled(self.base / 4, self.multiplier) as f32,
                Lifespan::Unbounded,
            ),
        ]
    }
}
