use flare_core::SharedRng;

use super::{radial, scaled};
use crate::effect::{EffectCore, VisualEffect};
use crate::emitter::Emitter;
use crate::registry::EffectSpawn;

/// Single radial burst of `particle_count × intensity` particles.
#[derive(Debug)]
pub struct BurstEffect {
    core: EffectCore,
    count: u32,
    color: [f32; 4],
    rng: SharedRng,
}

impl BurstEffect {
    /// Builds the recipe.
    #[must_use]
    pub fn new(spawn: EffectSpawn) -> Self {
        let count = scaled(spawn.settings.particle_count, spawn.settings.intensity);
        Self {
            core: EffectCore::new(spawn.name, spawn.id, &spawn.settings),
            count,
            color: spawn.settings.color,
            rng: spawn.rng,
        }
    }
}

impl VisualEffect for BurstEffect {
    fn core(&self) -> &EffectCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut EffectCore {
        &mut self.core
    }

    fn build_emitters(&self) -> Vec<Emitter> {
        let template = radial(&self.rng, self.color, (60.0, 180.0), (0.4, 0.9), (2.0, 5.0));
        vec![Emitter::burst("burst", template, self.count)]
    }
}
