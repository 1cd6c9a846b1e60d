use flare_core::SharedRng;

use super::{scaled, tint};
use crate::effect::{EffectCore, VisualEffect};
use crate::emitter::Emitter;
use crate::registry::EffectSpawn;
use crate::template::{Param, ParticleTemplate};

/// Short dust puff where a piece lands.
#[derive(Debug)]
pub struct HardDropEffect {
    core: EffectCore,
    count: u32,
    color: [f32; 4],
    rng: SharedRng,
}

impl HardDropEffect {
    /// Builds the recipe.
    #[must_use]
    pub fn new(spawn: EffectSpawn) -> Self {
        let count = scaled(spawn.settings.particle_count / 2, spawn.settings.intensity);
        Self {
            core: EffectCore::new(spawn.name, spawn.id, &spawn.settings),
            count,
            color: spawn.settings.color,
            rng: spawn.rng,
        }
    }
}

impl VisualEffect for HardDropEffect {
    fn core(&self) -> &EffectCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut EffectCore {
        &mut self.core
    }

    fn build_emitters(&self) -> Vec<Emitter> {
        let kick = self.rng.clone();
        let dust = ParticleTemplate {
            offset: Param::scatter(&self.rng, [40.0, 2.0]),
            velocity: Param::sampled(move || [kick.range(-80.0, 80.0), kick.range(-90.0, -30.0)]),
            life: Param::uniform(&self.rng, 0.2, 0.4),
            size: Param::uniform(&self.rng, 2.0, 4.0),
            color: tint(self.color, [0.8, 0.8, 0.8]).into(),
            gravity: 300.0.into(),
            friction: 2.0.into(),
            ..ParticleTemplate::default()
        };
        vec![Emitter::burst("dust", dust, self.count)]
    }
}
