use std::f32::consts::TAU;

use flare_core::SharedRng;

use super::{radial, scaled, tint};
use crate::config::SpinKind;
use crate::effect::{EffectCore, VisualEffect};
use crate::emitter::{Emitter, Lifespan};
use crate::registry::EffectSpawn;

/// Scale factor for a spin placement.
#[must_use]
pub const fn spin_multiplier(kind: SpinKind) -> f32 {
    match kind {
        SpinKind::None => 0.5,
        SpinKind::Mini => 1.0,
        SpinKind::Full => 2.0,
    }
}

/// Pulses per loop of the swirl.
const PULSES: f32 = 3.0;

/// Glow ring burst plus a pulsing swirl.
#[derive(Debug)]
pub struct SpinEffect {
    core: EffectCore,
    base: u32,
    multiplier: f32,
    color: [f32; 4],
    rng: SharedRng,
}

impl SpinEffect {
    /// Builds the recipe, scaled by spin kind.
    #[must_use]
    pub fn new(spawn: EffectSpawn) -> Self {
        let multiplier = spin_multiplier(spawn.params.spin) * spawn.settings.intensity;
        Self {
            core: EffectCore::new(spawn.name, spawn.id, &spawn.settings),
            base: spawn.settings.particle_count,
            multiplier,
            color: spawn.settings.color,
            rng: spawn.rng,
        }
    }
}

impl VisualEffect for SpinEffect {
    fn core(&self) -> &EffectCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut EffectCore {
        &mut self.core
    }

    fn build_emitters(&self) -> Vec<Emitter> {
        let ring = radial(&self.rng, tint(self.color, [0.7, 0.4, 1.0]), (140.0, 150.0), (0.3, 0.5), (2.0, 4.0));
        let swirl = radial(&self.rng, tint(self.color, [0.8, 0.6, 1.0]), (20.0, 60.0), (0.5, 0.9), (1.5, 3.0));

        vec![
            Emitter::burst("ring", ring, scaled(self.base, self.multiplier)),
            Emitter::continuous(
                "swirl",
                swirl,
                scaled(self.base / 2, self.multiplier) as f32,
                Lifespan::Unbounded,
            ),
        ]
    }

    fn modulate(&mut self, progress: f32) {
        let pulse = 0.6 + 0.4 * (progress * TAU * PULSES).sin().abs();
        if let Some(swirl) = self.core.emitter_mut("swirl") {
            swirl.set_intensity(pulse);
        }
    }
}
