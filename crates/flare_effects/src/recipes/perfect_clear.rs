use flare_core::SharedRng;

use super::{drift, radial, scaled, tint};
use crate::effect::{EffectCore, VisualEffect};
use crate::emitter::{Emitter, Lifespan};
use crate::registry::EffectSpawn;

const MULTIPLIER: f32 = 4.0;

/// Gold burst, white sparks and a long glow.
#[derive(Debug)]
pub struct PerfectClearEffect {
    core: EffectCore,
    base: u32,
    intensity: f32,
    color: [f32; 4],
    rng: SharedRng,
}

impl PerfectClearEffect {
    /// Builds the recipe.
    #[must_use]
    pub fn new(spawn: EffectSpawn) -> Self {
        Self {
            core: EffectCore::new(spawn.name, spawn.id, &spawn.settings),
            base: spawn.settings.particle_count,
            intensity: spawn.settings.intensity,
            color: spawn.settings.color,
            rng: spawn.rng,
        }
    }
}

impl VisualEffect for PerfectClearEffect {
    fn core(&self) -> &EffectCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut EffectCore {
        &mut self.core
    }

    fn build_emitters(&self) -> Vec<Emitter> {
        let factor = MULTIPLIER * self.intensity;
        let gold = radial(&self.rng, tint(self.color, [1.0, 0.8, 0.1]), (150.0, 400.0), (0.6, 1.2), (3.0, 7.0));
        let sparks = radial(&self.rng, self.color, (250.0, 500.0), (0.3, 0.6), (1.0, 2.0));
        let glow = drift(&self.rng, tint(self.color, [1.0, 0.95, 0.7]), [120.0, 60.0], 10.0, (1.5, 2.5));

        vec![
            Emitter::burst("gold", gold, scaled(self.base, factor)),
            Emitter::burst("sparks", sparks, scaled(self.base / 2, factor)),
            Emitter::continuous("glow", glow, scaled(self.base / 4, factor) as f32, Lifespan::Unbounded),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EffectParams;
    use crate::recipes::testing::spawn;

    #[test]
    fn test_fixed_multiplier() {
        let mut fx = PerfectClearEffect::new(spawn("perfect_clear", EffectParams::default()));
        fx.initialize().unwrap();
        assert_eq!(fx.core().emitter("gold").unwrap().burst_count(), 400);
        assert_eq!(fx.core().emitter("sparks").unwrap().burst_count(), 200);
        assert_eq!(fx.core().emitter("glow").unwrap().rate(), 100.0);
    }
}
