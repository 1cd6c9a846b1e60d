use flare_core::SharedRng;

use super::{drift, radial, scaled, tint};
use crate::effect::{EffectCore, VisualEffect};
use crate::emitter::{Emitter, Lifespan};
use crate::registry::EffectSpawn;

const FADE_IN: f32 = 0.2;
const FADE_OUT: f32 = 0.3;

/// Expanding ring plus an aura that fades in, holds, then fades out.
#[derive(Debug)]
pub struct LevelUpEffect {
    core: EffectCore,
    base: u32,
    multiplier: f32,
    color: [f32; 4],
    rng: SharedRng,
}

impl LevelUpEffect {
    /// Builds the recipe; every ten levels add 100%.
    #[must_use]
    pub fn new(spawn: EffectSpawn) -> Self {
        let multiplier = (1.0 + spawn.params.level as f32 / 10.0) * spawn.settings.intensity;
        Self {
            core: EffectCore::new(spawn.name, spawn.id, &spawn.settings),
            base: spawn.settings.particle_count,
            multiplier,
            color: spawn.settings.color,
            rng: spawn.rng,
        }
    }
}

/// Aura envelope over loop progress.
fn envelope(progress: f32) -> f32 {
    let p = progress.clamp(0.0, 1.0);
    if p < FADE_IN {
        p / FADE_IN
    } else if p > 1.0 - FADE_OUT {
        (1.0 - p) / FADE_OUT
    } else {
        1.0
    }
}

impl VisualEffect for LevelUpEffect {
    fn core(&self) -> &EffectCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut EffectCore {
        &mut self.core
    }

    fn build_emitters(&self) -> Vec<Emitter> {
        let cyan = tint(self.color, [0.3, 0.9, 1.0]);
        let ring = radial(&self.rng, cyan, (250.0, 260.0), (0.5, 0.6), (3.0, 4.0));
        let aura = drift(&self.rng, cyan, [80.0, 80.0], 15.0, (0.6, 1.2));

        vec![
            Emitter::burst("ring", ring, scaled(self.base, self.multiplier)),
            Emitter::continuous(
                "aura",
                aura,
                scaled(self.base / 2, self.multiplier) as f32,
                Lifespan::Unbounded,
            ),
        ]
    }

    fn modulate(&mut self, progress: f32) {
        if let Some(aura) = self.core.emitter_mut("aura") {
            aura.set_intensity(envelope(progress));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EffectParams;
    use crate::recipes::testing::spawn;

    #[test]
    fn test_envelope() {
        assert_eq!(envelope(0.0), 0.0);
        assert!((envelope(0.1) - 0.5).abs() < 1e-5);
        assert_eq!(envelope(0.5), 1.0);
        assert!(envelope(0.95) < 0.2);
        assert!(envelope(1.0).abs() < 1e-5);
    }

    #[test]
    fn test_level_bonus() {
        let params = EffectParams { level: 10, ..Default::default() };
        let mut fx = LevelUpEffect::new(spawn("level_up", params));
        fx.initialize().unwrap();
        assert_eq!(fx.core().emitter("ring").unwrap().burst_count(), 200);

        fx.modulate(0.1);
        assert!((fx.core().emitter("aura").unwrap().intensity() - 0.5).abs() < 1e-5);
    }
}
