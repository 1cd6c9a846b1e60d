use flare_core::SharedRng;

use super::{drift, radial, scaled, tint};
use crate::effect::{EffectCore, VisualEffect};
use crate::emitter::{Emitter, Lifespan};
use crate::registry::EffectSpawn;

/// Scale factor for a line clear.
#[must_use]
pub fn line_multiplier(lines: u8) -> f32 {
    match lines {
        0 | 1 => 1.0,
        2 => 1.5,
        3 => 2.2,
        _ => 3.0,
    }
}

/// Explosion burst, light sparks and lingering smoke.
#[derive(Debug)]
pub struct LineClearEffect {
    core: EffectCore,
    base: u32,
    multiplier: f32,
    color: [f32; 4],
    rng: SharedRng,
}

impl LineClearEffect {
    /// Builds the recipe, scaled by lines cleared.
    #[must_use]
    pub fn new(spawn: EffectSpawn) -> Self {
        let multiplier = line_multiplier(spawn.params.lines) * spawn.settings.intensity;
        Self {
            core: EffectCore::new(spawn.name, spawn.id, &spawn.settings),
            base: spawn.settings.particle_count,
            multiplier,
            color: spawn.settings.color,
            rng: spawn.rng,
        }
    }

    /// Scale factor in use.
    #[must_use]
    pub const fn multiplier(&self) -> f32 {
        self.multiplier
    }
}

impl VisualEffect for LineClearEffect {
    fn core(&self) -> &EffectCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut EffectCore {
        &mut self.core
    }

    fn build_emitters(&self) -> Vec<Emitter> {
        let explosion = radial(
            &self.rng,
            tint(self.color, [1.0, 0.7, 0.3]),
            (120.0, 320.0),
            (0.3, 0.7),
            (3.0, 6.0),
        );
        let sparks = radial(&self.rng, self.color, (200.0, 420.0), (0.2, 0.5), (1.0, 2.0));
        let smoke = drift(&self.rng, tint(self.color, [0.5, 0.5, 0.5]), [60.0, 8.0], 30.0, (0.8, 1.4));

        vec![
            Emitter::burst("explosion", explosion, scaled(self.base, self.multiplier)),
            Emitter::burst("sparks", sparks, scaled(self.base / 2, self.multiplier)),
            Emitter::continuous(
                "smoke",
                smoke,
                scaled(self.base / 4, self.multiplier) as f32,
                Lifespan::Unbounded,
            ),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EffectParams;
    use crate::emitter::EmissionMode;
    use crate::recipes::testing::spawn;

    #[test]
    fn test_line_multipliers() {
        assert_eq!(line_multiplier(1), 1.0);
        assert_eq!(line_multiplier(2), 1.5);
        assert_eq!(line_multiplier(3), 2.2);
        assert_eq!(line_multiplier(4), 3.0);
    }

    #[test]
    fn test_tetris_scales_sub_bursts() {
        let params = EffectParams { lines: 4, ..Default::default() };
        let mut fx = LineClearEffect::new(spawn("tetris", params));
        fx.initialize().unwrap();

        let core = fx.core();
        assert_eq!(core.emitters().len(), 3);
        assert_eq!(core.emitter("explosion").unwrap().burst_count(), 300);
        assert_eq!(core.emitter("sparks").unwrap().burst_count(), 150);
        let smoke = core.emitter("smoke").unwrap();
        assert_eq!(smoke.mode(), EmissionMode::Continuous);
        assert_eq!(smoke.rate(), 75.0);
    }
}
