//! # Effect Recipes
//!
//! The only place game meaning enters the engine. Each recipe composes
//! emitters from a base particle count and scales them by event
//! parameters (lines cleared, spin kind, score, level).

mod burst;
mod hard_drop;
mod level_up;
mod line_clear;
mod perfect_clear;
mod score;
mod spin;

pub use burst::BurstEffect;
pub use hard_drop::HardDropEffect;
pub use level_up::LevelUpEffect;
pub use line_clear::{line_multiplier, LineClearEffect};
pub use perfect_clear::PerfectClearEffect;
pub use score::{score_multiplier, ScoreEffect};
pub use spin::{spin_multiplier, SpinEffect};

use flare_core::{FlareResult, SharedRng};

use crate::registry::{factory, EffectRegistry};
use crate::template::{Param, ParticleTemplate};

/// Registers every built-in recipe.
///
/// # Errors
///
/// Propagates registry errors.
pub fn register_builtin(registry: &mut EffectRegistry) -> FlareResult<()> {
    registry.register("burst", factory(BurstEffect::new))?;

    let line_clear = factory(LineClearEffect::new);
    registry.register("line_clear", line_clear.clone())?;
    registry.register("tetris", line_clear)?;

    registry.register("spin", factory(SpinEffect::new))?;

    let score = factory(ScoreEffect::new);
    registry.register("score", score.clone())?;
    registry.register("combo", score)?;

    registry.register("level_up", factory(LevelUpEffect::new))?;
    registry.register("perfect_clear", factory(PerfectClearEffect::new))?;
    registry.register("hard_drop", factory(HardDropEffect::new))?;
    Ok(())
}

/// `base × factor`, rounded, at least 1.
pub(crate) fn scaled(base: u32, factor: f32) -> u32 {
    let factor = if factor.is_finite() { factor.max(0.0) } else { 1.0 };
    (base as f32 * factor).round().max(1.0) as u32
}

/// Multiplies RGB channels, keeps alpha.
pub(crate) fn tint(color: [f32; 4], rgb: [f32; 3]) -> [f32; 4] {
    [color[0] * rgb[0], color[1] * rgb[1], color[2] * rgb[2], color[3]]
}

/// Radial spray: random heading, speed/life/size drawn from ranges.
pub(crate) fn radial(
    rng: &SharedRng,
    color: [f32; 4],
    speed: (f32, f32),
    life: (f32, f32),
    size: (f32, f32),
) -> ParticleTemplate {
    let spin = rng.clone();
    ParticleTemplate {
        velocity: Param::radial(rng, speed.0, speed.1),
        life: Param::uniform(rng, life.0, life.1),
        size: Param::uniform(rng, size.0, size.1),
        rotation: Param::sampled(move || spin.angle()),
        color: color.into(),
        friction: 1.5.into(),
        ..ParticleTemplate::default()
    }
}

/// Slow drifting particles spread around the origin.
pub(crate) fn drift(
    rng: &SharedRng,
    color: [f32; 4],
    spread: [f32; 2],
    rise: f32,
    life: (f32, f32),
) -> ParticleTemplate {
    let wobble = rng.clone();
    ParticleTemplate {
        offset: Param::scatter(rng, spread),
        velocity: Param::sampled(move || [wobble.range(-10.0, 10.0), -rise]),
        life: Param::uniform(rng, life.0, life.1),
        size: Param::uniform(rng, 3.0, 7.0),
        color: color.into(),
        alpha: 0.6.into(),
        friction: 0.5.into(),
        ..ParticleTemplate::default()
    }
}
