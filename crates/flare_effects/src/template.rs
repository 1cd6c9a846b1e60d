//! Particle templates.
//!
//! Every template field is either a literal or a zero-argument sampler
//! evaluated once per stamped particle.

use std::fmt;
use std::sync::Arc;

use flare_core::{Particle, SharedRng};

/// A template field: fixed value or per-particle sample.
pub enum Param<T> {
    /// Same value for every particle.
    Literal(T),
    /// Evaluated for every particle.
    Sampled(Arc<dyn Fn() -> T + Send + Sync>),
}

impl<T: Copy> Param<T> {
    /// Wraps a sampler.
    pub fn sampled<F>(f: F) -> Self
    where
        F: Fn() -> T + Send + Sync + 'static,
    {
        Self::Sampled(Arc::new(f))
    }

    /// Produces the value for one particle.
    #[inline]
    pub fn sample(&self) -> T {
        match self {
            Self::Literal(value) => *value,
            Self::Sampled(f) => f(),
        }
    }

    /// True for literal fields.
    #[must_use]
    pub const fn is_literal(&self) -> bool {
        matches!(self, Self::Literal(_))
    }
}

impl Param<f32> {
    /// Uniform in `[lo, hi)` from a seeded generator.
    #[must_use]
    pub fn uniform(rng: &SharedRng, lo: f32, hi: f32) -> Self {
        let rng = rng.clone();
        Self::sampled(move || rng.range(lo, hi))
    }
}

impl Param<[f32; 2]> {
    /// Random heading with speed in `[lo, hi)`.
    #[must_use]
    pub fn radial(rng: &SharedRng, lo: f32, hi: f32) -> Self {
        let rng = rng.clone();
        Self::sampled(move || rng.radial(lo, hi))
    }

    /// Uniform point in an axis-aligned box of half-extent `spread`.
    #[must_use]
    pub fn scatter(rng: &SharedRng, spread: [f32; 2]) -> Self {
        let rng = rng.clone();
        Self::sampled(move || {
            [
                rng.range(-spread[0], spread[0]),
                rng.range(-spread[1], spread[1]),
            ]
        })
    }
}

impl<T> Clone for Param<T>
where
    T: Copy,
{
    fn clone(&self) -> Self {
        match self {
            Self::Literal(value) => Self::Literal(*value),
            Self::Sampled(f) => Self::Sampled(Arc::clone(f)),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Param<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Literal(value) => f.debug_tuple("Literal").field(value).finish(),
            Self::Sampled(_) => f.write_str("Sampled(..)"),
        }
    }
}

impl<T> From<T> for Param<T> {
    fn from(value: T) -> Self {
        Self::Literal(value)
    }
}

/// Fields stamped onto each particle an emitter produces.
#[derive(Debug, Clone)]
pub struct ParticleTemplate {
    /// Offset from the emitter position.
    pub offset: Param<[f32; 2]>,
    /// Initial velocity.
    pub velocity: Param<[f32; 2]>,
    /// Size.
    pub size: Param<f32>,
    /// Color (RGBA).
    pub color: Param<[f32; 4]>,
    /// Initial rotation in radians.
    pub rotation: Param<f32>,
    /// Lifetime in seconds.
    pub life: Param<f32>,
    /// Base opacity.
    pub alpha: Param<f32>,
    /// Vertical acceleration.
    pub gravity: Param<f32>,
    /// Velocity damping per second.
    pub friction: Param<f32>,
}

/// Lifetimes below this are bumped up so a fresh particle is always alive.
const MIN_LIFE: f32 = 0.01;

impl ParticleTemplate {
    /// Writes sampled fields into a pooled particle.
    pub fn stamp(&self, particle: &mut Particle, origin: [f32; 2]) {
        let offset = self.offset.sample();
        let life = self.life.sample().max(MIN_LIFE);

        particle.position = [origin[0] + offset[0], origin[1] + offset[1]];
        particle.velocity = self.velocity.sample();
        particle.size = self.size.sample().max(0.0);
        particle.color = self.color.sample();
        particle.rotation = self.rotation.sample();
        particle.life = life;
        particle.max_life = life;
        particle.alpha = self.alpha.sample().clamp(0.0, 1.0);
        particle.gravity = self.gravity.sample();
        particle.friction = self.friction.sample().max(0.0);
    }
}

impl Default for ParticleTemplate {
    fn default() -> Self {
        Self {
            offset: Param::Literal([0.0, 0.0]),
            velocity: Param::Literal([0.0, 0.0]),
            size: Param::Literal(4.0),
            color: Param::Literal([1.0, 1.0, 1.0, 1.0]),
            rotation: Param::Literal(0.0),
            life: Param::Literal(1.0),
            alpha: Param::Literal(1.0),
            gravity: Param::Literal(0.0),
            friction: Param::Literal(0.0),
        }
    }
}
