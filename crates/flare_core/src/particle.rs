//! Pooled particle record.
//!
//! A particle is owned by exactly one emitter between `acquire` and
//! `release`. The pool hands it out by value and takes it back by value,
//! so a released particle cannot be touched again.

/// A single 2D particle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Particle {
    /// Position in surface space.
    pub position: [f32; 2],
    /// Velocity in units per second.
    pub velocity: [f32; 2],
    /// Render size.
    pub size: f32,
    /// Color (RGBA).
    pub color: [f32; 4],
    /// Rotation in radians.
    pub rotation: f32,
    /// Remaining life in seconds.
    pub life: f32,
    /// Life at spawn, in seconds.
    pub max_life: f32,
    /// Base opacity, faded by remaining life at render time.
    pub alpha: f32,
    /// Vertical acceleration (positive = down on screen).
    pub gravity: f32,
    /// Velocity damping per second (0 = none).
    pub friction: f32,
}

impl Particle {
    /// Size of a particle in bytes.
    pub const SIZE: usize = std::mem::size_of::<Self>();

    /// Creates a dead particle (used for pool construction and reset).
    #[must_use]
    pub const fn dead() -> Self {
        Self {
            position: [0.0; 2],
            velocity: [0.0; 2],
            size: 0.0,
            color: [1.0, 1.0, 1.0, 1.0],
            rotation: 0.0,
            life: 0.0,
            max_life: 0.0,
            alpha: 1.0,
            gravity: 0.0,
            friction: 0.0,
        }
    }

    /// Resets to the dead state. This is the pool's reset function.
    pub fn reset(&mut self) {
        *self = Self::dead();
    }

    /// Is this particle alive?
    #[inline]
    #[must_use]
    pub fn is_alive(&self) -> bool {
        self.life > 0.0
    }

    /// Remaining life as a fraction of max life (0 when dead).
    #[inline]
    #[must_use]
    pub fn life_ratio(&self) -> f32 {
        if self.max_life > 0.0 {
            (self.life / self.max_life).clamp(0.0, 1.0)
        } else {
            0.0
        }
    }

    /// Opacity after life fade.
    #[inline]
    #[must_use]
    pub fn faded_alpha(&self) -> f32 {
        self.alpha * self.life_ratio()
    }

    /// Integrates one step, returns true while still alive.
    pub fn step(&mut self, dt: f32) -> bool {
        self.velocity[1] += self.gravity * dt;

        let damping = (1.0 - self.friction * dt).clamp(0.0, 1.0);
        self.velocity[0] *= damping;
        self.velocity[1] *= damping;

        self.position[0] += self.velocity[0] * dt;
        self.position[1] += self.velocity[1] * dt;
        self.life -= dt;

        self.is_alive()
    }
}

impl Default for Particle {
    fn default() -> Self {
        Self::dead()
    }
}
