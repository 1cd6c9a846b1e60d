//! Seeded randomness for particle variation.
//!
//! Same seed = same particles, ALWAYS. Template samplers capture a
//! [`SharedRng`] instead of reaching for thread-local entropy.

use std::sync::Arc;

use parking_lot::Mutex;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Cloneable handle to one seeded generator.
#[derive(Clone)]
pub struct SharedRng {
    inner: Arc<Mutex<ChaCha8Rng>>,
}

impl SharedRng {
    /// Creates a generator from a seed.
    #[must_use]
    pub fn seeded(seed: u64) -> Self {
        Self {
            inner: Arc::new(Mutex::new(ChaCha8Rng::seed_from_u64(seed))),
        }
    }

    /// Uniform sample in `[lo, hi)`. Returns `lo` for an empty range.
    pub fn range(&self, lo: f32, hi: f32) -> f32 {
        if hi <= lo {
            return lo;
        }
        self.inner.lock().gen_range(lo..hi)
    }

    /// Uniform sample in `[0, 1)`.
    pub fn unit(&self) -> f32 {
        self.inner.lock().gen::<f32>()
    }

    /// Uniform angle in radians.
    pub fn angle(&self) -> f32 {
        self.range(0.0, std::f32::consts::TAU)
    }

    /// Velocity vector with random heading and speed in `[lo, hi)`.
    pub fn radial(&self, lo: f32, hi: f32) -> [f32; 2] {
        let angle = self.angle();
        let speed = self.range(lo, hi);
        [angle.cos() * speed, angle.sin() * speed]
    }
}

impl std::fmt::Debug for SharedRng {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedRng").finish_non_exhaustive()
    }
}

impl Default for SharedRng {
    fn default() -> Self {
        Self::seeded(0x5EED)
    }
}
