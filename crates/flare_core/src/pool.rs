//! # Object Pool
//!
//! Recycling cache for objects that are acquired and released every frame.
//!
//! Unlike a fixed-slot allocator, this pool never refuses: past its ceiling
//! it constructs fresh objects and logs a saturation warning once. The
//! ceiling bounds the *free list*, so memory held by idle objects is capped
//! while bursts above the ceiling still succeed.

use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::error::{FlareError, FlareResult};
use crate::particle::Particle;

/// Floor and ceiling for a pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    /// Objects pre-built at construction and kept through `cleanup`.
    pub min_size: usize,
    /// Maximum length of the free list.
    pub max_size: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            min_size: 64,
            max_size: 2048,
        }
    }
}

/// Snapshot of pool counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolStats {
    /// Objects waiting on the free list.
    pub free: usize,
    /// Objects currently acquired.
    pub live: usize,
    /// Objects ever constructed.
    pub created: u64,
    /// Objects dropped because the free list was full or trimmed.
    pub discarded: u64,
    /// Highest live count observed.
    pub peak_live: usize,
    /// Current floor.
    pub min_size: usize,
    /// Current ceiling.
    pub max_size: usize,
}

/// A recycling object pool.
///
/// # Thread Safety
///
/// This pool is NOT synchronized. Share it through [`SharedPool`] when the
/// optimizers need to reach it.
pub struct ObjectPool<T> {
    /// Idle objects, ready to hand out.
    free: Vec<T>,
    /// Builds a fresh object when the free list is empty.
    factory: Box<dyn Fn() -> T + Send>,
    /// Returns a released object to a clean state.
    reset: Box<dyn Fn(&mut T) + Send>,
    /// Floor kept through `cleanup`.
    min_size: usize,
    /// Ceiling on the free list.
    max_size: usize,
    /// Objects currently out.
    live: usize,
    /// Lifetime construction count.
    created: u64,
    /// Lifetime discard count.
    discarded: u64,
    /// Highest live count.
    peak_live: usize,
    /// Saturation warning already logged for this episode.
    saturation_warned: bool,
}

/// Pool shared between the orchestrator and the optimizers.
pub type SharedPool<T> = Arc<Mutex<ObjectPool<T>>>;

/// The particle pool.
pub type ParticlePool = ObjectPool<Particle>;

/// Shared handle to the particle pool.
pub type SharedParticlePool = SharedPool<Particle>;

impl<T> ObjectPool<T> {
    /// Creates a pool and pre-builds `min_size` objects.
    ///
    /// # Errors
    ///
    /// Returns [`FlareError::InvalidConfig`] if the floor exceeds the ceiling
    /// or the ceiling is zero.
    pub fn new<F, R>(config: PoolConfig, factory: F, reset: R) -> FlareResult<Self>
    where
        F: Fn() -> T + Send + 'static,
        R: Fn(&mut T) + Send + 'static,
    {
        if config.max_size == 0 {
            return Err(FlareError::InvalidConfig("pool max_size must be > 0".into()));
        }
        if config.min_size > config.max_size {
            return Err(FlareError::InvalidConfig(format!(
                "pool min_size {} exceeds max_size {}",
                config.min_size, config.max_size
            )));
        }

        let free: Vec<T> = (0..config.min_size).map(|_| factory()).collect();

        Ok(Self {
            free,
            factory: Box::new(factory),
            reset: Box::new(reset),
            min_size: config.min_size,
            max_size: config.max_size,
            live: 0,
            created: config.min_size as u64,
            discarded: 0,
            peak_live: 0,
            saturation_warned: false,
        })
    }

    /// Wraps the pool in a shared handle.
    #[must_use]
    pub fn into_shared(self) -> SharedPool<T> {
        Arc::new(Mutex::new(self))
    }

    /// Hands out an object. Never blocks, never refuses.
    pub fn acquire(&mut self) -> T {
        let obj = if let Some(obj) = self.free.pop() {
            obj
        } else {
            if self.live >= self.max_size && !self.saturation_warned {
                tracing::warn!(
                    "Pool saturated: {} live objects at ceiling {}, allocating unpooled",
                    self.live,
                    self.max_size
                );
                self.saturation_warned = true;
            }
            self.created += 1;
            (self.factory)()
        };

        self.live += 1;
        self.peak_live = self.peak_live.max(self.live);
        obj
    }

    /// Takes an object back. It is reset, then kept only below the ceiling.
    pub fn release(&mut self, mut obj: T) {
        self.live = self.live.saturating_sub(1);
        if self.live < self.max_size {
            self.saturation_warned = false;
        }

        (self.reset)(&mut obj);

        if self.free.len() < self.max_size {
            self.free.push(obj);
        } else {
            self.discarded += 1;
        }
    }

    /// Changes the ceiling.
    ///
    /// # Errors
    ///
    /// Returns [`FlareError::PoolBelowLive`] when `max_size` is below the
    /// live count; the pool is left unchanged.
    pub fn resize(&mut self, max_size: usize) -> FlareResult<()> {
        if max_size < self.live || max_size == 0 {
            return Err(FlareError::PoolBelowLive {
                requested: max_size,
                live: self.live,
            });
        }

        self.max_size = max_size;
        self.min_size = self.min_size.min(max_size);
        if self.free.len() > max_size {
            let excess = self.free.len() - max_size;
            self.free.truncate(max_size);
            self.discarded += excess as u64;
        }
        Ok(())
    }

    /// Trims the free list back to the floor. Returns objects freed.
    pub fn cleanup(&mut self) -> usize {
        let excess = self.free.len().saturating_sub(self.min_size);
        if excess > 0 {
            self.free.truncate(self.min_size);
            self.discarded += excess as u64;
            tracing::debug!("Pool cleanup freed {} idle objects", excess);
        }
        excess
    }

    /// Objects currently acquired.
    #[inline]
    #[must_use]
    pub const fn active_count(&self) -> usize {
        self.live
    }

    /// Objects on the free list.
    #[inline]
    #[must_use]
    pub fn free_count(&self) -> usize {
        self.free.len()
    }

    /// Current ceiling.
    #[inline]
    #[must_use]
    pub const fn max_size(&self) -> usize {
        self.max_size
    }

    /// Current floor.
    #[inline]
    #[must_use]
    pub const fn min_size(&self) -> usize {
        self.min_size
    }

    /// Returns pool counters.
    #[must_use]
    pub fn stats(&self) -> PoolStats {
        PoolStats {
            free: self.free.len(),
            live: self.live,
            created: self.created,
            discarded: self.discarded,
            peak_live: self.peak_live,
            min_size: self.min_size,
            max_size: self.max_size,
        }
    }
}

impl ObjectPool<Particle> {
    /// Creates the particle pool.
    ///
    /// # Errors
    ///
    /// See [`ObjectPool::new`].
    pub fn particles(config: PoolConfig) -> FlareResult<Self> {
        Self::new(config, Particle::dead, Particle::reset)
    }
}

impl<T> std::fmt::Debug for ObjectPool<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectPool")
            .field("free", &self.free.len())
            .field("live", &self.live)
            .field("min_size", &self.min_size)
            .field("max_size", &self.max_size)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pool(min_size: usize, max_size: usize) -> ObjectPool<u32> {
        ObjectPool::new(PoolConfig { min_size, max_size }, || 0, |v| *v = 0).unwrap()
    }

    #[test]
    fn test_prewarm_to_floor() {
        let p = pool(4, 8);
        assert_eq!(p.free_count(), 4);
        assert_eq!(p.stats().created, 4);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let result = ObjectPool::new(PoolConfig { min_size: 9, max_size: 8 }, || 0u8, |_| {});
        assert!(matches!(result, Err(FlareError::InvalidConfig(_))));
    }

    #[test]
    fn test_acquire_past_ceiling_degrades() {
        let mut p = pool(0, 2);
        let held: Vec<u32> = (0..5).map(|_| p.acquire()).collect();
        assert_eq!(held.len(), 5);
        assert_eq!(p.active_count(), 5);
        assert_eq!(p.stats().created, 5);
    }

    #[test]
    fn test_release_resets_and_caps_free_list() {
        let mut p = pool(0, 3);
        let held: Vec<u32> = (0..6).map(|_| p.acquire()).collect();

        for mut v in held {
            v += 7;
            p.release(v);
            assert!(p.free_count() <= 3);
        }

        assert_eq!(p.active_count(), 0);
        assert_eq!(p.free_count(), 3);
        assert_eq!(p.stats().discarded, 3);
        assert_eq!(p.acquire(), 0);
    }

    #[test]
    fn test_release_acquire_cycle_restores_live_count() {
        let mut p = pool(2, 4);
        let before = p.active_count();

        for _ in 0..1000 {
            let v = p.acquire();
            p.release(v);
            assert!(p.free_count() <= p.max_size());
        }

        assert_eq!(p.active_count(), before);
        // Reuse means no growth beyond the prewarmed floor.
        assert_eq!(p.stats().created, 2);
    }

    #[test]
    fn test_resize_refuses_below_live() {
        let mut p = pool(0, 10);
        let _a = p.acquire();
        let _b = p.acquire();
        let _c = p.acquire();

        assert_eq!(
            p.resize(2),
            Err(FlareError::PoolBelowLive { requested: 2, live: 3 })
        );
        assert_eq!(p.max_size(), 10);

        assert!(p.resize(3).is_ok());
        assert_eq!(p.max_size(), 3);
    }

    #[test]
    fn test_resize_truncates_free_list() {
        let mut p = pool(6, 8);
        p.resize(2).unwrap();
        assert_eq!(p.free_count(), 2);
        assert_eq!(p.min_size(), 2);
    }

    #[test]
    fn test_cleanup_trims_to_floor() {
        let mut p = pool(2, 16);
        let held: Vec<u32> = (0..10).map(|_| p.acquire()).collect();
        for v in held {
            p.release(v);
        }
        assert_eq!(p.free_count(), 10);

        assert_eq!(p.cleanup(), 8);
        assert_eq!(p.free_count(), 2);
        assert_eq!(p.cleanup(), 0);
    }

    #[test]
    fn test_particle_pool_resets_on_release() {
        let mut p = ParticlePool::particles(PoolConfig { min_size: 0, max_size: 4 }).unwrap();
        let mut particle = p.acquire();
        particle.life = 3.0;
        p.release(particle);

        let again = p.acquire();
        assert!(!again.is_alive());
    }
}
