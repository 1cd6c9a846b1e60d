//! # FLARE Core
//!
//! Resource primitives underneath the effects engine:
//! - Recycling object pool with a soft ceiling
//! - Injected clock and id sources for reproducible runs
//! - Shared render settings and the quality ladder
//! - Frame metrics, rolling fps and event-rate meters
//! - Deferred scheduler (one pending flush per key)
//!
//! ## Architecture Rules
//!
//! 1. **Nothing blocks** - every call completes synchronously
//! 2. **Bounded memory** - idle objects are capped by the pool ceiling
//! 3. **Deterministic** - time, ids and randomness are all injected
//!
//! ## Example
//!
//! ```rust,ignore
//! use flare_core::{ParticlePool, PoolConfig};
//!
//! let mut pool = ParticlePool::particles(PoolConfig::default())?;
//! let particle = pool.acquire();
//! pool.release(particle);
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod clock;
pub mod error;
pub mod ids;
pub mod metrics;
pub mod particle;
pub mod pool;
pub mod random;
pub mod scheduler;
pub mod settings;

pub use clock::{Clock, ManualClock, SharedClock, SystemClock};
pub use error::{FlareError, FlareResult};
pub use ids::{EffectId, IdSource, ProcessIds, SequentialIds, SharedIds};
pub use metrics::{FrameMetrics, MonitorStats, PerformanceMonitor, RateMeter};
pub use particle::Particle;
pub use pool::{
    ObjectPool, ParticlePool, PoolConfig, PoolStats, SharedParticlePool, SharedPool,
};
pub use random::SharedRng;
pub use scheduler::DeferredScheduler;
pub use settings::{QualityLadder, QualityPreset, RenderSettings, SharedSettings};
