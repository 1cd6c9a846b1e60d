//! # Emitters
//!
//! An emitter stamps pooled particles from a [`ParticleTemplate`] and owns
//! them until they expire. Expired particles go straight back to the pool.
//!
//! Two modes:
//! - **Burst**: fires `burst_count` particles on the first update after start
//! - **Continuous**: `rate` particles per second through a fractional
//!   accumulator, each tick capped at `burst_count`

use flare_core::{Particle, ParticlePool};

use crate::template::ParticleTemplate;

/// How long an emitter (or effect) runs once started.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifespan {
    /// Stops by itself after this many milliseconds.
    Bounded {
        /// Duration in milliseconds.
        millis: u32,
    },
    /// Runs until stopped.
    Unbounded,
}

impl Lifespan {
    /// Negative durations mean unbounded.
    #[must_use]
    pub fn from_millis(millis: i64) -> Self {
        if millis < 0 {
            Self::Unbounded
        } else {
            Self::Bounded {
                millis: u32::try_from(millis).unwrap_or(u32::MAX),
            }
        }
    }

    /// Duration in milliseconds, if bounded.
    #[must_use]
    pub const fn millis(self) -> Option<u32> {
        match self {
            Self::Bounded { millis } => Some(millis),
            Self::Unbounded => None,
        }
    }

    /// Has `elapsed_secs` reached the end?
    #[must_use]
    pub fn is_elapsed(self, elapsed_secs: f32) -> bool {
        match self {
            Self::Bounded { millis } => elapsed_secs * 1000.0 >= millis as f32,
            Self::Unbounded => false,
        }
    }
}

/// Emission mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmissionMode {
    /// One burst per start.
    Burst,
    /// Steady stream.
    Continuous,
}

/// Lifetime counters for one emitter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EmitterTotals {
    /// Particles stamped.
    pub emitted: u64,
    /// Particles that expired and went back to the pool.
    pub expired: u64,
    /// Emission calls that produced at least one particle.
    pub bursts: u32,
}

/// Per-frame emission context handed down by the orchestrator.
pub struct EmitContext<'a> {
    pool: &'a mut ParticlePool,
    budget: usize,
    quality: f32,
}

impl<'a> EmitContext<'a> {
    /// `budget` is how many more particles may be emitted this frame.
    pub fn new(pool: &'a mut ParticlePool, budget: usize, quality: f32) -> Self {
        Self {
            pool,
            budget,
            quality: if quality.is_finite() { quality.max(0.0) } else { 1.0 },
        }
    }

    /// Particles left in this frame's budget.
    #[must_use]
    pub const fn remaining(&self) -> usize {
        self.budget
    }

    /// Quality scalar applied to emission counts.
    #[must_use]
    pub const fn quality(&self) -> f32 {
        self.quality
    }

    /// The particle pool.
    pub fn pool(&mut self) -> &mut ParticlePool {
        self.pool
    }

    fn consume(&mut self, n: usize) {
        self.budget = self.budget.saturating_sub(n);
    }
}

/// Default per-tick cap for continuous emitters.
pub const DEFAULT_BURST_COUNT: u32 = 32;

/// Slack when turning the continuous accumulator into whole particles.
const ACCUMULATOR_EPSILON: f32 = 1e-4;

/// Particle emitter.
#[derive(Debug)]
pub struct Emitter {
    name: String,
    template: ParticleTemplate,
    mode: EmissionMode,
    /// Particles per second (continuous).
    rate: f32,
    /// Burst size, and the per-call cap for `emit`.
    burst_count: u32,
    lifespan: Lifespan,
    position: [f32; 2],
    /// Multiplier on emission counts. Recipes drive this from `modulate`.
    intensity: f32,
    active: bool,
    active_time: f32,
    accumulator: f32,
    burst_pending: bool,
    particles: Vec<Particle>,
    totals: EmitterTotals,
}

impl Emitter {
    /// A continuous, unbounded emitter at 10 particles/s.
    #[must_use]
    pub fn new(name: impl Into<String>, template: ParticleTemplate) -> Self {
        Self {
            name: name.into(),
            template,
            mode: EmissionMode::Continuous,
            rate: 10.0,
            burst_count: DEFAULT_BURST_COUNT,
            lifespan: Lifespan::Unbounded,
            position: [0.0, 0.0],
            intensity: 1.0,
            active: true,
            active_time: 0.0,
            accumulator: 0.0,
            burst_pending: false,
            particles: Vec::new(),
            totals: EmitterTotals::default(),
        }
    }

    /// A one-shot burst emitter. Stops right after firing.
    #[must_use]
    pub fn burst(name: impl Into<String>, template: ParticleTemplate, count: u32) -> Self {
        let mut emitter = Self::new(name, template);
        emitter.mode = EmissionMode::Burst;
        emitter.burst_count = count.max(1);
        emitter.lifespan = Lifespan::Bounded { millis: 0 };
        emitter.burst_pending = true;
        emitter
    }

    /// A continuous emitter.
    #[must_use]
    pub fn continuous(
        name: impl Into<String>,
        template: ParticleTemplate,
        rate: f32,
        lifespan: Lifespan,
    ) -> Self {
        Self::new(name, template).with_rate(rate).with_lifespan(lifespan)
    }

    /// Sets the rate. Anything below 1/s (or NaN) becomes 1/s.
    #[must_use]
    pub fn with_rate(mut self, rate: f32) -> Self {
        self.rate = clamp_rate(rate);
        self
    }

    /// Sets the burst size / per-call cap. Zero becomes one.
    #[must_use]
    pub fn with_burst_count(mut self, count: u32) -> Self {
        self.burst_count = count.max(1);
        self
    }

    /// Sets the lifespan.
    #[must_use]
    pub fn with_lifespan(mut self, lifespan: Lifespan) -> Self {
        self.lifespan = lifespan;
        self
    }

    /// Sets the position.
    #[must_use]
    pub fn at(mut self, position: [f32; 2]) -> Self {
        self.position = position;
        self
    }

    /// (Re)starts emission and the active-time clock.
    pub fn start(&mut self) {
        self.active = true;
        self.active_time = 0.0;
        self.accumulator = 0.0;
        self.burst_pending = self.mode == EmissionMode::Burst;
    }

    /// Stops emission. Live particles keep simulating.
    pub fn stop(&mut self) {
        self.active = false;
        self.burst_pending = false;
    }

    /// Stamps up to `min(count, burst_count)` particles at `position`.
    ///
    /// Returns the newly created particles. No-op (empty slice) without a
    /// position, while inactive, or for a zero count.
    pub fn emit(
        &mut self,
        position: Option<[f32; 2]>,
        count: usize,
        pool: &mut ParticlePool,
    ) -> &[Particle] {
        let Some(origin) = position else {
            return &[];
        };
        if !self.active || count == 0 {
            return &[];
        }

        self.spawn(origin, count.min(self.burst_count as usize), pool)
    }

    fn spawn(&mut self, origin: [f32; 2], n: usize, pool: &mut ParticlePool) -> &[Particle] {
        let start = self.particles.len();
        self.particles.reserve(n);
        for _ in 0..n {
            let mut particle = pool.acquire();
            self.template.stamp(&mut particle, origin);
            self.particles.push(particle);
        }

        self.totals.emitted += n as u64;
        self.totals.bursts += 1;
        &self.particles[start..]
    }

    /// Advances live particles, then emits for this frame.
    pub fn update(&mut self, dt: f32, ctx: &mut EmitContext<'_>) {
        let dt = if dt.is_finite() { dt.max(0.0) } else { 0.0 };
        self.settle(dt, ctx.pool());

        if !self.active {
            return;
        }
        self.active_time += dt;

        let scale = self.intensity * ctx.quality();
        let wanted = match self.mode {
            EmissionMode::Burst if self.burst_pending => {
                self.burst_pending = false;
                (self.burst_count as f32 * scale).round() as usize
            }
            EmissionMode::Burst => 0,
            EmissionMode::Continuous => {
                self.accumulator += self.rate * dt * scale;
                let whole = (self.accumulator + ACCUMULATOR_EPSILON).floor();
                self.accumulator = (self.accumulator - whole).max(0.0);
                whole as usize
            }
        };

        // Intensity above 1 may push a frame past the plain burst cap.
        let cap = (self.burst_count as f32 * self.intensity.max(1.0)).round() as usize;
        let allowed = wanted.min(cap).min(ctx.remaining());
        if allowed > 0 {
            let origin = self.position;
            let n = self.spawn(origin, allowed, ctx.pool()).len();
            ctx.consume(n);
        }

        if self.lifespan.is_elapsed(self.active_time) {
            self.stop();
        }
    }

    /// Advances live particles without emitting.
    pub fn settle(&mut self, dt: f32, pool: &mut ParticlePool) {
        let mut i = 0;
        while i < self.particles.len() {
            if self.particles[i].step(dt) {
                i += 1;
            } else {
                let expired = self.particles.swap_remove(i);
                pool.release(expired);
                self.totals.expired += 1;
            }
        }
    }

    /// Returns every live particle to the pool.
    pub fn release_all(&mut self, pool: &mut ParticlePool) -> usize {
        let n = self.particles.len();
        for particle in self.particles.drain(..) {
            pool.release(particle);
        }
        n
    }

    /// Moves the emitter.
    pub fn set_position(&mut self, position: [f32; 2]) {
        self.position = position;
    }

    /// Sets the emission multiplier (clamped to `0..=4`).
    pub fn set_intensity(&mut self, intensity: f32) {
        self.intensity = if intensity.is_finite() { intensity.clamp(0.0, 4.0) } else { 1.0 };
    }

    /// Name, unique within an effect.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Emission mode.
    #[must_use]
    pub const fn mode(&self) -> EmissionMode {
        self.mode
    }

    /// Particles per second.
    #[must_use]
    pub const fn rate(&self) -> f32 {
        self.rate
    }

    /// Burst size / per-call cap.
    #[must_use]
    pub const fn burst_count(&self) -> u32 {
        self.burst_count
    }

    /// Lifespan.
    #[must_use]
    pub const fn lifespan(&self) -> Lifespan {
        self.lifespan
    }

    /// Position.
    #[must_use]
    pub const fn position(&self) -> [f32; 2] {
        self.position
    }

    /// Emission multiplier.
    #[must_use]
    pub const fn intensity(&self) -> f32 {
        self.intensity
    }

    /// Emitting?
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.active
    }

    /// Seconds since the last start.
    #[must_use]
    pub const fn active_time(&self) -> f32 {
        self.active_time
    }

    /// Live particles.
    #[must_use]
    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    /// Live particle count.
    #[must_use]
    pub fn live_count(&self) -> usize {
        self.particles.len()
    }

    /// Lifetime counters.
    #[must_use]
    pub const fn totals(&self) -> EmitterTotals {
        self.totals
    }
}

fn clamp_rate(rate: f32) -> f32 {
    if rate.is_finite() && rate >= 1.0 {
        rate
    } else {
        1.0
    }
}
