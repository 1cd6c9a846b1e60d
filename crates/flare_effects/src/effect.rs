//! # Effect Lifecycle
//!
//! Every effect recipe implements [`VisualEffect`] and embeds an
//! [`EffectCore`]. The trait's default methods run the shared state machine:
//!
//! ```text
//! Uninitialized -> Initialized -> Active -> Finished | Stopped
//!        ^                                        |
//!        +------------------ reset ---------------+
//! ```
//!
//! A recipe only supplies [`VisualEffect::build_emitters`] and, optionally,
//! [`VisualEffect::modulate`].

use flare_core::{EffectId, FlareError, FlareResult, ParticlePool};

use crate::config::EffectSettings;
use crate::emitter::{EmitContext, Emitter, Lifespan};

/// Lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EffectState {
    /// No emitters yet.
    Uninitialized,
    /// Emitters built, not running.
    Initialized,
    /// Running.
    Active,
    /// Bounded duration elapsed.
    Finished,
    /// Stopped explicitly.
    Stopped,
}

/// Rolling run statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct EffectRunStats {
    /// Completed runs (finished or stopped).
    pub runs: u32,
    /// Loop restarts across all runs.
    pub loops: u32,
    /// Duration of the last run.
    pub last_duration_ms: f32,
    /// Mean run duration.
    pub average_duration_ms: f32,
    /// Sum of all run durations.
    pub total_duration_ms: f32,
    /// Particles emitted across all runs.
    pub particles_emitted: u64,
}

/// Summary handed to the renderer when an effect is admitted.
#[derive(Debug, Clone, PartialEq)]
pub struct EffectInfo {
    /// Instance id.
    pub id: EffectId,
    /// Registered name.
    pub name: String,
    /// Owned emitters.
    pub emitter_count: usize,
    /// Nominal lifespan.
    pub lifespan: Lifespan,
    /// Loops?
    pub looping: bool,
}

/// State shared by every effect recipe.
#[derive(Debug)]
pub struct EffectCore {
    name: String,
    id: EffectId,
    lifespan: Lifespan,
    looping: bool,
    emitters: Vec<Emitter>,
    state: EffectState,
    /// Seconds into the current loop.
    elapsed: f32,
    /// Seconds since start, across loops.
    run_time: f32,
    loop_count: u32,
    position: Option<[f32; 2]>,
    stats: EffectRunStats,
}

impl EffectCore {
    /// Creates a core from resolved settings.
    #[must_use]
    pub fn new(name: impl Into<String>, id: EffectId, settings: &EffectSettings) -> Self {
        Self {
            name: name.into(),
            id,
            lifespan: settings.lifespan(),
            looping: settings.looping,
            emitters: Vec::new(),
            state: EffectState::Uninitialized,
            elapsed: 0.0,
            run_time: 0.0,
            loop_count: 0,
            position: None,
            stats: EffectRunStats::default(),
        }
    }

    /// Takes ownership of an emitter.
    ///
    /// # Errors
    ///
    /// Returns [`FlareError::DuplicateEmitter`] if the name is taken.
    pub fn attach(&mut self, emitter: Emitter) -> FlareResult<()> {
        if self.emitter(emitter.name()).is_some() {
            return Err(FlareError::DuplicateEmitter {
                effect: self.name.clone(),
                emitter: emitter.name().to_owned(),
            });
        }
        self.emitters.push(emitter);
        Ok(())
    }

    /// Emitter by name.
    #[must_use]
    pub fn emitter(&self, name: &str) -> Option<&Emitter> {
        self.emitters.iter().find(|e| e.name() == name)
    }

    /// Mutable emitter by name.
    pub fn emitter_mut(&mut self, name: &str) -> Option<&mut Emitter> {
        self.emitters.iter_mut().find(|e| e.name() == name)
    }

    /// Owned emitters in attach order.
    #[must_use]
    pub fn emitters(&self) -> &[Emitter] {
        &self.emitters
    }

    /// Registered name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Instance id.
    #[must_use]
    pub const fn id(&self) -> EffectId {
        self.id
    }

    /// Nominal lifespan.
    #[must_use]
    pub const fn lifespan(&self) -> Lifespan {
        self.lifespan
    }

    /// Loops?
    #[must_use]
    pub const fn looping(&self) -> bool {
        self.looping
    }

    /// Lifecycle state.
    #[must_use]
    pub const fn state(&self) -> EffectState {
        self.state
    }

    /// Seconds into the current loop.
    #[must_use]
    pub const fn elapsed(&self) -> f32 {
        self.elapsed
    }

    /// Loop restarts in the current run.
    #[must_use]
    pub const fn loop_count(&self) -> u32 {
        self.loop_count
    }

    /// Position given at the last start.
    #[must_use]
    pub const fn position(&self) -> Option<[f32; 2]> {
        self.position
    }

    /// Run statistics.
    #[must_use]
    pub const fn stats(&self) -> EffectRunStats {
        self.stats
    }

    /// Fraction of the current loop elapsed. Always 0 for unbounded effects.
    #[must_use]
    pub fn progress(&self) -> f32 {
        match self.lifespan {
            Lifespan::Bounded { millis: 0 } => 1.0,
            Lifespan::Bounded { millis } => (self.elapsed * 1000.0 / millis as f32).clamp(0.0, 1.0),
            Lifespan::Unbounded => 0.0,
        }
    }

    /// Live particles across all emitters.
    #[must_use]
    pub fn live_particles(&self) -> usize {
        self.emitters.iter().map(Emitter::live_count).sum()
    }

    /// Renderer summary.
    #[must_use]
    pub fn info(&self) -> EffectInfo {
        EffectInfo {
            id: self.id,
            name: self.name.clone(),
            emitter_count: self.emitters.len(),
            lifespan: self.lifespan,
            looping: self.looping,
        }
    }

    fn begin(&mut self, position: Option<[f32; 2]>) {
        if let Some(position) = position {
            self.position = Some(position);
            for emitter in &mut self.emitters {
                emitter.set_position(position);
            }
        }
        for emitter in &mut self.emitters {
            emitter.start();
        }
        self.elapsed = 0.0;
        self.run_time = 0.0;
        self.loop_count = 0;
        self.state = EffectState::Active;
    }

    /// Steps emitters and handles the end of a bounded loop.
    fn advance(&mut self, dt: f32, ctx: &mut EmitContext<'_>) {
        self.elapsed += dt;
        self.run_time += dt;
        self.step_emitters(dt, ctx);

        if !self.lifespan.is_elapsed(self.elapsed) {
            return;
        }
        if self.looping {
            let period = self.lifespan.millis().unwrap_or(0) as f32 / 1000.0;
            self.elapsed = (self.elapsed - period).max(0.0);
            self.loop_count += 1;
            self.stats.loops += 1;
            for emitter in &mut self.emitters {
                emitter.start();
            }
        } else {
            self.halt(EffectState::Finished);
        }
    }

    fn step_emitters(&mut self, dt: f32, ctx: &mut EmitContext<'_>) {
        for emitter in &mut self.emitters {
            let before = emitter.totals().emitted;
            emitter.update(dt, ctx);
            self.stats.particles_emitted += emitter.totals().emitted - before;
        }
    }

    fn settle(&mut self, dt: f32, ctx: &mut EmitContext<'_>) {
        for emitter in &mut self.emitters {
            emitter.settle(dt, ctx.pool());
        }
    }

    fn halt(&mut self, state: EffectState) {
        if self.state != EffectState::Active {
            return;
        }
        for emitter in &mut self.emitters {
            emitter.stop();
        }
        let run_ms = self.run_time * 1000.0;
        self.stats.runs += 1;
        self.stats.last_duration_ms = run_ms;
        self.stats.total_duration_ms += run_ms;
        self.stats.average_duration_ms = self.stats.total_duration_ms / self.stats.runs as f32;
        self.state = state;
    }

    fn release_particles(&mut self, pool: &mut ParticlePool) -> usize {
        self.emitters.iter_mut().map(|e| e.release_all(pool)).sum()
    }

    fn clear(&mut self, pool: &mut ParticlePool) {
        self.release_particles(pool);
        self.emitters.clear();
        self.elapsed = 0.0;
        self.run_time = 0.0;
        self.loop_count = 0;
        self.state = EffectState::Uninitialized;
    }
}

/// Capability interface implemented by every effect recipe.
///
/// The orchestrator depends on this trait only.
pub trait VisualEffect {
    /// Shared state.
    fn core(&self) -> &EffectCore;

    /// Shared state, mutable.
    fn core_mut(&mut self) -> &mut EffectCore;

    /// Assembles this recipe's emitters. Runs once per initialization.
    fn build_emitters(&self) -> Vec<Emitter>;

    /// Per-frame hook with the current loop progress (0..1).
    fn modulate(&mut self, _progress: f32) {}

    /// Builds emitters once. Repeat calls are no-ops.
    ///
    /// # Errors
    ///
    /// Returns [`FlareError::DuplicateEmitter`] if the recipe produced two
    /// emitters with one name; the effect stays uninitialized.
    fn initialize(&mut self) -> FlareResult<()> {
        if self.core().state() != EffectState::Uninitialized {
            return Ok(());
        }
        let emitters = self.build_emitters();
        let core = self.core_mut();
        for emitter in emitters {
            if let Err(err) = core.attach(emitter) {
                core.emitters.clear();
                return Err(err);
            }
        }
        core.state = EffectState::Initialized;
        Ok(())
    }

    /// Initializes if needed, then (re)starts every emitter.
    ///
    /// # Errors
    ///
    /// Propagates [`VisualEffect::initialize`] failures.
    fn start(&mut self, position: Option<[f32; 2]>) -> FlareResult<()> {
        self.initialize()?;
        self.core_mut().begin(position);
        Ok(())
    }

    /// Advances one frame.
    ///
    /// Inactive effects emit nothing and their clock stands still; particles
    /// already in flight keep simulating until they expire.
    fn update(&mut self, dt: f32, ctx: &mut EmitContext<'_>) {
        let dt = if dt.is_finite() { dt.max(0.0) } else { 0.0 };
        if !self.is_active() {
            self.core_mut().settle(dt, ctx);
            return;
        }
        self.core_mut().advance(dt, ctx);
        if self.is_active() {
            let progress = self.core().progress();
            self.modulate(progress);
        }
    }

    /// Stops emission and records the run.
    fn stop(&mut self) {
        self.core_mut().halt(EffectState::Stopped);
    }

    /// Returns particles to the pool and drops all emitters.
    fn reset(&mut self, pool: &mut ParticlePool) {
        self.core_mut().clear(pool);
    }

    /// Returns every live particle to the pool, keeping the emitters.
    fn release_particles(&mut self, pool: &mut ParticlePool) -> usize {
        self.core_mut().release_particles(pool)
    }

    /// Registered name.
    fn name(&self) -> &str {
        self.core().name()
    }

    /// Instance id.
    fn id(&self) -> EffectId {
        self.core().id()
    }

    /// Lifecycle state.
    fn state(&self) -> EffectState {
        self.core().state()
    }

    /// Running?
    fn is_active(&self) -> bool {
        self.core().state() == EffectState::Active
    }

    /// Live particles.
    fn live_particles(&self) -> usize {
        self.core().live_particles()
    }

    /// Run statistics.
    fn stats(&self) -> EffectRunStats {
        self.core().stats()
    }

    /// Renderer summary.
    fn info(&self) -> EffectInfo {
        self.core().info()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::ParticleTemplate;
    use flare_core::PoolConfig;

    struct Fountain {
        core: EffectCore,
        duplicate: bool,
        pulses: u32,
    }

    impl Fountain {
        fn new(duration_ms: i64, looping: bool) -> Self {
            let settings = EffectSettings {
                duration_ms,
                looping,
                ..EffectSettings::default()
            };
            Self {
                core: EffectCore::new("fountain", EffectId(1), &settings),
                duplicate: false,
                pulses: 0,
            }
        }
    }

    impl VisualEffect for Fountain {
        fn core(&self) -> &EffectCore {
            &self.core
        }

        fn core_mut(&mut self) -> &mut EffectCore {
            &mut self.core
        }

        fn build_emitters(&self) -> Vec<Emitter> {
            let mut emitters = vec![
                Emitter::burst("splash", ParticleTemplate::default(), 10),
                Emitter::new("spray", ParticleTemplate::default()).with_rate(50.0),
            ];
            if self.duplicate {
                emitters.push(Emitter::burst("splash", ParticleTemplate::default(), 1));
            }
            emitters
        }

        fn modulate(&mut self, _progress: f32) {
            self.pulses += 1;
        }
    }

    fn pool() -> ParticlePool {
        ParticlePool::particles(PoolConfig { min_size: 0, max_size: 512 }).unwrap()
    }

    #[test]
    fn test_initialize_is_idempotent() {
        let mut fx = Fountain::new(500, false);
        fx.initialize().unwrap();
        fx.initialize().unwrap();
        assert_eq!(fx.core().emitters().len(), 2);
        assert_eq!(fx.state(), EffectState::Initialized);
    }

    #[test]
    fn test_duplicate_emitter_is_error() {
        let mut fx = Fountain::new(500, false);
        fx.duplicate = true;
        let err = fx.initialize().unwrap_err();
        assert!(matches!(err, FlareError::DuplicateEmitter { .. }));
        assert_eq!(fx.state(), EffectState::Uninitialized);
        assert!(fx.core().emitters().is_empty());
    }

    #[test]
    fn test_bounded_effect_finishes() {
        let mut pool = pool();
        let mut fx = Fountain::new(100, false);
        fx.start(Some([5.0, 5.0])).unwrap();
        assert!(fx.is_active());

        let mut ctx = EmitContext::new(&mut pool, 1000, 1.0);
        for _ in 0..6 {
            fx.update(0.02, &mut ctx);
        }
        assert_eq!(fx.state(), EffectState::Finished);
        assert_eq!(fx.stats().runs, 1);
        assert!(fx.stats().last_duration_ms >= 100.0);
        assert!(fx.stats().particles_emitted >= 10);
        assert!(fx.pulses > 0);
    }

    #[test]
    fn test_inactive_update_is_inert() {
        let mut pool = pool();
        let mut fx = Fountain::new(100, false);
        fx.initialize().unwrap();

        let mut ctx = EmitContext::new(&mut pool, 1000, 1.0);
        fx.update(0.05, &mut ctx);
        assert_eq!(fx.core().elapsed(), 0.0);
        assert_eq!(fx.live_particles(), 0);
        assert_eq!(fx.pulses, 0);
    }

    #[test]
    fn test_looping_restarts_emitters() {
        let mut pool = pool();
        let mut fx = Fountain::new(50, true);
        fx.start(Some([0.0, 0.0])).unwrap();

        let mut ctx = EmitContext::new(&mut pool, 10_000, 1.0);
        for _ in 0..10 {
            fx.update(0.02, &mut ctx);
        }
        assert!(fx.is_active());
        assert!(fx.core().loop_count() >= 3);
        // Splash fires again on every loop.
        assert!(fx.core().emitter("splash").unwrap().totals().bursts >= 3);
    }

    #[test]
    fn test_stop_records_run() {
        let mut pool = pool();
        let mut fx = Fountain::new(-1, false);
        fx.start(None).unwrap();
        let mut ctx = EmitContext::new(&mut pool, 1000, 1.0);
        fx.update(0.1, &mut ctx);
        fx.stop();

        assert_eq!(fx.state(), EffectState::Stopped);
        let stats = fx.stats();
        assert_eq!(stats.runs, 1);
        assert!((stats.last_duration_ms - 100.0).abs() < 0.5);
        assert!((stats.average_duration_ms - stats.total_duration_ms).abs() < f32::EPSILON);

        // Second stop does not count another run.
        fx.stop();
        assert_eq!(fx.stats().runs, 1);
    }

    #[test]
    fn test_reset_then_start_matches_fresh() {
        let mut pool = pool();
        let mut used = Fountain::new(200, false);
        used.start(Some([1.0, 1.0])).unwrap();
        {
            let mut ctx = EmitContext::new(&mut pool, 1000, 1.0);
            used.update(0.05, &mut ctx);
        }
        used.reset(&mut pool);
        assert_eq!(used.state(), EffectState::Uninitialized);
        assert_eq!(pool.active_count(), 0);
        used.start(Some([1.0, 1.0])).unwrap();

        let mut fresh = Fountain::new(200, false);
        fresh.start(Some([1.0, 1.0])).unwrap();

        let names = |fx: &Fountain| {
            fx.core().emitters().iter().map(|e| e.name().to_owned()).collect::<Vec<_>>()
        };
        assert_eq!(names(&used), names(&fresh));
        assert_eq!(used.core().elapsed(), 0.0);
        assert_eq!(used.core().elapsed(), fresh.core().elapsed());
        assert_eq!(used.state(), fresh.state());
    }
}
