//! # Flare Engine
//!
//! One call per frame:
//!
//! ```text
//! frame(dt)
//! ├─ 1. monitor.record_frame(dt)
//! ├─ 2. orchestrator.update(dt)        effects → emitters → pool
//! ├─ 3. FrameMetrics snapshot          fps, memory, particles, events
//! ├─ 4. coordinator.tick(now)          interval-gated rule passes
//! ├─ 5. coordinator.frame()            adaptive quality + skip verdict
//! └─ 6. orchestrator.render()          unless the frame is skipped
//! ```
//!
//! The orchestrator and the optimizers never call each other. They meet in
//! the shared settings and the shared particle pool.

use std::sync::Arc;

use flare_core::{
    FlareResult, FrameMetrics, MonitorStats, ParticlePool, PerformanceMonitor, ProcessIds,
    RenderSettings, SharedClock, SharedIds, SharedParticlePool, SharedRng, SharedSettings,
    SystemClock,
};
use flare_effects::{
    EffectOrchestrator, EffectRegistry, EffectRenderer, HeadlessRenderer, OrchestratorBuilder,
    OrchestratorStats, PlayRequest,
};
use flare_perf::{CoordinatorStats, OptimizationCoordinator, OptimizationReport};

use crate::config::EngineConfig;

/// What happened in one frame.
#[derive(Debug, Clone)]
pub struct FrameOutcome {
    /// Frame number, starting at 1.
    pub frame: u64,
    /// False when the frame was skipped.
    pub rendered: bool,
    /// New adaptive quality scalar, when it moved.
    pub quality_scalar: Option<f32>,
    /// Coordinator pass report, when one ran.
    pub report: Option<OptimizationReport>,
    /// Snapshot the optimizers saw.
    pub metrics: FrameMetrics,
}

/// Engine-wide counters.
#[derive(Debug, Clone)]
pub struct EngineStats {
    /// Frames driven.
    pub frames: u64,
    /// Frames rendered.
    pub rendered: u64,
    /// Frames skipped.
    pub skipped: u64,
    /// Frame timing.
    pub monitor: MonitorStats,
    /// Orchestrator counters.
    pub orchestrator: OrchestratorStats,
    /// Coordinator counters.
    pub coordinator: CoordinatorStats,
    /// Current knob values.
    pub settings: RenderSettings,
}

/// Builds a [`FlareEngine`] with optional injected collaborators.
#[derive(Default)]
pub struct EngineBuilder {
    config: EngineConfig,
    clock: Option<SharedClock>,
    ids: Option<SharedIds>,
    registry: Option<EffectRegistry>,
}

impl EngineBuilder {
    /// Starts from a configuration.
    #[must_use]
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// Injects a clock.
    #[must_use]
    pub fn with_clock(mut self, clock: SharedClock) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Injects an id source.
    #[must_use]
    pub fn with_ids(mut self, ids: SharedIds) -> Self {
        self.ids = Some(ids);
        self
    }

    /// Uses this registry instead of the built-in recipes.
    #[must_use]
    pub fn with_registry(mut self, registry: EffectRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Builds the engine around a renderer.
    ///
    /// # Errors
    ///
    /// Returns [`flare_core::FlareError::InvalidConfig`] for any invalid
    /// section of the configuration.
    pub fn build<R: EffectRenderer>(self, renderer: R) -> FlareResult<FlareEngine<R>> {
        let config = self.config;
        config.validate()?;

        let settings = SharedSettings::new(RenderSettings::from_ladder(
            &config.optimizer.quality_levels,
            config.initial_quality_level,
        ));
        let pool = ParticlePool::particles(config.pool)?.into_shared();
        let clock = self.clock.unwrap_or_else(SystemClock::shared);
        let ids = self.ids.unwrap_or_else(|| Arc::new(ProcessIds));

        let mut orchestrator = OrchestratorBuilder::new(config.orchestrator.clone())
            .with_pool(Arc::clone(&pool))
            .with_settings(settings.clone())
            .with_clock(Arc::clone(&clock))
            .with_ids(ids)
            .with_rng(SharedRng::seeded(config.seed));
        if let Some(registry) = self.registry {
            orchestrator = orchestrator.with_registry(registry);
        }
        let orchestrator = orchestrator.build(renderer)?;

        let coordinator = OptimizationCoordinator::standard(config.optimizer.clone(), &settings, &pool)?;
        let monitor = PerformanceMonitor::new(config.optimizer.target_fps);

        tracing::info!(
            "Flare engine ready: quality level {}, target {} fps",
            settings.read().quality_level,
            config.optimizer.target_fps
        );

        Ok(FlareEngine {
            orchestrator,
            coordinator,
            monitor,
            settings,
            pool,
            clock,
            memory_fraction: 0.0,
            frames: 0,
            rendered: 0,
            skipped: 0,
        })
    }
}

/// Orchestrator + coordinator + frame monitor.
pub struct FlareEngine<R: EffectRenderer = HeadlessRenderer> {
    orchestrator: EffectOrchestrator<R>,
    coordinator: OptimizationCoordinator,
    monitor: PerformanceMonitor,
    settings: SharedSettings,
    pool: SharedParticlePool,
    clock: SharedClock,
    memory_fraction: f32,
    frames: u64,
    rendered: u64,
    skipped: u64,
}

impl FlareEngine<HeadlessRenderer> {
    /// Engine with the headless renderer and default collaborators.
    ///
    /// # Errors
    ///
    /// See [`EngineBuilder::build`].
    pub fn headless(config: EngineConfig) -> FlareResult<Self> {
        EngineBuilder::new(config).build(HeadlessRenderer::default())
    }
}

impl<R: EffectRenderer> FlareEngine<R> {
    /// Drives one frame. `dt` is the elapsed time in seconds.
    pub fn frame(&mut self, dt: f32) -> FrameOutcome {
        let dt = if dt.is_finite() { dt.max(0.0) } else { 0.0 };
        self.frames += 1;

        self.monitor.record_frame(dt * 1000.0);
        self.orchestrator.update(dt);

        let now = self.clock.now_ms();
        let mut metrics = FrameMetrics {
            timestamp_ms: now,
            fps: self.monitor.fps(),
            frame_time_ms: self.monitor.last_frame_ms(),
            memory_fraction: self.memory_fraction,
            ..FrameMetrics::default()
        };
        self.orchestrator.fill_metrics(&mut metrics);

        let report = self.coordinator.tick(now, &metrics);
        let decision = self.coordinator.frame(&metrics);

        if decision.skip {
            self.skipped += 1;
        } else {
            self.orchestrator.render();
            self.rendered += 1;
        }

        FrameOutcome {
            frame: self.frames,
            rendered: !decision.skip,
            quality_scalar: decision.quality_scalar,
            report,
            metrics,
        }
    }

    /// Plays an effect. See [`EffectOrchestrator::play_effect`].
    pub fn play_effect(&mut self, name: &str, request: PlayRequest) -> bool {
        self.orchestrator.play_effect(name, request)
    }

    /// Stops the oldest live instance of `name`.
    pub fn stop_effect(&mut self, name: &str) -> bool {
        self.orchestrator.stop_effect(name)
    }

    /// Stops everything and clears the queue.
    pub fn stop_all_effects(&mut self) {
        self.orchestrator.stop_all_effects();
    }

    /// Sets the memory pressure reported to the optimizers (clamped to 0..1).
    pub fn set_memory_fraction(&mut self, fraction: f32) {
        self.memory_fraction = if fraction.is_finite() { fraction.clamp(0.0, 1.0) } else { 0.0 };
    }

    /// Memory pressure reported to the optimizers.
    #[must_use]
    pub const fn memory_fraction(&self) -> f32 {
        self.memory_fraction
    }

    /// Counters across every component.
    #[must_use]
    pub fn stats(&self) -> EngineStats {
        EngineStats {
            frames: self.frames,
            rendered: self.rendered,
            skipped: self.skipped,
            monitor: self.monitor.stats(),
            orchestrator: self.orchestrator.stats(),
            coordinator: self.coordinator.stats(),
            settings: self.settings.snapshot(),
        }
    }

    /// The orchestrator.
    #[must_use]
    pub const fn orchestrator(&self) -> &EffectOrchestrator<R> {
        &self.orchestrator
    }

    /// The orchestrator, mutable (registration, listeners, config updates).
    pub fn orchestrator_mut(&mut self) -> &mut EffectOrchestrator<R> {
        &mut self.orchestrator
    }

    /// The coordinator.
    #[must_use]
    pub const fn coordinator(&self) -> &OptimizationCoordinator {
        &self.coordinator
    }

    /// The coordinator, mutable.
    pub fn coordinator_mut(&mut self) -> &mut OptimizationCoordinator {
        &mut self.coordinator
    }

    /// The frame monitor.
    #[must_use]
    pub const fn monitor(&self) -> &PerformanceMonitor {
        &self.monitor
    }

    /// Shared render settings.
    #[must_use]
    pub const fn settings(&self) -> &SharedSettings {
        &self.settings
    }

    /// Shared particle pool.
    #[must_use]
    pub const fn pool(&self) -> &SharedParticlePool {
        &self.pool
    }

    /// Stops everything and drops listeners. The engine stays inert after.
    pub fn shutdown(&mut self) {
        self.orchestrator.destroy();
        self.coordinator.set_auto_optimization(false);
    }
}

impl<R: EffectRenderer + std::fmt::Debug> std::fmt::Debug for FlareEngine<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FlareEngine")
            .field("frames", &self.frames)
            .field("orchestrator", &self.orchestrator)
            .field("coordinator", &self.coordinator)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flare_core::{ManualClock, SequentialIds};

    fn engine(clock: &ManualClock) -> FlareEngine {
        EngineBuilder::new(EngineConfig::default())
            .with_clock(clock.shared())
            .with_ids(Arc::new(SequentialIds::new()))
            .build(HeadlessRenderer::default())
            .unwrap()
    }

    #[test]
    fn test_frame_renders() {
        let clock = ManualClock::new(0);
        let mut engine = engine(&clock);
        assert!(engine.play_effect("burst", PlayRequest::at(100.0, 100.0)));

        let outcome = engine.frame(1.0 / 60.0);
        assert!(outcome.rendered);
        assert_eq!(outcome.frame, 1);
        assert_eq!(outcome.metrics.active_effects, 1);
        assert!(outcome.metrics.particle_count > 0);
        assert!(engine.orchestrator().renderer().system_stats().frames_rendered == 1);
    }

    #[test]
    fn test_slow_frames_trigger_optimization() {
        let clock = ManualClock::new(0);
        let mut engine = engine(&clock);

        let mut reports = Vec::new();
        for _ in 0..120 {
            clock.advance(50);
            if let Some(report) = engine.frame(0.05).report {
                reports.push(report);
            }
        }

        assert!(!reports.is_empty());
        let settings = engine.settings().snapshot();
        assert!(settings.quality_level < 3);
        assert!(settings.quality_scalar < 1.0);
        assert!(engine.stats().skipped > 0);
    }

    #[test]
    fn test_memory_fraction_clamped() {
        let clock = ManualClock::new(0);
        let mut engine = engine(&clock);
        engine.set_memory_fraction(3.0);
        assert!((engine.memory_fraction() - 1.0).abs() < f32::EPSILON);
        engine.set_memory_fraction(f32::NAN);
        assert_eq!(engine.memory_fraction(), 0.0);
    }
}
