//! # Optimization Coordinator
//!
//! Runs the supplied optimizers on its own cadence. A pass happens only when
//! the interval has elapsed since the last check and at least one rule
//! matches the snapshot. Every pass is appended to a bounded history.

use flare_core::{FlareError, FlareResult, FrameMetrics, SharedParticlePool, SharedSettings};

use crate::config::OptimizerConfig;
use crate::events::EventSystemOptimizer;
use crate::history::ActionHistory;
use crate::memory::MemoryOptimizer;
use crate::particle::ParticleOptimizer;
use crate::rendering::{FrameDecision, RenderingOptimizer};
use crate::report::OptimizationReport;
use crate::system::Optimizer;

/// Coordinator counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CoordinatorStats {
    /// Passes run.
    pub passes: u64,
    /// Interval checks where no rule matched.
    pub idle_checks: u64,
    /// Rules applied across all passes.
    pub rules_applied: u64,
    /// Bytes released across all passes.
    pub memory_freed_bytes: u64,
}

/// Assembles a coordinator from whichever optimizers are available.
#[derive(Debug)]
pub struct CoordinatorBuilder {
    config: OptimizerConfig,
    particle: Option<ParticleOptimizer>,
    rendering: Option<RenderingOptimizer>,
    memory: Option<MemoryOptimizer>,
    events: Option<EventSystemOptimizer>,
}

impl CoordinatorBuilder {
    /// Empty builder.
    #[must_use]
    pub const fn new(config: OptimizerConfig) -> Self {
        Self {
            config,
            particle: None,
            rendering: None,
            memory: None,
            events: None,
        }
    }

    /// Adds the particle optimizer.
    #[must_use]
    pub fn with_particle(mut self, optimizer: ParticleOptimizer) -> Self {
        self.particle = Some(optimizer);
        self
    }

    /// Adds the rendering optimizer.
    #[must_use]
    pub fn with_rendering(mut self, optimizer: RenderingOptimizer) -> Self {
        self.rendering = Some(optimizer);
        self
    }

    /// Adds the memory optimizer.
    #[must_use]
    pub fn with_memory(mut self, optimizer: MemoryOptimizer) -> Self {
        self.memory = Some(optimizer);
        self
    }

    /// Adds the event system optimizer.
    #[must_use]
    pub fn with_events(mut self, optimizer: EventSystemOptimizer) -> Self {
        self.events = Some(optimizer);
        self
    }

    /// Validates and builds.
    ///
    /// # Errors
    ///
    /// - [`FlareError::InvalidConfig`] for a bad config
    /// - [`FlareError::MissingCollaborator`] when no optimizer was supplied
    pub fn build(self) -> FlareResult<OptimizationCoordinator> {
        self.config.validate()?;
        if self.particle.is_none()
            && self.rendering.is_none()
            && self.memory.is_none()
            && self.events.is_none()
        {
            return Err(FlareError::MissingCollaborator("optimizer"));
        }

        Ok(OptimizationCoordinator {
            history: ActionHistory::new(self.config.history_capacity),
            config: self.config,
            particle: self.particle,
            rendering: self.rendering,
            memory: self.memory,
            events: self.events,
            last_check_ms: None,
            stats: CoordinatorStats::default(),
        })
    }
}

/// Gates, fans out and records optimizer passes.
#[derive(Debug)]
pub struct OptimizationCoordinator {
    config: OptimizerConfig,
    particle: Option<ParticleOptimizer>,
    rendering: Option<RenderingOptimizer>,
    memory: Option<MemoryOptimizer>,
    events: Option<EventSystemOptimizer>,
    last_check_ms: Option<u64>,
    history: ActionHistory<OptimizationReport>,
    stats: CoordinatorStats,
}

impl OptimizationCoordinator {
    /// Starts a builder.
    #[must_use]
    pub const fn builder(config: OptimizerConfig) -> CoordinatorBuilder {
        CoordinatorBuilder::new(config)
    }

    /// Coordinator running all four optimizers over the same handles.
    ///
    /// # Errors
    ///
    /// Returns [`FlareError::InvalidConfig`] for a bad config.
    pub fn standard(
        config: OptimizerConfig,
        settings: &SharedSettings,
        pool: &SharedParticlePool,
    ) -> FlareResult<Self> {
        let particle = ParticleOptimizer::new(&config, settings.clone(), pool.clone());
        let rendering = RenderingOptimizer::new(&config, settings.clone());
        let memory = MemoryOptimizer::new(&config, settings.clone(), pool.clone());
        let events = EventSystemOptimizer::new(&config, settings.clone());
        Self::builder(config)
            .with_particle(particle)
            .with_rendering(rendering)
            .with_memory(memory)
            .with_events(events)
            .build()
    }

    /// Interval-gated pass. The first call arms the timer.
    ///
    /// Returns the report when a pass ran.
    pub fn tick(&mut self, now_ms: u64, metrics: &FrameMetrics) -> Option<OptimizationReport> {
        if !self.config.enable_auto_optimization {
            return None;
        }
        let Some(last) = self.last_check_ms else {
            self.last_check_ms = Some(now_ms);
            return None;
        };
        if now_ms.saturating_sub(last) < self.config.optimization_interval_ms {
            return None;
        }
        self.last_check_ms = Some(now_ms);

        if !self.needs_optimization(metrics) {
            self.stats.idle_checks += 1;
            tracing::debug!("Optimization check at {}ms: nothing to do", now_ms);
            return None;
        }
        Some(self.optimize(now_ms, metrics))
    }

    /// Does any supplied optimizer have a matching rule?
    #[must_use]
    pub fn needs_optimization(&self, metrics: &FrameMetrics) -> bool {
        let checks: [Option<&dyn Optimizer>; 4] = [
            self.particle.as_ref().map(|o| o as &dyn Optimizer),
            self.rendering.as_ref().map(|o| o as &dyn Optimizer),
            self.memory.as_ref().map(|o| o as &dyn Optimizer),
            self.events.as_ref().map(|o| o as &dyn Optimizer),
        ];
        checks.into_iter().flatten().any(|o| o.needs_optimization(metrics))
    }

    /// Unconditional pass over every supplied optimizer.
    pub fn optimize(&mut self, now_ms: u64, metrics: &FrameMetrics) -> OptimizationReport {
        let systems: [Option<&mut dyn Optimizer>; 4] = [
            self.particle.as_mut().map(|o| o as &mut dyn Optimizer),
            self.rendering.as_mut().map(|o| o as &mut dyn Optimizer),
            self.memory.as_mut().map(|o| o as &mut dyn Optimizer),
            self.events.as_mut().map(|o| o as &mut dyn Optimizer),
        ];
        let reports = systems
            .into_iter()
            .flatten()
            .map(|o| o.optimize(metrics))
            .collect();

        let report = OptimizationReport::from_systems(now_ms, *metrics, reports);

        self.stats.passes += 1;
        self.stats.rules_applied += report.total_applied as u64;
        self.stats.memory_freed_bytes += report.memory_freed_bytes as u64;

        if report.improved() {
            let names: Vec<&str> = report.applied().map(|(_, rule)| rule.name).collect();
            tracing::info!(
                "Optimization pass at {}ms ({:.1} fps): applied {:?}, freed {} bytes",
                now_ms,
                metrics.fps,
                names,
                report.memory_freed_bytes
            );
        } else {
            tracing::debug!("Optimization pass at {}ms: all {} rules skipped", now_ms, report.total_skipped);
        }

        self.history.push(report.clone());
        report
    }

    /// Per-frame rendering controls. Renders unconditionally without a
    /// rendering optimizer.
    pub fn frame(&mut self, metrics: &FrameMetrics) -> FrameDecision {
        self.rendering.as_mut().map_or(
            FrameDecision {
                skip: false,
                quality_scalar: None,
            },
            |r| r.frame(metrics),
        )
    }

    /// Turns interval passes on or off.
    pub fn set_auto_optimization(&mut self, enabled: bool) {
        self.config.enable_auto_optimization = enabled;
    }

    /// Past pass reports, oldest first.
    #[must_use]
    pub const fn history(&self) -> &ActionHistory<OptimizationReport> {
        &self.history
    }

    /// Counters.
    #[must_use]
    pub const fn stats(&self) -> CoordinatorStats {
        self.stats
    }

    /// Configuration.
    #[must_use]
    pub const fn config(&self) -> &OptimizerConfig {
        &self.config
    }

    /// The particle optimizer, if supplied.
    #[must_use]
    pub const fn particle(&self) -> Option<&ParticleOptimizer> {
        self.particle.as_ref()
    }

    /// The rendering optimizer, if supplied.
    #[must_use]
    pub const fn rendering(&self) -> Option<&RenderingOptimizer> {
        self.rendering.as_ref()
    }
}
