//! # Memory Optimizer
//!
//! Escalating responses to memory pressure: trim idle particles, then halve
//! the pool ceiling, then halve the particle budget.

use flare_core::{FrameMetrics, SharedParticlePool, SharedSettings};

use crate::config::OptimizerConfig;
use crate::rules::{Rule, RuleSet, RuleSkip};
use crate::system::{measure_freed, Optimizer, SystemKind, SystemReport};

/// Pressure above the threshold at which the pool ceiling is halved.
pub const SHRINK_MARGIN: f32 = 0.1;

/// Pressure above the threshold at which the particle budget is halved.
pub const BUDGET_MARGIN: f32 = 0.15;

/// What the memory rules act on.
#[derive(Debug, Clone)]
pub struct MemoryTarget {
    /// Shared particle pool.
    pub pool: SharedParticlePool,
    /// Shared render settings.
    pub settings: SharedSettings,
    /// Pool ceiling floor.
    pub min_pool_size: usize,
    /// Budget floor.
    pub min_particles: usize,
}

/// Pool and budget trimming under memory pressure.
#[derive(Debug)]
pub struct MemoryOptimizer {
    target: MemoryTarget,
    rules: RuleSet<MemoryTarget>,
}

impl MemoryOptimizer {
    /// Builds the optimizer over shared handles.
    #[must_use]
    pub fn new(config: &OptimizerConfig, settings: SharedSettings, pool: SharedParticlePool) -> Self {
        let threshold = config.memory_threshold;
        let rules = RuleSet::new()
            .with(Rule::new(
                "cleanup_pool",
                1,
                move |m: &FrameMetrics| m.memory_fraction > threshold,
                |t: &MemoryTarget, _| {
                    let freed = t.pool.lock().cleanup();
                    if freed == 0 {
                        return Err(RuleSkip::AtFloor);
                    }
                    Ok(format!("freed {freed} idle particles"))
                },
            ))
            .with(Rule::new(
                "shrink_pool",
                2,
                move |m: &FrameMetrics| m.memory_fraction > threshold + SHRINK_MARGIN,
                |t: &MemoryTarget, _| {
                    let mut pool = t.pool.lock();
                    let before = pool.max_size();
                    let next = (before / 2).max(t.min_pool_size).max(pool.active_count());
                    if next >= before {
                        return Err(RuleSkip::AtFloor);
                    }
                    pool.resize(next).map_err(|e| RuleSkip::Failed(e.to_string()))?;
                    Ok(format!("pool ceiling {before} -> {next}"))
                },
            ))
            .with(Rule::new(
                "reduce_particle_budget",
                3,
                move |m: &FrameMetrics| m.memory_fraction > threshold + BUDGET_MARGIN,
                |t: &MemoryTarget, _| {
                    let mut settings = t.settings.write();
                    let before = settings.max_particles;
                    let next = (before / 2).max(t.min_particles);
                    if next >= before {
                        return Err(RuleSkip::AtFloor);
                    }
                    settings.max_particles = next;
                    Ok(format!("max_particles {before} -> {next}"))
                },
            ));

        Self {
            target: MemoryTarget {
                pool,
                settings,
                min_pool_size: config.min_pool_size,
                min_particles: config.min_particles,
            },
            rules,
        }
    }

    /// The handles this optimizer mutates.
    #[must_use]
    pub const fn target(&self) -> &MemoryTarget {
        &self.target
    }
}

impl Optimizer for MemoryOptimizer {
    fn kind(&self) -> SystemKind {
        SystemKind::Memory
    }

    fn needs_optimization(&self, metrics: &FrameMetrics) -> bool {
        self.rules.any_matches(metrics)
    }

    fn optimize(&mut self, metrics: &FrameMetrics) -> SystemReport {
        let (rules, memory_freed_bytes) =
            measure_freed(&self.target.pool, || self.rules.evaluate(&self.target, metrics));
        if memory_freed_bytes > 0 {
            tracing::info!("Memory optimizer released {} bytes", memory_freed_bytes);
        }
        SystemReport {
            system: SystemKind::Memory,
            rules,
            memory_freed_bytes,
        }
    }
}
