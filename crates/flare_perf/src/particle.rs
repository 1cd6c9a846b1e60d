//! # Particle Optimizer
//!
//! Trades particle budget and ladder level against frame rate:
//!
//! | pri | rule | fires when |
//! |---|---|---|
//! | 1 | `reduce_particle_count` | fps < 80% of target |
//! | 2 | `reduce_quality` | fps < 60% of target |
//! | 3 | `enable_lod` | live particles above the LOD threshold |
//! | 4 | `cleanup_pool` | memory above threshold |
//! | 5 | `restore_quality` | fps ≥ 110% of target, memory under threshold, below the top level |
//!
//! "Target" is the current ladder level's frame rate, capped by the
//! configured `target_fps`, so dropping a level also lowers the bar.

use flare_core::{FrameMetrics, QualityLadder, SharedParticlePool, SharedSettings};

use crate::config::OptimizerConfig;
use crate::rules::{Rule, RuleSet, RuleSkip};
use crate::system::{measure_freed, Optimizer, SystemKind, SystemReport};

/// Budget multiplier applied by `reduce_particle_count`.
pub const PARTICLE_REDUCTION: f32 = 0.75;

/// What the particle rules act on.
#[derive(Debug, Clone)]
pub struct ParticleTarget {
    /// Shared render settings.
    pub settings: SharedSettings,
    /// Shared particle pool.
    pub pool: SharedParticlePool,
    /// Ladder used for level changes.
    pub ladder: QualityLadder,
    /// Budget floor.
    pub min_particles: usize,
}

/// Particle budget and quality-level optimizer.
#[derive(Debug)]
pub struct ParticleOptimizer {
    target: ParticleTarget,
    rules: RuleSet<ParticleTarget>,
}

impl ParticleOptimizer {
    /// Builds the optimizer over shared handles.
    #[must_use]
    pub fn new(config: &OptimizerConfig, settings: SharedSettings, pool: SharedParticlePool) -> Self {
        let target = ParticleTarget {
            settings,
            pool,
            ladder: config.quality_levels.clone(),
            min_particles: config.min_particles,
        };
        Self {
            rules: Self::rules(config, &target.settings),
            target,
        }
    }

    fn rules(config: &OptimizerConfig, settings: &SharedSettings) -> RuleSet<ParticleTarget> {
        let ceiling = config.target_fps;
        let memory = config.memory_threshold;
        let lod_threshold = config.lod_particle_threshold;
        let top = config.quality_levels.top();
        let target_fps = move |s: &SharedSettings| s.read().effective_target_fps(ceiling);
        let (for_count, for_quality, current) = (settings.clone(), settings.clone(), settings.clone());

        RuleSet::new()
            .with(Rule::new(
                "reduce_particle_count",
                1,
                move |m: &FrameMetrics| m.fps < target_fps(&for_count) * 0.8,
                |t: &ParticleTarget, _| {
                    let mut settings = t.settings.write();
                    let before = settings.max_particles;
                    let reduced = ((before as f32 * PARTICLE_REDUCTION) as usize).max(t.min_particles);
                    if reduced >= before {
                        return Err(RuleSkip::AtFloor);
                    }
                    settings.max_particles = reduced;
                    Ok(format!("max_particles {before} -> {reduced}"))
                },
            ))
            .with(Rule::new(
                "reduce_quality",
                2,
                move |m: &FrameMetrics| m.fps < target_fps(&for_quality) * 0.6,
                |t: &ParticleTarget, _| {
                    let level = t.settings.read().quality_level;
                    if level <= 1 {
                        return Err(RuleSkip::AtFloor);
                    }
                    step_level(t, level, level - 1)
                },
            ))
            .with(Rule::new(
                "enable_lod",
                3,
                move |m: &FrameMetrics| m.particle_count > lod_threshold,
                |t: &ParticleTarget, _| {
                    let mut settings = t.settings.write();
                    if settings.enable_lod {
                        return Err(RuleSkip::AtCeiling);
                    }
                    settings.enable_lod = true;
                    Ok("LOD on".into())
                },
            ))
            .with(Rule::new(
                "cleanup_pool",
                4,
                move |m: &FrameMetrics| m.memory_fraction > memory,
                |t: &ParticleTarget, _| {
                    let freed = t.pool.lock().cleanup();
                    if freed == 0 {
                        return Err(RuleSkip::AtFloor);
                    }
                    Ok(format!("freed {freed} idle particles"))
                },
            ))
            .with(Rule::new(
                "restore_quality",
                5,
                move |m: &FrameMetrics| {
                    let (level, fps) = {
                        let s = current.read();
                        (s.quality_level, s.effective_target_fps(ceiling))
                    };
                    m.fps >= fps * 1.1 && m.memory_fraction < memory && level < top
                },
                |t: &ParticleTarget, _| {
                    let level = t.settings.read().quality_level;
                    if level >= t.ladder.top() {
                        return Err(RuleSkip::AtCeiling);
                    }
                    step_level(t, level, level + 1)
                },
            ))
    }

    /// Rule names in evaluation order.
    #[must_use]
    pub fn rule_names(&self) -> Vec<&'static str> {
        self.rules.names()
    }

    /// The handles this optimizer mutates.
    #[must_use]
    pub const fn target(&self) -> &ParticleTarget {
        &self.target
    }
}

fn step_level(t: &ParticleTarget, from: u8, to: u8) -> Result<String, RuleSkip> {
    if t.settings.set_quality_level(&t.ladder, to) {
        Ok(format!("quality level {from} -> {to}"))
    } else {
        Err(RuleSkip::Failed(format!("quality level {to} not on ladder")))
    }
}

impl Optimizer for ParticleOptimizer {
    fn kind(&self) -> SystemKind {
        SystemKind::Particle
    }

    fn needs_optimization(&self, metrics: &FrameMetrics) -> bool {
        self.rules.any_matches(metrics)
    }

    fn optimize(&mut self, metrics: &FrameMetrics) -> SystemReport {
        let (rules, memory_freed_bytes) =
            measure_freed(&self.target.pool, || self.rules.evaluate(&self.target, metrics));
        SystemReport {
            system: SystemKind::Particle,
            rules,
            memory_freed_bytes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::SkipReason;
    use flare_core::{Particle, ParticlePool, PoolConfig, RenderSettings};

    fn optimizer(level: u8) -> ParticleOptimizer {
        let config = OptimizerConfig::default();
        let settings = SharedSettings::new(RenderSettings::from_ladder(&config.quality_levels, level));
        let pool = ParticlePool::particles(PoolConfig { min_size: 4, max_size: 64 })
            .unwrap()
            .into_shared();
        ParticleOptimizer::new(&config, settings, pool)
    }

    fn metrics(fps: f32) -> FrameMetrics {
        FrameMetrics {
            fps,
            memory_fraction: 0.5,
            ..Default::default()
        }
    }

    #[test]
    fn test_slow_frames_reduce_count_and_quality() {
        let mut opt = optimizer(3);
        let report = opt.optimize(&metrics(20.0));

        assert!(report.rules.was_applied("reduce_particle_count"));
        assert!(report.rules.was_applied("reduce_quality"));
        let settings = opt.target().settings.snapshot();
        assert_eq!(settings.quality_level, 2);
        assert_eq!(settings.max_particles, 500);
    }

    #[test]
    fn test_mildly_slow_only_reduces_count() {
        let mut opt = optimizer(3);
        let report = opt.optimize(&metrics(45.0));
        assert!(report.rules.was_applied("reduce_particle_count"));
        assert_eq!(report.rules.skip_reason("reduce_quality"), Some(&SkipReason::ConditionUnmet));
        assert_eq!(opt.target().settings.read().max_particles, 750);
    }

    #[test]
    fn test_floors_report_skips() {
        let mut opt = optimizer(1);
        opt.target().settings.write().max_particles = 100;
        let report = opt.optimize(&metrics(10.0));
        assert_eq!(report.rules.skip_reason("reduce_particle_count"), Some(&SkipReason::AtFloor));
        assert_eq!(report.rules.skip_reason("reduce_quality"), Some(&SkipReason::AtFloor));
    }

    #[test]
    fn test_restore_quality() {
        let mut opt = optimizer(5);
        assert!(!opt.needs_optimization(&metrics(120.0)));
        let report = opt.optimize(&metrics(120.0));
        assert_eq!(report.rules.skip_reason("restore_quality"), Some(&SkipReason::ConditionUnmet));

        let mut opt = optimizer(2);
        let report = opt.optimize(&metrics(120.0));
        assert!(report.rules.was_applied("restore_quality"));
        assert_eq!(opt.target().settings.read().quality_level, 3);
    }

    #[test]
    fn test_lod_and_cleanup() {
        let mut opt = optimizer(3);
        {
            let mut pool = opt.target().pool.lock();
            let held: Vec<Particle> = (0..20).map(|_| pool.acquire()).collect();
            for p in held {
                pool.release(p);
            }
        }
        let report = opt.optimize(&FrameMetrics {
            fps: 60.0,
            memory_fraction: 0.95,
            particle_count: 5000,
            ..Default::default()
        });

        assert!(report.rules.was_applied("enable_lod"));
        assert!(report.rules.was_applied("cleanup_pool"));
        assert_eq!(report.memory_freed_bytes, 16 * Particle::SIZE);
        assert!(opt.target().settings.read().enable_lod);
    }

    #[test]
    fn test_lower_level_lowers_the_bar() {
        let mut opt = optimizer(1);

        // 35 fps is degraded against 60 but healthy against level 1's 30.
        let report = opt.optimize(&metrics(35.0));
        assert!(!report.rules.was_applied("reduce_particle_count"));
        assert!(report.rules.was_applied("restore_quality"));
        assert_eq!(opt.target().settings.read().max_particles, 500);

        // Level 2 targets 45: the same rate now trims the budget, once per pass.
        let report = opt.optimize(&metrics(35.0));
        assert!(report.rules.was_applied("reduce_particle_count"));
        assert_eq!(opt.target().settings.read().max_particles, 375);
    }

    #[test]
    fn test_needs_optimization() {
        let opt = optimizer(3);
        assert!(opt.needs_optimization(&metrics(20.0)));
        assert!(!opt.needs_optimization(&metrics(60.0)));
    }
}
