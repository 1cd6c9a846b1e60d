//! # Rendering Optimizer
//!
//! Interval rules (`enable_lod`, `increase_batch_size`, `relax_lod`) plus
//! two per-frame controls: frame skipping and adaptive quality.
//!
//! A frame is skipped when fps has fallen below half the target or the last
//! frame overran 1.5× the budget, never more than `max_consecutive_skips`
//! frames in a row. Target and budget follow the current ladder level.

use flare_core::{FrameMetrics, SharedSettings};

use crate::config::OptimizerConfig;
use crate::quality::AdaptiveQuality;
use crate::rules::{Rule, RuleSet, RuleSkip};
use crate::system::{Optimizer, SystemKind, SystemReport};

/// Fraction of the target fps below which frames are skipped.
pub const DEGRADED_FPS_RATIO: f32 = 0.5;

/// Frame-time multiple of the budget that counts as an overrun.
pub const OVERRUN_FACTOR: f32 = 1.5;

/// What the rendering rules act on.
#[derive(Debug, Clone)]
pub struct RenderTarget {
    /// Shared render settings.
    pub settings: SharedSettings,
    /// Batch size ceiling.
    pub max_batch_size: usize,
}

/// Per-frame verdict.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameDecision {
    /// Skip the render call this frame.
    pub skip: bool,
    /// New quality scalar, when adaptive quality moved.
    pub quality_scalar: Option<f32>,
}

/// LOD, batching, frame skipping and adaptive quality.
#[derive(Debug)]
pub struct RenderingOptimizer {
    target: RenderTarget,
    rules: RuleSet<RenderTarget>,
    adaptive: AdaptiveQuality,
    /// Configured target, the cap on every level's own target.
    target_fps: f32,
    frame_skip: bool,
    max_consecutive_skips: u32,
    consecutive_skips: u32,
    total_skips: u64,
}

impl RenderingOptimizer {
    /// Builds the optimizer over the shared settings.
    #[must_use]
    pub fn new(config: &OptimizerConfig, settings: SharedSettings) -> Self {
        let adaptive = AdaptiveQuality::new(config.adaptive.clone());
        settings.write().quality_scalar = adaptive.scalar();
        let rules = Self::rules(config, &settings);
        Self {
            target: RenderTarget {
                settings,
                max_batch_size: config.max_batch_size,
            },
            rules,
            adaptive,
            target_fps: config.target_fps,
            frame_skip: config.enable_frame_skip,
            max_consecutive_skips: config.max_consecutive_skips,
            consecutive_skips: 0,
            total_skips: 0,
        }
    }

    fn rules(config: &OptimizerConfig, settings: &SharedSettings) -> RuleSet<RenderTarget> {
        let ceiling = config.target_fps;
        let lod_threshold = config.lod_particle_threshold;
        let target_fps = move |s: &SharedSettings| s.read().effective_target_fps(ceiling);
        let (for_lod, for_batch, current) = (settings.clone(), settings.clone(), settings.clone());

        RuleSet::new()
            .with(Rule::new(
                "enable_lod",
                1,
                move |m: &FrameMetrics| m.fps < target_fps(&for_lod) * 0.7,
                |t: &RenderTarget, _| {
                    let mut settings = t.settings.write();
                    if settings.enable_lod {
                        return Err(RuleSkip::AtCeiling);
                    }
                    settings.enable_lod = true;
                    Ok("LOD on".into())
                },
            ))
            .with(Rule::new(
                "increase_batch_size",
                2,
                move |m: &FrameMetrics| m.fps < target_fps(&for_batch) * 0.8,
                |t: &RenderTarget, _| {
                    let mut settings = t.settings.write();
                    let before = settings.batch_size;
                    if before >= t.max_batch_size {
                        return Err(RuleSkip::AtCeiling);
                    }
                    let next = before.max(1).saturating_mul(2).min(t.max_batch_size);
                    settings.batch_size = next;
                    Ok(format!("batch_size {before} -> {next}"))
                },
            ))
            .with(Rule::new(
                "relax_lod",
                3,
                move |m: &FrameMetrics| {
                    let (lod, fps) = {
                        let s = current.read();
                        (s.enable_lod, s.effective_target_fps(ceiling))
                    };
                    m.fps >= fps * 0.95 && m.particle_count < lod_threshold && lod
                },
                |t: &RenderTarget, _| {
                    let mut settings = t.settings.write();
                    if !settings.enable_lod {
                        return Err(RuleSkip::AtFloor);
                    }
                    settings.enable_lod = false;
                    Ok("LOD off".into())
                },
            ))
    }

    /// Frame rate the current ladder level asks for.
    #[must_use]
    pub fn effective_target_fps(&self) -> f32 {
        self.target.settings.read().effective_target_fps(self.target_fps)
    }

    /// Frame budget at the current ladder level.
    #[must_use]
    pub fn budget_ms(&self) -> f32 {
        FrameMetrics::budget_ms(self.effective_target_fps())
    }

    /// Decides whether this frame renders. Counts skips in the settings.
    pub fn should_skip_frame(&mut self, metrics: &FrameMetrics) -> bool {
        if !self.frame_skip {
            self.consecutive_skips = 0;
            return false;
        }

        let target_fps = self.effective_target_fps();
        let degraded = metrics.fps > 0.0 && metrics.fps < target_fps * DEGRADED_FPS_RATIO;
        let overrun = metrics.frame_time_ms > FrameMetrics::budget_ms(target_fps) * OVERRUN_FACTOR;

        if (degraded || overrun) && self.consecutive_skips < self.max_consecutive_skips {
            self.consecutive_skips += 1;
            self.total_skips += 1;
            self.target.settings.write().frames_skipped += 1;
            tracing::debug!(
                "Skipping frame ({:.1} fps, {:.1}ms), {} in a row",
                metrics.fps,
                metrics.frame_time_ms,
                self.consecutive_skips
            );
            true
        } else {
            self.consecutive_skips = 0;
            false
        }
    }

    /// Feeds the adaptive controller and publishes the scalar when it moves.
    pub fn adapt_quality(&mut self, metrics: &FrameMetrics) -> Option<f32> {
        let budget_ms = self.budget_ms();
        let scalar = self.adaptive.sample(metrics.frame_time_ms, budget_ms)?;
        self.target.settings.write().quality_scalar = scalar;
        tracing::debug!("Adaptive quality -> {:.2}", scalar);
        Some(scalar)
    }

    /// Both per-frame controls in one call.
    pub fn frame(&mut self, metrics: &FrameMetrics) -> FrameDecision {
        let quality_scalar = self.adapt_quality(metrics);
        FrameDecision {
            skip: self.should_skip_frame(metrics),
            quality_scalar,
        }
    }

    /// The adaptive controller.
    #[must_use]
    pub const fn adaptive(&self) -> &AdaptiveQuality {
        &self.adaptive
    }

    /// Skips in the current run.
    #[must_use]
    pub const fn consecutive_skips(&self) -> u32 {
        self.consecutive_skips
    }

    /// Skips since construction.
    #[must_use]
    pub const fn total_skips(&self) -> u64 {
        self.total_skips
    }

    /// The handles this optimizer mutates.
    #[must_use]
    pub const fn target(&self) -> &RenderTarget {
        &self.target
    }
}

impl Optimizer for RenderingOptimizer {
    fn kind(&self) -> SystemKind {
        SystemKind::Rendering
    }

    fn needs_optimization(&self, metrics: &FrameMetrics) -> bool {
        self.rules.any_matches(metrics)
    }

    fn optimize(&mut self, metrics: &FrameMetrics) -> SystemReport {
        SystemReport {
            system: SystemKind::Rendering,
            rules: self.rules.evaluate(&self.target, metrics),
            memory_freed_bytes: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::SkipReason;
    use flare_core::RenderSettings;

    fn optimizer() -> RenderingOptimizer {
        RenderingOptimizer::new(&OptimizerConfig::default(), SharedSettings::default())
    }

    #[test]
    fn test_slow_frames_enable_lod_and_grow_batches() {
        let mut opt = optimizer();
        let slow = FrameMetrics { fps: 30.0, ..Default::default() };

        let report = opt.optimize(&slow);
        assert!(report.rules.was_applied("enable_lod"));
        assert!(report.rules.was_applied("increase_batch_size"));
        assert_eq!(opt.target().settings.read().batch_size, 200);

        for _ in 0..5 {
            opt.optimize(&slow);
        }
        assert_eq!(opt.target().settings.read().batch_size, 800);
        let report = opt.optimize(&slow);
        assert_eq!(report.rules.skip_reason("increase_batch_size"), Some(&SkipReason::AtCeiling));
        assert_eq!(report.rules.skip_reason("enable_lod"), Some(&SkipReason::AtCeiling));
    }

    #[test]
    fn test_relax_lod() {
        let settings = SharedSettings::new(RenderSettings {
            enable_lod: true,
            ..Default::default()
        });
        let mut opt = RenderingOptimizer::new(&OptimizerConfig::default(), settings);
        let report = opt.optimize(&FrameMetrics { fps: 60.0, particle_count: 10, ..Default::default() });
        assert!(report.rules.was_applied("relax_lod"));
        assert!(!opt.target().settings.read().enable_lod);
    }

    #[test]
    fn test_frame_skip_limit() {
        let mut opt = optimizer();
        let degraded = FrameMetrics {
            fps: 20.0,
            frame_time_ms: 50.0,
            ..Default::default()
        };

        let decisions: Vec<bool> = (0..9).map(|_| opt.should_skip_frame(&degraded)).collect();
        assert_eq!(
            decisions,
            vec![true, true, false, true, true, false, true, true, false]
        );
        assert_eq!(opt.total_skips(), 6);
        assert_eq!(opt.target().settings.read().frames_skipped, 6);
    }

    #[test]
    fn test_healthy_frames_render() {
        let mut opt = optimizer();
        let healthy = FrameMetrics {
            fps: 60.0,
            frame_time_ms: 16.0,
            ..Default::default()
        };
        assert!(!opt.should_skip_frame(&healthy));
        assert_eq!(opt.consecutive_skips(), 0);
    }

    #[test]
    fn test_single_overrun_skips() {
        let mut opt = optimizer();
        let spike = FrameMetrics {
            fps: 58.0,
            frame_time_ms: 40.0,
            ..Default::default()
        };
        assert!(opt.should_skip_frame(&spike));
    }

    #[test]
    fn test_budget_follows_quality_level() {
        let config = OptimizerConfig::default();
        let settings = SharedSettings::new(RenderSettings::from_ladder(&config.quality_levels, 3));
        let mut opt = RenderingOptimizer::new(&config, settings.clone());
        let near_30 = FrameMetrics { fps: 28.0, frame_time_ms: 35.0, ..Default::default() };

        assert!((opt.budget_ms() - 1000.0 / 60.0).abs() < 1e-3);
        assert!(opt.should_skip_frame(&near_30));
        assert!(opt.optimize(&near_30).rules.was_applied("increase_batch_size"));

        assert!(settings.set_quality_level(&config.quality_levels, 1));
        assert!((opt.effective_target_fps() - 30.0).abs() < f32::EPSILON);
        assert!((opt.budget_ms() - 1000.0 / 30.0).abs() < 1e-3);
        assert!(!opt.should_skip_frame(&near_30));
        assert!(!opt.needs_optimization(&near_30));
    }

    #[test]
    fn test_frame_skip_disabled() {
        let config = OptimizerConfig {
            enable_frame_skip: false,
            ..Default::default()
        };
        let mut opt = RenderingOptimizer::new(&config, SharedSettings::default());
        assert!(!opt.should_skip_frame(&FrameMetrics { fps: 5.0, frame_time_ms: 200.0, ..Default::default() }));
    }

    #[test]
    fn test_adaptive_quality_writes_settings() {
        let mut opt = optimizer();
        let slow = FrameMetrics { frame_time_ms: 40.0, ..Default::default() };
        let decision = opt.frame(&slow);
        assert_eq!(decision.quality_scalar, Some(0.95));
        assert!((opt.target().settings.read().quality_scalar - 0.95).abs() < 1e-6);
    }
}
