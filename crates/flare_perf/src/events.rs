//! # Event System Optimizer
//!
//! Switches notification delivery between immediate and batched, and widens
//! the batch window when buffered notifications pile up.

use flare_core::{FrameMetrics, SharedSettings};

use crate::config::OptimizerConfig;
use crate::rules::{Rule, RuleSet, RuleSkip};
use crate::system::{Optimizer, SystemKind, SystemReport};

/// What the event rules act on.
#[derive(Debug, Clone)]
pub struct EventTarget {
    /// Shared render settings (batching knobs).
    pub settings: SharedSettings,
    /// Batch delay ceiling.
    pub max_batch_delay_ms: u64,
}

/// Notification batching optimizer.
#[derive(Debug)]
pub struct EventSystemOptimizer {
    target: EventTarget,
    rules: RuleSet<EventTarget>,
}

impl EventSystemOptimizer {
    /// Builds the optimizer over the shared settings.
    #[must_use]
    pub fn new(config: &OptimizerConfig, settings: SharedSettings) -> Self {
        let rate = config.event_rate_threshold;
        let pending = config.pending_threshold;
        let ceiling = config.target_fps;
        let current = settings.clone();

        let rules = RuleSet::new()
            .with(Rule::new(
                "enable_batching",
                1,
                move |m: &FrameMetrics| m.events_per_second > rate,
                |t: &EventTarget, m: &FrameMetrics| {
                    let mut settings = t.settings.write();
                    if settings.notification_batching {
                        return Err(RuleSkip::AtCeiling);
                    }
                    settings.notification_batching = true;
                    Ok(format!("batching on at {:.0} events/s", m.events_per_second))
                },
            ))
            .with(Rule::new(
                "extend_batch_delay",
                2,
                move |m: &FrameMetrics| m.pending_notifications > pending,
                |t: &EventTarget, _| {
                    let mut settings = t.settings.write();
                    let before = settings.notification_batch_ms;
                    if before >= t.max_batch_delay_ms {
                        return Err(RuleSkip::AtCeiling);
                    }
                    let next = before.max(1).saturating_mul(2).min(t.max_batch_delay_ms);
                    settings.notification_batch_ms = next;
                    Ok(format!("batch delay {before}ms -> {next}ms"))
                },
            ))
            .with(Rule::new(
                "disable_batching",
                3,
                move |m: &FrameMetrics| {
                    let (batching, fps) = {
                        let s = current.read();
                        (s.notification_batching, s.effective_target_fps(ceiling))
                    };
                    m.events_per_second < rate / 2.0 && m.fps >= fps && batching
                },
                |t: &EventTarget, _| {
                    let mut settings = t.settings.write();
                    if !settings.notification_batching {
                        return Err(RuleSkip::AtFloor);
                    }
                    settings.notification_batching = false;
                    Ok("batching off".into())
                },
            ));

        Self {
            target: EventTarget {
                settings,
                max_batch_delay_ms: config.max_batch_delay_ms,
            },
            rules,
        }
    }

    /// The handles this optimizer mutates.
    #[must_use]
    pub const fn target(&self) -> &EventTarget {
        &self.target
    }
}

impl Optimizer for EventSystemOptimizer {
    fn kind(&self) -> SystemKind {
        SystemKind::Events
    }

    fn needs_optimization(&self, metrics: &FrameMetrics) -> bool {
        self.rules.any_matches(metrics)
    }

    fn optimize(&mut self, metrics: &FrameMetrics) -> SystemReport {
        SystemReport {
            system: SystemKind::Events,
            rules: self.rules.evaluate(&self.target, metrics),
            memory_freed_bytes: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::SkipReason;

    fn optimizer() -> EventSystemOptimizer {
        EventSystemOptimizer::new(&OptimizerConfig::default(), SharedSettings::default())
    }

    #[test]
    fn test_busy_bus_enables_batching() {
        let mut opt = optimizer();
        let busy = FrameMetrics {
            fps: 60.0,
            events_per_second: 500.0,
            pending_notifications: 100,
            ..Default::default()
        };
        let report = opt.optimize(&busy);
        assert!(report.rules.was_applied("enable_batching"));
        assert!(report.rules.was_applied("extend_batch_delay"));

        let settings = opt.target().settings.snapshot();
        assert!(settings.notification_batching);
        assert_eq!(settings.notification_batch_ms, 32);

        for _ in 0..4 {
            opt.optimize(&busy);
        }
        assert_eq!(opt.target().settings.read().notification_batch_ms, 128);
        let report = opt.optimize(&busy);
        assert_eq!(report.rules.skip_reason("enable_batching"), Some(&SkipReason::AtCeiling));
        assert_eq!(report.rules.skip_reason("extend_batch_delay"), Some(&SkipReason::AtCeiling));
    }

    #[test]
    fn test_quiet_bus_disables_batching() {
        let mut opt = optimizer();
        opt.target().settings.write().notification_batching = true;

        let quiet = FrameMetrics { fps: 60.0, events_per_second: 10.0, ..Default::default() };
        let report = opt.optimize(&quiet);
        assert!(report.rules.was_applied("disable_batching"));

        assert!(!opt.needs_optimization(&quiet));
    }

    #[test]
    fn test_quiet_bus_at_low_level_disables_batching() {
        let config = OptimizerConfig::default();
        let settings = SharedSettings::new(flare_core::RenderSettings::from_ladder(&config.quality_levels, 1));
        settings.write().notification_batching = true;
        let mut opt = EventSystemOptimizer::new(&config, settings);

        let quiet = FrameMetrics { fps: 40.0, events_per_second: 10.0, ..Default::default() };
        assert!(opt.optimize(&quiet).rules.was_applied("disable_batching"));
    }
}
