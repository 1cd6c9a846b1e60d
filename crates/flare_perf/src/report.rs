//! Aggregated coordinator pass reports.

use flare_core::FrameMetrics;

use crate::rules::AppliedRule;
use crate::system::{SystemKind, SystemReport};

/// Outcome of one coordinator pass over every supplied optimizer.
#[derive(Debug, Clone, PartialEq)]
pub struct OptimizationReport {
    /// When the pass ran.
    pub timestamp_ms: u64,
    /// Snapshot the pass evaluated.
    pub metrics: FrameMetrics,
    /// One entry per optimizer, in evaluation order.
    pub systems: Vec<SystemReport>,
    /// Rules applied across all systems.
    pub total_applied: usize,
    /// Rules skipped across all systems.
    pub total_skipped: usize,
    /// Bytes released across all systems.
    pub memory_freed_bytes: usize,
}

impl OptimizationReport {
    /// Sums per-system results.
    #[must_use]
    pub fn from_systems(timestamp_ms: u64, metrics: FrameMetrics, systems: Vec<SystemReport>) -> Self {
        let total_applied = systems.iter().map(|s| s.rules.applied.len()).sum();
        let total_skipped = systems.iter().map(|s| s.rules.skipped.len()).sum();
        let memory_freed_bytes = systems.iter().map(|s| s.memory_freed_bytes).sum();
        Self {
            timestamp_ms,
            metrics,
            systems,
            total_applied,
            total_skipped,
            memory_freed_bytes,
        }
    }

    /// Did anything change?
    #[must_use]
    pub const fn improved(&self) -> bool {
        self.total_applied > 0
    }

    /// Every applied rule with its system.
    pub fn applied(&self) -> impl Iterator<Item = (SystemKind, &AppliedRule)> {
        self.systems
            .iter()
            .flat_map(|s| s.rules.applied.iter().map(move |r| (s.system, r)))
    }

    /// Did `rule` apply in `system`?
    #[must_use]
    pub fn was_applied(&self, system: SystemKind, rule: &str) -> bool {
        self.system(system).is_some_and(|s| s.rules.was_applied(rule))
    }

    /// One system's report.
    #[must_use]
    pub fn system(&self, system: SystemKind) -> Option<&SystemReport> {
        self.systems.iter().find(|s| s.system == system)
    }
}
