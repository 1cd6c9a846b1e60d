//! The seam between the coordinator and the concrete optimizers.

use std::fmt;

use flare_core::{FrameMetrics, Particle, SharedParticlePool};

use crate::rules::RuleReport;

/// Which optimizer produced a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SystemKind {
    /// Particle budget and quality ladder.
    Particle,
    /// LOD, batching, frame skipping, adaptive quality.
    Rendering,
    /// Pool trimming.
    Memory,
    /// Notification batching.
    Events,
}

impl fmt::Display for SystemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Particle => "particle",
            Self::Rendering => "rendering",
            Self::Memory => "memory",
            Self::Events => "events",
        };
        f.write_str(name)
    }
}

/// One optimizer's share of a coordinator pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SystemReport {
    /// Producer.
    pub system: SystemKind,
    /// Applied and skipped rules.
    pub rules: RuleReport,
    /// Bytes released from the particle pool.
    pub memory_freed_bytes: usize,
}

/// A rule-driven optimizer.
pub trait Optimizer {
    /// Which system this is.
    fn kind(&self) -> SystemKind;

    /// Would any rule fire for this snapshot?
    fn needs_optimization(&self, metrics: &FrameMetrics) -> bool;

    /// Evaluates every rule once.
    fn optimize(&mut self, metrics: &FrameMetrics) -> SystemReport;
}

/// Runs `pass` and measures how many pooled particles it discarded, in bytes.
pub(crate) fn measure_freed<R>(pool: &SharedParticlePool, pass: impl FnOnce() -> R) -> (R, usize) {
    let before = pool.lock().stats().discarded;
    let result = pass();
    let after = pool.lock().stats().discarded;
    let freed = usize::try_from(after.saturating_sub(before)).unwrap_or(usize::MAX);
    (result, freed.saturating_mul(Particle::SIZE))
}
