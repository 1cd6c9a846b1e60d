//! # FLARE Perf
//!
//! Self-regulation for the effects engine.
//!
//! Optimizers hold a small priority-ordered rule set and mutate the shared
//! render settings and particle pool directly. The coordinator decides when
//! they run.
//!
//! ## Architecture Rules
//!
//! 1. **Knobs, not effects** - optimizers never reach into live effects
//! 2. **Skips are data** - a rule that cannot act reports why
//! 3. **Bounded** - history and frame skipping both have hard caps
//!
//! ## Example
//!
//! ```rust,ignore
//! use flare_perf::{OptimizationCoordinator, OptimizerConfig};
//!
//! let mut coordinator = OptimizationCoordinator::standard(OptimizerConfig::default(), &settings, &pool)?;
//! if let Some(report) = coordinator.tick(now_ms, &metrics) {
//!     println!("{} rules applied", report.total_applied);
//! }
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod config;
pub mod coordinator;
pub mod events;
pub mod history;
pub mod memory;
pub mod particle;
pub mod quality;
pub mod rendering;
pub mod report;
pub mod rules;
pub mod system;

pub use config::{AdaptiveQualityConfig, OptimizerConfig};
pub use coordinator::{CoordinatorBuilder, CoordinatorStats, OptimizationCoordinator};
pub use events::{EventSystemOptimizer, EventTarget};
pub use history::ActionHistory;
pub use memory::{MemoryOptimizer, MemoryTarget};
pub use particle::{ParticleOptimizer, ParticleTarget};
pub use quality::AdaptiveQuality;
pub use rendering::{FrameDecision, RenderTarget, RenderingOptimizer};
pub use report::OptimizationReport;
pub use rules::{
    ActionResult, AppliedRule, Rule, RuleReport, RuleSet, RuleSkip, SkipReason, SkippedRule,
};
pub use system::{Optimizer, SystemKind, SystemReport};
