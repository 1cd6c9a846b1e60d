//! # Rule Engine
//!
//! A rule is `condition(metrics) -> priority -> action(target)`. A rule set
//! evaluates every rule against one snapshot, lowest priority number
//! first, and partitions the outcome into applied and skipped.

use std::fmt;

use flare_core::FrameMetrics;
use thiserror::Error;

/// Why an action declined to act.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RuleSkip {
    /// The knob is already at its lower bound.
    #[error("already at floor")]
    AtFloor,
    /// The knob is already at its upper bound.
    #[error("already at ceiling")]
    AtCeiling,
    /// The action failed.
    #[error("action failed: {0}")]
    Failed(String),
}

/// Why a rule ended up in `skipped`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// Condition false for this snapshot.
    ConditionUnmet,
    /// Knob at its lower bound.
    AtFloor,
    /// Knob at its upper bound.
    AtCeiling,
    /// Action failed.
    ActionFailed(String),
}

impl From<RuleSkip> for SkipReason {
    fn from(skip: RuleSkip) -> Self {
        match skip {
            RuleSkip::AtFloor => Self::AtFloor,
            RuleSkip::AtCeiling => Self::AtCeiling,
            RuleSkip::Failed(msg) => Self::ActionFailed(msg),
        }
    }
}

/// Outcome of an action: a human-readable detail or a skip.
pub type ActionResult = Result<String, RuleSkip>;

type Condition = Box<dyn Fn(&FrameMetrics) -> bool + Send + Sync>;
type Action<T> = Box<dyn Fn(&T, &FrameMetrics) -> ActionResult + Send + Sync>;

/// One optimization rule.
pub struct Rule<T> {
    name: &'static str,
    priority: u8,
    condition: Condition,
    action: Action<T>,
}

impl<T> Rule<T> {
    /// Creates a rule.
    pub fn new<C, A>(name: &'static str, priority: u8, condition: C, action: A) -> Self
    where
        C: Fn(&FrameMetrics) -> bool + Send + Sync + 'static,
        A: Fn(&T, &FrameMetrics) -> ActionResult + Send + Sync + 'static,
    {
        Self {
            name,
            priority,
            condition: Box::new(condition),
            action: Box::new(action),
        }
    }

    /// Rule name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// Evaluation order (lower first).
    #[must_use]
    pub const fn priority(&self) -> u8 {
        self.priority
    }

    /// Does the condition hold?
    #[must_use]
    pub fn matches(&self, metrics: &FrameMetrics) -> bool {
        (self.condition)(metrics)
    }
}

impl<T> fmt::Debug for Rule<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rule")
            .field("name", &self.name)
            .field("priority", &self.priority)
            .finish_non_exhaustive()
    }
}

/// A rule whose action ran.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppliedRule {
    /// Rule name.
    pub name: &'static str,
    /// Rule priority.
    pub priority: u8,
    /// What changed.
    pub detail: String,
}

/// A rule that did not act.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedRule {
    /// Rule name.
    pub name: &'static str,
    /// Why.
    pub reason: SkipReason,
}

/// Outcome of one rule-set pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuleReport {
    /// Rules that acted, in evaluation order.
    pub applied: Vec<AppliedRule>,
    /// Rules that did not act, in evaluation order.
    pub skipped: Vec<SkippedRule>,
}

impl RuleReport {
    /// Did `name` act?
    #[must_use]
    pub fn was_applied(&self, name: &str) -> bool {
        self.applied.iter().any(|r| r.name == name)
    }

    /// Skip reason for `name`, if it was skipped.
    #[must_use]
    pub fn skip_reason(&self, name: &str) -> Option<&SkipReason> {
        self.skipped.iter().find(|r| r.name == name).map(|r| &r.reason)
    }
}

/// Priority-ordered rules over one target.
pub struct RuleSet<T> {
    rules: Vec<Rule<T>>,
}

impl<T> RuleSet<T> {
    /// Empty set.
    #[must_use]
    pub const fn new() -> Self {
        Self { rules: Vec::new() }
    }

    /// Adds a rule. Equal priorities keep insertion order.
    pub fn add(&mut self, rule: Rule<T>) {
        let at = self.rules.partition_point(|r| r.priority <= rule.priority);
        self.rules.insert(at, rule);
    }

    /// Builder form of [`RuleSet::add`].
    #[must_use]
    pub fn with(mut self, rule: Rule<T>) -> Self {
        self.add(rule);
        self
    }

    /// Does any condition hold?
    #[must_use]
    pub fn any_matches(&self, metrics: &FrameMetrics) -> bool {
        self.rules.iter().any(|r| r.matches(metrics))
    }

    /// Runs every rule against one snapshot.
    pub fn evaluate(&self, target: &T, metrics: &FrameMetrics) -> RuleReport {
        let mut report = RuleReport::default();
        for rule in &self.rules {
            if !rule.matches(metrics) {
                report.skipped.push(SkippedRule {
                    name: rule.name,
                    reason: SkipReason::ConditionUnmet,
                });
                continue;
            }
            match (rule.action)(target, metrics) {
                Ok(detail) => {
                    tracing::debug!("Rule '{}' applied: {}", rule.name, detail);
                    report.applied.push(AppliedRule {
                        name: rule.name,
                        priority: rule.priority,
                        detail,
                    });
                }
                Err(skip) => {
                    if let RuleSkip::Failed(msg) = &skip {
                        tracing::warn!("Rule '{}' failed: {}", rule.name, msg);
                    } else {
                        tracing::debug!("Rule '{}' skipped: {}", rule.name, skip);
                    }
                    report.skipped.push(SkippedRule {
                        name: rule.name,
                        reason: skip.into(),
                    });
                }
            }
        }
        report
    }

    /// Rule names in evaluation order.
    #[must_use]
    pub fn names(&self) -> Vec<&'static str> {
        self.rules.iter().map(|r| r.name).collect()
    }

    /// Number of rules.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// True when empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl<T> Default for RuleSet<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for RuleSet<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.rules.iter()).finish()
    }
}
