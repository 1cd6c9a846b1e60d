//! Effect instance identifiers.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Unique id of a live effect instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EffectId(pub u64);

impl fmt::Display for EffectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "fx#{}", self.0)
    }
}

/// Source of effect ids.
pub trait IdSource: Send + Sync {
    /// Returns the next id. Never repeats within one source.
    fn next_id(&self) -> EffectId;
}

/// Id source handle shared between components.
pub type SharedIds = Arc<dyn IdSource>;

/// Process-wide counter. Every instance draws from the same sequence.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessIds;

impl IdSource for ProcessIds {
    fn next_id(&self) -> EffectId {
        static NEXT_ID: AtomicU64 = AtomicU64::new(1);
        EffectId(NEXT_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// Local counter starting at 1, for reproducible tests.
#[derive(Debug, Default)]
pub struct SequentialIds {
    next: AtomicU64,
}

impl SequentialIds {
    /// Creates a counter whose first id is 1.
    #[must_use]
    pub fn new() -> Self {
        Self {
            next: AtomicU64::new(1),
        }
    }
}

impl IdSource for SequentialIds {
    fn next_id(&self) -> EffectId {
        // `Default` starts at 0; skip it so ids are always >= 1.
        let id = self.next.fetch_add(1, Ordering::Relaxed);
        if id == 0 {
            EffectId(self.next.fetch_add(1, Ordering::Relaxed))
        } else {
            EffectId(id)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sequential_ids() {
        let ids = SequentialIds::new();
        assert_eq!(ids.next_id(), EffectId(1));
        assert_eq!(ids.next_id(), EffectId(2));

        let defaulted = SequentialIds::default();
        assert_eq!(defaulted.next_id(), EffectId(1));
    }

    #[test]
    fn test_process_ids_unique() {
        let a = ProcessIds.next_id();
        let b = ProcessIds.next_id();
        assert_ne!(a, b);
    }

    #[test]
    fn test_display() {
        assert_eq!(EffectId(7).to_string(), "fx#7");
    }
}
