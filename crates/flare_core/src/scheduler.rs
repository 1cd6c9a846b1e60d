//! Deferred task scheduler.
//!
//! Holds at most one pending deadline per key. Scheduling a key that is
//! already pending is a no-op, so bursts of work coalesce into one flush.

/// Keyed one-shot deadlines.
#[derive(Debug, Clone)]
pub struct DeferredScheduler<K> {
    /// `(key, due_ms)` in scheduling order.
    pending: Vec<(K, u64)>,
}

impl<K: Copy + Eq> DeferredScheduler<K> {
    /// Creates an empty scheduler.
    #[must_use]
    pub const fn new() -> Self {
        Self { pending: Vec::new() }
    }

    /// Schedules `key` to fire `delay_ms` after `now_ms`.
    ///
    /// Returns false (and keeps the original deadline) if `key` is pending.
    pub fn schedule(&mut self, key: K, now_ms: u64, delay_ms: u64) -> bool {
        if self.is_pending(key) {
            return false;
        }
        self.pending.push((key, now_ms.saturating_add(delay_ms)));
        true
    }

    /// Is `key` waiting to fire?
    #[must_use]
    pub fn is_pending(&self, key: K) -> bool {
        self.pending.iter().any(|(k, _)| *k == key)
    }

    /// Removes and returns every key due at `now_ms`, in scheduling order.
    pub fn take_due(&mut self, now_ms: u64) -> Vec<K> {
        let mut due = Vec::new();
        self.pending.retain(|&(key, at)| {
            if at <= now_ms {
                due.push(key);
                false
            } else {
                true
            }
        });
        due
    }

    /// Cancels one key. Returns true if it was pending.
    pub fn cancel(&mut self, key: K) -> bool {
        let before = self.pending.len();
        self.pending.retain(|(k, _)| *k != key);
        self.pending.len() != before
    }

    /// Cancels everything.
    pub fn clear(&mut self) {
        self.pending.clear();
    }

    /// Number of pending keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// True when nothing is pending.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

impl<K: Copy + Eq> Default for DeferredScheduler<K> {
    fn default() -> Self {
        Self::new()
    }
}
