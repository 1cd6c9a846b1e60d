//! # Effect Notifications
//!
//! Closed set of lifecycle notifications, delivered two ways:
//! - callback listeners, synchronously and in registration order
//! - typed `crossbeam-channel` subscribers, via `try_send`
//!
//! A failing listener is logged and counted; the remaining listeners still
//! receive the notification. With batching on, notifications are buffered
//! and flushed together once the batch delay elapses. Only one flush is
//! ever pending.

use std::fmt;

use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use flare_core::{DeferredScheduler, EffectId, RateMeter};
use thiserror::Error;

/// Why a play request did not produce an effect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejectReason {
    /// Effects are globally disabled.
    Disabled,
    /// No factory under that name.
    Unregistered,
    /// The overflow queue is full.
    QueueFull,
    /// The renderer refused the effect.
    RendererRejected,
    /// The factory or emitter assembly failed.
    ConstructionFailed(String),
}

/// Lifecycle notification.
#[derive(Debug, Clone, PartialEq)]
pub enum EffectNotification {
    // =========================================================================
    // Instance lifecycle
    // =========================================================================
    /// An effect was admitted and started.
    Started {
        /// Instance id.
        id: EffectId,
        /// Registered name.
        name: String,
        /// Clock time at start.
        at_ms: u64,
    },

    /// An effect ran its course and was evicted.
    Completed {
        /// Instance id.
        id: EffectId,
        /// Registered name.
        name: String,
        /// Run duration.
        run_ms: f32,
    },

    /// An effect was stopped by name.
    Stopped {
        /// Instance id.
        id: EffectId,
        /// Registered name.
        name: String,
    },

    // =========================================================================
    // Back-pressure
    // =========================================================================
    /// A request waits in the overflow queue.
    Queued {
        /// Requested name.
        name: String,
        /// Queue length after the push.
        depth: usize,
    },

    /// A request was refused.
    Rejected {
        /// Requested name.
        name: String,
        /// Why.
        reason: RejectReason,
    },

    /// Everything was stopped at once.
    AllStopped {
        /// Live effects that were stopped.
        count: usize,
        /// Queued requests that were discarded.
        discarded: usize,
    },
}

impl EffectNotification {
    /// Discriminant, for filtering.
    #[must_use]
    pub const fn kind(&self) -> NotificationKind {
        match self {
            Self::Started { .. } => NotificationKind::Started,
            Self::Completed { .. } => NotificationKind::Completed,
            Self::Stopped { .. } => NotificationKind::Stopped,
            Self::Queued { .. } => NotificationKind::Queued,
            Self::Rejected { .. } => NotificationKind::Rejected,
            Self::AllStopped { .. } => NotificationKind::AllStopped,
        }
    }
}

/// Notification discriminant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NotificationKind {
    /// [`EffectNotification::Started`]
    Started,
    /// [`EffectNotification::Completed`]
    Completed,
    /// [`EffectNotification::Stopped`]
    Stopped,
    /// [`EffectNotification::Queued`]
    Queued,
    /// [`EffectNotification::Rejected`]
    Rejected,
    /// [`EffectNotification::AllStopped`]
    AllStopped,
}

/// Error a listener may return. Logged and counted, never propagated.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("listener failed: {0}")]
pub struct ListenerError(pub String);

impl ListenerError {
    /// Creates an error from any message.
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Handle returned by `add_listener`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type Callback = Box<dyn FnMut(&EffectNotification) -> Result<(), ListenerError>>;

struct Listener {
    id: ListenerId,
    filter: Option<Vec<NotificationKind>>,
    callback: Callback,
}

impl Listener {
    fn wants(&self, kind: NotificationKind) -> bool {
        self.filter.as_ref().map_or(true, |kinds| kinds.contains(&kind))
    }
}

/// Delivery counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BusStats {
    /// Notifications published.
    pub published: u64,
    /// Successful listener calls.
    pub delivered: u64,
    /// Listener calls that returned an error.
    pub listener_failures: u64,
    /// Notifications a full subscriber channel could not take.
    pub channel_dropped: u64,
    /// Batched flushes performed.
    pub flushes: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BatchKey {
    Notifications,
}

/// Listener registry, subscriber fan-out and batch buffer.
pub struct NotificationBus {
    listeners: Vec<Listener>,
    subscribers: Vec<Sender<EffectNotification>>,
    subscriber_capacity: usize,
    pending: Vec<EffectNotification>,
    scheduler: DeferredScheduler<BatchKey>,
    rate: RateMeter,
    next_listener: u64,
    stats: BusStats,
}

impl NotificationBus {
    /// Creates a bus whose subscriber channels hold `subscriber_capacity`.
    #[must_use]
    pub fn new(subscriber_capacity: usize) -> Self {
        Self {
            listeners: Vec::new(),
            subscribers: Vec::new(),
            subscriber_capacity: subscriber_capacity.max(1),
            pending: Vec::new(),
            scheduler: DeferredScheduler::new(),
            rate: RateMeter::new(),
            next_listener: 1,
            stats: BusStats::default(),
        }
    }

    /// Adds a listener for every notification.
    pub fn add_listener<F>(&mut self, callback: F) -> ListenerId
    where
        F: FnMut(&EffectNotification) -> Result<(), ListenerError> + 'static,
    {
        self.push_listener(None, Box::new(callback))
    }

    /// Adds a listener for some kinds only.
    pub fn add_filtered_listener<F>(&mut self, kinds: &[NotificationKind], callback: F) -> ListenerId
    where
        F: FnMut(&EffectNotification) -> Result<(), ListenerError> + 'static,
    {
        self.push_listener(Some(kinds.to_vec()), Box::new(callback))
    }

    fn push_listener(&mut self, filter: Option<Vec<NotificationKind>>, callback: Callback) -> ListenerId {
        let id = ListenerId(self.next_listener);
        self.next_listener += 1;
        self.listeners.push(Listener { id, filter, callback });
        id
    }

    /// Removes a listener. Returns true if it existed.
    pub fn remove_listener(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|l| l.id != id);
        self.listeners.len() != before
    }

    /// Opens a typed subscriber channel.
    pub fn subscribe(&mut self) -> Receiver<EffectNotification> {
        let (sender, receiver) = bounded(self.subscriber_capacity);
        self.subscribers.push(sender);
        receiver
    }

    /// Publishes one notification.
    ///
    /// `batch_delay_ms` of `Some(..)` buffers it and schedules a flush
    /// (unless one is already pending); `None` delivers immediately, after
    /// anything still buffered from an earlier batch.
    pub fn publish(&mut self, notification: EffectNotification, now_ms: u64, batch_delay_ms: Option<u64>) {
        self.stats.published += 1;
        self.rate.record(now_ms, 1);

        match batch_delay_ms {
            Some(delay) => {
                self.pending.push(notification);
                self.scheduler.schedule(BatchKey::Notifications, now_ms, delay);
            }
            None => {
                if !self.pending.is_empty() {
                    self.flush();
                }
                self.deliver(&notification);
            }
        }
    }

    /// Flushes the batch if its deadline has passed. Returns notifications delivered.
    pub fn pump(&mut self, now_ms: u64) -> usize {
        if self.scheduler.take_due(now_ms).is_empty() {
            return 0;
        }
        self.flush_pending()
    }

    /// Delivers everything buffered right now.
    pub fn flush(&mut self) -> usize {
        self.scheduler.cancel(BatchKey::Notifications);
        self.flush_pending()
    }

    fn flush_pending(&mut self) -> usize {
        if self.pending.is_empty() {
            return 0;
        }
        let batch = std::mem::take(&mut self.pending);
        for notification in &batch {
            self.deliver(notification);
        }
        self.stats.flushes += 1;
        batch.len()
    }

    /// Drops buffered notifications and the pending flush.
    pub fn cancel_pending(&mut self) -> usize {
        self.scheduler.clear();
        let dropped = self.pending.len();
        self.pending.clear();
        dropped
    }

    /// Drops every listener and subscriber.
    pub fn clear_listeners(&mut self) {
        self.listeners.clear();
        self.subscribers.clear();
    }

    fn deliver(&mut self, notification: &EffectNotification) {
        let kind = notification.kind();
        for listener in &mut self.listeners {
            if !listener.wants(kind) {
                continue;
            }
            match (listener.callback)(notification) {
                Ok(()) => self.stats.delivered += 1,
                Err(err) => {
                    self.stats.listener_failures += 1;
                    tracing::warn!("Listener {:?} failed on {:?}: {}", listener.id, kind, err);
                }
            }
        }

        let mut dropped = 0;
        self.subscribers.retain(|tx| match tx.try_send(notification.clone()) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                dropped += 1;
                true
            }
            Err(TrySendError::Disconnected(_)) => false,
        });
        self.stats.channel_dropped += dropped;
    }

    /// Buffered notifications.
    #[must_use]
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Is a flush scheduled?
    #[must_use]
    pub fn flush_pending_scheduled(&self) -> bool {
        self.scheduler.is_pending(BatchKey::Notifications)
    }

    /// Registered listeners.
    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    /// Live subscriber channels.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    /// Notifications published over the last second.
    pub fn events_per_second(&mut self, now_ms: u64) -> f32 {
        self.rate.rate(now_ms)
    }

    /// Counters.
    #[must_use]
    pub const fn stats(&self) -> BusStats {
        self.stats
    }
}

impl fmt::Debug for NotificationBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NotificationBus")
            .field("listeners", &self.listeners.len())
            .field("subscribers", &self.subscribers.len())
            .field("pending", &self.pending.len())
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}
