//! # Effect Orchestrator
//!
//! Owns every live effect and drives them once per frame.
//!
//! ## Admission
//!
//! ```text
//! play_effect(name) ──> disabled / unregistered? ──> false (silent)
//!        │
//!        ├── at capacity ──> FIFO overflow queue ──> false
//!        │
//!        └── construct ──> renderer.add_effect ──> start ──> Started
//! ```
//!
//! Every eviction (completion or `stop_effect`) replays exactly one queued
//! request, oldest first. A replay that finds no room goes back to the
//! front of the queue.
//!
//! ## Rules
//!
//! - Live effects never exceed `max_concurrent_effects`
//! - Particles go back to the pool before the next request is admitted
//! - Per-frame calls never fail; they degrade and count

use std::collections::VecDeque;
use std::sync::Arc;

use crossbeam_channel::Receiver;
use flare_core::{
    EffectId, FlareResult, FrameMetrics, ParticlePool, PoolConfig, PoolStats, ProcessIds,
    RenderSettings, SharedClock, SharedIds, SharedParticlePool, SharedRng, SharedSettings,
    SystemClock,
};

use crate::config::{OrchestratorConfig, OrchestratorConfigPatch, PlayRequest};
use crate::effect::VisualEffect;
use crate::emitter::EmitContext;
use crate::notify::{
    BusStats, EffectNotification, ListenerError, ListenerId, NotificationBus, NotificationKind,
    RejectReason,
};
use crate::registry::{EffectFactory, EffectRegistry, EffectSpawn};
use crate::renderer::{EffectRenderer, ParticleInstance, RenderFrame, SurfaceStats};

/// Orchestrator counters.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct OrchestratorStats {
    /// Effects admitted.
    pub played: u64,
    /// Effects live right now.
    pub active: usize,
    /// Requests waiting in the overflow queue.
    pub queued: usize,
    /// Effects evicted after running their course.
    pub completed: u64,
    /// Effects stopped explicitly.
    pub stopped: u64,
    /// Requests refused (disabled, unregistered, renderer, construction).
    pub rejected: u64,
    /// Requests dropped because the queue was full.
    pub dropped: u64,
    /// Queued requests taken off the queue for replay.
    pub replayed: u64,
    /// Live particles across all effects.
    pub live_particles: usize,
    /// Pool counters.
    pub pool: PoolStats,
    /// Notification counters.
    pub notifications: BusStats,
    /// Renderer counters.
    pub surface: SurfaceStats,
}

#[derive(Debug, Default)]
struct Counters {
    played: u64,
    completed: u64,
    stopped: u64,
    rejected: u64,
    dropped: u64,
    replayed: u64,
}

struct LiveEffect {
    effect: Box<dyn VisualEffect>,
    /// Milliseconds since admission, accumulated from `dt`.
    age_ms: f32,
    /// Nominal duration plus the settling grace period.
    evict_after_ms: f32,
}

impl LiveEffect {
    fn is_settled(&self) -> bool {
        !self.effect.is_active() && self.age_ms >= self.evict_after_ms
    }
}

#[derive(Debug)]
struct QueuedRequest {
    name: String,
    request: PlayRequest,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Origin {
    Call,
    Replay,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Completed,
    Stopped,
}

/// Collaborator wiring for an [`EffectOrchestrator`].
///
/// Anything not supplied gets a production default: built-in recipes,
/// a fresh pool, system clock, process-wide ids.
#[derive(Default)]
pub struct OrchestratorBuilder {
    config: OrchestratorConfig,
    registry: Option<EffectRegistry>,
    pool: Option<SharedParticlePool>,
    settings: Option<SharedSettings>,
    clock: Option<SharedClock>,
    ids: Option<SharedIds>,
    rng: Option<SharedRng>,
}

impl OrchestratorBuilder {
    /// Starts from a configuration.
    #[must_use]
    pub fn new(config: OrchestratorConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// Uses this registry instead of the built-in recipes.
    #[must_use]
    pub fn with_registry(mut self, registry: EffectRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Shares an existing particle pool.
    #[must_use]
    pub fn with_pool(mut self, pool: SharedParticlePool) -> Self {
        self.pool = Some(pool);
        self
    }

    /// Shares existing render settings.
    #[must_use]
    pub fn with_settings(mut self, settings: SharedSettings) -> Self {
        self.settings = Some(settings);
        self
    }

    /// Injects a clock.
    #[must_use]
    pub fn with_clock(mut self, clock: SharedClock) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Injects an id source.
    #[must_use]
    pub fn with_ids(mut self, ids: SharedIds) -> Self {
        self.ids = Some(ids);
        self
    }

    /// Injects the generator used by template samplers.
    #[must_use]
    pub fn with_rng(mut self, rng: SharedRng) -> Self {
        self.rng = Some(rng);
        self
    }

    /// Builds the orchestrator around a renderer.
    ///
    /// # Errors
    ///
    /// Returns [`flare_core::FlareError::InvalidConfig`] for invalid limits.
    pub fn build<R: EffectRenderer>(self, renderer: R) -> FlareResult<EffectOrchestrator<R>> {
        self.config.validate()?;

        let registry = match self.registry {
            Some(registry) => registry,
            None => EffectRegistry::with_builtin()?,
        };
        let pool = match self.pool {
            Some(pool) => pool,
            None => ParticlePool::particles(PoolConfig::default())?.into_shared(),
        };
        let bus = NotificationBus::new(self.config.subscriber_capacity);

        tracing::info!(
            "Effect orchestrator ready: {} effects registered, max {} concurrent",
            registry.len(),
            self.config.max_concurrent_effects
        );

        Ok(EffectOrchestrator {
            config: self.config,
            registry,
            renderer,
            pool,
            settings: self
                .settings
                .unwrap_or_else(|| SharedSettings::new(RenderSettings::default())),
            clock: self.clock.unwrap_or_else(SystemClock::shared),
            ids: self.ids.unwrap_or_else(|| Arc::new(ProcessIds)),
            rng: self.rng.unwrap_or_default(),
            live: Vec::new(),
            queue: VecDeque::new(),
            bus,
            instances: Vec::new(),
            counters: Counters::default(),
            destroyed: false,
        })
    }
}

/// Effect orchestrator.
pub struct EffectOrchestrator<R: EffectRenderer> {
    config: OrchestratorConfig,
    registry: EffectRegistry,
    renderer: R,
    pool: SharedParticlePool,
    settings: SharedSettings,
    clock: SharedClock,
    ids: SharedIds,
    rng: SharedRng,
    /// Live effects in admission order.
    live: Vec<LiveEffect>,
    queue: VecDeque<QueuedRequest>,
    bus: NotificationBus,
    /// Reused upload buffer.
    instances: Vec<ParticleInstance>,
    counters: Counters,
    destroyed: bool,
}

impl<R: EffectRenderer> EffectOrchestrator<R> {
    /// Orchestrator with default collaborators.
    ///
    /// # Errors
    ///
    /// See [`OrchestratorBuilder::build`].
    pub fn new(config: OrchestratorConfig, renderer: R) -> FlareResult<Self> {
        OrchestratorBuilder::new(config).build(renderer)
    }

    // =========================================================================
    // Playback
    // =========================================================================

    /// Plays an effect.
    ///
    /// Returns true if it started now. False covers: effects disabled,
    /// unknown name, queued for later, or refused by the renderer.
    pub fn play_effect(&mut self, name: &str, request: PlayRequest) -> bool {
        self.admit(name, request, Origin::Call)
    }

    fn admit(&mut self, name: &str, request: PlayRequest, origin: Origin) -> bool {
        if self.destroyed {
            return false;
        }
        if !self.config.enable_effects {
            self.reject(name, RejectReason::Disabled);
            return false;
        }
        if !self.registry.contains(name) {
            tracing::debug!("play_effect: '{}' is not registered", name);
            self.reject(name, RejectReason::Unregistered);
            return false;
        }
        if self.live.len() >= self.config.max_concurrent_effects {
            match origin {
                Origin::Call => self.enqueue(name, request),
                Origin::Replay => self.queue.push_front(QueuedRequest {
                    name: name.to_owned(),
                    request,
                }),
            }
            return false;
        }
        self.launch(name, request)
    }

    fn launch(&mut self, name: &str, request: PlayRequest) -> bool {
        let settings = self.config.resolve(name, &request.overrides);
        let evict_after_ms = settings.lifespan().millis().unwrap_or(0) as f32
            + self.config.settle_grace_ms as f32;
        let spawn = EffectSpawn {
            id: self.ids.next_id(),
            name: name.to_owned(),
            settings,
            params: request.params,
            rng: self.rng.clone(),
        };

        let mut effect = match self.registry.create(spawn) {
            Ok(effect) => effect,
            Err(err) => {
                tracing::warn!("Effect '{}' construction failed: {}", name, err);
                self.reject(name, RejectReason::ConstructionFailed(err.to_string()));
                return false;
            }
        };
        if let Err(err) = effect.initialize() {
            tracing::warn!("Effect '{}' construction failed: {}", name, err);
            self.reject(name, RejectReason::ConstructionFailed(err.to_string()));
            return false;
        }

        if !self.renderer.add_effect(&effect.info()) {
            tracing::warn!("Renderer rejected effect '{}' ({})", name, effect.id());
            self.reject(name, RejectReason::RendererRejected);
            return false;
        }
        if let Err(err) = effect.start(request.position) {
            tracing::warn!("Effect '{}' failed to start: {}", name, err);
            self.renderer.remove_effect(effect.id());
            self.reject(name, RejectReason::ConstructionFailed(err.to_string()));
            return false;
        }

        let id = effect.id();
        self.live.push(LiveEffect {
            effect,
            age_ms: 0.0,
            evict_after_ms,
        });
        self.counters.played += 1;

        let at_ms = self.clock.now_ms();
        self.notify(EffectNotification::Started {
            id,
            name: name.to_owned(),
            at_ms,
        });
        true
    }

    fn enqueue(&mut self, name: &str, request: PlayRequest) {
        if self.queue.len() >= self.config.max_queued_effects {
            self.counters.dropped += 1;
            tracing::warn!(
                "Effect queue full ({}), dropping '{}'",
                self.config.max_queued_effects,
                name
            );
            self.notify(EffectNotification::Rejected {
                name: name.to_owned(),
                reason: RejectReason::QueueFull,
            });
            return;
        }

        self.queue.push_back(QueuedRequest {
            name: name.to_owned(),
            request,
        });
        let depth = self.queue.len();
        tracing::debug!("Queued '{}' (depth {})", name, depth);
        self.notify(EffectNotification::Queued {
            name: name.to_owned(),
            depth,
        });
    }

    fn reject(&mut self, name: &str, reason: RejectReason) {
        self.counters.rejected += 1;
        self.notify(EffectNotification::Rejected {
            name: name.to_owned(),
            reason,
        });
    }

    /// Takes one request off the queue if there is room. True if it started.
    fn replay_one(&mut self) -> bool {
        if self.live.len() >= self.config.max_concurrent_effects {
            return false;
        }
        let Some(queued) = self.queue.pop_front() else {
            return false;
        };
        self.counters.replayed += 1;
        tracing::debug!("Replaying '{}' ({} still queued)", queued.name, self.queue.len());
        self.admit(&queued.name, queued.request, Origin::Replay)
    }

    fn drain_queue(&mut self) -> usize {
        let mut started = 0;
        while self.live.len() < self.config.max_concurrent_effects && !self.queue.is_empty() {
            if self.replay_one() {
                started += 1;
            }
        }
        started
    }

    /// Stops the earliest-started live effect with this name and replays
    /// one queued request. Returns false if none is live.
    pub fn stop_effect(&mut self, name: &str) -> bool {
        let Some(index) = self.live.iter().position(|l| l.effect.name() == name) else {
            return false;
        };
        let live = self.live.remove(index);
        self.retire(live, Outcome::Stopped);
        self.replay_one();
        true
    }

    /// Stops everything, empties the queue and cancels batched notifications.
    ///
    /// Publishes a single [`EffectNotification::AllStopped`] instead of one
    /// notification per instance.
    pub fn stop_all_effects(&mut self) {
        let count = self.live.len();
        {
            let mut pool = self.pool.lock();
            for mut live in self.live.drain(..) {
                live.effect.stop();
                live.effect.release_particles(&mut pool);
                self.renderer.remove_effect(live.effect.id());
            }
        }
        let discarded = self.queue.len();
        self.queue.clear();
        self.bus.cancel_pending();
        self.counters.stopped += count as u64;

        if count > 0 || discarded > 0 {
            tracing::info!("Stopped all effects ({} live, {} queued)", count, discarded);
        }
        let now = self.clock.now_ms();
        self.bus
            .publish(EffectNotification::AllStopped { count, discarded }, now, None);
    }

    fn retire(&mut self, live: LiveEffect, outcome: Outcome) {
        let LiveEffect { mut effect, .. } = live;
        effect.stop();
        {
            let mut pool = self.pool.lock();
            effect.release_particles(&mut pool);
        }
        self.renderer.remove_effect(effect.id());

        let id = effect.id();
        let name = effect.name().to_owned();
        match outcome {
            Outcome::Completed => {
                self.counters.completed += 1;
                let run_ms = effect.stats().last_duration_ms;
                self.notify(EffectNotification::Completed { id, name, run_ms });
            }
            Outcome::Stopped => {
                self.counters.stopped += 1;
                self.notify(EffectNotification::Stopped { id, name });
            }
        }
    }

    // =========================================================================
    // Frame
    // =========================================================================

    /// Advances every live effect, evicts settled ones, replays the queue
    /// and pumps batched notifications.
    pub fn update(&mut self, dt: f32) {
        if self.destroyed {
            return;
        }
        let dt = if dt.is_finite() { dt.max(0.0) } else { 0.0 };
        let (max_particles, quality) = {
            let settings = self.settings.read();
            (settings.max_particles, settings.quality_scalar)
        };
        let budget = max_particles.saturating_sub(self.live_particles());

        {
            let mut pool = self.pool.lock();
            let mut ctx = EmitContext::new(&mut pool, budget, quality);
            for live in &mut self.live {
                live.effect.update(dt, &mut ctx);
                live.age_ms += dt * 1000.0;
            }
        }
        self.renderer.update(dt);

        let mut evicted = 0;
        let mut i = 0;
        while i < self.live.len() {
            if self.live[i].is_settled() {
                let live = self.live.remove(i);
                self.retire(live, Outcome::Completed);
                evicted += 1;
            } else {
                i += 1;
            }
        }
        for _ in 0..evicted {
            self.replay_one();
        }

        let now = self.clock.now_ms();
        self.bus.pump(now);
    }

    /// Hands every live particle to the renderer.
    pub fn render(&mut self) {
        if self.destroyed {
            return;
        }
        self.instances.clear();
        for live in &self.live {
            for emitter in live.effect.core().emitters() {
                self.instances
                    .extend(emitter.particles().iter().map(ParticleInstance::from));
            }
        }

        let (batch_size, enable_lod, quality) = {
            let settings = self.settings.read();
            (settings.batch_size, settings.enable_lod, settings.quality_scalar)
        };
        let frame = RenderFrame {
            instances: &self.instances,
            batch_size,
            enable_lod,
            quality,
        };
        self.renderer.render(&frame);
    }

    // =========================================================================
    // Configuration
    // =========================================================================

    /// Registers (or replaces) an effect factory.
    ///
    /// # Errors
    ///
    /// Returns [`flare_core::FlareError::EmptyEffectName`] for an empty name.
    pub fn register_effect(&mut self, name: &str, factory: EffectFactory) -> FlareResult<()> {
        self.registry.register(name, factory)
    }

    /// Applies a partial configuration update.
    ///
    /// Raising the ceiling drains queued requests into the new room.
    /// Lowering it below the live count stops the oldest instances.
    /// Disabling effects stops everything and clears the queue.
    ///
    /// # Errors
    ///
    /// Returns [`flare_core::FlareError::InvalidConfig`] and leaves the
    /// configuration untouched if the result is invalid.
    pub fn update_config(&mut self, patch: &OrchestratorConfigPatch) -> FlareResult<()> {
        let mut next = self.config.clone();
        next.apply(patch);
        next.validate()?;

        let was_enabled = self.config.enable_effects;
        self.config = next;

        if was_enabled && !self.config.enable_effects {
            tracing::info!("Effects disabled");
            self.stop_all_effects();
            return Ok(());
        }

        let excess = self.live.len().saturating_sub(self.config.max_concurrent_effects);
        if excess > 0 {
            tracing::info!(
                "Ceiling lowered to {}, stopping {} oldest effects",
                self.config.max_concurrent_effects,
                excess
            );
            for live in self.live.drain(..excess).collect::<Vec<_>>() {
                self.retire(live, Outcome::Stopped);
            }
        }

        while self.queue.len() > self.config.max_queued_effects {
            if let Some(dropped) = self.queue.pop_back() {
                self.counters.dropped += 1;
                tracing::warn!("Queue bound lowered, dropping '{}'", dropped.name);
            }
        }
        let started = self.drain_queue();
        if started > 0 {
            tracing::debug!("Config update started {} queued effects", started);
        }
        Ok(())
    }

    /// Current configuration.
    #[must_use]
    pub const fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    // =========================================================================
    // Notifications
    // =========================================================================

    fn notify(&mut self, notification: EffectNotification) {
        let now = self.clock.now_ms();
        let batch = {
            let settings = self.settings.read();
            settings
                .notification_batching
                .then_some(settings.notification_batch_ms)
        };
        self.bus.publish(notification, now, batch);
    }

    /// Adds a callback listener.
    pub fn add_listener<F>(&mut self, callback: F) -> ListenerId
    where
        F: FnMut(&EffectNotification) -> Result<(), ListenerError> + 'static,
    {
        self.bus.add_listener(callback)
    }

    /// Adds a listener for some notification kinds only.
    pub fn add_filtered_listener<F>(&mut self, kinds: &[NotificationKind], callback: F) -> ListenerId
    where
        F: FnMut(&EffectNotification) -> Result<(), ListenerError> + 'static,
    {
        self.bus.add_filtered_listener(kinds, callback)
    }

    /// Removes a listener.
    pub fn remove_listener(&mut self, id: ListenerId) -> bool {
        self.bus.remove_listener(id)
    }

    /// Opens a typed notification channel.
    pub fn subscribe(&mut self) -> Receiver<EffectNotification> {
        self.bus.subscribe()
    }

    /// Delivers batched notifications now.
    pub fn flush_notifications(&mut self) -> usize {
        self.bus.flush()
    }

    // =========================================================================
    // Introspection
    // =========================================================================

    /// Counters.
    #[must_use]
    pub fn stats(&self) -> OrchestratorStats {
        OrchestratorStats {
            played: self.counters.played,
            active: self.live.len(),
            queued: self.queue.len(),
            completed: self.counters.completed,
            stopped: self.counters.stopped,
            rejected: self.counters.rejected,
            dropped: self.counters.dropped,
            replayed: self.counters.replayed,
            live_particles: self.live_particles(),
            pool: self.pool.lock().stats(),
            notifications: self.bus.stats(),
            surface: self.renderer.system_stats(),
        }
    }

    /// Copies load figures into an optimizer snapshot.
    pub fn fill_metrics(&mut self, metrics: &mut FrameMetrics) {
        let now = self.clock.now_ms();
        metrics.particle_count = self.live_particles();
        metrics.active_effects = self.live.len();
        metrics.queued_effects = self.queue.len();
        metrics.events_per_second = self.bus.events_per_second(now);
        metrics.pending_notifications = self.bus.pending_len();
        metrics.listener_failures = self.bus.stats().listener_failures;
    }

    /// Live particles across all effects.
    #[must_use]
    pub fn live_particles(&self) -> usize {
        self.live.iter().map(|l| l.effect.live_particles()).sum()
    }

    /// Live effect count.
    #[must_use]
    pub fn active_count(&self) -> usize {
        self.live.len()
    }

    /// Queued request count.
    #[must_use]
    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    /// Live effects as `(id, name)`, in admission order.
    #[must_use]
    pub fn active_effects(&self) -> Vec<(EffectId, &str)> {
        self.live
            .iter()
            .map(|l| (l.effect.id(), l.effect.name()))
            .collect()
    }

    /// Queued names, oldest first.
    #[must_use]
    pub fn queued_names(&self) -> Vec<&str> {
        self.queue.iter().map(|q| q.name.as_str()).collect()
    }

    /// Is any instance of `name` live?
    #[must_use]
    pub fn is_playing(&self, name: &str) -> bool {
        self.live.iter().any(|l| l.effect.name() == name)
    }

    /// A live effect by id.
    #[must_use]
    pub fn effect(&self, id: EffectId) -> Option<&dyn VisualEffect> {
        self.live
            .iter()
            .find(|l| l.effect.id() == id)
            .map(|l| l.effect.as_ref())
    }

    /// Registry.
    #[must_use]
    pub const fn registry(&self) -> &EffectRegistry {
        &self.registry
    }

    /// Shared particle pool.
    #[must_use]
    pub const fn pool(&self) -> &SharedParticlePool {
        &self.pool
    }

    /// Shared render settings.
    #[must_use]
    pub const fn settings(&self) -> &SharedSettings {
        &self.settings
    }

    /// Renderer.
    #[must_use]
    pub const fn renderer(&self) -> &R {
        &self.renderer
    }

    /// Renderer, mutable.
    pub fn renderer_mut(&mut self) -> &mut R {
        &mut self.renderer
    }

    // =========================================================================
    // Teardown
    // =========================================================================

    /// Stops everything and drops all listeners and subscribers.
    /// Later calls are ignored.
    pub fn destroy(&mut self) {
        if self.destroyed {
            return;
        }
        self.stop_all_effects();
        self.bus.clear_listeners();
        self.destroyed = true;
        tracing::info!("Effect orchestrator destroyed");
    }

    /// Has `destroy` been called?
    #[must_use]
    pub const fn is_destroyed(&self) -> bool {
        self.destroyed
    }
}

impl<R: EffectRenderer + std::fmt::Debug> std::fmt::Debug for EffectOrchestrator<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EffectOrchestrator")
            .field("live", &self.live.len())
            .field("queued", &self.queue.len())
            .field("renderer", &self.renderer)
            .field("destroyed", &self.destroyed)
            .finish_non_exhaustive()
    }
}
