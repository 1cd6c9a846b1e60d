//! # FLARE Effects
//!
//! Effect lifecycle and orchestration:
//! - Particle templates with literal or sampled fields
//! - Burst / continuous emitters drawing from the shared pool
//! - The [`VisualEffect`] capability trait and the game-event recipes
//! - [`EffectOrchestrator`]: concurrency ceiling, FIFO overflow queue,
//!   completion detection, notifications
//! - [`EffectRenderer`] collaborator trait and a headless implementation
//!
//! ## Example
//!
//! ```rust,ignore
//! use flare_effects::{EffectOrchestrator, HeadlessRenderer, OrchestratorConfig, PlayRequest};
//!
//! let mut fx = EffectOrchestrator::new(OrchestratorConfig::default(), HeadlessRenderer::default())?;
//! fx.play_effect("line_clear", PlayRequest::at(160.0, 320.0));
//! fx.update(1.0 / 60.0);
//! fx.render();
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod config;
pub mod effect;
pub mod emitter;
pub mod notify;
pub mod orchestrator;
pub mod recipes;
pub mod registry;
pub mod renderer;
pub mod template;

pub use config::{
    EffectParams, EffectSettings, EffectSettingsPatch, OrchestratorConfig,
    OrchestratorConfigPatch, PlayRequest, SpinKind,
};
pub use effect::{EffectCore, EffectInfo, EffectRunStats, EffectState, VisualEffect};
pub use emitter::{EmissionMode, EmitContext, Emitter, EmitterTotals, Lifespan};
pub use notify::{
    BusStats, EffectNotification, ListenerError, ListenerId, NotificationBus, NotificationKind,
    RejectReason,
};
pub use orchestrator::{EffectOrchestrator, OrchestratorBuilder, OrchestratorStats};
pub use registry::{factory, EffectFactory, EffectRegistry, EffectSpawn};
pub use renderer::{
    EffectRenderer, HeadlessRenderer, ParticleInstance, RenderFrame, SurfaceStats,
};
pub use template::{Param, ParticleTemplate};
