//! # FLARE
//!
//! A self-regulating visual effects engine.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                        FlareEngine                           │
//! │                                                              │
//! │  ┌─────────────────────┐         ┌────────────────────────┐  │
//! │  │  flare_effects      │         │  flare_perf            │  │
//! │  │  Orchestrator       │         │  Coordinator           │  │
//! │  │  • effects/emitters │         │  • particle / rendering│  │
//! │  │  • overflow queue   │         │  • memory / events     │  │
//! │  │  • notifications    │         │  • adaptive quality    │  │
//! │  └─────────┬───────────┘         └───────────┬────────────┘  │
//! │            │        ┌───────────────┐        │               │
//! │            └───────>│  flare_core   │<───────┘               │
//! │                     │  settings     │                        │
//! │                     │  pool, clock  │                        │
//! │                     └───────────────┘                        │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```rust,ignore
//! use flare::{EngineConfig, FlareEngine, PlayRequest};
//!
//! let mut engine = FlareEngine::headless(EngineConfig::from_file("flare.toml")?)?;
//! engine.play_effect("line_clear", PlayRequest::at(160.0, 320.0));
//! let outcome = engine.frame(1.0 / 60.0);
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod config;
pub mod engine;

pub use flare_core as core;
pub use flare_effects as effects;
pub use flare_perf as perf;

pub use config::EngineConfig;
pub use engine::{EngineBuilder, EngineStats, FlareEngine, FrameOutcome};
pub use flare_effects::{EffectParams, HeadlessRenderer, PlayRequest, SpinKind};
