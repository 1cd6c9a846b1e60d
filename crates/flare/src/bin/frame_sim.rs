//! # Frame Simulation
//!
//! Drives the engine headlessly through a synthetic load curve and prints
//! what the optimizers did about it.
//!
//! ```text
//! cargo run --bin frame_sim -- [config.toml] [seconds]
//! ```
//!
//! Load model: a 12ms base frame, plus 0.02ms per live particle, plus a
//! 30ms stall between seconds 4 and 8. Game events fire on a fixed
//! schedule so runs are reproducible.

use std::sync::Arc;

use flare::{
    EffectParams, EngineBuilder, EngineConfig, FlareEngine, HeadlessRenderer, PlayRequest, SpinKind,
};
use flare_core::{ManualClock, SequentialIds};

const BASE_FRAME_MS: f32 = 12.0;
const PER_PARTICLE_MS: f32 = 0.02;
const STALL_MS: f32 = 30.0;
const STALL_WINDOW_S: (f32, f32) = (4.0, 8.0);

fn main() {
    let mut args = std::env::args().skip(1);
    let config = match args.next() {
        Some(path) => match EngineConfig::from_file(&path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("frame_sim: {e}");
                std::process::exit(1);
            }
        },
        None => EngineConfig::default(),
    };
    let seconds: u32 = args.next().and_then(|s| s.parse().ok()).unwrap_or(12);

    let clock = ManualClock::new(0);
    let engine = EngineBuilder::new(config)
        .with_clock(clock.shared())
        .with_ids(Arc::new(SequentialIds::new()))
        .build(HeadlessRenderer::default());
    let mut engine = match engine {
        Ok(engine) => engine,
        Err(e) => {
            eprintln!("frame_sim: {e}");
            std::process::exit(1);
        }
    };

    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║                 FLARE FRAME SIMULATION                       ║");
    println!("╚══════════════════════════════════════════════════════════════╝");
    println!();
    println!(
        "{:>4} {:>7} {:>7} {:>6} {:>8} {:>6} {:>5} {:>7} {:>6}",
        "sec", "fps", "frame", "fx", "parts", "queue", "lvl", "scalar", "skips"
    );

    let mut frame_ms = BASE_FRAME_MS;
    let mut sim_ms = 0.0_f32;
    let mut next_second = 1.0_f32;
    let mut frame: u64 = 0;

    while sim_ms < seconds as f32 * 1000.0 {
        frame += 1;
        play_scheduled(&mut engine, frame);

        clock.advance(frame_ms.round() as u64);
        sim_ms += frame_ms;

        let pool = engine.pool().lock().stats();
        let held = (pool.live + pool.free) as f32;
        engine.set_memory_fraction(held / pool.max_size.max(1) as f32);

        let outcome = engine.frame(frame_ms / 1000.0);
        if let Some(report) = &outcome.report {
            for (system, rule) in report.applied() {
                println!("      [{:>6}ms] {system}/{}: {}", report.timestamp_ms, rule.name, rule.detail);
            }
        }

        if sim_ms / 1000.0 >= next_second {
            let stats = engine.stats();
            println!(
                "{:>4} {:>7.1} {:>6.1}ms {:>5} {:>8} {:>6} {:>5} {:>7.2} {:>6}",
                next_second as u32,
                outcome.metrics.fps,
                outcome.metrics.frame_time_ms,
                stats.orchestrator.active,
                stats.orchestrator.live_particles,
                stats.orchestrator.queued,
                stats.settings.quality_level,
                stats.settings.quality_scalar,
                stats.skipped
            );
            next_second += 1.0;
        }

        frame_ms = synthetic_frame_ms(sim_ms, outcome.metrics.particle_count);
    }

    let stats = engine.stats();
    println!();
    println!("═══ SUMMARY ═══");
    println!("  frames:            {} ({} rendered, {} skipped)", stats.frames, stats.rendered, stats.skipped);
    println!("  worst frame:       {:.1}ms", stats.monitor.worst_frame_ms);
    println!("  effects played:    {}", stats.orchestrator.played);
    println!("  effects completed: {}", stats.orchestrator.completed);
    println!("  queue replays:     {}", stats.orchestrator.replayed);
    println!("  queue drops:       {}", stats.orchestrator.dropped);
    println!("  pool created:      {}", stats.orchestrator.pool.created);
    println!("  optimizer passes:  {}", stats.coordinator.passes);
    println!("  rules applied:     {}", stats.coordinator.rules_applied);
    println!("  memory freed:      {} bytes", stats.coordinator.memory_freed_bytes);
    println!("  history kept:      {}", engine.coordinator().history().len());

    engine.shutdown();
}

fn synthetic_frame_ms(sim_ms: f32, particles: usize) -> f32 {
    let secs = sim_ms / 1000.0;
    let stall = if secs >= STALL_WINDOW_S.0 && secs < STALL_WINDOW_S.1 {
        STALL_MS
    } else {
        0.0
    };
    BASE_FRAME_MS + particles as f32 * PER_PARTICLE_MS + stall
}

fn play_scheduled(engine: &mut FlareEngine, frame: u64) {
    let at = PlayRequest::at(160.0, 320.0);

    if frame % 20 == 0 {
        engine.play_effect("hard_drop", PlayRequest::at(160.0, 600.0));
    }
    if frame % 45 == 0 {
        let lines = ((frame / 45) % 4 + 1) as u8;
        let name = if lines == 4 { "tetris" } else { "line_clear" };
        engine.play_effect(
            name,
            at.clone().with_params(EffectParams { lines, ..EffectParams::default() }),
        );
    }
    if frame % 90 == 0 {
        engine.play_effect(
            "score",
            at.clone().with_params(EffectParams {
                score: frame * 10,
                combo: (frame / 90 % 5) as u32,
                ..EffectParams::default()
            }),
        );
    }
    if frame % 150 == 0 {
        engine.play_effect(
            "spin",
            at.clone().with_params(EffectParams { spin: SpinKind::Full, ..EffectParams::default() }),
        );
    }
    if frame % 600 == 0 {
        engine.play_effect(
            "level_up",
            at.with_params(EffectParams { level: (frame / 600) as u32, ..EffectParams::default() }),
        );
    }
}
