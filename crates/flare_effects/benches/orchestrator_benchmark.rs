//! # Orchestrator Benchmark
//!
//! ENGINE REQUIREMENTS:
//! - One update + render of 50 looping line clears inside a 16ms frame
//!
//! Run with: `cargo bench --package flare_effects`

// Benchmarks don't need docs
#![allow(missing_docs)]

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use flare_core::{ManualClock, SharedRng};
use flare_effects::{
    EffectOrchestrator, EffectSettingsPatch, HeadlessRenderer, OrchestratorBuilder,
    OrchestratorConfig, PlayRequest,
};

fn loaded(effects: usize) -> EffectOrchestrator<HeadlessRenderer> {
    let config = OrchestratorConfig {
        max_concurrent_effects: effects,
        ..OrchestratorConfig::default()
    };
    let mut orch = OrchestratorBuilder::new(config)
        .with_clock(ManualClock::new(0).shared())
        .with_rng(SharedRng::seeded(42))
        .build(HeadlessRenderer::new(effects))
        .expect("orchestrator");
    orch.settings().write().max_particles = 100_000;

    let looping = EffectSettingsPatch::default().looping(true).particle_count(80);
    for i in 0..effects {
        let request = PlayRequest::at(i as f32 * 10.0, 200.0).with_overrides(looping.clone());
        orch.play_effect("line_clear", request);
    }
    orch
}

fn bench_frame(c: &mut Criterion) {
    let mut group = c.benchmark_group("orchestrator_frame");

    for effects in [1usize, 10, 50] {
        group.bench_with_input(BenchmarkId::from_parameter(effects), &effects, |b, &effects| {
            let mut orch = loaded(effects);
            // Warm up to steady-state particle counts.
            for _ in 0..60 {
                orch.update(1.0 / 60.0);
            }
            b.iter(|| {
                orch.update(black_box(1.0 / 60.0));
                orch.render();
            });
        });
    }

    group.finish();
}

fn bench_admission(c: &mut Criterion) {
    c.bench_function("play_stop_cycle", |b| {
        let mut orch = loaded(1);
        orch.stop_all_effects();
        b.iter(|| {
            orch.play_effect(black_box("burst"), PlayRequest::at(0.0, 0.0));
            orch.stop_effect("burst");
        });
    });
}

criterion_group!(benches, bench_frame, bench_admission);
criterion_main!(benches);
