//! Integration tests for the pool, emitters and effect lifecycles.

use flare::core::{EffectId, ParticlePool, PoolConfig, SharedRng};
use flare::effects::{
    EffectParams, EffectRegistry, EffectSettings, EffectSpawn, EffectState, EmitContext, Emitter,
    Param, ParticleTemplate,
};

fn pool(max_size: usize) -> ParticlePool {
    ParticlePool::particles(PoolConfig { min_size: 8, max_size }).unwrap()
}

#[test]
fn test_release_acquire_cycle_bounded() {
    let mut pool = pool(32);
    let before = pool.active_count();

    for round in 1..=50 {
        let held: Vec<_> = (0..round).map(|_| pool.acquire()).collect();
        assert_eq!(pool.active_count(), before + round);
        for particle in held {
            pool.release(particle);
        }
        assert!(pool.free_count() <= 32);
        assert_eq!(pool.active_count(), before);
    }

    let stats = pool.stats();
    assert_eq!(stats.peak_live, 50);
    assert!(stats.discarded > 0);
}

#[test]
fn test_emitter_burst_count_caps_emit() {
    let mut pool = pool(256);
    let mut emitter = Emitter::burst("sparks", ParticleTemplate::default(), 5);

    let emitted = emitter.emit(Some([40.0, 80.0]), 100, &mut pool);
    assert_eq!(emitted.len(), 5);
    assert_eq!(pool.active_count(), 5);

    assert_eq!(emitter.release_all(&mut pool), 5);
    assert_eq!(pool.active_count(), 0);
}

#[test]
fn test_sampled_template_is_reproducible() {
    let stamp = |seed: u64| {
        let rng = SharedRng::seeded(seed);
        let template = ParticleTemplate {
            size: Param::uniform(&rng, 1.0, 8.0),
            velocity: Param::radial(&rng, 10.0, 50.0),
            ..Default::default()
        };
        let mut pool = pool(64);
        let mut emitter = Emitter::burst("seeded", template, 16);
        let sizes: Vec<f32> = emitter
            .emit(Some([0.0, 0.0]), 16, &mut pool)
            .iter()
            .map(|p| p.size)
            .collect();
        emitter.release_all(&mut pool);
        sizes
    };

    assert_eq!(stamp(11), stamp(11));
    assert_ne!(stamp(11), stamp(12));
}

fn spawn(name: &str, id: u64) -> EffectSpawn {
    EffectSpawn {
        id: EffectId(id),
        name: name.into(),
        settings: EffectSettings {
            particle_count: 40,
            duration_ms: 600,
            ..EffectSettings::default()
        },
        params: EffectParams {
            lines: 2,
            ..EffectParams::default()
        },
        rng: SharedRng::seeded(5),
    }
}

#[test]
fn test_reset_then_start_matches_fresh() {
    let registry = EffectRegistry::with_builtin().unwrap();
    let mut pool = pool(1024);

    for name in registry.names() {
        let mut used = registry.create(spawn(name, 1)).unwrap();
        used.start(Some([10.0, 10.0])).unwrap();
        {
            let mut ctx = EmitContext::new(&mut pool, 10_000, 1.0);
            for _ in 0..10 {
                used.update(1.0 / 60.0, &mut ctx);
            }
        }
        used.reset(&mut pool);
        assert_eq!(pool.active_count(), 0, "{name} leaked particles");
        used.start(Some([10.0, 10.0])).unwrap();

        let mut fresh = registry.create(spawn(name, 2)).unwrap();
        fresh.start(Some([10.0, 10.0])).unwrap();

        let emitters = |fx: &dyn flare::effects::VisualEffect| {
            fx.core()
                .emitters()
                .iter()
                .map(|e| (e.name().to_owned(), e.mode(), e.burst_count()))
                .collect::<Vec<_>>()
        };
        assert_eq!(emitters(used.as_ref()), emitters(fresh.as_ref()), "{name}");
        assert_eq!(used.core().elapsed(), 0.0);
        assert_eq!(used.state(), EffectState::Active);
        assert_eq!(fresh.state(), EffectState::Active);

        used.reset(&mut pool);
        fresh.reset(&mut pool);
    }
}
