//! Integration tests for effect admission, the overflow queue and
//! notifications, driven through the engine facade.

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;

use flare::core::{ManualClock, SequentialIds};
use flare::effects::{
    EffectNotification, EffectSettingsPatch, ListenerError, NotificationKind,
    OrchestratorConfigPatch,
};
use flare::{EngineBuilder, EngineConfig, FlareEngine, HeadlessRenderer, PlayRequest};

const DT: f32 = 1.0 / 60.0;

fn engine_with(config: EngineConfig) -> (FlareEngine, ManualClock) {
    let clock = ManualClock::new(0);
    let engine = EngineBuilder::new(config)
        .with_clock(clock.shared())
        .with_ids(Arc::new(SequentialIds::new()))
        .build(HeadlessRenderer::default())
        .unwrap();
    (engine, clock)
}

fn engine(max_concurrent: usize) -> (FlareEngine, ManualClock) {
    let mut config = EngineConfig::default();
    config.orchestrator.max_concurrent_effects = max_concurrent;
    engine_with(config)
}

/// A request for an effect that runs until stopped.
fn endless() -> PlayRequest {
    PlayRequest::at(100.0, 100.0).with_overrides(EffectSettingsPatch::default().duration_ms(-1))
}

#[test]
fn test_burst_capacity_then_queue() {
    let mut config = EngineConfig::default();
    config.orchestrator.max_concurrent_effects = 5;
    config
        .orchestrator
        .effect_settings
        .insert("burst".into(), EffectSettingsPatch::default().particle_count(80));
    let (mut engine, _) = engine_with(config);

    for _ in 0..5 {
        assert!(engine.play_effect("burst", PlayRequest::at(50.0, 50.0)));
    }
    assert_eq!(engine.orchestrator().active_count(), 5);

    assert!(!engine.play_effect("burst", PlayRequest::at(50.0, 50.0)));
    assert_eq!(engine.orchestrator().active_count(), 5);
    assert_eq!(engine.orchestrator().queue_len(), 1);
}

#[test]
fn test_active_never_exceeds_ceiling() {
    let (mut engine, clock) = engine(3);
    let names = ["burst", "line_clear", "hard_drop", "spin", "score"];

    let mut state: u32 = 0x2545_F491;
    for _ in 0..2000 {
        state ^= state << 13;
        state ^= state >> 17;
        state ^= state << 5;

        match state % 8 {
            0..=3 => {
                let name = names[(state >> 8) as usize % names.len()];
                engine.play_effect(name, PlayRequest::at(10.0, 10.0));
            }
            4 => {
                let name = names[(state >> 8) as usize % names.len()];
                engine.stop_effect(name);
            }
            5 => {
                let ceiling = 1 + (state >> 8) as usize % 4;
                engine
                    .orchestrator_mut()
                    .update_config(&OrchestratorConfigPatch {
                        max_concurrent_effects: Some(ceiling),
                        ..Default::default()
                    })
                    .unwrap();
            }
            _ => {
                clock.advance(16);
                engine.frame(DT);
            }
        }
        let ceiling = engine.orchestrator().config().max_concurrent_effects;
        assert!(engine.orchestrator().active_count() <= ceiling);
    }
}

#[test]
fn test_overflow_replays_in_fifo_order() {
    let (mut engine, _) = engine(1);

    assert!(engine.play_effect("burst", endless()));
    assert!(!engine.play_effect("line_clear", endless()));
    assert!(!engine.play_effect("hard_drop", endless()));
    assert_eq!(engine.orchestrator().queued_names(), vec!["line_clear", "hard_drop"]);

    assert!(engine.stop_effect("burst"));
    engine.frame(DT);
    assert!(engine.orchestrator().is_playing("line_clear"));
    assert_eq!(engine.orchestrator().queued_names(), vec!["hard_drop"]);

    assert!(engine.stop_effect("line_clear"));
    engine.frame(DT);
    assert!(engine.orchestrator().is_playing("hard_drop"));
    assert_eq!(engine.orchestrator().queue_len(), 0);
}

#[test]
fn test_stop_then_update_drains_exactly_one() {
    let (mut engine, _) = engine(2);
    for _ in 0..6 {
        engine.play_effect("burst", endless());
    }
    assert_eq!(engine.orchestrator().queue_len(), 4);

    engine.stop_effect("burst");
    engine.frame(DT);
    assert_eq!(engine.orchestrator().queue_len(), 3);
    assert_eq!(engine.orchestrator().active_count(), 2);
}

#[test]
fn test_completion_replays_queue() {
    let (mut engine, clock) = engine(1);
    assert!(engine.play_effect("hard_drop", PlayRequest::at(0.0, 0.0)));
    assert!(!engine.play_effect("burst", PlayRequest::at(0.0, 0.0)));

    for _ in 0..240 {
        clock.advance(16);
        engine.frame(DT);
        if engine.orchestrator().is_playing("burst") {
            break;
        }
    }
    assert!(engine.orchestrator().is_playing("burst"));
    assert!(!engine.orchestrator().is_playing("hard_drop"));
    assert_eq!(engine.stats().orchestrator.completed, 1);
}

#[test]
fn test_disabled_effects_never_play() {
    let (mut engine, _) = engine(4);
    engine
        .orchestrator_mut()
        .update_config(&OrchestratorConfigPatch {
            enable_effects: Some(false),
            ..Default::default()
        })
        .unwrap();

    assert!(!engine.play_effect("burst", PlayRequest::at(0.0, 0.0)));
    assert_eq!(engine.orchestrator().active_count(), 0);
    assert_eq!(engine.orchestrator().queue_len(), 0);
}

#[test]
fn test_unknown_effect_is_false() {
    let (mut engine, _) = engine(4);
    assert!(!engine.play_effect("fireworks", PlayRequest::at(0.0, 0.0)));
    assert_eq!(engine.orchestrator().queue_len(), 0);
}

#[test]
fn test_failing_listener_does_not_block_others() {
    let (mut engine, _) = engine(4);
    let seen = Rc::new(RefCell::new(Vec::new()));

    engine
        .orchestrator_mut()
        .add_listener(|_| Err(ListenerError::new("listener exploded")));
    let sink = Rc::clone(&seen);
    engine.orchestrator_mut().add_listener(move |n| {
        sink.borrow_mut().push(n.clone());
        Ok(())
    });

    assert!(engine.play_effect("burst", PlayRequest::at(0.0, 0.0)));

    let seen = seen.borrow();
    assert_eq!(seen.len(), 1);
    assert!(matches!(&seen[0], EffectNotification::Started { name, .. } if name == "burst"));
    assert_eq!(engine.stats().orchestrator.notifications.listener_failures, 1);
}

#[test]
fn test_batched_notifications_flush_once() {
    let (mut engine, clock) = engine(8);
    {
        let mut settings = engine.settings().write();
        settings.notification_batching = true;
        settings.notification_batch_ms = 16;
    }
    let deliveries = Rc::new(RefCell::new(0_usize));
    let sink = Rc::clone(&deliveries);
    engine.orchestrator_mut().add_listener(move |_| {
        *sink.borrow_mut() += 1;
        Ok(())
    });

    for _ in 0..4 {
        engine.play_effect("burst", PlayRequest::at(0.0, 0.0));
    }
    assert_eq!(*deliveries.borrow(), 0);
    let bus = engine.stats().orchestrator.notifications;
    assert_eq!(bus.flushes, 0);

    clock.advance(20);
    engine.frame(DT);
    assert_eq!(*deliveries.borrow(), 4);
    assert_eq!(engine.stats().orchestrator.notifications.flushes, 1);
}

#[test]
fn test_subscriber_receives_lifecycle() {
    let (mut engine, _) = engine(1);
    let rx = engine.orchestrator_mut().subscribe();

    engine.play_effect("burst", endless());
    engine.play_effect("spin", endless());
    engine.stop_all_effects();

    let kinds: Vec<_> = rx.try_iter().map(|n| n.kind()).collect();
    assert_eq!(
        kinds,
        vec![
            NotificationKind::Started,
            NotificationKind::Queued,
            NotificationKind::AllStopped,
        ]
    );
}
