//! Observer-facing event stream emitted by the controller.

mod common;

use bridge_traits::MediaEvent;
use common::{config_with_gates, Fixture, CONTENT_ID};
use core_playback::PlayerConfig;
use core_runtime::events::{CoreEvent, GateEvent, PlaybackEvent};

#[tokio::test]
async fn test_gate_stream_reports_full_challenge_cycle() {
    let fixture = Fixture::new();
    let mut h = fixture.start(config_with_gates(&[(10.0, 1), (40.0, 2)]).with_cooldown_seconds(30));
    let mut gates = h
        .controller
        .subscribe()
        .filter(|event| matches!(event, CoreEvent::Gate(_)));

    h.ready(100.0);
    h.play();
    h.time(10.1);
    h.controller.on_challenge_attempt_failed(1);
    h.controller.on_challenge_solved(1, 2, Some(12.5));

    assert_eq!(
        gates.recv().await.unwrap(),
        CoreEvent::Gate(GateEvent::Activated {
            content_id: CONTENT_ID.to_string(),
            level: 1,
            trigger_time: 10.0,
        })
    );
    assert_eq!(
        gates.recv().await.unwrap(),
        CoreEvent::Gate(GateEvent::AttemptFailed {
            content_id: CONTENT_ID.to_string(),
            level: 1,
            attempts: 1,
        })
    );
    assert_eq!(
        gates.recv().await.unwrap(),
        CoreEvent::Gate(GateEvent::Solved {
            content_id: CONTENT_ID.to_string(),
            level: 1,
            attempts: 2,
            solve_time_seconds: Some(12.5),
        })
    );
    assert_eq!(
        gates.recv().await.unwrap(),
        CoreEvent::Gate(GateEvent::CooldownStarted {
            content_id: CONTENT_ID.to_string(),
            completed_level: 1,
            next_level: 2,
            cooldown_seconds: 30,
        })
    );
    assert!(gates.try_recv().is_none());
}

#[tokio::test]
async fn test_playback_stream_order() {
    let fixture = Fixture::new();
    let mut h = fixture.start(PlayerConfig::default());
    let mut playback = h.controller.subscribe().filter(|event| {
        !matches!(
            event,
            CoreEvent::Playback(PlaybackEvent::PositionChanged { .. }) | CoreEvent::Gate(_)
        )
    });

    h.ready(50.0);
    h.play();
    h.time(2.0);
    h.controller.pause().unwrap();
    h.controller.handle_media_event(MediaEvent::Ended);

    let mut kinds = Vec::new();
    for event in playback.drain() {
        if let CoreEvent::Playback(event) = event {
            kinds.push(match event {
                PlaybackEvent::Ready { quality_levels, .. } => {
                    assert_eq!(quality_levels, 2);
                    "ready"
                }
                PlaybackEvent::Started { .. } => "started",
                PlaybackEvent::Paused {
                    position_seconds, ..
                } => {
                    assert_eq!(position_seconds, 2.0);
                    "paused"
                }
                PlaybackEvent::Completed { .. } => "completed",
                _ => "other",
            });
        }
    }
    assert_eq!(kinds, vec!["ready", "started", "paused", "completed"]);
}

#[tokio::test]
async fn test_position_updates_carry_duration() {
    let fixture = Fixture::new();
    let mut h = fixture.start(PlayerConfig::default());
    let mut positions = h
        .controller
        .subscribe()
        .filter(|event| matches!(event, CoreEvent::Playback(PlaybackEvent::PositionChanged { .. })));

    h.ready(80.0);
    h.time(1.5);

    match positions.recv().await.unwrap() {
        CoreEvent::Playback(PlaybackEvent::PositionChanged {
            content_id,
            position_seconds,
            duration_seconds,
        }) => {
            assert_eq!(content_id, CONTENT_ID);
            assert_eq!(position_seconds, 1.5);
            assert_eq!(duration_seconds, 80.0);
        }
        other => panic!("unexpected event: {:?}", other),
    }
}
