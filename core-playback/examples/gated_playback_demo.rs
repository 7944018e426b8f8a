//! # Gated Playback Example
//!
//! Drives a [`PlaybackController`] against a simulated video element that
//! plays natively: the viewer watches, hits a gate, solves the challenge,
//! waits out the cooldown and reaches the next gate.
//!
//! Run with: `cargo run --example gated_playback_demo --package core-playback`

use std::sync::Arc;
use std::time::Duration;

use bridge_traits::error::Result as BridgeResult;
use bridge_traits::{
    Clock, ManualClock, MediaElement, MediaEvent, MediaTarget, MemoryKeyValueStore, TimeRange,
};
use core_playback::{format_time, Gate, PlaybackController, PlayerConfig};
use core_runtime::config::CoreConfig;
use core_runtime::events::CoreEvent;
use core_runtime::logging::{init_logging, LogFormat, LoggingConfig};

const SOURCE: &str = "https://cdn.example.com/course/lesson-1/master.m3u8";

// ============================================================================
// Simulated video element
// ============================================================================

#[derive(Default)]
struct SimulatedVideo {
    time: f64,
    paused: bool,
}

impl MediaElement for SimulatedVideo {
    fn target(&self) -> MediaTarget {
        MediaTarget::new("demo-video")
    }

    fn play(&mut self) -> BridgeResult<()> {
        self.paused = false;
        Ok(())
    }

    fn pause(&mut self) {
        self.paused = true;
    }

    fn is_paused(&self) -> bool {
        self.paused
    }

    fn current_time(&self) -> f64 {
        self.time
    }

    fn set_current_time(&mut self, seconds: f64) {
        self.time = seconds;
    }

    fn duration(&self) -> f64 {
        180.0
    }

    fn set_volume(&mut self, _volume: f64) {}

    fn set_muted(&mut self, _muted: bool) {}

    fn set_playback_rate(&mut self, _rate: f64) {}

    fn set_loop(&mut self, _looping: bool) {}

    fn set_poster(&mut self, _poster: &str) {}

    fn set_source(&mut self, _url: &str) {}

    fn supports_native_hls(&self) -> bool {
        true
    }

    fn buffered(&self) -> Vec<TimeRange> {
        vec![TimeRange::new(0.0, self.time + 30.0)]
    }

    fn set_fullscreen(&mut self, _fullscreen: bool) -> BridgeResult<()> {
        Ok(())
    }
}

fn main() -> anyhow::Result<()> {
    init_logging(LoggingConfig::default().with_format(LogFormat::Compact))?;

    let clock = Arc::new(ManualClock::new(chrono::Utc::now()));
    let core = CoreConfig::builder()
        .key_value_store(Arc::new(MemoryKeyValueStore::new()))
        .clock(clock.clone())
        .build()?;

    let config = PlayerConfig::default()
        .with_src(SOURCE)
        .with_gates(vec![Gate::new(30.0, 1), Gate::new(90.0, 2)])
        .with_cooldown_seconds(20);

    let mut controller = PlaybackController::builder(config)
        .runtime(&core)
        .media(Box::new(SimulatedVideo {
            paused: true,
            ..SimulatedVideo::default()
        }))
        .build()?;
    let mut events = controller.subscribe();

    controller.handle_media_event(MediaEvent::LoadedMetadata);
    controller.play()?;
    println!(
        "Gates at: {:?}",
        controller
            .gate_markers()
            .iter()
            .map(|marker| format_time(marker.time))
            .collect::<Vec<_>>()
    );

    // One time update per wall-clock second at normal speed.
    let mut media_time = 0.0;
    for _ in 0..150 {
        if controller.state().is_gate_active() {
            let level = controller.active_challenge_level().unwrap_or_default();
            println!("{} - challenge for level {} on screen", format_time(media_time), level);
            clock.advance(Duration::from_secs(8));
            controller.on_challenge_attempt_failed(level);
            controller.on_challenge_solved(level, 2, None);
            continue;
        }

        media_time += 1.0;
        clock.advance(Duration::from_secs(1));
        controller.handle_media_event(MediaEvent::TimeUpdate { time: media_time });
        controller.poll_timers();

        if controller.completed_levels().len() == 2 {
            break;
        }
    }

    let completed_levels = controller.completed_levels().clone();
    let seek_applied = controller.seek(10.0).is_applied();
    println!(
        "Finished at {} with levels {:?} (seek to 0:10 applied: {})",
        format_time(media_time),
        completed_levels,
        seek_applied
    );
    println!("Wall clock: {}", clock.now());

    controller.teardown();

    for event in events.drain() {
        if let CoreEvent::Gate(gate) = event {
            println!("  {:?}", gate);
        }
    }
    Ok(())
}
