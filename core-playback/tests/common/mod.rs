//! Shared fakes for controller integration tests.
//!
//! Every fake records into state behind a shared `parking_lot::Mutex` so a
//! test can keep inspecting it after the fake is boxed into the controller.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use bridge_traits::error::Result as BridgeResult;
use bridge_traits::{
    ChallengeWidget, EngineOptions, ManualClock, MediaElement, MediaEvent, MediaTarget,
    MemoryKeyValueStore, QualityLevel, StreamingEngine, StreamingEngineFactory, TimeRange,
};
use bridge_traits::{BridgeError, EngineEvent};
use core_playback::{
    KeyValueProgressStore, PersistedProgress, PlaybackController, PlayerConfig, Preferences,
    ProgressStore, Result,
};
use core_runtime::events::{EventBus, EventStream};
use parking_lot::Mutex;

pub const SRC: &str = "https://cdn.example.com/course/lesson-1/master.m3u8?token=abc";
pub const CONTENT_ID: &str = "master.m3u8";
pub const START_MS: i64 = 1_700_000_000_000;

/// Ordered record of side effects across all fakes.
#[derive(Clone, Default)]
pub struct CallLog(Arc<Mutex<Vec<String>>>);

impl CallLog {
    pub fn push(&self, entry: impl Into<String>) {
        self.0.lock().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.lock().clone()
    }

    pub fn position(&self, entry: &str) -> Option<usize> {
        self.0.lock().iter().position(|e| e == entry)
    }

    pub fn clear(&self) {
        self.0.lock().clear();
    }
}

// ============================================================================
// Media element
// ============================================================================

#[derive(Debug)]
pub struct MediaState {
    pub current_time: f64,
    pub duration: f64,
    pub paused: bool,
    pub volume: f64,
    pub muted: bool,
    pub playback_rate: f64,
    pub looping: bool,
    pub poster: Option<String>,
    pub source: Option<String>,
    pub native_hls: bool,
    pub fullscreen: bool,
    pub reject_play: bool,
    pub play_calls: usize,
    pub pause_calls: usize,
    pub seeks: Vec<f64>,
}

impl Default for MediaState {
    fn default() -> Self {
        Self {
            current_time: 0.0,
            duration: f64::NAN,
            paused: true,
            volume: 1.0,
            muted: false,
            playback_rate: 1.0,
            looping: false,
            poster: None,
            source: None,
            native_hls: false,
            fullscreen: false,
            reject_play: false,
            play_calls: 0,
            pause_calls: 0,
            seeks: Vec::new(),
        }
    }
}

pub struct FakeMedia {
    state: Arc<Mutex<MediaState>>,
    log: CallLog,
}

impl FakeMedia {
    pub fn new() -> (Self, Arc<Mutex<MediaState>>) {
        let state = Arc::new(Mutex::new(MediaState::default()));
        let media = Self {
            state: state.clone(),
            log: CallLog::default(),
        };
        (media, state)
    }
}

impl MediaElement for FakeMedia {
    fn target(&self) -> MediaTarget {
        MediaTarget::new("video-under-test")
    }

    fn play(&mut self) -> BridgeResult<()> {
        let mut state = self.state.lock();
        state.play_calls += 1;
        if state.reject_play {
            return Err(BridgeError::MediaRejected("autoplay blocked".to_string()));
        }
        state.paused = false;
        self.log.push("media.play");
        Ok(())
    }

    fn pause(&mut self) {
        let mut state = self.state.lock();
        state.pause_calls += 1;
        state.paused = true;
        self.log.push("media.pause");
    }

    fn is_paused(&self) -> bool {
        self.state.lock().paused
    }

    fn current_time(&self) -> f64 {
        self.state.lock().current_time
    }

    fn set_current_time(&mut self, seconds: f64) {
        let mut state = self.state.lock();
        state.current_time = seconds;
        state.seeks.push(seconds);
    }

    fn duration(&self) -> f64 {
        self.state.lock().duration
    }

    fn set_volume(&mut self, volume: f64) {
        self.state.lock().volume = volume;
    }

    fn set_muted(&mut self, muted: bool) {
        self.state.lock().muted = muted;
    }

    fn set_playback_rate(&mut self, rate: f64) {
        self.state.lock().playback_rate = rate;
    }

    fn set_loop(&mut self, looping: bool) {
        self.state.lock().looping = looping;
    }

    fn set_poster(&mut self, poster: &str) {
        self.state.lock().poster = Some(poster.to_string());
    }

    fn set_source(&mut self, url: &str) {
        self.state.lock().source = Some(url.to_string());
    }

    fn supports_native_hls(&self) -> bool {
        self.state.lock().native_hls
    }

    fn buffered(&self) -> Vec<TimeRange> {
        Vec::new()
    }

    fn set_fullscreen(&mut self, fullscreen: bool) -> BridgeResult<()> {
        self.state.lock().fullscreen = fullscreen;
        Ok(())
    }
}

// ============================================================================
// Streaming engine
// ============================================================================

#[derive(Debug, Default)]
pub struct EngineState {
    pub created: usize,
    pub loaded: Vec<String>,
    pub attached: Vec<String>,
    pub destroyed: usize,
    pub level_requests: Vec<Option<usize>>,
}

struct FakeEngine {
    state: Arc<Mutex<EngineState>>,
    log: CallLog,
    current_level: Option<usize>,
}

impl StreamingEngine for FakeEngine {
    fn load(&mut self, url: &str) -> BridgeResult<()> {
        self.state.lock().loaded.push(url.to_string());
        Ok(())
    }

    fn attach(&mut self, target: &MediaTarget) -> BridgeResult<()> {
        self.state.lock().attached.push(target.as_str().to_string());
        Ok(())
    }

    fn current_level(&self) -> Option<usize> {
        self.current_level
    }

    fn set_current_level(&mut self, level: Option<usize>) {
        self.current_level = level;
        self.state.lock().level_requests.push(level);
    }

    fn destroy(&mut self) {
        self.state.lock().destroyed += 1;
        self.log.push("engine.destroy");
    }
}

pub struct FakeEngineFactory {
    supported: bool,
    state: Arc<Mutex<EngineState>>,
    log: CallLog,
}

impl StreamingEngineFactory for FakeEngineFactory {
    fn is_supported(&self) -> bool {
        self.supported
    }

    fn create(&self, _options: &EngineOptions) -> BridgeResult<Box<dyn StreamingEngine>> {
        self.state.lock().created += 1;
        Ok(Box::new(FakeEngine {
            state: self.state.clone(),
            log: self.log.clone(),
            current_level: None,
        }))
    }
}

// ============================================================================
// Challenge widget
// ============================================================================

#[derive(Debug, Default)]
pub struct WidgetState {
    pub mounted: Option<u32>,
    pub mounts: Vec<u32>,
    pub unmounts: usize,
}

pub struct FakeWidget {
    state: Arc<Mutex<WidgetState>>,
    log: CallLog,
}

impl ChallengeWidget for FakeWidget {
    fn mount(&mut self, level: u32) {
        let mut state = self.state.lock();
        state.mounted = Some(level);
        state.mounts.push(level);
        self.log.push(format!("widget.mount({})", level));
    }

    fn unmount(&mut self) {
        let mut state = self.state.lock();
        state.mounted = None;
        state.unmounts += 1;
        self.log.push("widget.unmount");
    }
}

// ============================================================================
// Progress store
// ============================================================================

/// Key-value backed store that counts writes.
pub struct CountingProgressStore {
    inner: KeyValueProgressStore,
    log: CallLog,
    pub sets: Mutex<usize>,
    pub clears: Mutex<usize>,
}

impl CountingProgressStore {
    pub fn set_count(&self) -> usize {
        *self.sets.lock()
    }

    pub fn clear_count(&self) -> usize {
        *self.clears.lock()
    }
}

impl ProgressStore for CountingProgressStore {
    fn get(&self, content_id: &str) -> Result<Option<PersistedProgress>> {
        self.inner.get(content_id)
    }

    fn set(&self, content_id: &str, progress: &PersistedProgress) -> Result<()> {
        self.inner.set(content_id, progress)?;
        *self.sets.lock() += 1;
        self.log.push("progress.set");
        Ok(())
    }

    fn clear(&self, content_id: &str) -> Result<()> {
        self.inner.clear(content_id)?;
        *self.clears.lock() += 1;
        self.log.push("progress.clear");
        Ok(())
    }

    fn load_preferences(&self) -> Result<Preferences> {
        self.inner.load_preferences()
    }

    fn save_preferences(&self, preferences: &Preferences) -> Result<()> {
        self.inner.save_preferences(preferences)
    }
}

// ============================================================================
// Fixture
// ============================================================================

/// Host environment shared across controller instances, so a test can
/// "reload the page" against the same storage and clock.
pub struct Fixture {
    pub memory: Arc<MemoryKeyValueStore>,
    pub clock: Arc<ManualClock>,
    pub log: CallLog,
    pub engine_supported: bool,
    pub native_hls: bool,
}

impl Fixture {
    pub fn new() -> Self {
        Self {
            memory: Arc::new(MemoryKeyValueStore::new()),
            clock: Arc::new(ManualClock::from_millis(START_MS)),
            log: CallLog::default(),
            engine_supported: true,
            native_hls: false,
        }
    }

    pub fn native_only(mut self) -> Self {
        self.engine_supported = false;
        self.native_hls = true;
        self
    }

    pub fn unsupported(mut self) -> Self {
        self.engine_supported = false;
        self.native_hls = false;
        self
    }

    pub fn progress(&self) -> KeyValueProgressStore {
        KeyValueProgressStore::new(self.memory.clone(), "video-player")
    }

    /// Build a controller without loading a source.
    pub fn build(&self, config: PlayerConfig) -> Harness {
        let media = Arc::new(Mutex::new(MediaState {
            native_hls: self.native_hls,
            ..MediaState::default()
        }));
        let engine = Arc::new(Mutex::new(EngineState::default()));
        let widget = Arc::new(Mutex::new(WidgetState::default()));
        let store = Arc::new(CountingProgressStore {
            inner: KeyValueProgressStore::new(self.memory.clone(), config.persist_key.clone()),
            log: self.log.clone(),
            sets: Mutex::new(0),
            clears: Mutex::new(0),
        });

        let bus = EventBus::new(4096);
        let events = EventStream::new(bus.subscribe());

        let controller = PlaybackController::builder(config)
            .media(Box::new(FakeMedia {
                state: media.clone(),
                log: self.log.clone(),
            }))
            .widget(Box::new(FakeWidget {
                state: widget.clone(),
                log: self.log.clone(),
            }))
            .engine_factory(Arc::new(FakeEngineFactory {
                supported: self.engine_supported,
                state: engine.clone(),
                log: self.log.clone(),
            }))
            .progress_store(store.clone())
            .clock(self.clock.clone())
            .event_bus(bus)
            .build()
            .unwrap();

        Harness {
            controller,
            media,
            engine,
            widget,
            store,
            clock: self.clock.clone(),
            events,
        }
    }

    /// Build a controller and load [`SRC`].
    pub fn start(&self, config: PlayerConfig) -> Harness {
        let mut harness = self.build(config);
        harness.controller.set_source(SRC).unwrap();
        harness
    }
}

pub struct Harness {
    pub controller: PlaybackController,
    pub media: Arc<Mutex<MediaState>>,
    pub engine: Arc<Mutex<EngineState>>,
    pub widget: Arc<Mutex<WidgetState>>,
    pub store: Arc<CountingProgressStore>,
    pub clock: Arc<ManualClock>,
    pub events: EventStream,
}

impl Harness {
    /// Report a duration and a parsed manifest with two levels.
    pub fn ready(&mut self, duration: f64) {
        self.media.lock().duration = duration;
        self.controller
            .handle_media_event(MediaEvent::DurationChange { duration });
        let generation = self.generation();
        self.controller.handle_engine_event(
            generation,
            EngineEvent::ManifestParsed {
                levels: vec![
                    QualityLevel::new(0, 640, 360, 800_000),
                    QualityLevel::new(1, 1280, 720, 2_500_000),
                ],
            },
        );
    }

    /// Start playback and echo the element's `play` notification.
    pub fn play(&mut self) {
        self.controller.play().unwrap();
        self.controller.handle_media_event(MediaEvent::Play);
    }

    /// Move the element's playhead and deliver the time update.
    pub fn time(&mut self, time: f64) {
        self.media.lock().current_time = time;
        self.controller
            .handle_media_event(MediaEvent::TimeUpdate { time });
    }

    /// Advance wall-clock time and fire due timers.
    pub fn advance(&mut self, by: Duration) {
        self.clock.advance(by);
        self.controller.poll_timers();
    }

    pub fn generation(&self) -> u64 {
        self.controller.engine_generation().unwrap_or_default()
    }

    pub fn media_time(&self) -> f64 {
        self.media.lock().current_time
    }
}

pub fn config_with_gates(gates: &[(f64, u32)]) -> PlayerConfig {
    PlayerConfig::default().with_gates(
        gates
            .iter()
            .map(|&(time, level)| core_playback::Gate::new(time, level))
            .collect(),
    )
}
