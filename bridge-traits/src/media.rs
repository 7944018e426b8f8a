//! Media element bridge.
//!
//! The media primitive is the host's video surface (an `HTMLVideoElement` in
//! the browser, a native video view elsewhere). The player core issues
//! commands through [`MediaElement`] and receives the element's notifications
//! as [`MediaEvent`] values pushed by the host.

use serde::{Deserialize, Serialize};

use crate::{error::Result, platform::PlatformSend, streaming::MediaTarget};

/// A contiguous buffered span of the media timeline, in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: f64,
    pub end: f64,
}

impl TimeRange {
    pub fn new(start: f64, end: f64) -> Self {
        Self { start, end }
    }

    pub fn len(&self) -> f64 {
        (self.end - self.start).max(0.0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0.0
    }

    pub fn contains(&self, time: f64) -> bool {
        time >= self.start && time <= self.end
    }
}

/// Commands the player core can issue to the host media element.
///
/// Setters take effect on the element synchronously; the element reports the
/// resulting state changes back as [`MediaEvent`]s.
pub trait MediaElement: PlatformSend {
    /// Handle a streaming engine attaches to.
    fn target(&self) -> MediaTarget;

    /// Start or resume playback. Hosts may refuse (e.g. autoplay policy).
    fn play(&mut self) -> Result<()>;

    fn pause(&mut self);

    fn is_paused(&self) -> bool;

    /// Current playback position in seconds.
    fn current_time(&self) -> f64;

    fn set_current_time(&mut self, seconds: f64);

    /// Media duration in seconds; `NaN` or `0.0` until metadata is known.
    fn duration(&self) -> f64;

    fn set_volume(&mut self, volume: f64);

    fn set_muted(&mut self, muted: bool);

    fn set_playback_rate(&mut self, rate: f64);

    fn set_loop(&mut self, looping: bool);

    fn set_poster(&mut self, poster: &str);

    /// Point the element at a URL directly, bypassing the streaming engine.
    fn set_source(&mut self, url: &str);

    /// Whether the element can play adaptive manifests without an engine
    /// (Safari's native HLS support).
    fn supports_native_hls(&self) -> bool;

    fn buffered(&self) -> Vec<TimeRange>;

    fn set_fullscreen(&mut self, fullscreen: bool) -> Result<()>;
}

/// Notifications raised by the media element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum MediaEvent {
    Play,
    Pause,
    Ended,
    TimeUpdate { time: f64 },
    DurationChange { duration: f64 },
    VolumeChange { volume: f64, muted: bool },
    Progress { buffered: Vec<TimeRange> },
    Waiting,
    CanPlay,
    LoadedMetadata,
    FullscreenChange { fullscreen: bool },
    Error { message: String },
}
