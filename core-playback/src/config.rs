//! # Player Configuration
//!
//! Options recognized by the gated playback controller, loadable from JSON.

use std::path::Path;
use std::time::Duration;

use bridge_traits::EngineOptions;
use serde::{Deserialize, Serialize};

use crate::error::{PlaybackError, Result};
use crate::gates::{Gate, GateSchedule};

/// Gated player configuration.
///
/// Every field has a default, so `{}` is a valid configuration (no source,
/// no gates).
///
/// ```
/// use core_playback::config::PlayerConfig;
///
/// let config = PlayerConfig::from_json_str(r#"{
///     "src": "https://cdn.example.com/lesson-1/master.m3u8",
///     "auto_play": true,
///     "gates": [{ "time": 10, "level": 1 }, { "time": 70, "level": 2 }]
/// }"#).unwrap();
///
/// assert_eq!(config.persist_key, "video-player");
/// assert_eq!(config.cooldown_seconds, 60);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerConfig {
    /// Stream or file URL. `None` leaves the controller waiting for
    /// `set_source`.
    #[serde(default)]
    pub src: Option<String>,

    /// Start playback once ready, unless a resume prompt is shown.
    #[serde(default)]
    pub auto_play: bool,

    /// Start muted, overriding the saved mute preference.
    #[serde(default)]
    pub muted: bool,

    #[serde(default, rename = "loop")]
    pub loop_playback: bool,

    #[serde(default)]
    pub poster: Option<String>,

    /// Prefix of every persisted key. Must be unique per player embedding.
    ///
    /// Default: `"video-player"`.
    #[serde(default = "default_persist_key")]
    pub persist_key: String,

    /// Seconds between periodic progress saves, and the minimum position
    /// change for a save to be written.
    ///
    /// Default: 5 seconds.
    #[serde(default = "default_persist_interval")]
    pub persist_interval: f64,

    /// Saved positions at or below this many seconds are not offered for
    /// resume.
    ///
    /// Default: 5 seconds.
    #[serde(default = "default_resume_threshold")]
    pub resume_threshold: f64,

    /// Saved positions older than this are not offered for resume.
    ///
    /// Default: 30 days.
    #[serde(default = "default_resume_max_age")]
    pub resume_max_age: Duration,

    /// Challenge gates, ordered by time.
    #[serde(default)]
    pub gates: Vec<Gate>,

    /// Wall-clock delay after solving a gate before the next one may
    /// activate. `0` disables pacing.
    ///
    /// Default: 60 seconds.
    #[serde(default = "default_cooldown_seconds")]
    pub cooldown_seconds: u64,

    /// Rates offered by the speed picker.
    #[serde(default = "default_playback_rates")]
    pub playback_rates: Vec<f64>,

    /// Quality level applied when the manifest loads and no preference is
    /// saved. `None` keeps automatic selection.
    #[serde(default)]
    pub preferred_quality: Option<usize>,

    /// Reject every user seek.
    #[serde(default)]
    pub disable_seeking: bool,

    #[serde(default = "default_keyboard_shortcuts")]
    pub keyboard_shortcuts: bool,

    /// Seconds skipped by the arrow keys.
    ///
    /// Default: 5 seconds.
    #[serde(default = "default_seek_step")]
    pub seek_step: f64,

    /// Volume change per arrow key press.
    ///
    /// Default: 0.1.
    #[serde(default = "default_volume_step")]
    pub volume_step: f64,

    /// Delay before a seek triggers a progress save; a newer seek replaces a
    /// pending one.
    ///
    /// Default: 100 ms.
    #[serde(default = "default_seek_save_debounce")]
    pub seek_save_debounce: Duration,

    /// Options passed to the adaptive streaming engine.
    #[serde(default)]
    pub engine: EngineOptions,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            src: None,
            auto_play: false,
            muted: false,
            loop_playback: false,
            poster: None,
            persist_key: default_persist_key(),
            persist_interval: default_persist_interval(),
            resume_threshold: default_resume_threshold(),
            resume_max_age: default_resume_max_age(),
            gates: Vec::new(),
            cooldown_seconds: default_cooldown_seconds(),
            playback_rates: default_playback_rates(),
            preferred_quality: None,
            disable_seeking: false,
            keyboard_shortcuts: default_keyboard_shortcuts(),
            seek_step: default_seek_step(),
            volume_step: default_volume_step(),
            seek_save_debounce: default_seek_save_debounce(),
            engine: EngineOptions::default(),
        }
    }
}

impl PlayerConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    pub fn with_src(mut self, src: impl Into<String>) -> Self {
        self.src = Some(src.into());
        self
    }

    pub fn with_gates(mut self, gates: Vec<Gate>) -> Self {
        self.gates = gates;
        self
    }

    pub fn with_cooldown_seconds(mut self, seconds: u64) -> Self {
        self.cooldown_seconds = seconds;
        self
    }

    pub fn with_auto_play(mut self, auto_play: bool) -> Self {
        self.auto_play = auto_play;
        self
    }

    pub fn with_persist_key(mut self, key: impl Into<String>) -> Self {
        self.persist_key = key.into();
        self
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<()> {
        GateSchedule::new(self.gates.clone())?;

        if !(self.persist_interval.is_finite() && self.persist_interval > 0.0) {
            return Err(PlaybackError::Config(
                "persist_interval must be > 0".to_string(),
            ));
        }
        self.persist_period()?;

        if !(self.resume_threshold.is_finite() && self.resume_threshold >= 0.0) {
            return Err(PlaybackError::Config(
                "resume_threshold must be >= 0".to_string(),
            ));
        }

        if self.persist_key.is_empty() {
            return Err(PlaybackError::Config(
                "persist_key cannot be empty".to_string(),
            ));
        }

        if self.playback_rates.is_empty() {
            return Err(PlaybackError::Config(
                "playback_rates cannot be empty".to_string(),
            ));
        }

        if let Some(rate) = self
            .playback_rates
            .iter()
            .find(|rate| !(rate.is_finite() && **rate > 0.0))
        {
            return Err(PlaybackError::Config(format!(
                "playback rate {} must be > 0",
                rate
            )));
        }

        if !(self.seek_step.is_finite() && self.seek_step > 0.0) {
            return Err(PlaybackError::Config("seek_step must be > 0".to_string()));
        }

        if !(self.volume_step.is_finite() && self.volume_step > 0.0 && self.volume_step <= 1.0) {
            return Err(PlaybackError::Config(
                "volume_step must be between 0.0 and 1.0".to_string(),
            ));
        }

        Ok(())
    }

    /// Persist interval as a timer period.
    pub fn persist_period(&self) -> Result<Duration> {
        Duration::try_from_secs_f64(self.persist_interval).map_err(|e| {
            PlaybackError::Config(format!(
                "persist_interval {} is out of range: {}",
                self.persist_interval, e
            ))
        })
    }

    pub fn cooldown(&self) -> Duration {
        Duration::from_secs(self.cooldown_seconds)
    }

    /// Whether `rate` is one of the configured playback rates.
    pub fn is_allowed_rate(&self, rate: f64) -> bool {
        self.playback_rates
            .iter()
            .any(|allowed| (allowed - rate).abs() < 1e-9)
    }
}

// ============================================================================
// Default Functions (for serde)
// ============================================================================

fn default_persist_key() -> String {
    "video-player".to_string()
}

fn default_persist_interval() -> f64 {
    5.0
}

fn default_resume_threshold() -> f64 {
    5.0
}

fn default_resume_max_age() -> Duration {
    Duration::from_secs(30 * 24 * 60 * 60)
}

fn default_cooldown_seconds() -> u64 {
    60
}

fn default_playback_rates() -> Vec<f64> {
    vec![0.5, 0.75, 1.0, 1.25, 1.5, 2.0]
}

fn default_keyboard_shortcuts() -> bool {
    true
}

fn default_seek_step() -> f64 {
    5.0
}

fn default_volume_step() -> f64 {
    0.1
}

fn default_seek_save_debounce() -> Duration {
    Duration::from_millis(100)
}
