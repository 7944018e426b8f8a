//! Mirrored playback state and seek results.

use std::fmt;

use bridge_traits::TimeRange;
use serde::{Deserialize, Serialize};

/// Controller state machine.
///
/// ```text
/// Loading ─► Ready ─► Playing ◄─► Paused
///                        │  ▲
///                        ▼  │ solved
///                    GateActive
///
/// Playing/Paused ─► Ended        any ─► Errored (reload to recover)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum PlayerState {
    /// Waiting for the manifest or media metadata.
    Loading,
    Ready,
    Playing,
    Paused,
    /// Playback is held until the challenge for `level` is solved.
    GateActive { level: u32 },
    Ended,
    /// A fatal error stopped playback. Only a new source recovers.
    Errored,
}

impl PlayerState {
    pub fn is_gate_active(&self) -> bool {
        matches!(self, PlayerState::GateActive { .. })
    }
}

impl fmt::Display for PlayerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlayerState::Loading => write!(f, "loading"),
            PlayerState::Ready => write!(f, "ready"),
            PlayerState::Playing => write!(f, "playing"),
            PlayerState::Paused => write!(f, "paused"),
            PlayerState::GateActive { level } => write!(f, "gate_active({})", level),
            PlayerState::Ended => write!(f, "ended"),
            PlayerState::Errored => write!(f, "errored"),
        }
    }
}

/// Local mirror of the media element and engine state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaybackSession {
    pub current_time: f64,
    /// `0.0` until metadata reports a duration.
    pub duration: f64,
    pub is_playing: bool,
    pub volume: f64,
    pub is_muted: bool,
    pub playback_rate: f64,
    /// `None` is automatic quality selection.
    pub current_quality_index: Option<usize>,
    pub buffered_ranges: Vec<TimeRange>,
    pub is_fullscreen: bool,
    pub is_loading: bool,
    pub last_error: Option<String>,
}

impl Default for PlaybackSession {
    fn default() -> Self {
        Self {
            current_time: 0.0,
            duration: 0.0,
            is_playing: false,
            volume: 1.0,
            is_muted: false,
            playback_rate: 1.0,
            current_quality_index: None,
            buffered_ranges: Vec::new(),
            is_fullscreen: false,
            is_loading: true,
            last_error: None,
        }
    }
}

impl PlaybackSession {
    /// Whether a positive, finite duration is known.
    pub fn has_duration(&self) -> bool {
        self.duration.is_finite() && self.duration > 0.0
    }

    /// Seconds buffered ahead of the playhead.
    pub fn buffered_ahead(&self) -> f64 {
        self.buffered_ranges
            .iter()
            .find(|range| range.contains(self.current_time))
            .map_or(0.0, |range| range.end - self.current_time)
    }
}

/// Result of a seek request.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SeekOutcome {
    /// The media element moved to `time` (after clamping).
    Applied { time: f64 },
    /// The media time is unchanged.
    Rejected { reason: SeekRejection },
}

impl SeekOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, SeekOutcome::Applied { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum SeekRejection {
    /// The target lies past the trigger time of this unsolved gate.
    UnsolvedGate { level: u32 },
    /// A challenge is on screen.
    GateActive { level: u32 },
    SeekingDisabled,
    /// No source is loaded.
    NotLoaded,
    Errored,
    /// The target is not a finite number.
    InvalidTarget,
}
