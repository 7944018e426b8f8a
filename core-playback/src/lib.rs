//! # Gated Playback Module
//!
//! Adaptive video playback that stops at scheduled gates until the viewer
//! solves a challenge.
//!
//! ## Overview
//!
//! This module handles:
//! - Gate schedule validation and trigger detection ([`gates`])
//! - The single active challenge and its outcome ([`challenge`])
//! - Resume points, completed levels and preferences ([`progress`])
//! - Streaming engine lifetime and quality mirroring ([`engine`])
//! - The playback state machine, seek interception and timers ([`controller`])

pub mod challenge;
pub mod config;
pub mod controller;
pub mod engine;
pub mod error;
pub mod format;
pub mod gates;
pub mod progress;
pub mod timers;

pub use challenge::{ChallengeOutcome, ChallengeSession, ChallengeState};
pub use config::PlayerConfig;
pub use controller::{
    Key, LevelCompleteNotice, PlaybackController, PlaybackControllerBuilder, PlaybackSession,
    PlayerState, ResumeChoice, ResumePrompt, SeekOutcome, SeekRejection,
};
pub use engine::{EngineGeneration, StreamingEngineAdapter};
pub use error::{PlaybackError, Result};
pub use format::format_time;
pub use gates::{Gate, GateMarker, GateSchedule, GateState, GATE_TRIGGER_WINDOW};
pub use progress::{
    content_id_from_src, KeyValueProgressStore, PersistedProgress, Preferences, ProgressStore,
};
pub use timers::{TimerKind, TimerSet};
