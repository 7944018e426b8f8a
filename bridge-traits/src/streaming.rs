//! Adaptive streaming engine bridge.
//!
//! Transport, manifest parsing and demuxing are owned by the host's adaptive
//! bitrate engine (hls.js in the browser). The core only sees the surface
//! below: load a manifest, attach to a media target, switch levels, and
//! receive [`EngineEvent`]s.

use serde::{Deserialize, Serialize};

use crate::{error::Result, platform::PlatformSend, platform::PlatformSendSync};

/// Opaque handle identifying the media element an engine feeds.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MediaTarget(pub String);

impl MediaTarget {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// One rendition advertised by the manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualityLevel {
    pub index: usize,
    pub width: u32,
    pub height: u32,
    /// Peak bitrate in bits per second
    pub bitrate: u64,
}

impl QualityLevel {
    pub fn new(index: usize, width: u32, height: u32, bitrate: u64) -> Self {
        Self {
            index,
            width,
            height,
            bitrate,
        }
    }

    /// Label used by quality pickers, e.g. `"720p (2500kbps)"`.
    pub fn display_name(&self) -> String {
        let kbps = (self.bitrate as f64 / 1000.0).round() as u64;
        format!("{}p ({}kbps)", self.height, kbps)
    }
}

/// Engine construction options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineOptions {
    pub enable_worker: bool,
    pub low_latency_mode: bool,
    /// Seconds of already-played media the engine keeps buffered
    pub back_buffer_length: f64,
    pub cap_level_to_player_size: bool,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            enable_worker: true,
            low_latency_mode: true,
            back_buffer_length: 90.0,
            cap_level_to_player_size: true,
        }
    }
}

/// Classification of engine errors, mirroring the engine's own taxonomy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineErrorKind {
    Network,
    Media,
    Mux,
    Other(String),
}

impl std::fmt::Display for EngineErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EngineErrorKind::Network => write!(f, "networkError"),
            EngineErrorKind::Media => write!(f, "mediaError"),
            EngineErrorKind::Mux => write!(f, "muxError"),
            EngineErrorKind::Other(kind) => write!(f, "{}", kind),
        }
    }
}

/// Notifications raised by the streaming engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum EngineEvent {
    ManifestParsed {
        levels: Vec<QualityLevel>,
    },
    LevelSwitched {
        index: usize,
    },
    Error {
        kind: EngineErrorKind,
        details: String,
        fatal: bool,
    },
}

/// A live adaptive streaming engine instance.
///
/// Instances are single-use: one per source URL. [`StreamingEngine::destroy`]
/// detaches from the media target and stops all network activity; no events
/// may be delivered for an instance after it has been destroyed.
pub trait StreamingEngine: PlatformSend {
    fn load(&mut self, url: &str) -> Result<()>;

    fn attach(&mut self, target: &MediaTarget) -> Result<()>;

    /// Currently selected level, `None` while the engine picks automatically.
    fn current_level(&self) -> Option<usize>;

    /// Pin a level, or return to automatic selection with `None`.
    fn set_current_level(&mut self, level: Option<usize>);

    fn destroy(&mut self);
}

/// Creates [`StreamingEngine`] instances.
pub trait StreamingEngineFactory: PlatformSendSync {
    /// Whether the host can run the engine at all (MSE availability).
    fn is_supported(&self) -> bool;

    fn create(&self, options: &EngineOptions) -> Result<Box<dyn StreamingEngine>>;
}
