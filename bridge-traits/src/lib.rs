//! # Host Bridge Traits
//!
//! Capabilities the player core needs from its host, expressed as traits that
//! every host platform implements.
//!
//! ## Overview
//!
//! The gated player never talks to a browser, a video surface, or a storage
//! backend directly. The host hands it implementations of the traits below and
//! forwards element and engine notifications as plain event values.
//!
//! ## Traits
//!
//! ### Media
//! - [`MediaElement`](media::MediaElement) - The video surface (play, pause, seek, volume)
//! - [`StreamingEngine`](streaming::StreamingEngine) - Adaptive bitrate engine instance
//! - [`StreamingEngineFactory`](streaming::StreamingEngineFactory) - Engine support probe and constructor
//!
//! ### Interaction
//! - [`ChallengeWidget`](challenge::ChallengeWidget) - Mounts the mini-game that unlocks a gate
//!
//! ### Persistence
//! - [`KeyValueStore`](storage::KeyValueStore) - `localStorage`-shaped string store
//!
//! ### Utilities
//! - [`Clock`](time::Clock) - Time source for deterministic testing
//! - [`LoggerSink`](time::LoggerSink) - Forward structured logs to host logging
//!
//! ## Platform Requirements
//!
//! | Platform | Implementation Crate | Status |
//! |----------|---------------------|--------|
//! | Desktop  | `bridge-desktop`    | ✅ Settings store |
//! | Web      | TBD                 | 📋 Planned |
//!
//! ## Error Handling
//!
//! All bridge traits use [`BridgeError`](error::BridgeError). Storage errors
//! are reported but the player treats them as non-fatal; media and engine
//! errors surface as user-visible playback errors.
//!
//! ## Thread Safety
//!
//! Shared capabilities (`KeyValueStore`, `Clock`, `LoggerSink`, engine
//! factories) are `Send + Sync` on native targets. Objects owned by a single
//! player instance (media element, engine, widget) only need `Send`. On
//! `wasm32` both bounds are dropped.

pub mod challenge;
pub mod error;
pub mod media;
pub mod platform;
pub mod storage;
pub mod streaming;
pub mod time;

pub use error::BridgeError;

// Re-export commonly used types
pub use challenge::{ChallengeWidget, HeadlessChallengeWidget};
pub use media::{MediaElement, MediaEvent, TimeRange};
pub use platform::{PlatformSend, PlatformSendSync};
pub use storage::{KeyValueStore, MemoryKeyValueStore};
pub use streaming::{
    EngineErrorKind, EngineEvent, EngineOptions, MediaTarget, QualityLevel, StreamingEngine,
    StreamingEngineFactory,
};
pub use time::{Clock, ConsoleLogger, LogEntry, LogLevel, LoggerSink, ManualClock, SystemClock};
