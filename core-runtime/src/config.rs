//! # Core Configuration Module
//!
//! Holds the host capabilities every player instance shares.
//!
//! ## Overview
//!
//! [`CoreConfig`] is built with [`CoreConfigBuilder`] and fails fast when a
//! required bridge is missing, with an error message telling the host what
//! to inject.
//!
//! ## Required Dependencies
//!
//! - `KeyValueStore` - persistence for resume points, completed gate levels
//!   and preferences
//!
//! ## Optional Dependencies (with defaults)
//!
//! - `Clock` - defaults to [`SystemClock`]
//! - `LoggerSink` - host log mirror, none by default
//! - `StreamingEngineFactory` - adaptive engine; without one the player uses
//!   the media element's native playback path
//!
//! When the `desktop-shims` feature is enabled, a JSON-file `KeyValueStore`
//! under the platform data directory is injected if none is provided.
//!
//! ## Usage
//!
//! ```
//! use bridge_traits::MemoryKeyValueStore;
//! use core_runtime::config::CoreConfig;
//! use std::sync::Arc;
//!
//! let config = CoreConfig::builder()
//!     .key_value_store(Arc::new(MemoryKeyValueStore::new()))
//!     .event_buffer_size(256)
//!     .build()
//!     .expect("valid config");
//!
//! assert_eq!(config.event_buffer_size, 256);
//! ```

use crate::error::{Error, Result};
use crate::events::{EventBus, DEFAULT_EVENT_BUFFER_SIZE};
use bridge_traits::{Clock, KeyValueStore, LoggerSink, StreamingEngineFactory, SystemClock};
use std::path::PathBuf;
use std::sync::Arc;

/// Upper bound on the event buffer; position updates arrive several times a
/// second, so anything beyond this only hides a stuck subscriber.
const MAX_EVENT_BUFFER_SIZE: usize = 65_536;

/// Shared host capabilities for player instances.
#[derive(Clone)]
pub struct CoreConfig {
    /// Durable string store (required)
    pub key_value_store: Arc<dyn KeyValueStore>,

    /// Wall-clock source for timers and persistence timestamps
    pub clock: Arc<dyn Clock>,

    /// Optional host log mirror
    pub logger_sink: Option<Arc<dyn LoggerSink>>,

    /// Adaptive streaming engine factory (optional)
    pub engine_factory: Option<Arc<dyn StreamingEngineFactory>>,

    /// Per-subscriber buffer of the event bus
    pub event_buffer_size: usize,

    /// Where the desktop settings file lives, when the default store is used
    pub settings_path: Option<PathBuf>,
}

impl std::fmt::Debug for CoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoreConfig")
            .field("key_value_store", &"KeyValueStore { ... }")
            .field("clock", &"Clock { ... }")
            .field(
                "logger_sink",
                &self.logger_sink.as_ref().map(|_| "LoggerSink { ... }"),
            )
            .field(
                "engine_factory",
                &self
                    .engine_factory
                    .as_ref()
                    .map(|_| "StreamingEngineFactory { ... }"),
            )
            .field("event_buffer_size", &self.event_buffer_size)
            .field("settings_path", &self.settings_path)
            .finish()
    }
}

impl CoreConfig {
    pub fn builder() -> CoreConfigBuilder {
        CoreConfigBuilder::default()
    }

    /// Checks value ranges. Bridges are validated by the builder.
    pub fn validate(&self) -> Result<()> {
        if self.event_buffer_size == 0 {
            return Err(Error::Config(
                "Event buffer size must be greater than 0".to_string(),
            ));
        }

        if self.event_buffer_size > MAX_EVENT_BUFFER_SIZE {
            return Err(Error::Config(format!(
                "Event buffer size exceeds maximum of {}",
                MAX_EVENT_BUFFER_SIZE
            )));
        }

        Ok(())
    }

    /// Create an event bus sized from this configuration.
    pub fn event_bus(&self) -> EventBus {
        EventBus::new(self.event_buffer_size)
    }
}

#[cfg(not(feature = "desktop-shims"))]
fn key_value_store_missing_error() -> Error {
    Error::CapabilityMissing {
        capability: "KeyValueStore".to_string(),
        message: "KeyValueStore implementation is required for resume points and preferences. \
                 Desktop: enable the 'desktop-shims' feature to use the default FileSettingsStore. \
                 Web: inject a localStorage-backed store. \
                 Tests: use bridge_traits::MemoryKeyValueStore."
            .to_string(),
    }
}

#[cfg(feature = "desktop-shims")]
fn provide_default_key_value_store(
    settings_path: Option<&PathBuf>,
) -> Result<(Arc<dyn KeyValueStore>, PathBuf)> {
    use bridge_desktop::FileSettingsStore;

    let path = match settings_path {
        Some(path) => path.clone(),
        None => FileSettingsStore::default_path()?,
    };

    let store = FileSettingsStore::open(path.clone()).map_err(|e| {
        Error::Internal(format!("Failed to initialize default KeyValueStore: {}", e))
    })?;

    let store: Arc<dyn KeyValueStore> = Arc::new(store);
    Ok((store, path))
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_key_value_store(
    _settings_path: Option<&PathBuf>,
) -> Result<(Arc<dyn KeyValueStore>, PathBuf)> {
    Err(key_value_store_missing_error())
}

/// Builder for [`CoreConfig`].
#[derive(Default)]
pub struct CoreConfigBuilder {
    key_value_store: Option<Arc<dyn KeyValueStore>>,
    clock: Option<Arc<dyn Clock>>,
    logger_sink: Option<Arc<dyn LoggerSink>>,
    engine_factory: Option<Arc<dyn StreamingEngineFactory>>,
    event_buffer_size: Option<usize>,
    settings_path: Option<PathBuf>,
}

impl CoreConfigBuilder {
    pub fn key_value_store(mut self, store: Arc<dyn KeyValueStore>) -> Self {
        self.key_value_store = Some(store);
        self
    }

    /// Sets the wall-clock source. Tests inject a `ManualClock`.
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn logger_sink(mut self, sink: Arc<dyn LoggerSink>) -> Self {
        self.logger_sink = Some(sink);
        self
    }

    pub fn engine_factory(mut self, factory: Arc<dyn StreamingEngineFactory>) -> Self {
        self.engine_factory = Some(factory);
        self
    }

    pub fn event_buffer_size(mut self, size: usize) -> Self {
        self.event_buffer_size = Some(size);
        self
    }

    /// Location of the default desktop settings file. Ignored when a store
    /// is injected explicitly.
    pub fn settings_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.settings_path = Some(path.into());
        self
    }

    /// Builds the final `CoreConfig`.
    ///
    /// # Errors
    ///
    /// - [`Error::CapabilityMissing`] when no `KeyValueStore` is injected and
    ///   the `desktop-shims` feature is off
    /// - [`Error::Config`] when a value is out of range
    pub fn build(self) -> Result<CoreConfig> {
        let (key_value_store, settings_path) = match self.key_value_store {
            Some(store) => (store, None),
            None => {
                let (store, path) =
                    provide_default_key_value_store(self.settings_path.as_ref())?;
                (store, Some(path))
            }
        };

        let config = CoreConfig {
            key_value_store,
            clock: self.clock.unwrap_or_else(|| Arc::new(SystemClock)),
            logger_sink: self.logger_sink,
            engine_factory: self.engine_factory,
            event_buffer_size: self.event_buffer_size.unwrap_or(DEFAULT_EVENT_BUFFER_SIZE),
            settings_path,
        };

        config.validate()?;

        Ok(config)
    }
}
