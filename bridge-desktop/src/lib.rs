//! # Desktop Bridge Implementations
//!
//! Default implementations of bridge traits for desktop platforms
//! (macOS, Windows, Linux).
//!
//! ## Overview
//!
//! Desktop hosts get a persistent [`KeyValueStore`](bridge_traits::KeyValueStore)
//! out of the box:
//! - `FileSettingsStore` keeps player progress and preferences in a JSON file
//!   under the platform data directory
//!
//! Media, streaming engine and challenge widget implementations are host UI
//! concerns and are injected by the embedding application.
//!
//! ## Usage
//!
//! ```no_run
//! use bridge_desktop::FileSettingsStore;
//! use bridge_traits::KeyValueStore;
//!
//! let store = FileSettingsStore::open_default().unwrap();
//! store.set_f64("video-player-volume", 0.8).unwrap();
//! ```

mod settings;

pub use settings::FileSettingsStore;
