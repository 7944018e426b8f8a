//! Workspace placeholder crate.
//!
//! This crate exposes feature flags that map onto the member crates
//! (`core-runtime`, `core-playback`). Host applications can depend on
//! `gated-player-workspace`, enable `desktop-shims` or `playback`, and reach the
//! gated video controller through the re-exports below.

#[cfg(any(feature = "playback", feature = "desktop-shims"))]
pub use core_playback as playback;
#[cfg(any(feature = "playback", feature = "desktop-shims"))]
pub use core_runtime as runtime;
