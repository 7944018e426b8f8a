//! # Playback Error Types
//!
//! Errors surfaced by the gated playback controller and its collaborators.

use bridge_traits::BridgeError;
use thiserror::Error;

/// Errors that can occur during playback operations.
#[derive(Error, Debug)]
pub enum PlaybackError {
    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Player configuration failed validation.
    #[error("Invalid player configuration: {0}")]
    Config(String),

    /// A required host capability was not injected.
    #[error("Capability missing: {capability} - {message}")]
    CapabilityMissing { capability: String, message: String },

    /// Shared runtime configuration error.
    #[error("Runtime error: {0}")]
    Runtime(#[from] core_runtime::Error),

    // ========================================================================
    // Source / Streaming Errors
    // ========================================================================
    /// Neither the streaming engine nor the media element can play the source.
    #[error("Unsupported source: {0}")]
    Unsupported(String),

    /// The streaming engine reported a fatal error. Recoverable only by
    /// reloading the source.
    #[error("Streaming failed ({kind}): {details}")]
    StreamingFailed { kind: String, details: String },

    /// The media element reported an error.
    #[error("Media error: {0}")]
    Media(String),

    // ========================================================================
    // Playback Control Errors
    // ========================================================================
    /// Playback is held at a gate until its challenge is solved.
    #[error("Playback locked until level {level} is solved")]
    GateLocked { level: u32 },

    /// Operation requires metadata or a manifest to be loaded first.
    #[error("Player is not ready")]
    NotReady,

    /// The controller is in the errored state.
    #[error("Player is in an error state; reload the source")]
    Errored,

    /// The controller was torn down.
    #[error("Player has been torn down")]
    TornDown,

    /// Invalid volume value (must be in range [0.0, 1.0]).
    #[error("Invalid volume: {0} (must be between 0.0 and 1.0)")]
    InvalidVolume(f64),

    /// Playback rate is not one of the configured rates.
    #[error("Unsupported playback rate: {0}")]
    InvalidPlaybackRate(f64),

    /// Quality index out of range.
    #[error("Invalid quality level {index} ({available} available)")]
    InvalidQuality { index: usize, available: usize },

    // ========================================================================
    // Generic Errors
    // ========================================================================
    /// Host bridge failure (storage, media element).
    #[error("Bridge error: {0}")]
    Bridge(#[from] BridgeError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Internal error (should not occur in normal operation).
    #[error("Internal error: {0}")]
    Internal(String),
}

impl PlaybackError {
    /// Returns `true` if retrying later may succeed without user action.
    pub fn is_transient(&self) -> bool {
        match self {
            PlaybackError::NotReady => true,
            PlaybackError::Bridge(e) => e.is_storage_failure(),
            _ => false,
        }
    }

    /// Returns `true` if the error ends the current content session.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            PlaybackError::Unsupported(_) | PlaybackError::StreamingFailed { .. }
        )
    }

    /// Returns `true` if the error should be shown to the viewer.
    ///
    /// Persistence failures and rejected seeks are never user-visible.
    pub fn is_user_visible(&self) -> bool {
        matches!(
            self,
            PlaybackError::Unsupported(_)
                | PlaybackError::StreamingFailed { .. }
                | PlaybackError::Media(_)
        )
    }
}

/// Result type for playback operations.
pub type Result<T> = std::result::Result<T, PlaybackError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification() {
        let fatal = PlaybackError::StreamingFailed {
            kind: "networkError".to_string(),
            details: "manifestLoadError".to_string(),
        };
        assert!(fatal.is_fatal());
        assert!(fatal.is_user_visible());
        assert!(!fatal.is_transient());

        let storage = PlaybackError::Bridge(BridgeError::QuotaExceeded {
            key: "video-player-a-time".to_string(),
        });
        assert!(storage.is_transient());
        assert!(!storage.is_user_visible());

        let gate = PlaybackError::GateLocked { level: 2 };
        assert!(!gate.is_fatal());
        assert!(!gate.is_user_visible());
        assert_eq!(gate.to_string(), "Playback locked until level 2 is solved");
    }
}
