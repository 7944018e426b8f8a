//! Challenge widget bridge.
//!
//! A challenge widget is any interactive mini-game (quiz, visual memory grid,
//! sequence ordering, pattern recall) the host can mount over the video. The
//! core does not know which flavor is mounted; it only mounts a widget for a
//! level and waits for the host to report the widget's success callback.

use crate::platform::PlatformSend;

/// Host-side challenge presentation.
///
/// Widgets handle wrong answers and terminal "game over" screens on their
/// own. The only result the core consumes is the solve report, which the host
/// forwards to the controller as `on_challenge_solved(level, attempts,
/// solve_time_seconds)`.
pub trait ChallengeWidget: PlatformSend {
    /// Present the challenge configured for `level`.
    fn mount(&mut self, level: u32);

    /// Remove any presented challenge. Must be safe to call when nothing is
    /// mounted.
    fn unmount(&mut self);
}

/// Widget that presents nothing, for headless hosts.
#[derive(Debug, Default, Clone)]
pub struct HeadlessChallengeWidget {
    mounted: Option<u32>,
}

impl HeadlessChallengeWidget {
    pub fn mounted_level(&self) -> Option<u32> {
        self.mounted
    }
}

impl ChallengeWidget for HeadlessChallengeWidget {
    fn mount(&mut self, level: u32) {
        self.mounted = Some(level);
    }

    fn unmount(&mut self) {
        self.mounted = None;
    }
}
