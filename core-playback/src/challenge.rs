//! # Challenge Session
//!
//! Tracks the single challenge presented over the video. The session mounts
//! the host widget for a level, counts reported wrong answers and turns the
//! widget's success report into a [`ChallengeOutcome`].
//!
//! Terminal "game over" screens and retry flows are the widget's business;
//! the session only ever sees failed attempts and the final success.

use bridge_traits::ChallengeWidget;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Result of a solved challenge, consumed once by the controller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChallengeOutcome {
    pub level: u32,
    pub success: bool,
    pub attempts: u32,
    pub solve_time_seconds: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ChallengeState {
    Idle,
    Active {
        level: u32,
        failed_attempts: u32,
        started_at: DateTime<Utc>,
    },
    Solved {
        level: u32,
        attempts: u32,
    },
}

pub struct ChallengeSession {
    widget: Box<dyn ChallengeWidget>,
    state: ChallengeState,
}

impl ChallengeSession {
    pub fn new(widget: Box<dyn ChallengeWidget>) -> Self {
        Self {
            widget,
            state: ChallengeState::Idle,
        }
    }

    pub fn state(&self) -> ChallengeState {
        self.state
    }

    pub fn active_level(&self) -> Option<u32> {
        match self.state {
            ChallengeState::Active { level, .. } => Some(level),
            _ => None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.active_level().is_some()
    }

    /// Mount the widget for `level`. Returns `false` without touching the
    /// widget when another challenge is already active.
    pub fn activate(&mut self, level: u32, now: DateTime<Utc>) -> bool {
        if let Some(active) = self.active_level() {
            debug!(
                active_level = active,
                requested_level = level,
                "Challenge already active, ignoring activation"
            );
            return false;
        }

        self.widget.mount(level);
        self.state = ChallengeState::Active {
            level,
            failed_attempts: 0,
            started_at: now,
        };
        info!(level, "Challenge activated");
        true
    }

    /// Count a wrong answer. Returns the failed-attempt count, or `None` if
    /// `level` is not the active challenge.
    pub fn record_failed_attempt(&mut self, level: u32) -> Option<u32> {
        match &mut self.state {
            ChallengeState::Active {
                level: active,
                failed_attempts,
                ..
            } if *active == level => {
                *failed_attempts += 1;
                debug!(level, attempts = *failed_attempts, "Challenge attempt failed");
                Some(*failed_attempts)
            }
            _ => {
                debug!(level, "Failed attempt for inactive challenge ignored");
                None
            }
        }
    }

    /// Finish the active challenge for `level` and unmount the widget.
    ///
    /// The attempt count is the larger of the widget's report and the failed
    /// attempts seen plus the successful one. A missing solve time falls back
    /// to the wall-clock time since activation.
    pub fn complete(
        &mut self,
        level: u32,
        reported_attempts: u32,
        solve_time_seconds: Option<f64>,
        now: DateTime<Utc>,
    ) -> Option<ChallengeOutcome> {
        let (failed_attempts, started_at) = match self.state {
            ChallengeState::Active {
                level: active,
                failed_attempts,
                started_at,
            } if active == level => (failed_attempts, started_at),
            _ => {
                debug!(level, "Solve report for inactive challenge ignored");
                return None;
            }
        };

        let attempts = reported_attempts.max(failed_attempts + 1);
        let solve_time_seconds = solve_time_seconds
            .filter(|seconds| seconds.is_finite() && *seconds >= 0.0)
            .or_else(|| {
                let elapsed = now.signed_duration_since(started_at);
                Some(elapsed.num_milliseconds().max(0) as f64 / 1000.0)
            });

        self.widget.unmount();
        self.state = ChallengeState::Solved { level, attempts };
        info!(level, attempts, "Challenge solved");

        Some(ChallengeOutcome {
            level,
            success: true,
            attempts,
            solve_time_seconds,
        })
    }

    /// Unmount any active challenge and return to idle.
    pub fn cancel(&mut self) {
        if let Some(level) = self.active_level() {
            debug!(level, "Challenge cancelled");
        }
        self.widget.unmount();
        self.state = ChallengeState::Idle;
    }
}

impl std::fmt::Debug for ChallengeSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChallengeSession")
            .field("widget", &"ChallengeWidget { ... }")
            .field("state", &self.state)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use parking_lot::Mutex;

    #[derive(Default)]
    struct Recorded {
        mounts: Vec<u32>,
        unmounts: usize,
    }

    struct RecordingWidget(Arc<Mutex<Recorded>>);

    impl ChallengeWidget for RecordingWidget {
        fn mount(&mut self, level: u32) {
            self.0.lock().mounts.push(level);
        }

        fn unmount(&mut self) {
            self.0.lock().unmounts += 1;
        }
    }

    fn session() -> (ChallengeSession, Arc<Mutex<Recorded>>) {
        let recorded = Arc::new(Mutex::new(Recorded::default()));
        let session = ChallengeSession::new(Box::new(RecordingWidget(recorded.clone())));
        (session, recorded)
    }

    fn at(seconds: i64) -> DateTime<Utc> {
        DateTime::<Utc>::from_timestamp(1_700_000_000 + seconds, 0).unwrap()
    }

    #[test]
    fn test_activation_is_exclusive() {
        let (mut session, recorded) = session();

        assert!(session.activate(1, at(0)));
        assert!(!session.activate(2, at(1)));
        assert_eq!(session.active_level(), Some(1));
        assert_eq!(recorded.lock().mounts, vec![1]);
    }

    #[test]
    fn test_failed_attempts_stay_active() {
        let (mut session, _) = session();
        session.activate(1, at(0));

        assert_eq!(session.record_failed_attempt(1), Some(1));
        assert_eq!(session.record_failed_attempt(1), Some(2));
        assert_eq!(session.record_failed_attempt(2), None);
        assert!(session.is_active());
    }

    #[test]
    fn test_complete_produces_outcome_and_unmounts() {
        let (mut session, recorded) = session();
        session.activate(1, at(0));

        let outcome = session.complete(1, 2, Some(3.0), at(10)).unwrap();
        assert_eq!(
            outcome,
            ChallengeOutcome {
                level: 1,
                success: true,
                attempts: 2,
                solve_time_seconds: Some(3.0),
            }
        );
        assert_eq!(recorded.lock().unmounts, 1);
        assert!(!session.is_active());
        assert_eq!(session.state(), ChallengeState::Solved { level: 1, attempts: 2 });

        // consumed once
        assert!(session.complete(1, 2, Some(3.0), at(11)).is_none());
    }

    #[test]
    fn test_complete_uses_counted_attempts_and_elapsed_time() {
        let (mut session, _) = session();
        session.activate(3, at(0));
        session.record_failed_attempt(3);
        session.record_failed_attempt(3);

        let outcome = session.complete(3, 1, None, at(42)).unwrap();
        assert_eq!(outcome.attempts, 3);
        assert_eq!(outcome.solve_time_seconds, Some(42.0));
    }

    #[test]
    fn test_complete_wrong_level_is_ignored() {
        let (mut session, recorded) = session();
        session.activate(1, at(0));

        assert!(session.complete(2, 1, None, at(5)).is_none());
        assert!(session.is_active());
        assert_eq!(recorded.lock().unmounts, 0);
    }

    #[test]
    fn test_cancel_allows_reactivation() {
        let (mut session, recorded) = session();
        session.activate(1, at(0));
        session.cancel();

        assert_eq!(session.state(), ChallengeState::Idle);
        assert!(session.activate(1, at(3)));
        assert_eq!(recorded.lock().mounts, vec![1, 1]);
    }
}
