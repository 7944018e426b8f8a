//! # Logical Timers
//!
//! Deadline bookkeeping for the controller's three timers. Nothing here
//! sleeps: the host calls `poll_timers` on the controller (from its event
//! loop, an interval, or a test) and due timers are drained against the
//! injected clock.

use std::collections::BTreeMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TimerKind {
    /// Repeating progress save every `persist_interval`.
    PeriodicSave,
    /// One-shot save shortly after the last seek.
    SeekSave,
    /// One-shot pacing delay after a solved gate.
    Cooldown,
}

#[derive(Debug, Clone, Copy)]
struct Timer {
    deadline: DateTime<Utc>,
    period: Option<Duration>,
}

/// Pending timers keyed by kind. At most one timer of each kind exists;
/// scheduling a kind again replaces the pending one.
#[derive(Debug, Default)]
pub struct TimerSet {
    timers: BTreeMap<TimerKind, Timer>,
}

fn offset(from: DateTime<Utc>, by: Duration) -> DateTime<Utc> {
    chrono::Duration::from_std(by)
        .ok()
        .and_then(|by| from.checked_add_signed(by))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

impl TimerSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fire once at `now + delay`.
    pub fn schedule_once(&mut self, kind: TimerKind, now: DateTime<Utc>, delay: Duration) {
        let deadline = offset(now, delay);
        debug!(timer = ?kind, %deadline, "Timer scheduled");
        self.timers.insert(
            kind,
            Timer {
                deadline,
                period: None,
            },
        );
    }

    /// Fire every `period`, first at `now + period`. A zero period is
    /// treated as one millisecond.
    pub fn schedule_interval(&mut self, kind: TimerKind, now: DateTime<Utc>, period: Duration) {
        let period = period.max(Duration::from_millis(1));
        self.timers.insert(
            kind,
            Timer {
                deadline: offset(now, period),
                period: Some(period),
            },
        );
        debug!(timer = ?kind, period_ms = period.as_millis() as u64, "Interval scheduled");
    }

    /// Cancel a timer. Returns whether one was pending.
    pub fn cancel(&mut self, kind: TimerKind) -> bool {
        self.timers.remove(&kind).is_some()
    }

    pub fn cancel_all(&mut self) {
        if !self.timers.is_empty() {
            debug!(count = self.timers.len(), "Cancelling all timers");
        }
        self.timers.clear();
    }

    pub fn is_scheduled(&self, kind: TimerKind) -> bool {
        self.timers.contains_key(&kind)
    }

    pub fn deadline(&self, kind: TimerKind) -> Option<DateTime<Utc>> {
        self.timers.get(&kind).map(|timer| timer.deadline)
    }

    /// Earliest pending deadline, for hosts that sleep until the next tick.
    pub fn next_deadline(&self) -> Option<DateTime<Utc>> {
        self.timers.values().map(|timer| timer.deadline).min()
    }

    pub fn is_empty(&self) -> bool {
        self.timers.is_empty()
    }

    /// Remove and return every timer due at `now`, earliest first.
    ///
    /// One-shot timers are dropped. Interval timers fire once no matter how
    /// many periods were missed and move to their first deadline after `now`.
    pub fn take_due(&mut self, now: DateTime<Utc>) -> Vec<TimerKind> {
        let mut due: Vec<(DateTime<Utc>, TimerKind)> = self
            .timers
            .iter()
            .filter(|(_, timer)| timer.deadline <= now)
            .map(|(kind, timer)| (timer.deadline, *kind))
            .collect();
        due.sort();

        for (_, kind) in &due {
            let Some(timer) = self.timers.get_mut(kind) else {
                continue;
            };
            match timer.period {
                Some(period) => {
                    while timer.deadline <= now {
                        let next = offset(timer.deadline, period);
                        if next == timer.deadline {
                            break;
                        }
                        timer.deadline = next;
                    }
                }
                None => {
                    self.timers.remove(kind);
                }
            }
        }

        due.into_iter().map(|(_, kind)| kind).collect()
    }
}
