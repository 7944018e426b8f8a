//! # Gate Schedule
//!
//! Ordered timestamps at which playback must stop for a challenge, and the
//! per-gate bookkeeping the controller keeps while the content plays.
//!
//! The schedule is pure data: every query takes the set of completed levels
//! explicitly, so a solved level is never re-triggered no matter how the
//! viewer moves around the timeline.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::error::{PlaybackError, Result};

/// Tolerance after a gate's trigger time within which a time update still
/// counts as "at the gate". Media elements report time every ~250ms, so an
/// exact match would be missed.
pub const GATE_TRIGGER_WINDOW: f64 = 0.5;

/// A scheduled stop in the content.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Gate {
    /// Media time in seconds
    #[serde(rename = "time")]
    pub trigger_time: f64,
    /// Challenge level required to pass
    pub level: u32,
}

impl Gate {
    pub fn new(trigger_time: f64, level: u32) -> Self {
        Self {
            trigger_time,
            level,
        }
    }

    fn is_within_window(&self, time: f64) -> bool {
        self.trigger_time <= time && time < self.trigger_time + GATE_TRIGGER_WINDOW
    }
}

/// Progress on one gate during the current content session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GateState {
    pub attempts: u32,
    pub solved: bool,
    /// Seconds the viewer spent on the challenge, if reported
    pub time_to_solve: Option<f64>,
}

/// Progress-bar marker for one gate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GateMarker {
    pub time: f64,
    pub level: u32,
    pub solved: bool,
}

/// Immutable, validated list of gates ordered by trigger time.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GateSchedule {
    gates: Vec<Gate>,
}

impl GateSchedule {
    /// Build a schedule, rejecting lists that are not strictly increasing in
    /// both trigger time and level.
    pub fn new(gates: Vec<Gate>) -> Result<Self> {
        for gate in &gates {
            if !gate.trigger_time.is_finite() || gate.trigger_time < 0.0 {
                return Err(PlaybackError::Config(format!(
                    "gate for level {} has invalid time {}",
                    gate.level, gate.trigger_time
                )));
            }
        }

        for pair in gates.windows(2) {
            let (prev, next) = (&pair[0], &pair[1]);
            if next.trigger_time <= prev.trigger_time {
                return Err(PlaybackError::Config(format!(
                    "gate times must be strictly increasing ({} then {})",
                    prev.trigger_time, next.trigger_time
                )));
            }
            if next.level <= prev.level {
                return Err(PlaybackError::Config(format!(
                    "gate levels must be strictly increasing ({} then {})",
                    prev.level, next.level
                )));
            }
        }

        Ok(Self { gates })
    }

    pub fn gates(&self) -> &[Gate] {
        &self.gates
    }

    pub fn len(&self) -> usize {
        self.gates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.gates.is_empty()
    }

    pub fn index_of_level(&self, level: u32) -> Option<usize> {
        self.gates.iter().position(|gate| gate.level == level)
    }

    /// The unsolved gate whose trigger window contains `current_time`.
    pub fn next_unsolved_gate(
        &self,
        current_time: f64,
        completed: &BTreeSet<u32>,
    ) -> Option<&Gate> {
        self.gates
            .iter()
            .filter(|gate| !completed.contains(&gate.level))
            .find(|gate| gate.is_within_window(current_time))
    }

    /// Earliest unsolved gate strictly before `time`. A seek to `time` is
    /// allowed only when this returns `None`.
    pub fn first_unsolved_gate_at_or_before(
        &self,
        time: f64,
        completed: &BTreeSet<u32>,
    ) -> Option<&Gate> {
        self.gates
            .iter()
            .filter(|gate| !completed.contains(&gate.level))
            .find(|gate| gate.trigger_time < time)
    }

    /// Earliest unsolved gate passed during continuous playback from
    /// `previous` to `current` (`previous < trigger <= current`).
    pub fn crossed_unsolved_gate(
        &self,
        previous: f64,
        current: f64,
        completed: &BTreeSet<u32>,
    ) -> Option<&Gate> {
        if current <= previous {
            return None;
        }
        self.gates
            .iter()
            .filter(|gate| !completed.contains(&gate.level))
            .find(|gate| previous < gate.trigger_time && gate.trigger_time <= current)
    }

    /// Earliest unsolved gate in schedule order, regardless of time.
    pub fn first_unsolved(&self, completed: &BTreeSet<u32>) -> Option<&Gate> {
        self.gates
            .iter()
            .find(|gate| !completed.contains(&gate.level))
    }

    /// Count of gates whose level is not completed.
    pub fn remaining(&self, completed: &BTreeSet<u32>) -> usize {
        self.gates
            .iter()
            .filter(|gate| !completed.contains(&gate.level))
            .count()
    }

    pub fn markers(&self, completed: &BTreeSet<u32>) -> Vec<GateMarker> {
        self.gates
            .iter()
            .map(|gate| GateMarker {
                time: gate.trigger_time,
                level: gate.level,
                solved: completed.contains(&gate.level),
            })
            .collect()
    }
}
