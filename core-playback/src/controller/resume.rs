//! Resume prompt and level-complete notice.

use chrono::{DateTime, Utc};
use core_runtime::events::{CoreEvent, PlaybackEvent};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::PlaybackController;
use crate::progress::PersistedProgress;

/// Offer to continue from a saved position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResumePrompt {
    pub position: f64,
    pub duration: f64,
    /// Watched share in whole percent.
    pub percentage: u32,
    pub saved_at: DateTime<Utc>,
}

impl ResumePrompt {
    fn from_progress(progress: &PersistedProgress) -> Self {
        Self {
            position: progress.position_seconds,
            duration: progress.duration_seconds,
            percentage: progress.percentage(),
            saved_at: DateTime::<Utc>::from_timestamp_millis(progress.saved_at_epoch_ms)
                .unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResumeChoice {
    /// Seek to the saved position.
    Resume,
    /// Forget the saved position and play from the start.
    StartOver,
    /// Close the prompt and leave the playhead alone.
    Dismiss,
}

/// Shown while a cooldown holds back the next gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelCompleteNotice {
    pub completed_level: u32,
    pub next_level: u32,
    /// Gates still unsolved.
    pub remaining: usize,
}

impl PlaybackController {
    /// Decide once per content session whether to offer the saved position.
    pub(super) fn evaluate_resume(&mut self) {
        if self.resume_evaluated {
            return;
        }
        self.resume_evaluated = true;

        let Some(saved) = self.saved_progress.as_ref() else {
            return;
        };

        let now_ms = self.clock.unix_timestamp_millis();
        if !saved.resume_eligible(
            self.config.resume_threshold,
            self.config.resume_max_age,
            now_ms,
        ) {
            return;
        }

        let prompt = ResumePrompt::from_progress(saved);
        info!(
            position = prompt.position,
            percentage = prompt.percentage,
            "Offering resume"
        );
        self.emit(CoreEvent::Playback(PlaybackEvent::ResumeOffered {
            content_id: self.content_key(),
            position_seconds: prompt.position,
            percentage: prompt.percentage,
        }));
        self.resume_prompt = Some(prompt);
    }

    /// Answer the resume prompt. Returns `false` when no prompt is pending.
    ///
    /// Resuming to a position past an unsolved gate lands on that gate's
    /// trigger time instead.
    pub fn choose_resume(&mut self, choice: ResumeChoice) -> bool {
        let span = self.span.clone();
        let _enter = span.enter();

        let Some(prompt) = self.resume_prompt.take() else {
            return false;
        };
        info!(?choice, "Resume prompt answered");

        match choice {
            ResumeChoice::Resume => {
                let target = self
                    .schedule
                    .first_unsolved_gate_at_or_before(prompt.position, &self.completed_levels)
                    .map_or(prompt.position, |gate| gate.trigger_time);
                self.apply_seek(target);
                self.auto_play_after_prompt();
            }
            ResumeChoice::StartOver => {
                if let Some(content_id) = self.content_id.as_deref() {
                    if let Err(e) = self.progress.clear(content_id) {
                        warn!(error = %e, "Failed to clear resume point");
                    }
                }
                self.saved_progress = None;
                self.last_saved_time = 0.0;
                self.apply_seek(0.0);
                self.auto_play_after_prompt();
            }
            ResumeChoice::Dismiss => {}
        }
        true
    }

    fn auto_play_after_prompt(&mut self) {
        if self.config.auto_play {
            if let Err(e) = self.play() {
                warn!(error = %e, "Autoplay after resume prompt failed");
            }
        }
    }

    pub fn resume_prompt(&self) -> Option<&ResumePrompt> {
        self.resume_prompt.as_ref()
    }

    pub fn level_complete_notice(&self) -> Option<&LevelCompleteNotice> {
        self.notice.as_ref()
    }
}
