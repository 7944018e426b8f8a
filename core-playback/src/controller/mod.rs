//! # Playback Controller
//!
//! The gated player's state machine. It owns the mirrored
//! [`PlaybackSession`], the [`ChallengeSession`], the streaming engine and
//! the logical timers, and it is the only writer of progress for the content
//! it plays.
//!
//! ## Driving the controller
//!
//! The controller never blocks and never spawns. The host forwards
//! notifications and calls [`PlaybackController::poll_timers`] regularly:
//!
//! - media element notifications: [`PlaybackController::handle_media_event`]
//! - engine notifications, tagged with the generation returned by
//!   [`PlaybackController::engine_generation`]:
//!   [`PlaybackController::handle_engine_event`]
//! - widget reports: [`PlaybackController::on_challenge_solved`] and
//!   [`PlaybackController::on_challenge_attempt_failed`]
//!
//! Observers subscribe to [`CoreEvent`]s through
//! [`PlaybackController::subscribe`].
//!
//! ```rust,ignore
//! let mut controller = PlaybackController::builder(config)
//!     .runtime(&core_config)
//!     .media(Box::new(video))
//!     .widget(Box::new(quiz))
//!     .build()?;
//!
//! controller.handle_media_event(MediaEvent::TimeUpdate { time: 10.1 });
//! assert!(controller.state().is_gate_active());
//! ```

mod controls;
mod keyboard;
mod resume;
mod session;

pub use keyboard::Key;
pub use resume::{LevelCompleteNotice, ResumeChoice, ResumePrompt};
pub use session::{PlaybackSession, PlayerState, SeekOutcome, SeekRejection};

use std::collections::BTreeSet;
use std::sync::Arc;

use bridge_traits::{
    ChallengeWidget, Clock, EngineEvent, HeadlessChallengeWidget, KeyValueStore, MediaElement,
    MediaEvent, StreamingEngineFactory, SystemClock,
};
use core_runtime::config::CoreConfig;
use core_runtime::events::{CoreEvent, EventBus, EventStream, GateEvent, PlaybackEvent};
use tracing::{debug, error, info, info_span, warn, Span};
use uuid::Uuid;

use crate::challenge::{ChallengeOutcome, ChallengeSession};
use crate::config::PlayerConfig;
use crate::engine::{EngineGeneration, StreamingEngineAdapter};
use crate::error::{PlaybackError, Result};
use crate::gates::{Gate, GateMarker, GateSchedule, GateState};
use crate::progress::{
    content_id_from_src, KeyValueProgressStore, PersistedProgress, Preferences, ProgressStore,
};
use crate::timers::{TimerKind, TimerSet};

pub struct PlaybackController {
    config: PlayerConfig,
    schedule: GateSchedule,
    media: Box<dyn MediaElement>,
    challenge: ChallengeSession,
    engine: StreamingEngineAdapter,
    progress: Arc<dyn ProgressStore>,
    clock: Arc<dyn Clock>,
    events: EventBus,
    timers: TimerSet,

    state: PlayerState,
    session: PlaybackSession,
    preferences: Preferences,

    source: Option<String>,
    content_id: Option<String>,
    gate_states: Vec<GateState>,
    completed_levels: BTreeSet<u32>,
    saved_progress: Option<PersistedProgress>,
    last_saved_time: f64,
    ready: bool,
    resume_evaluated: bool,
    resume_prompt: Option<ResumePrompt>,
    notice: Option<LevelCompleteNotice>,

    session_id: Option<Uuid>,
    span: Span,
    torn_down: bool,
}

impl PlaybackController {
    pub fn builder(config: PlayerConfig) -> PlaybackControllerBuilder {
        PlaybackControllerBuilder::new(config)
    }

    // ========================================================================
    // Content lifecycle
    // ========================================================================

    /// Load a new source, releasing everything held for the previous one.
    ///
    /// Fails, and enters [`PlayerState::Errored`], when neither the streaming
    /// engine nor the media element can play the source.
    pub fn set_source(&mut self, src: &str) -> Result<()> {
        if self.torn_down {
            return Err(PlaybackError::TornDown);
        }
        let persist_period = self.config.persist_period()?;

        self.release_content();

        let content_id = content_id_from_src(src);
        let session_id = Uuid::new_v4();
        self.span = info_span!(
            "playback_session",
            session_id = %session_id,
            content_id = %content_id
        );
        let span = self.span.clone();
        let _enter = span.enter();

        self.source = Some(src.to_string());
        self.content_id = Some(content_id.clone());
        self.session_id = Some(session_id);
        self.reset_content_state();

        match self.progress.get(&content_id) {
            Ok(Some(saved)) => {
                self.restore_completed(&saved.completed_levels);
                self.saved_progress = Some(saved);
            }
            Ok(None) => {}
            Err(e) => warn!(error = %e, "Failed to read saved progress"),
        }

        if self.engine.is_supported() {
            let target = self.media.target();
            if let Err(e) = self.engine.acquire(src, &target) {
                let failure = PlaybackError::StreamingFailed {
                    kind: "setup".to_string(),
                    details: e.to_string(),
                };
                self.enter_errored(&failure);
                return Err(failure);
            }
            info!(
                generation = self.engine.generation(),
                "Loading source through streaming engine"
            );
        } else if self.media.supports_native_hls() {
            self.media.set_source(src);
            info!("Loading source natively");
        } else {
            let failure = PlaybackError::Unsupported(
                "adaptive streaming is not supported on this host".to_string(),
            );
            self.enter_errored(&failure);
            return Err(failure);
        }

        let now = self.clock.now();
        self.timers
            .schedule_interval(TimerKind::PeriodicSave, now, persist_period);
        Ok(())
    }

    fn reset_content_state(&mut self) {
        self.state = PlayerState::Loading;
        self.session = PlaybackSession {
            volume: self.session.volume,
            is_muted: self.session.is_muted,
            playback_rate: self.session.playback_rate,
            is_fullscreen: self.session.is_fullscreen,
            ..PlaybackSession::default()
        };
        self.gate_states = vec![GateState::default(); self.schedule.len()];
        self.completed_levels.clear();
        self.saved_progress = None;
        self.last_saved_time = 0.0;
        self.ready = false;
        self.resume_evaluated = false;
        self.resume_prompt = None;
        self.notice = None;
    }

    fn restore_completed(&mut self, levels: &BTreeSet<u32>) {
        for level in levels {
            if let Some(index) = self.schedule.index_of_level(*level) {
                self.gate_states[index].solved = true;
            }
        }
        self.completed_levels = levels.clone();
        if !levels.is_empty() {
            debug!(completed = ?levels, "Restored completed levels");
        }
    }

    /// Cancel timers, save, then release the engine and any challenge held
    /// for the current content.
    fn release_content(&mut self) {
        if self.source.is_none() {
            return;
        }
        self.timers.cancel_all();
        self.save_progress(true);
        self.engine.release();
        self.challenge.cancel();
    }

    /// Final save without teardown, for page-unload style hooks.
    pub fn unload(&mut self) {
        if self.torn_down {
            return;
        }
        let span = self.span.clone();
        let _enter = span.enter();
        self.save_progress(true);
    }

    /// Stop everything and release every host resource. Idempotent; also
    /// runs on drop.
    pub fn teardown(&mut self) {
        if self.torn_down {
            return;
        }
        let span = self.span.clone();
        let _enter = span.enter();

        self.timers.cancel_all();
        self.save_progress(true);
        self.engine.release();
        self.challenge.cancel();
        self.torn_down = true;
        info!("Playback controller torn down");
    }

    fn enter_errored(&mut self, failure: &PlaybackError) {
        error!(error = %failure, "Playback failed");

        self.save_progress(true);
        self.timers.cancel_all();
        self.challenge.cancel();
        self.engine.release();
        self.media.pause();

        self.state = PlayerState::Errored;
        self.session.is_playing = false;
        self.session.is_loading = false;
        self.session.last_error = Some(failure.to_string());
        self.resume_prompt = None;
        self.notice = None;

        self.emit(CoreEvent::Playback(PlaybackEvent::Error {
            content_id: self.content_id.clone(),
            message: failure.to_string(),
            fatal: true,
        }));
    }

    // ========================================================================
    // Host notifications
    // ========================================================================

    /// Apply a notification from the media element.
    pub fn handle_media_event(&mut self, event: MediaEvent) {
        if self.torn_down {
            debug!(?event, "Media event after teardown ignored");
            return;
        }
        let span = self.span.clone();
        let _enter = span.enter();

        match event {
            MediaEvent::Play => self.on_media_play(),
            MediaEvent::Pause => self.on_media_pause(),
            MediaEvent::Ended => self.on_media_ended(),
            MediaEvent::TimeUpdate { time } => self.on_time_update(time),
            MediaEvent::DurationChange { duration } => {
                self.session.duration = duration;
            }
            MediaEvent::VolumeChange { volume, muted } => {
                self.session.volume = volume;
                self.session.is_muted = muted;
                if self.preferences.volume != volume || self.preferences.muted != muted {
                    self.preferences.volume = volume;
                    self.preferences.muted = muted;
                    self.persist_preferences();
                }
            }
            MediaEvent::Progress { buffered } => {
                self.session.buffered_ranges = buffered;
            }
            MediaEvent::Waiting => {
                self.session.is_loading = true;
            }
            MediaEvent::CanPlay => {
                self.session.is_loading = false;
            }
            MediaEvent::LoadedMetadata => {
                let duration = self.media.duration();
                if duration.is_finite() && duration > 0.0 {
                    self.session.duration = duration;
                }
                if self.source.is_some() && self.state != PlayerState::Errored {
                    let levels = self.engine.levels().len();
                    self.become_ready(levels);
                }
            }
            MediaEvent::FullscreenChange { fullscreen } => {
                self.session.is_fullscreen = fullscreen;
            }
            MediaEvent::Error { message } => {
                warn!(error = %message, "Media element error");
                self.session.last_error = Some(message.clone());
                self.emit(CoreEvent::Playback(PlaybackEvent::Error {
                    content_id: self.content_id.clone(),
                    message,
                    fatal: false,
                }));
            }
        }
    }

    /// Apply a notification from the streaming engine instance identified by
    /// `generation`. Notifications from released instances are dropped.
    pub fn handle_engine_event(&mut self, generation: EngineGeneration, event: EngineEvent) {
        if self.torn_down || !self.engine.is_current(generation) {
            debug!(
                generation,
                current = self.engine.generation(),
                "Stale engine event ignored"
            );
            return;
        }
        let span = self.span.clone();
        let _enter = span.enter();

        match event {
            EngineEvent::ManifestParsed { levels } => {
                let count = levels.len();
                self.engine.set_levels(levels);
                self.apply_initial_quality(count);
                self.become_ready(count);
            }
            EngineEvent::LevelSwitched { index } => {
                self.engine.on_level_switched(index);
                self.session.current_quality_index = Some(index);
                let name = self.engine.level(index).map(|level| level.display_name());
                self.emit(CoreEvent::Playback(PlaybackEvent::QualityChanged {
                    content_id: self.content_key(),
                    level: Some(index),
                    name,
                }));
            }
            EngineEvent::Error {
                kind,
                details,
                fatal,
            } => {
                if fatal {
                    self.enter_errored(&PlaybackError::StreamingFailed {
                        kind: kind.to_string(),
                        details,
                    });
                } else {
                    warn!(kind = %kind, details = %details, "Recoverable streaming error");
                }
            }
        }
    }

    fn apply_initial_quality(&mut self, available: usize) {
        let Some(index) = self.preferences.quality.or(self.config.preferred_quality) else {
            return;
        };
        if index >= available {
            debug!(index, available, "Saved quality not offered by this manifest");
            return;
        }
        match self.engine.set_level(Some(index)) {
            Ok(()) => self.session.current_quality_index = Some(index),
            Err(e) => warn!(error = %e, "Failed to apply saved quality"),
        }
    }

    fn become_ready(&mut self, quality_levels: usize) {
        if self.ready {
            return;
        }
        self.ready = true;
        self.session.is_loading = false;
        if self.state == PlayerState::Loading {
            self.state = PlayerState::Ready;
        }
        info!(quality_levels, "Playback ready");
        self.emit(CoreEvent::Playback(PlaybackEvent::Ready {
            content_id: self.content_key(),
            quality_levels,
        }));

        self.evaluate_resume();
        if self.resume_prompt.is_none() && self.config.auto_play {
            if let Err(e) = self.play() {
                warn!(error = %e, "Autoplay failed");
            }
        }
    }

    fn on_media_play(&mut self) {
        match self.state {
            PlayerState::GateActive { level } => {
                debug!(level, "Play while gate active, pausing again");
                self.media.pause();
            }
            PlayerState::Errored => {}
            _ => self.transition_playing(),
        }
    }

    fn on_media_pause(&mut self) {
        match self.state {
            PlayerState::GateActive { .. } => {
                self.save_progress(false);
            }
            _ => self.transition_paused(),
        }
    }

    fn on_media_ended(&mut self) {
        if matches!(self.state, PlayerState::Errored | PlayerState::Ended) {
            return;
        }
        self.state = PlayerState::Ended;
        self.session.is_playing = false;
        if self.challenge.is_active() {
            self.challenge.cancel();
        }
        self.notice = None;
        self.timers.cancel(TimerKind::SeekSave);
        self.timers.cancel(TimerKind::Cooldown);

        if let Some(content_id) = self.content_id.as_deref() {
            if let Err(e) = self.progress.clear(content_id) {
                warn!(error = %e, "Failed to clear resume point");
            }
        }
        self.saved_progress = None;
        self.last_saved_time = 0.0;

        info!("Playback completed");
        self.emit(CoreEvent::Playback(PlaybackEvent::Completed {
            content_id: self.content_key(),
        }));
    }

    fn on_time_update(&mut self, time: f64) {
        let previous = self.session.current_time;
        self.session.current_time = time;
        self.emit(CoreEvent::Playback(PlaybackEvent::PositionChanged {
            content_id: self.content_key(),
            position_seconds: time,
            duration_seconds: self.session.duration,
        }));
        self.check_gates(previous, time);
    }

    fn check_gates(&mut self, previous: f64, current: f64) {
        if matches!(
            self.state,
            PlayerState::GateActive { .. } | PlayerState::Ended | PlayerState::Errored
        ) || self.challenge.is_active()
            || self.timers.is_scheduled(TimerKind::Cooldown)
        {
            return;
        }

        let gate = self
            .schedule
            .next_unsolved_gate(current, &self.completed_levels)
            .or_else(|| {
                self.schedule
                    .crossed_unsolved_gate(previous, current, &self.completed_levels)
            })
            .copied();

        if let Some(gate) = gate {
            self.activate_gate(gate);
        }
    }

    fn activate_gate(&mut self, gate: Gate) {
        let now = self.clock.now();
        if !self.challenge.activate(gate.level, now) {
            return;
        }

        self.media.pause();
        self.state = PlayerState::GateActive { level: gate.level };
        self.session.is_playing = false;
        info!(
            level = gate.level,
            trigger_time = gate.trigger_time,
            position = self.session.current_time,
            "Gate activated"
        );
        self.emit(CoreEvent::Gate(GateEvent::Activated {
            content_id: self.content_key(),
            level: gate.level,
            trigger_time: gate.trigger_time,
        }));
    }

    // ========================================================================
    // Challenge reports
    // ========================================================================

    /// The widget for `level` reported success. Marks the gate solved,
    /// persists the completed levels, resumes playback and starts the
    /// cooldown before the next gate.
    ///
    /// Returns `None` when `level` is not the active challenge.
    pub fn on_challenge_solved(
        &mut self,
        level: u32,
        attempts: u32,
        solve_time_seconds: Option<f64>,
    ) -> Option<ChallengeOutcome> {
        if self.torn_down {
            return None;
        }
        let span = self.span.clone();
        let _enter = span.enter();

        let now = self.clock.now();
        let outcome = self
            .challenge
            .complete(level, attempts, solve_time_seconds, now)?;

        if let Some(index) = self.schedule.index_of_level(level) {
            self.gate_states[index] = GateState {
                attempts: outcome.attempts,
                solved: true,
                time_to_solve: outcome.solve_time_seconds,
            };
        }
        self.completed_levels.insert(level);
        self.persist_completion();

        self.emit(CoreEvent::Gate(GateEvent::Solved {
            content_id: self.content_key(),
            level,
            attempts: outcome.attempts,
            solve_time_seconds: outcome.solve_time_seconds,
        }));

        self.state = PlayerState::Paused;
        match self.media.play() {
            Ok(()) => self.transition_playing(),
            Err(e) => warn!(error = %e, "Failed to resume after gate"),
        }

        if let Some(next) = self.schedule.first_unsolved(&self.completed_levels).copied() {
            if self.config.cooldown_seconds > 0 {
                self.timers
                    .schedule_once(TimerKind::Cooldown, now, self.config.cooldown());
                let notice = LevelCompleteNotice {
                    completed_level: level,
                    next_level: next.level,
                    remaining: self.schedule.remaining(&self.completed_levels),
                };
                self.notice = Some(notice);
                info!(
                    next_level = next.level,
                    cooldown_seconds = self.config.cooldown_seconds,
                    "Gate cooldown started"
                );
                self.emit(CoreEvent::Gate(GateEvent::CooldownStarted {
                    content_id: self.content_key(),
                    completed_level: level,
                    next_level: next.level,
                    cooldown_seconds: self.config.cooldown_seconds,
                }));
            } else if next.trigger_time <= self.session.current_time {
                self.activate_gate(next);
            }
        }

        Some(outcome)
    }

    /// The widget for `level` reported a wrong answer.
    pub fn on_challenge_attempt_failed(&mut self, level: u32) {
        if self.torn_down {
            return;
        }
        let Some(attempts) = self.challenge.record_failed_attempt(level) else {
            return;
        };
        if let Some(index) = self.schedule.index_of_level(level) {
            self.gate_states[index].attempts = attempts;
        }
        self.emit(CoreEvent::Gate(GateEvent::AttemptFailed {
            content_id: self.content_key(),
            level,
            attempts,
        }));
    }

    fn on_cooldown_elapsed(&mut self) {
        self.notice = None;
        let Some(next) = self.schedule.first_unsolved(&self.completed_levels).copied() else {
            return;
        };

        debug!(next_level = next.level, "Gate cooldown elapsed");
        self.emit(CoreEvent::Gate(GateEvent::CooldownElapsed {
            content_id: self.content_key(),
            next_level: next.level,
        }));

        if matches!(self.state, PlayerState::Ended | PlayerState::Errored) {
            return;
        }
        if next.trigger_time <= self.session.current_time {
            self.activate_gate(next);
        }
    }

    // ========================================================================
    // Playback commands
    // ========================================================================

    pub fn play(&mut self) -> Result<()> {
        match self.state {
            _ if self.torn_down => Err(PlaybackError::TornDown),
            PlayerState::GateActive { level } => Err(PlaybackError::GateLocked { level }),
            PlayerState::Errored => Err(PlaybackError::Errored),
            _ if self.source.is_none() => Err(PlaybackError::NotReady),
            _ => {
                self.media.play()?;
                self.transition_playing();
                Ok(())
            }
        }
    }

    pub fn pause(&mut self) -> Result<()> {
        match self.state {
            _ if self.torn_down => Err(PlaybackError::TornDown),
            PlayerState::GateActive { .. } => Ok(()),
            PlayerState::Errored => Err(PlaybackError::Errored),
            _ => {
                self.media.pause();
                self.transition_paused();
                Ok(())
            }
        }
    }

    /// Play when paused, pause when playing. Returns whether playback is now
    /// running.
    pub fn toggle_play(&mut self) -> Result<bool> {
        if self.session.is_playing {
            self.pause()?;
            Ok(false)
        } else {
            self.play()?;
            Ok(true)
        }
    }

    fn transition_playing(&mut self) {
        if self.state == PlayerState::Playing {
            return;
        }
        self.state = PlayerState::Playing;
        self.session.is_playing = true;
        self.emit(CoreEvent::Playback(PlaybackEvent::Started {
            content_id: self.content_key(),
            position_seconds: self.session.current_time,
        }));
    }

    fn transition_paused(&mut self) {
        match self.state {
            PlayerState::Playing => {
                self.state = PlayerState::Paused;
                self.session.is_playing = false;
                self.emit(CoreEvent::Playback(PlaybackEvent::Paused {
                    content_id: self.content_key(),
                    position_seconds: self.session.current_time,
                }));
                self.save_progress(false);
            }
            PlayerState::Ready => self.state = PlayerState::Paused,
            _ => {}
        }
    }

    /// Seek to `target` seconds unless an unsolved gate lies before it.
    pub fn seek(&mut self, target: f64) -> SeekOutcome {
        let span = self.span.clone();
        let _enter = span.enter();

        let rejection = match self.state {
            _ if self.torn_down || self.source.is_none() => Some(SeekRejection::NotLoaded),
            PlayerState::Errored => Some(SeekRejection::Errored),
            PlayerState::GateActive { level } => Some(SeekRejection::GateActive { level }),
            _ if self.config.disable_seeking => Some(SeekRejection::SeekingDisabled),
            _ if !target.is_finite() => Some(SeekRejection::InvalidTarget),
            _ => None,
        };
        if let Some(reason) = rejection {
            return self.reject_seek(target, reason);
        }

        let mut target = target.max(0.0);
        if self.session.has_duration() {
            target = target.min(self.session.duration);
        }

        if let Some(gate) = self
            .schedule
            .first_unsolved_gate_at_or_before(target, &self.completed_levels)
            .copied()
        {
            return self.reject_seek(target, SeekRejection::UnsolvedGate { level: gate.level });
        }

        if self.state == PlayerState::Ended {
            self.state = PlayerState::Paused;
        }
        self.apply_seek(target);
        SeekOutcome::Applied { time: target }
    }

    fn reject_seek(&mut self, target: f64, reason: SeekRejection) -> SeekOutcome {
        debug!(target, ?reason, "Seek rejected");
        let level = match reason {
            SeekRejection::UnsolvedGate { level } | SeekRejection::GateActive { level } => {
                Some(level)
            }
            SeekRejection::SeekingDisabled => None,
            _ => return SeekOutcome::Rejected { reason },
        };
        self.emit(CoreEvent::Gate(GateEvent::SeekBlocked {
            content_id: self.content_key(),
            requested_time: target,
            level,
        }));
        SeekOutcome::Rejected { reason }
    }

    /// Move the playhead without interception and schedule the debounced
    /// save.
    fn apply_seek(&mut self, target: f64) {
        self.media.set_current_time(target);
        self.session.current_time = target;
        let now = self.clock.now();
        self.timers
            .schedule_once(TimerKind::SeekSave, now, self.config.seek_save_debounce);
    }

    // ========================================================================
    // Timers & persistence
    // ========================================================================

    /// Fire every timer due at the clock's current time. Returns the timers
    /// that fired.
    pub fn poll_timers(&mut self) -> Vec<TimerKind> {
        if self.torn_down {
            return Vec::new();
        }
        let span = self.span.clone();
        let _enter = span.enter();

        let due = self.timers.take_due(self.clock.now());
        for kind in &due {
            match kind {
                TimerKind::PeriodicSave | TimerKind::SeekSave => {
                    self.save_progress(false);
                }
                TimerKind::Cooldown => self.on_cooldown_elapsed(),
            }
        }
        due
    }

    /// Earliest pending timer deadline, for hosts that sleep between polls.
    pub fn next_timer_deadline(&self) -> Option<chrono::DateTime<chrono::Utc>> {
        self.timers.next_deadline()
    }

    /// Save the current position. Unless `force`d, only when it moved more
    /// than `persist_interval` since the last save. Returns whether a record
    /// was written.
    fn save_progress(&mut self, force: bool) -> bool {
        if self.torn_down || self.content_id.is_none() || self.state == PlayerState::Ended {
            return false;
        }

        let position = self.session.current_time;
        if !self.session.has_duration() || !(position > 0.0) {
            return false;
        }
        if !force && (position - self.last_saved_time).abs() <= self.config.persist_interval {
            return false;
        }

        self.write_progress(position, self.session.duration)
    }

    /// Write the completed levels immediately, whatever the position.
    fn persist_completion(&mut self) {
        let duration = if self.session.has_duration() {
            self.session.duration
        } else {
            0.0
        };
        self.write_progress(self.session.current_time.max(0.0), duration);
    }

    fn write_progress(&mut self, position: f64, duration: f64) -> bool {
        let Some(content_id) = self.content_id.as_deref() else {
            return false;
        };
        let record = PersistedProgress {
            position_seconds: position,
            duration_seconds: duration,
            saved_at_epoch_ms: self.clock.unix_timestamp_millis(),
            completed_levels: self.completed_levels.clone(),
        };

        match self.progress.set(content_id, &record) {
            Ok(()) => {
                self.last_saved_time = position;
                true
            }
            Err(e) => {
                warn!(error = %e, "Failed to save progress");
                false
            }
        }
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn state(&self) -> PlayerState {
        self.state
    }

    pub fn session(&self) -> &PlaybackSession {
        &self.session
    }

    pub fn config(&self) -> &PlayerConfig {
        &self.config
    }

    pub fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }

    pub fn content_id(&self) -> Option<&str> {
        self.content_id.as_deref()
    }

    pub fn session_id(&self) -> Option<Uuid> {
        self.session_id
    }

    pub fn schedule(&self) -> &GateSchedule {
        &self.schedule
    }

    /// Per-gate progress, in schedule order.
    pub fn gate_states(&self) -> &[GateState] {
        &self.gate_states
    }

    pub fn completed_levels(&self) -> &BTreeSet<u32> {
        &self.completed_levels
    }

    pub fn gate_markers(&self) -> Vec<GateMarker> {
        self.schedule.markers(&self.completed_levels)
    }

    pub fn active_challenge_level(&self) -> Option<u32> {
        self.challenge.active_level()
    }

    pub fn preferences(&self) -> &Preferences {
        &self.preferences
    }

    /// Generation of the live engine instance, used to tag its notifications.
    pub fn engine_generation(&self) -> Option<EngineGeneration> {
        self.engine
            .is_attached()
            .then(|| self.engine.generation())
    }

    pub fn is_torn_down(&self) -> bool {
        self.torn_down
    }

    pub fn event_bus(&self) -> &EventBus {
        &self.events
    }

    pub fn subscribe(&self) -> EventStream {
        EventStream::new(self.events.subscribe())
    }

    fn emit(&self, event: CoreEvent) {
        // No subscribers is fine.
        let _ = self.events.emit(event);
    }

    fn content_key(&self) -> String {
        self.content_id.clone().unwrap_or_default()
    }
}

impl Drop for PlaybackController {
    fn drop(&mut self) {
        self.teardown();
    }
}

impl std::fmt::Debug for PlaybackController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlaybackController")
            .field("state", &self.state)
            .field("content_id", &self.content_id)
            .field("gates", &self.schedule.len())
            .field("completed_levels", &self.completed_levels)
            .field("engine", &self.engine)
            .field("challenge", &self.challenge)
            .field("torn_down", &self.torn_down)
            .finish()
    }
}

// ============================================================================
// Builder
// ============================================================================

/// Builder for [`PlaybackController`].
///
/// A media element and a progress store (or a key-value store to build one
/// from) are required. The clock defaults to [`SystemClock`], the widget to
/// [`HeadlessChallengeWidget`], and the event bus to a fresh one.
pub struct PlaybackControllerBuilder {
    config: PlayerConfig,
    media: Option<Box<dyn MediaElement>>,
    widget: Option<Box<dyn ChallengeWidget>>,
    progress_store: Option<Arc<dyn ProgressStore>>,
    key_value_store: Option<Arc<dyn KeyValueStore>>,
    clock: Option<Arc<dyn Clock>>,
    engine_factory: Option<Arc<dyn StreamingEngineFactory>>,
    event_bus: Option<EventBus>,
}

impl PlaybackControllerBuilder {
    pub fn new(config: PlayerConfig) -> Self {
        Self {
            config,
            media: None,
            widget: None,
            progress_store: None,
            key_value_store: None,
            clock: None,
            engine_factory: None,
            event_bus: None,
        }
    }

    /// Take shared capabilities from a runtime configuration.
    pub fn runtime(mut self, core: &CoreConfig) -> Self {
        self.key_value_store = Some(core.key_value_store.clone());
        self.clock = Some(core.clock.clone());
        if let Some(factory) = &core.engine_factory {
            self.engine_factory = Some(factory.clone());
        }
        self.event_bus = Some(core.event_bus());
        self
    }

    pub fn media(mut self, media: Box<dyn MediaElement>) -> Self {
        self.media = Some(media);
        self
    }

    pub fn widget(mut self, widget: Box<dyn ChallengeWidget>) -> Self {
        self.widget = Some(widget);
        self
    }

    pub fn progress_store(mut self, store: Arc<dyn ProgressStore>) -> Self {
        self.progress_store = Some(store);
        self
    }

    pub fn key_value_store(mut self, store: Arc<dyn KeyValueStore>) -> Self {
        self.key_value_store = Some(store);
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn engine_factory(mut self, factory: Arc<dyn StreamingEngineFactory>) -> Self {
        self.engine_factory = Some(factory);
        self
    }

    pub fn event_bus(mut self, bus: EventBus) -> Self {
        self.event_bus = Some(bus);
        self
    }

    /// Validate the configuration, restore preferences and load
    /// `config.src` when set.
    ///
    /// # Errors
    ///
    /// `Config` for invalid options, `CapabilityMissing` when the media
    /// element or storage is missing, and any error from loading `src`.
    pub fn build(self) -> Result<PlaybackController> {
        self.config.validate()?;
        let schedule = GateSchedule::new(self.config.gates.clone())?;

        let media = self.media.ok_or_else(|| PlaybackError::CapabilityMissing {
            capability: "MediaElement".to_string(),
            message: "A media element is required".to_string(),
        })?;

        let progress = match (self.progress_store, self.key_value_store) {
            (Some(store), _) => store,
            (None, Some(kv)) => Arc::new(KeyValueProgressStore::new(
                kv,
                self.config.persist_key.clone(),
            )) as Arc<dyn ProgressStore>,
            (None, None) => {
                return Err(PlaybackError::CapabilityMissing {
                    capability: "ProgressStore".to_string(),
                    message: "Provide a progress store or a key-value store".to_string(),
                })
            }
        };

        let widget = self
            .widget
            .unwrap_or_else(|| Box::new(HeadlessChallengeWidget::default()) as Box<dyn ChallengeWidget>);
        let clock = self
            .clock
            .unwrap_or_else(|| Arc::new(SystemClock) as Arc<dyn Clock>);
        let engine = StreamingEngineAdapter::new(self.engine_factory, self.config.engine.clone());

        let preferences = progress.load_preferences().unwrap_or_else(|e| {
            warn!(error = %e, "Failed to load preferences, using defaults");
            Preferences::default()
        });

        let mut controller = PlaybackController {
            gate_states: vec![GateState::default(); schedule.len()],
            schedule,
            media,
            challenge: ChallengeSession::new(widget),
            engine,
            progress,
            clock,
            events: self.event_bus.unwrap_or_default(),
            timers: TimerSet::new(),
            state: PlayerState::Loading,
            session: PlaybackSession::default(),
            preferences,
            source: None,
            content_id: None,
            completed_levels: BTreeSet::new(),
            saved_progress: None,
            last_saved_time: 0.0,
            ready: false,
            resume_evaluated: false,
            resume_prompt: None,
            notice: None,
            session_id: None,
            span: Span::none(),
            torn_down: false,
            config: self.config,
        };

        controller.apply_media_settings();
        if let Some(src) = controller.config.src.clone() {
            controller.set_source(&src)?;
        }
        Ok(controller)
    }
}

impl PlaybackController {
    /// Push configuration and restored preferences to the media element.
    fn apply_media_settings(&mut self) {
        let muted = self.config.muted || self.preferences.muted;
        let rate = if self.config.is_allowed_rate(self.preferences.playback_rate) {
            self.preferences.playback_rate
        } else {
            1.0
        };

        self.media.set_loop(self.config.loop_playback);
        if let Some(poster) = &self.config.poster {
            self.media.set_poster(poster);
        }
        self.media.set_volume(self.preferences.volume);
        self.media.set_muted(muted);
        self.media.set_playback_rate(rate);

        self.session.volume = self.preferences.volume;
        self.session.is_muted = muted;
        self.session.playback_rate = rate;
    }
}
