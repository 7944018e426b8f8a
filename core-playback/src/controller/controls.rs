//! Viewer controls: volume, speed, quality, fullscreen and relative seeks.
//!
//! These pass straight through to the media element or the streaming engine
//! and persist the resulting preference. None of them interact with gates
//! except `skip`, which goes through normal seek interception.

use bridge_traits::QualityLevel;
use core_runtime::events::{CoreEvent, PlaybackEvent};
use tracing::{debug, warn};

use super::session::SeekOutcome;
use super::PlaybackController;
use crate::error::{PlaybackError, Result};

impl PlaybackController {
    /// Set the volume in `0.0..=1.0`.
    pub fn set_volume(&mut self, volume: f64) -> Result<()> {
        self.ensure_live()?;
        if !(0.0..=1.0).contains(&volume) {
            return Err(PlaybackError::InvalidVolume(volume));
        }

        self.media.set_volume(volume);
        self.session.volume = volume;
        self.preferences.volume = volume;
        self.persist_preferences();
        Ok(())
    }

    pub fn set_muted(&mut self, muted: bool) -> Result<()> {
        self.ensure_live()?;
        self.media.set_muted(muted);
        self.session.is_muted = muted;
        self.preferences.muted = muted;
        self.persist_preferences();
        Ok(())
    }

    /// Flip mute. Returns the new mute state.
    pub fn toggle_mute(&mut self) -> Result<bool> {
        let muted = !self.session.is_muted;
        self.set_muted(muted)?;
        Ok(muted)
    }

    /// Set the playback rate; only configured rates are accepted.
    pub fn set_playback_rate(&mut self, rate: f64) -> Result<()> {
        self.ensure_live()?;
        if !self.config.is_allowed_rate(rate) {
            return Err(PlaybackError::InvalidPlaybackRate(rate));
        }

        self.media.set_playback_rate(rate);
        self.session.playback_rate = rate;
        self.preferences.playback_rate = rate;
        self.persist_preferences();
        Ok(())
    }

    pub fn playback_rates(&self) -> &[f64] {
        &self.config.playback_rates
    }

    /// Pick a quality level, or automatic selection with `None`.
    pub fn set_quality(&mut self, level: Option<usize>) -> Result<()> {
        self.ensure_live()?;
        self.engine.set_level(level)?;

        self.session.current_quality_index = level;
        self.preferences.quality = level;
        self.persist_preferences();

        let name = level
            .and_then(|index| self.engine.level(index))
            .map(QualityLevel::display_name);
        debug!(?level, name = name.as_deref(), "Quality selected");
        self.emit(CoreEvent::Playback(PlaybackEvent::QualityChanged {
            content_id: self.content_key(),
            level,
            name,
        }));
        Ok(())
    }

    pub fn quality_levels(&self) -> &[QualityLevel] {
        self.engine.levels()
    }

    /// Flip fullscreen. Returns the new fullscreen state.
    pub fn toggle_fullscreen(&mut self) -> Result<bool> {
        self.ensure_live()?;
        let fullscreen = !self.session.is_fullscreen;
        self.media.set_fullscreen(fullscreen)?;
        self.session.is_fullscreen = fullscreen;
        Ok(fullscreen)
    }

    /// Seek relative to the current time.
    pub fn skip(&mut self, delta: f64) -> SeekOutcome {
        let target = self.session.current_time + delta;
        self.seek(target.max(0.0))
    }

    pub(super) fn persist_preferences(&self) {
        if let Err(e) = self.progress.save_preferences(&self.preferences) {
            warn!(error = %e, "Failed to save preferences");
        }
    }

    fn ensure_live(&self) -> Result<()> {
        if self.torn_down {
            return Err(PlaybackError::TornDown);
        }
        Ok(())
    }
}
