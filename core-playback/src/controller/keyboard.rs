//! Keyboard shortcuts.

use tracing::debug;

use super::PlaybackController;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Space,
    K,
    F,
    M,
    ArrowLeft,
    ArrowRight,
    ArrowUp,
    ArrowDown,
}

impl Key {
    /// Map a DOM `KeyboardEvent.key` or `.code` value.
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            " " | "Space" | "Spacebar" => Some(Key::Space),
            "k" | "K" | "KeyK" => Some(Key::K),
            "f" | "F" | "KeyF" => Some(Key::F),
            "m" | "M" | "KeyM" => Some(Key::M),
            "ArrowLeft" | "Left" => Some(Key::ArrowLeft),
            "ArrowRight" | "Right" => Some(Key::ArrowRight),
            "ArrowUp" | "Up" => Some(Key::ArrowUp),
            "ArrowDown" | "Down" => Some(Key::ArrowDown),
            _ => None,
        }
    }
}

impl PlaybackController {
    /// Apply a shortcut. Returns `true` when the key was consumed and the
    /// host should suppress its default action.
    pub fn handle_key(&mut self, key: Key) -> bool {
        if !self.config.keyboard_shortcuts || self.torn_down {
            return false;
        }

        let result = match key {
            Key::Space | Key::K => self.toggle_play().map(|_| ()),
            Key::F => self.toggle_fullscreen().map(|_| ()),
            Key::M => self.toggle_mute().map(|_| ()),
            Key::ArrowLeft => {
                self.skip(-self.config.seek_step);
                Ok(())
            }
            Key::ArrowRight => {
                self.skip(self.config.seek_step);
                Ok(())
            }
            Key::ArrowUp => self.set_volume(self.stepped_volume(self.config.volume_step)),
            Key::ArrowDown => self.set_volume(self.stepped_volume(-self.config.volume_step)),
        };

        if let Err(e) = result {
            debug!(?key, error = %e, "Shortcut not applied");
        }
        true
    }

    fn stepped_volume(&self, step: f64) -> f64 {
        ((self.session.volume + step).clamp(0.0, 1.0) * 100.0).round() / 100.0
    }
}
