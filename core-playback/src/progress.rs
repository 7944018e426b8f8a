//! # Progress Store
//!
//! Durable resume points, completed gate levels and viewer preferences.
//!
//! [`KeyValueProgressStore`] lays records out over a [`KeyValueStore`] so a
//! browser host can back it with `localStorage` directly:
//!
//! | Key | Value |
//! |-----|-------|
//! | `{persist_key}-{content_id}-time` | position in seconds |
//! | `{persist_key}-{content_id}-time-duration` | duration in seconds |
//! | `{persist_key}-{content_id}-time-timestamp` | save time, Unix ms |
//! | `{persist_key}-{content_id}-completed` | JSON array of levels |
//! | `{persist_key}-volume` / `-muted` / `-playbackRate` / `-quality` | preferences |
//!
//! Preferences are shared by every content item of one player embedding.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use bridge_traits::{BridgeError, KeyValueStore, PlatformSendSync};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::Result;

/// Saved playback state for one content item.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PersistedProgress {
    pub position_seconds: f64,
    pub duration_seconds: f64,
    pub saved_at_epoch_ms: i64,
    pub completed_levels: BTreeSet<u32>,
}

impl PersistedProgress {
    /// Whether this record warrants a resume prompt: the position is strictly
    /// past `threshold` and the record is younger than `max_age`.
    pub fn resume_eligible(&self, threshold: f64, max_age: Duration, now_ms: i64) -> bool {
        if !(self.position_seconds > threshold) {
            return false;
        }
        let age_ms = now_ms.saturating_sub(self.saved_at_epoch_ms);
        let max_age_ms = i64::try_from(max_age.as_millis()).unwrap_or(i64::MAX);
        age_ms < max_age_ms
    }

    /// Watched share in whole percent, `0` when the duration is unknown.
    pub fn percentage(&self) -> u32 {
        if self.duration_seconds > 0.0 && self.duration_seconds.is_finite() {
            ((self.position_seconds / self.duration_seconds) * 100.0)
                .round()
                .clamp(0.0, 100.0) as u32
        } else {
            0
        }
    }
}

/// Viewer preferences restored on every load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Preferences {
    pub volume: f64,
    pub muted: bool,
    pub playback_rate: f64,
    /// Explicitly chosen quality level; `None` is automatic selection.
    pub quality: Option<usize>,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            volume: 1.0,
            muted: false,
            playback_rate: 1.0,
            quality: None,
        }
    }
}

/// Durable storage for playback progress and preferences.
pub trait ProgressStore: PlatformSendSync {
    fn get(&self, content_id: &str) -> Result<Option<PersistedProgress>>;

    /// Replace the record for `content_id`.
    fn set(&self, content_id: &str, progress: &PersistedProgress) -> Result<()>;

    /// Remove the resume point for `content_id`. Completed levels are kept.
    fn clear(&self, content_id: &str) -> Result<()>;

    fn load_preferences(&self) -> Result<Preferences>;

    fn save_preferences(&self, preferences: &Preferences) -> Result<()>;
}

/// [`ProgressStore`] over a string key-value store.
#[derive(Clone)]
pub struct KeyValueProgressStore {
    store: Arc<dyn KeyValueStore>,
    persist_key: String,
}

impl KeyValueProgressStore {
    pub fn new(store: Arc<dyn KeyValueStore>, persist_key: impl Into<String>) -> Self {
        Self {
            store,
            persist_key: persist_key.into(),
        }
    }

    pub fn persist_key(&self) -> &str {
        &self.persist_key
    }

    fn time_key(&self, content_id: &str) -> String {
        format!("{}-{}-time", self.persist_key, content_id)
    }

    fn duration_key(&self, content_id: &str) -> String {
        format!("{}-duration", self.time_key(content_id))
    }

    fn timestamp_key(&self, content_id: &str) -> String {
        format!("{}-timestamp", self.time_key(content_id))
    }

    fn completed_key(&self, content_id: &str) -> String {
        format!("{}-{}-completed", self.persist_key, content_id)
    }

    fn preference_key(&self, name: &str) -> String {
        format!("{}-{}", self.persist_key, name)
    }

    fn read_completed(&self, content_id: &str) -> Result<Option<BTreeSet<u32>>> {
        let key = self.completed_key(content_id);
        match self.store.get_string(&key)? {
            Some(raw) => match serde_json::from_str::<BTreeSet<u32>>(&raw) {
                Ok(levels) => Ok(Some(levels)),
                Err(e) => {
                    warn!(key = %key, error = %e, "Ignoring malformed completed levels");
                    Ok(None)
                }
            },
            None => Ok(None),
        }
    }

    /// Read one preference, falling back to `None` when the stored value is
    /// unparsable.
    fn read_preference<T>(
        &self,
        name: &str,
        read: impl FnOnce(&dyn KeyValueStore, &str) -> bridge_traits::error::Result<Option<T>>,
    ) -> Result<Option<T>> {
        let key = self.preference_key(name);
        match read(self.store.as_ref(), &key) {
            Ok(value) => Ok(value),
            Err(BridgeError::Malformed { key, message }) => {
                warn!(key = %key, error = %message, "Ignoring malformed preference");
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }
}

impl ProgressStore for KeyValueProgressStore {
    fn get(&self, content_id: &str) -> Result<Option<PersistedProgress>> {
        let completed = self.read_completed(content_id)?;

        let position = match self.store.get_f64(&self.time_key(content_id)) {
            Ok(position) => position,
            Err(BridgeError::Malformed { key, message }) => {
                warn!(key = %key, error = %message, "Ignoring malformed resume point");
                None
            }
            Err(e) => return Err(e.into()),
        };

        let Some(position_seconds) = position else {
            return Ok(completed.map(|completed_levels| PersistedProgress {
                completed_levels,
                ..PersistedProgress::default()
            }));
        };

        let duration_seconds = self
            .store
            .get_f64(&self.duration_key(content_id))
            .ok()
            .flatten()
            .unwrap_or(0.0);
        let saved_at_epoch_ms = self
            .store
            .get_i64(&self.timestamp_key(content_id))
            .ok()
            .flatten()
            .unwrap_or(0);

        Ok(Some(PersistedProgress {
            position_seconds,
            duration_seconds,
            saved_at_epoch_ms,
            completed_levels: completed.unwrap_or_default(),
        }))
    }

    fn set(&self, content_id: &str, progress: &PersistedProgress) -> Result<()> {
        self.store
            .set_f64(&self.time_key(content_id), progress.position_seconds)?;
        self.store
            .set_f64(&self.duration_key(content_id), progress.duration_seconds)?;
        self.store
            .set_i64(&self.timestamp_key(content_id), progress.saved_at_epoch_ms)?;
        let completed = serde_json::to_string(&progress.completed_levels)?;
        self.store
            .set_string(&self.completed_key(content_id), &completed)?;

        debug!(
            content_id,
            position = progress.position_seconds,
            completed = progress.completed_levels.len(),
            "Progress saved"
        );
        Ok(())
    }

    fn clear(&self, content_id: &str) -> Result<()> {
        self.store.remove(&self.time_key(content_id))?;
        self.store.remove(&self.duration_key(content_id))?;
        self.store.remove(&self.timestamp_key(content_id))?;
        debug!(content_id, "Resume point cleared");
        Ok(())
    }

    fn load_preferences(&self) -> Result<Preferences> {
        let defaults = Preferences::default();

        let volume = self
            .read_preference("volume", |store, key| store.get_f64(key))?
            .filter(|volume| (0.0..=1.0).contains(volume))
            .unwrap_or(defaults.volume);
        let muted = self
            .read_preference("muted", |store, key| store.get_bool(key))?
            .unwrap_or(defaults.muted);
        let playback_rate = self
            .read_preference("playbackRate", |store, key| store.get_f64(key))?
            .filter(|rate| rate.is_finite() && *rate > 0.0)
            .unwrap_or(defaults.playback_rate);
        let quality = self
            .read_preference("quality", |store, key| store.get_i64(key))?
            .and_then(|quality| usize::try_from(quality).ok());

        Ok(Preferences {
            volume,
            muted,
            playback_rate,
            quality,
        })
    }

    fn save_preferences(&self, preferences: &Preferences) -> Result<()> {
        self.store
            .set_f64(&self.preference_key("volume"), preferences.volume)?;
        self.store
            .set_bool(&self.preference_key("muted"), preferences.muted)?;
        self.store
            .set_f64(&self.preference_key("playbackRate"), preferences.playback_rate)?;
        match preferences.quality {
            Some(quality) => self
                .store
                .set_i64(&self.preference_key("quality"), quality as i64)?,
            // -1 is automatic selection
            None => self.store.set_i64(&self.preference_key("quality"), -1)?,
        }
        Ok(())
    }
}

impl std::fmt::Debug for KeyValueProgressStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyValueProgressStore")
            .field("store", &"KeyValueStore { ... }")
            .field("persist_key", &self.persist_key)
            .finish()
    }
}

/// Stable content identity: the last path segment of the source URL without
/// query or fragment, or `"default"` when there is none.
pub fn content_id_from_src(src: &str) -> String {
    let path = src
        .find(|c| c == '?' || c == '#')
        .map_or(src, |end| &src[..end]);

    path.trim_end_matches('/')
        .rsplit('/')
        .next()
        .filter(|segment| !segment.is_empty())
        .unwrap_or("default")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_traits::MemoryKeyValueStore;

    const DAY_MS: i64 = 24 * 60 * 60 * 1000;

    fn store() -> (KeyValueProgressStore, Arc<MemoryKeyValueStore>) {
        let memory = Arc::new(MemoryKeyValueStore::new());
        (KeyValueProgressStore::new(memory.clone(), "video-player"), memory)
    }

    #[test]
    fn test_content_id_from_src() {
        assert_eq!(
            content_id_from_src("https://cdn.example.com/lesson-1/master.m3u8?token=abc"),
            "master.m3u8"
        );
        assert_eq!(content_id_from_src("/videos/intro.mp4#t=10"), "intro.mp4");
        assert_eq!(content_id_from_src("https://cdn.example.com/course/"), "course");
        assert_eq!(content_id_from_src(""), "default");
        assert_eq!(content_id_from_src("/"), "default");
    }

    #[test]
    fn test_set_uses_key_layout() {
        let (progress, memory) = store();
        let record = PersistedProgress {
            position_seconds: 42.5,
            duration_seconds: 300.0,
            saved_at_epoch_ms: 1_700_000_000_000,
            completed_levels: [1, 2].into_iter().collect(),
        };
        progress.set("intro.mp4", &record).unwrap();

        assert_eq!(
            memory.get_string("video-player-intro.mp4-time").unwrap().as_deref(),
            Some("42.5")
        );
        assert_eq!(
            memory
                .get_string("video-player-intro.mp4-time-duration")
                .unwrap()
                .as_deref(),
            Some("300")
        );
        assert_eq!(
            memory
                .get_string("video-player-intro.mp4-time-timestamp")
                .unwrap()
                .as_deref(),
            Some("1700000000000")
        );
        assert_eq!(
            memory
                .get_string("video-player-intro.mp4-completed")
                .unwrap()
                .as_deref(),
            Some("[1,2]")
        );
        assert_eq!(progress.get("intro.mp4").unwrap(), Some(record));
    }

    #[test]
    fn test_clear_keeps_completed_levels() {
        let (progress, _) = store();
        let record = PersistedProgress {
            position_seconds: 42.5,
            duration_seconds: 300.0,
            saved_at_epoch_ms: 1,
            completed_levels: [1].into_iter().collect(),
        };
        progress.set("a", &record).unwrap();
        progress.clear("a").unwrap();

        let after = progress.get("a").unwrap().unwrap();
        assert_eq!(after.position_seconds, 0.0);
        assert_eq!(after.completed_levels, [1].into_iter().collect());
        assert!(progress.get("b").unwrap().is_none());
    }

    #[test]
    fn test_malformed_values_are_ignored() {
        let (progress, memory) = store();
        memory.set_string("video-player-a-time", "soon").unwrap();
        memory.set_string("video-player-a-completed", "{oops").unwrap();
        assert!(progress.get("a").unwrap().is_none());

        memory.set_string("video-player-volume", "loud").unwrap();
        memory.set_string("video-player-playbackRate", "1.5").unwrap();
        let preferences = progress.load_preferences().unwrap();
        assert_eq!(preferences.volume, 1.0);
        assert_eq!(preferences.playback_rate, 1.5);
    }

    #[test]
    fn test_preferences_round_trip() {
        let (progress, memory) = store();
        assert_eq!(progress.load_preferences().unwrap(), Preferences::default());

        let preferences = Preferences {
            volume: 0.4,
            muted: true,
            playback_rate: 1.25,
            quality: Some(2),
        };
        progress.save_preferences(&preferences).unwrap();
        assert_eq!(progress.load_preferences().unwrap(), preferences);
        assert_eq!(
            memory.get_string("video-player-playbackRate").unwrap().as_deref(),
            Some("1.25")
        );

        progress
            .save_preferences(&Preferences {
                quality: None,
                ..preferences
            })
            .unwrap();
        assert_eq!(progress.load_preferences().unwrap().quality, None);
    }

    #[test]
    fn test_unavailable_storage_is_an_error() {
        let (progress, memory) = store();
        memory.set_unavailable(true);

        let err = progress.set("a", &PersistedProgress::default()).unwrap_err();
        assert!(err.is_transient());
        assert!(progress.get("a").is_err());
    }

    #[test]
    fn test_resume_eligibility_boundaries() {
        let now = 100 * DAY_MS;
        let max_age = Duration::from_secs(30 * 24 * 60 * 60);
        let record = |position: f64, age_days: i64| PersistedProgress {
            position_seconds: position,
            duration_seconds: 100.0,
            saved_at_epoch_ms: now - age_days * DAY_MS,
            completed_levels: BTreeSet::new(),
        };

        assert!(!record(5.0, 1).resume_eligible(5.0, max_age, now));
        assert!(record(5.01, 1).resume_eligible(5.0, max_age, now));
        assert!(record(50.0, 29).resume_eligible(5.0, max_age, now));
        assert!(!record(50.0, 30).resume_eligible(5.0, max_age, now));
        assert!(!record(50.0, 31).resume_eligible(5.0, max_age, now));

        let ahead_of_clock = PersistedProgress {
            saved_at_epoch_ms: now + 60_000,
            ..record(50.0, 0)
        };
        assert!(ahead_of_clock.resume_eligible(5.0, max_age, now));
    }

    #[test]
    fn test_percentage() {
        let mut record = PersistedProgress {
            position_seconds: 30.0,
            duration_seconds: 120.0,
            ..PersistedProgress::default()
        };
        assert_eq!(record.percentage(), 25);

        record.duration_seconds = 0.0;
        assert_eq!(record.percentage(), 0);
    }
}
