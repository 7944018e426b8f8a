//! Settings storage backed by a JSON file

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use bridge_traits::{
    error::{BridgeError, Result},
    storage::KeyValueStore,
};
use parking_lot::Mutex;
use tracing::{debug, warn};

const SETTINGS_FILE_NAME: &str = "player-settings.json";
const APP_DIR_NAME: &str = "gated-player";

/// File-backed [`KeyValueStore`] for desktop hosts.
///
/// The whole map is kept in memory and written back on every mutation as a
/// single JSON object. Writes go to a sibling temp file first and are renamed
/// over the target, so a crash mid-write leaves the previous file intact.
pub struct FileSettingsStore {
    path: PathBuf,
    entries: Mutex<BTreeMap<String, String>>,
}

impl FileSettingsStore {
    /// Open (or create) the store at `path`.
    ///
    /// A missing file starts empty. An unreadable file is logged and replaced
    /// on the next write rather than failing the host.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let entries = match fs::read_to_string(&path) {
            Ok(raw) => match serde_json::from_str::<BTreeMap<String, String>>(&raw) {
                Ok(entries) => entries,
                Err(e) => {
                    warn!(path = ?path, error = %e, "Settings file is corrupt, starting empty");
                    BTreeMap::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(BridgeError::Io(e)),
        };

        debug!(path = ?path, keys = entries.len(), "Opened settings store");

        Ok(Self {
            path,
            entries: Mutex::new(entries),
        })
    }

    /// Open the store in the platform data directory
    /// (e.g. `~/.local/share/gated-player/player-settings.json`).
    pub fn open_default() -> Result<Self> {
        Self::open(Self::default_path()?)
    }

    pub fn default_path() -> Result<PathBuf> {
        let base = dirs::data_dir().ok_or_else(|| {
            BridgeError::NotAvailable("No platform data directory".to_string())
        })?;
        Ok(base.join(APP_DIR_NAME).join(SETTINGS_FILE_NAME))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, entries: &BTreeMap<String, String>) -> Result<()> {
        let json = serde_json::to_string_pretty(entries)
            .map_err(|e| BridgeError::OperationFailed(format!("Failed to encode settings: {}", e)))?;

        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl KeyValueStore for FileSettingsStore {
    fn get_string(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.lock().get(key).cloned())
    }

    fn set_string(&self, key: &str, value: &str) -> Result<()> {
        let mut entries = self.entries.lock();
        let previous = entries.insert(key.to_string(), value.to_string());

        if let Err(e) = self.persist(&entries) {
            // Keep memory consistent with disk.
            match previous {
                Some(previous) => entries.insert(key.to_string(), previous),
                None => entries.remove(key),
            };
            return Err(e);
        }

        debug!(key = key, "Stored setting");
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let mut entries = self.entries.lock();
        if entries.remove(key).is_none() {
            return Ok(());
        }

        self.persist(&entries)?;
        debug!(key = key, "Deleted setting");
        Ok(())
    }

    fn list_keys(&self) -> Result<Vec<String>> {
        Ok(self.entries.lock().keys().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_settings_path() -> PathBuf {
        std::env::temp_dir()
            .join(format!("gated-player-settings-{}", uuid::Uuid::new_v4()))
            .join(SETTINGS_FILE_NAME)
    }

    #[test]
    fn test_string_operations() {
        let path = temp_settings_path();
        let store = FileSettingsStore::open(&path).unwrap();

        store.set_string("test_key", "test_value").unwrap();
        assert_eq!(
            store.get_string("test_key").unwrap(),
            Some("test_value".to_string())
        );

        store.remove("test_key").unwrap();
        assert_eq!(store.get_string("test_key").unwrap(), None);

        let _ = fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn test_values_survive_reopen() {
        let path = temp_settings_path();
        {
            let store = FileSettingsStore::open(&path).unwrap();
            store.set_f64("video-player-volume", 0.4).unwrap();
            store.set_bool("video-player-muted", true).unwrap();
        }

        let reopened = FileSettingsStore::open(&path).unwrap();
        assert_eq!(reopened.get_f64("video-player-volume").unwrap(), Some(0.4));
        assert_eq!(reopened.get_bool("video-player-muted").unwrap(), Some(true));
        assert_eq!(
            reopened.list_keys().unwrap(),
            vec!["video-player-muted", "video-player-volume"]
        );

        let _ = fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn test_corrupt_file_starts_empty() {
        let path = temp_settings_path();
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "{not json").unwrap();

        let store = FileSettingsStore::open(&path).unwrap();
        assert!(store.list_keys().unwrap().is_empty());

        store.set_string("a", "b").unwrap();
        let raw = fs::read_to_string(&path).unwrap();
        assert!(raw.contains("\"a\""));

        let _ = fs::remove_dir_all(path.parent().unwrap());
    }
}
