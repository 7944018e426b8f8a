//! Key-Value Storage Abstraction
//!
//! Hosts persist player state through a small synchronous string store with
//! the same shape as the browser's `localStorage`:
//! - Web: `window.localStorage`
//! - Desktop: a JSON file in the application data directory
//! - Tests: [`MemoryKeyValueStore`]
//!
//! Writes can fail when the backing storage is unavailable or full. Callers in
//! the player treat every failure as non-fatal.

use std::collections::BTreeMap;

use parking_lot::Mutex;

use crate::error::{BridgeError, Result};
use crate::platform::PlatformSendSync;

/// Synchronous string key-value store.
///
/// Typed accessors are provided on top of the string primitives; values are
/// stored using their `Display` form so they stay readable by other tooling
/// inspecting the same storage.
///
/// # Example
///
/// ```
/// use bridge_traits::storage::{KeyValueStore, MemoryKeyValueStore};
///
/// let store = MemoryKeyValueStore::new();
/// store.set_f64("video-player-volume", 0.5).unwrap();
/// assert_eq!(store.get_f64("video-player-volume").unwrap(), Some(0.5));
/// ```
pub trait KeyValueStore: PlatformSendSync {
    /// Retrieve a raw string value.
    fn get_string(&self, key: &str) -> Result<Option<String>>;

    /// Store a raw string value, replacing any previous value.
    fn set_string(&self, key: &str, value: &str) -> Result<()>;

    /// Remove a key. Removing a missing key is not an error.
    fn remove(&self, key: &str) -> Result<()>;

    /// List all keys currently stored.
    fn list_keys(&self) -> Result<Vec<String>>;

    fn has_key(&self, key: &str) -> Result<bool> {
        Ok(self.get_string(key)?.is_some())
    }

    fn get_f64(&self, key: &str) -> Result<Option<f64>> {
        parse_value(key, self.get_string(key)?)
    }

    fn set_f64(&self, key: &str, value: f64) -> Result<()> {
        self.set_string(key, &value.to_string())
    }

    fn get_i64(&self, key: &str) -> Result<Option<i64>> {
        parse_value(key, self.get_string(key)?)
    }

    fn set_i64(&self, key: &str, value: i64) -> Result<()> {
        self.set_string(key, &value.to_string())
    }

    fn get_bool(&self, key: &str) -> Result<Option<bool>> {
        parse_value(key, self.get_string(key)?)
    }

    fn set_bool(&self, key: &str, value: bool) -> Result<()> {
        self.set_string(key, if value { "true" } else { "false" })
    }
}

/// Parse a stored value with `FromStr`, reporting unparsable content as
/// [`BridgeError::Malformed`].
fn parse_value<T>(key: &str, raw: Option<String>) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match raw {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| BridgeError::Malformed {
                key: key.to_string(),
                message: e.to_string(),
            }),
        None => Ok(None),
    }
}

/// In-memory [`KeyValueStore`].
///
/// Supports an optional byte quota and an "unavailable" switch so callers can
/// exercise the storage-failure paths the browser produces (private browsing,
/// `QuotaExceededError`).
#[derive(Debug, Default)]
pub struct MemoryKeyValueStore {
    inner: Mutex<MemoryState>,
}

#[derive(Debug, Default)]
struct MemoryState {
    entries: BTreeMap<String, String>,
    quota_bytes: Option<usize>,
    unavailable: bool,
}

impl MemoryState {
    fn used_bytes(&self) -> usize {
        self.entries.iter().map(|(k, v)| k.len() + v.len()).sum()
    }

    fn check_available(&self) -> Result<()> {
        if self.unavailable {
            return Err(BridgeError::NotAvailable("storage disabled".to_string()));
        }
        Ok(())
    }
}

impl MemoryKeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store that rejects writes once keys plus values exceed `bytes`.
    pub fn with_quota(bytes: usize) -> Self {
        let store = Self::default();
        store.inner.lock().quota_bytes = Some(bytes);
        store
    }

    /// Toggle whether every operation fails with [`BridgeError::NotAvailable`].
    pub fn set_unavailable(&self, unavailable: bool) {
        self.inner.lock().unavailable = unavailable;
    }

    /// Number of stored entries.
    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl KeyValueStore for MemoryKeyValueStore {
    fn get_string(&self, key: &str) -> Result<Option<String>> {
        let state = self.inner.lock();
        state.check_available()?;
        Ok(state.entries.get(key).cloned())
    }

    fn set_string(&self, key: &str, value: &str) -> Result<()> {
        let mut state = self.inner.lock();
        state.check_available()?;

        if let Some(quota) = state.quota_bytes {
            let existing = state
                .entries
                .get(key)
                .map(|v| key.len() + v.len())
                .unwrap_or(0);
            let projected = state.used_bytes() - existing + key.len() + value.len();
            if projected > quota {
                return Err(BridgeError::QuotaExceeded {
                    key: key.to_string(),
                });
            }
        }

        state.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let mut state = self.inner.lock();
        state.check_available()?;
        state.entries.remove(key);
        Ok(())
    }

    fn list_keys(&self) -> Result<Vec<String>> {
        let state = self.inner.lock();
        state.check_available()?;
        Ok(state.entries.keys().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_string_round_trip_and_remove() {
        let store = MemoryKeyValueStore::new();
        store.set_string("key", "value").unwrap();
        assert_eq!(store.get_string("key").unwrap(), Some("value".to_string()));
        assert!(store.has_key("key").unwrap());

        store.remove("key").unwrap();
        assert_eq!(store.get_string("key").unwrap(), None);
        store.remove("key").unwrap();
    }

    #[test]
    fn test_typed_accessors() {
        let store = MemoryKeyValueStore::new();
        store.set_bool("muted", true).unwrap();
        store.set_i64("quality", 3).unwrap();
        store.set_f64("rate", 1.25).unwrap();

        assert_eq!(store.get_bool("muted").unwrap(), Some(true));
        assert_eq!(store.get_i64("quality").unwrap(), Some(3));
        assert_eq!(store.get_f64("rate").unwrap(), Some(1.25));
        assert_eq!(store.get_f64("missing").unwrap(), None);
    }

    #[test]
    fn test_malformed_value() {
        let store = MemoryKeyValueStore::new();
        store.set_string("rate", "fast").unwrap();

        let err = store.get_f64("rate").unwrap_err();
        assert!(matches!(err, BridgeError::Malformed { ref key, .. } if key == "rate"));
        assert!(err.is_storage_failure());
    }

    #[test]
    fn test_quota_exceeded() {
        let store = MemoryKeyValueStore::with_quota(16);
        store.set_string("a", "12345").unwrap();
        // Overwriting the same key only counts the new value.
        store.set_string("a", "1234567890").unwrap();

        let err = store.set_string("b", "1234567890").unwrap_err();
        assert!(matches!(err, BridgeError::QuotaExceeded { .. }));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_unavailable_store() {
        let store = MemoryKeyValueStore::new();
        store.set_unavailable(true);
        assert!(store.get_string("a").is_err());
        assert!(store.set_string("a", "b").is_err());

        store.set_unavailable(false);
        store.set_string("a", "b").unwrap();
        assert_eq!(store.list_keys().unwrap(), vec!["a".to_string()]);
    }
}
