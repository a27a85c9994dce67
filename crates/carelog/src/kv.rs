//! String key-value stores.
//!
//! Settings such as the admin-edited category list and the last-saved
//! timestamp live under string keys with string values, JSON-encoded where
//! structured. [`MemoryStore`] also reads and writes browser storage dumps
//! (a JSON object of key to string value) for [`crate::legacy`] import and
//! export.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Mutex;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::error::{Error, Result};

/// A string-keyed, string-valued persistent map.
pub trait KeyValueStore: Send + Sync {
    /// Read the value stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store cannot be read.
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Store `value` under `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store cannot be written.
    fn set(&self, key: &str, value: &str) -> Result<()>;

    /// All keys currently stored, sorted.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store cannot be read.
    fn keys(&self) -> Result<Vec<String>>;
}

/// Read and decode a JSON value stored under `key`.
///
/// # Errors
///
/// Returns an error if the store fails or the value is not valid JSON for `T`.
pub fn read_json<T: DeserializeOwned>(store: &dyn KeyValueStore, key: &str) -> Result<Option<T>> {
    match store.get(key)? {
        Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
        None => Ok(None),
    }
}

/// Encode `value` as JSON and store it under `key`.
///
/// # Errors
///
/// Returns an error if encoding or the store write fails.
pub fn write_json<T: Serialize + ?Sized>(
    store: &dyn KeyValueStore,
    key: &str,
    value: &T,
) -> Result<()> {
    let raw = serde_json::to_string(value)?;
    store.set(key, &raw)
}

/// In-memory key-value store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<BTreeMap<String, String>>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a storage dump: a JSON object mapping keys to values.
    ///
    /// String values are kept verbatim; any other JSON value is stored in its
    /// serialized form, so dumps that inlined parsed arrays load as well.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not a JSON object.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)?;
        let object: serde_json::Map<String, serde_json::Value> = serde_json::from_str(&raw)?;

        let entries = object
            .into_iter()
            .map(|(key, value)| {
                let value = match value {
                    serde_json::Value::String(s) => s,
                    other => other.to_string(),
                };
                (key, value)
            })
            .collect::<BTreeMap<_, _>>();

        debug!("Loaded {} keys from {}", entries.len(), path.display());
        Ok(Self {
            entries: Mutex::new(entries),
        })
    }

    /// Write the store as a JSON object of key to string value.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn write_json_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let entries = self.lock()?;
        let raw = serde_json::to_string_pretty(&*entries)?;
        std::fs::write(path, raw)?;
        Ok(())
    }

    /// Number of stored keys.
    ///
    /// # Errors
    ///
    /// Returns an error if the store lock is poisoned.
    pub fn len(&self) -> Result<usize> {
        Ok(self.lock()?.len())
    }

    /// Whether the store holds no keys.
    ///
    /// # Errors
    ///
    /// Returns an error if the store lock is poisoned.
    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.lock()?.is_empty())
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, BTreeMap<String, String>>> {
        self.entries
            .lock()
            .map_err(|_| Error::internal("key-value store lock poisoned"))
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.lock()?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.lock()?.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>> {
        Ok(self.lock()?.keys().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_missing_key() {
        let store = MemoryStore::new();
        assert!(store.get("daily_logs").unwrap().is_none());
        assert!(store.is_empty().unwrap());
    }

    #[test]
    fn test_set_replaces_value() {
        let store = MemoryStore::new();
        store.set("k", "1").unwrap();
        store.set("k", "2").unwrap();
        assert_eq!(store.get("k").unwrap().as_deref(), Some("2"));
        assert_eq!(store.len().unwrap(), 1);
    }

    #[test]
    fn test_keys_are_sorted() {
        let store = MemoryStore::new();
        store.set("b", "").unwrap();
        store.set("a", "").unwrap();
        assert_eq!(store.keys().unwrap(), vec!["a", "b"]);
    }

    #[test]
    fn test_json_helpers() {
        let store = MemoryStore::new();
        write_json(&store, "nums", &vec![1, 2, 3]).unwrap();
        let nums: Option<Vec<i32>> = read_json(&store, "nums").unwrap();
        assert_eq!(nums, Some(vec![1, 2, 3]));

        let missing: Option<Vec<i32>> = read_json(&store, "other").unwrap();
        assert!(missing.is_none());
    }

    #[test]
    fn test_read_json_rejects_corrupt_value() {
        let store = MemoryStore::new();
        store.set("broken", "[1, 2").unwrap();
        let result: Result<Option<Vec<i32>>> = read_json(&store, "broken");
        assert!(matches!(result, Err(Error::Json(_))));
    }

    #[test]
    fn test_json_file_dump() {
        let path =
            std::env::temp_dir().join(format!("carelog_kv_dump_{}.json", std::process::id()));
        std::fs::write(
            &path,
            r#"{"daily_logs": "[]", "inline": [1, 2], "daily_logs_saved_at": "2025-07-11T01:00:00.000Z"}"#,
        )
        .unwrap();

        let store = MemoryStore::from_json_file(&path).unwrap();
        assert_eq!(store.get("daily_logs").unwrap().as_deref(), Some("[]"));
        assert_eq!(store.get("inline").unwrap().as_deref(), Some("[1,2]"));

        store.set("extra", "x").unwrap();
        store.write_json_file(&path).unwrap();
        let reloaded = MemoryStore::from_json_file(&path).unwrap();
        assert_eq!(reloaded.len().unwrap(), 4);

        let _ = std::fs::remove_file(&path);
    }
}
