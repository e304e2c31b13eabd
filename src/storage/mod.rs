//! Key-value persistence for timer state and settings.
//!
//! Values are opaque strings (JSON in practice). Two implementations are
//! provided:
//!
//! - [`FileStore`]: one file per key under a data directory
//! - [`MemoryStore`]: in-process map with a shared handle, used by tests

mod error;

use std::cell::RefCell;
use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use tracing::debug;

pub use error::StorageError;

/// Key under which the session snapshot is stored.
pub const SESSION_KEY: &str = "pomodoro-state";

/// Key under which the timer settings are stored.
pub const SETTINGS_KEY: &str = "pomodoro-settings";

/// Key under which the last notification permission answer is stored.
pub const PERMISSION_KEY: &str = "notification-permission";

/// Name of the application data directory.
const APP_DIR_NAME: &str = "pomodoro";

/// String key-value persistence.
pub trait KeyValueStore {
    /// Returns the value stored under `key`, or `None` if absent.
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Stores `value` under `key`, replacing any previous value.
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
}

impl<T: KeyValueStore + ?Sized> KeyValueStore for Rc<T> {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        (**self).set(key, value)
    }
}

// ============================================================================
// FileStore
// ============================================================================

/// Stores each key as `<dir>/<key>.json`.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Creates a store rooted at `dir`. The directory is created on first write.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Creates a store in the platform data directory (e.g. `~/.local/share/pomodoro`).
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NoDataDir` if the platform has no data directory.
    pub fn in_default_location() -> Result<Self, StorageError> {
        let base = dirs::data_dir().ok_or(StorageError::NoDataDir)?;
        Ok(Self::new(base.join(APP_DIR_NAME)))
    }

    /// Returns the directory backing this store.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, StorageError> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !valid {
            return Err(StorageError::InvalidKey(key.to_string()));
        }
        Ok(self.dir.join(format!("{key}.json")))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let path = self.path_for(key)?;
        match fs::read_to_string(&path) {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StorageError::Read {
                path: path.display().to_string(),
                source: e,
            }),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let path = self.path_for(key)?;
        fs::create_dir_all(&self.dir).map_err(|e| StorageError::Write {
            path: self.dir.display().to_string(),
            source: e,
        })?;

        // Write-then-rename so a crash never leaves a half-written value.
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, value)
            .and_then(|()| fs::rename(&tmp, &path))
            .map_err(|e| StorageError::Write {
                path: path.display().to_string(),
                source: e,
            })?;

        debug!("Stored {} ({} bytes)", key, value.len());
        Ok(())
    }
}

// ============================================================================
// MemoryStore
// ============================================================================

/// In-memory store. Clones share the same underlying map.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    values: Rc<RefCell<HashMap<String, String>>>,
    writes: Rc<RefCell<Vec<String>>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the keys written so far, in write order.
    #[must_use]
    pub fn write_log(&self) -> Vec<String> {
        self.writes.borrow().clone()
    }

    /// Returns how many times `key` has been written.
    #[must_use]
    pub fn write_count(&self, key: &str) -> usize {
        self.writes.borrow().iter().filter(|k| *k == key).count()
    }

    pub fn clear_write_log(&self) {
        self.writes.borrow_mut().clear();
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.values.borrow().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.values
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        self.writes.borrow_mut().push(key.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod file_store_tests {
        use super::*;

        #[test]
        fn test_get_missing_returns_none() {
            let dir = tempfile::tempdir().unwrap();
            let store = FileStore::new(dir.path());
            assert_eq!(store.get(SESSION_KEY).unwrap(), None);
        }

        #[test]
        fn test_set_then_get() {
            let dir = tempfile::tempdir().unwrap();
            let store = FileStore::new(dir.path().join("nested"));

            store.set(SETTINGS_KEY, r#"{"pomodoro":30}"#).unwrap();

            assert_eq!(
                store.get(SETTINGS_KEY).unwrap().as_deref(),
                Some(r#"{"pomodoro":30}"#)
            );
            assert!(dir.path().join("nested/pomodoro-settings.json").exists());
            assert!(!dir.path().join("nested/pomodoro-settings.json.tmp").exists());
        }

        #[test]
        fn test_set_overwrites() {
            let dir = tempfile::tempdir().unwrap();
            let store = FileStore::new(dir.path());

            store.set("k", "1").unwrap();
            store.set("k", "2").unwrap();

            assert_eq!(store.get("k").unwrap().as_deref(), Some("2"));
        }

        #[test]
        fn test_rejects_path_like_keys() {
            let dir = tempfile::tempdir().unwrap();
            let store = FileStore::new(dir.path());

            let err = store.set("../escape", "x").unwrap_err();
            assert!(matches!(err, StorageError::InvalidKey(_)));
            assert!(store.get("").is_err());
        }
    }

    mod memory_store_tests {
        use super::*;

        #[test]
        fn test_clones_share_values() {
            let store = MemoryStore::new();
            let other = store.clone();

            store.set("a", "1").unwrap();

            assert_eq!(other.get("a").unwrap().as_deref(), Some("1"));
        }

        #[test]
        fn test_write_log() {
            let store = MemoryStore::new();
            store.set("a", "1").unwrap();
            store.set("b", "2").unwrap();
            store.set("a", "3").unwrap();

            assert_eq!(store.write_log(), vec!["a", "b", "a"]);
            assert_eq!(store.write_count("a"), 2);

            store.clear_write_log();
            assert!(store.write_log().is_empty());
            assert_eq!(store.get("a").unwrap().as_deref(), Some("3"));
        }

        #[test]
        fn test_rc_store_delegates() {
            let store: Rc<dyn KeyValueStore> = Rc::new(MemoryStore::new());
            store.set("x", "y").unwrap();
            assert_eq!(store.get("x").unwrap().as_deref(), Some("y"));
        }
    }
}
