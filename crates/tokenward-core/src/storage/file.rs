use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::Result;
use tracing::warn;

use super::{FallibleStorage, Storage, StorageError};
use crate::config::APP_NAME;

/// Storage file name in the data directory
const STORAGE_FILE: &str = "storage.json";

type Entries = BTreeMap<String, String>;

/// Storage backed by a single JSON object file.
///
/// The file is re-read on every call so that several processes sharing it see
/// each other's writes. Writes within one process are serialized.
#[derive(Debug)]
pub struct FileStorage {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// Storage file under the user data directory
    pub fn default_location() -> Result<Self> {
        let data_dir = dirs::data_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find data directory"))?;
        Ok(Self::new(data_dir.join(APP_NAME).join(STORAGE_FILE)))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_entries(&self) -> Result<Entries, StorageError> {
        if !self.path.exists() {
            return Ok(Entries::new());
        }
        let contents = std::fs::read_to_string(&self.path)
            .map_err(|e| StorageError::io(&self.path, e))?;
        if contents.trim().is_empty() {
            return Ok(Entries::new());
        }
        Ok(serde_json::from_str(&contents)?)
    }

    fn write_entries(&self, entries: &Entries) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| StorageError::io(parent, e))?;
        }
        let contents = serde_json::to_string_pretty(entries)?;
        std::fs::write(&self.path, contents).map_err(|e| StorageError::io(&self.path, e))
    }
}

impl FallibleStorage for FileStorage {
    fn try_get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.read_entries()?.remove(key))
    }

    fn try_set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let _guard = self.write_lock.lock().unwrap_or_else(|p| p.into_inner());
        let mut entries = self.read_entries()?;
        entries.insert(key.to_string(), value.to_string());
        self.write_entries(&entries)
    }

    fn try_remove(&self, key: &str) -> Result<(), StorageError> {
        let _guard = self.write_lock.lock().unwrap_or_else(|p| p.into_inner());
        let mut entries = self.read_entries()?;
        if entries.remove(key).is_some() {
            self.write_entries(&entries)?;
        }
        Ok(())
    }
}

impl Storage for FileStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.try_get(key).unwrap_or_else(|e| {
            warn!(key = key, error = %e, "Failed to read from storage file");
            None
        })
    }

    fn set(&self, key: &str, value: &str) {
        if let Err(e) = self.try_set(key, value) {
            warn!(key = key, error = %e, "Failed to write to storage file");
        }
    }

    fn remove(&self, key: &str) {
        if let Err(e) = self.try_remove(key) {
            warn!(key = key, error = %e, "Failed to remove from storage file");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_reads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(dir.path().join("storage.json"));
        assert_eq!(storage.try_get("token").unwrap(), None);
        // Removing from a missing file does not create it
        storage.try_remove("token").unwrap();
        assert!(!storage.path().exists());
    }

    #[test]
    fn test_persists_across_instances() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("storage.json");

        let first = FileStorage::new(&path);
        first.set("tokenward_token", "abc");
        first.set("tokenward_is_guest", "false");

        let second = FileStorage::new(&path);
        assert_eq!(second.get("tokenward_token").as_deref(), Some("abc"));

        second.remove("tokenward_token");
        assert_eq!(first.get("tokenward_token"), None);
        assert_eq!(first.get("tokenward_is_guest").as_deref(), Some("false"));
    }

    #[test]
    fn test_corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("storage.json");
        std::fs::write(&path, "not json").unwrap();

        let storage = FileStorage::new(&path);
        assert!(matches!(storage.try_get("token"), Err(StorageError::Corrupt(_))));
        // The infallible surface degrades to "absent"
        assert_eq!(storage.get("token"), None);
    }
}
