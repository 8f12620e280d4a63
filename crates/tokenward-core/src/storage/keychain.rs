use std::collections::{hash_map, HashMap};
use std::fmt;
use std::sync::Mutex;

use keyring::Entry;
use tracing::warn;

use super::{FallibleStorage, Storage, StorageError};

/// Storage in the OS keychain, one entry per key under a fixed service name.
///
/// Entries are created once per key and reused, so every call for a key goes
/// through the same credential handle.
pub struct KeyringStorage {
    service: String,
    entries: Mutex<HashMap<String, Entry>>,
}

impl KeyringStorage {
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn service(&self) -> &str {
        &self.service
    }

    fn with_entry<T>(
        &self,
        key: &str,
        op: impl FnOnce(&Entry) -> keyring::Result<T>,
    ) -> keyring::Result<T> {
        let mut entries = self
            .entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let entry = match entries.entry(key.to_string()) {
            hash_map::Entry::Occupied(slot) => slot.into_mut(),
            hash_map::Entry::Vacant(slot) => slot.insert(Entry::new(&self.service, key)?),
        };
        op(entry)
    }
}

impl fmt::Debug for KeyringStorage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyringStorage")
            .field("service", &self.service)
            .finish_non_exhaustive()
    }
}

impl FallibleStorage for KeyringStorage {
    fn try_get(&self, key: &str) -> Result<Option<String>, StorageError> {
        match self.with_entry(key, |entry| entry.get_password()) {
            Ok(value) => Ok(Some(value)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn try_set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.with_entry(key, |entry| entry.set_password(value))?;
        Ok(())
    }

    fn try_remove(&self, key: &str) -> Result<(), StorageError> {
        match self.with_entry(key, |entry| entry.delete_credential()) {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

impl Storage for KeyringStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.try_get(key).unwrap_or_else(|e| {
            warn!(key = key, error = %e, "Failed to read from keychain");
            None
        })
    }

    fn set(&self, key: &str, value: &str) {
        if let Err(e) = self.try_set(key, value) {
            warn!(key = key, error = %e, "Failed to store in keychain");
        }
    }

    fn remove(&self, key: &str) {
        if let Err(e) = self.try_remove(key) {
            warn!(key = key, error = %e, "Failed to delete from keychain");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // The mock store keeps each credential inside its own entry
    fn use_mock_keychain() {
        keyring::set_default_credential_builder(keyring::mock::default_credential_builder());
    }

    #[test]
    fn test_set_then_get_round_trips() {
        use_mock_keychain();
        let storage = KeyringStorage::new("tokenward-tests");

        assert_eq!(storage.try_get("tokenward_token").unwrap(), None);
        storage.set("tokenward_token", "abc");
        assert_eq!(storage.get("tokenward_token").as_deref(), Some("abc"));

        storage.set("tokenward_token", "def");
        assert_eq!(storage.get("tokenward_token").as_deref(), Some("def"));
    }

    #[test]
    fn test_remove_is_idempotent() {
        use_mock_keychain();
        let storage = KeyringStorage::new("tokenward-tests");

        storage.try_remove("tokenward_is_guest").unwrap();
        storage.set("tokenward_is_guest", "true");
        storage.try_remove("tokenward_is_guest").unwrap();
        storage.try_remove("tokenward_is_guest").unwrap();
        assert_eq!(storage.get("tokenward_is_guest"), None);
    }
}
