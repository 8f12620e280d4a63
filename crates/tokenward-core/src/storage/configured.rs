use std::collections::HashMap;
use std::sync::RwLock;

use anyhow::Result;
use tracing::warn;

use super::{FallibleStorage, FileStorage, KeyringStorage, MemoryStorage, Storage, StorageError};
use crate::config::{SharedConfig, StorageType, APP_NAME};

/// Writes a persistent backend refused, keyed by backend and key. `None`
/// records a removal.
type Pending = HashMap<(StorageType, String), Option<String>>;

/// Storage that follows the `storage_type` selector of the shared config.
///
/// The selector is read on every call, so a change made through
/// [`SharedConfig::set_storage_type`] applies to the next operation. When the
/// selected persistent backend refuses a write or removal, the change is kept
/// in memory and shadows the backend for that key until a later write to the
/// backend succeeds.
pub struct ConfiguredStorage {
    config: SharedConfig,
    memory: MemoryStorage,
    pending: RwLock<Pending>,
    file: Box<dyn FallibleStorage>,
    keyring: Box<dyn FallibleStorage>,
}

impl ConfiguredStorage {
    pub fn new(
        config: SharedConfig,
        file: impl FallibleStorage + 'static,
        keyring: impl FallibleStorage + 'static,
    ) -> Self {
        Self {
            config,
            memory: MemoryStorage::new(),
            pending: RwLock::new(HashMap::new()),
            file: Box::new(file),
            keyring: Box::new(keyring),
        }
    }

    /// File storage in the user data directory and keychain entries under the
    /// application name
    pub fn with_default_backends(config: SharedConfig) -> Result<Self> {
        Ok(Self::new(
            config,
            FileStorage::default_location()?,
            KeyringStorage::new(APP_NAME),
        ))
    }

    fn persistent(&self, storage_type: StorageType) -> Option<&dyn FallibleStorage> {
        match storage_type {
            StorageType::Memory => None,
            StorageType::File => Some(&*self.file),
            StorageType::Keyring => Some(&*self.keyring),
        }
    }

    fn pending_value(&self, storage_type: StorageType, key: &str) -> Option<Option<String>> {
        self.pending
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(&(storage_type, key.to_string()))
            .cloned()
    }

    fn hold(&self, storage_type: StorageType, key: &str, value: Option<&str>) {
        self.pending
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert((storage_type, key.to_string()), value.map(str::to_string));
    }

    fn release(&self, storage_type: StorageType, key: &str) {
        self.pending
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .remove(&(storage_type, key.to_string()));
    }

    fn fall_back(storage_type: StorageType, op: &str, key: &str, error: &StorageError) {
        warn!(
            storage = %storage_type,
            op = op,
            key = key,
            error = %error,
            "Storage backend unavailable, using memory"
        );
    }
}

impl Storage for ConfiguredStorage {
    fn get(&self, key: &str) -> Option<String> {
        let storage_type = self.config.storage_type();
        let Some(backend) = self.persistent(storage_type) else {
            return self.memory.get(key);
        };
        if let Some(value) = self.pending_value(storage_type, key) {
            return value;
        }
        backend.try_get(key).unwrap_or_else(|e| {
            Self::fall_back(storage_type, "get", key, &e);
            None
        })
    }

    fn set(&self, key: &str, value: &str) {
        let storage_type = self.config.storage_type();
        let Some(backend) = self.persistent(storage_type) else {
            return self.memory.set(key, value);
        };
        match backend.try_set(key, value) {
            Ok(()) => self.release(storage_type, key),
            Err(e) => {
                Self::fall_back(storage_type, "set", key, &e);
                self.hold(storage_type, key, Some(value));
            }
        }
    }

    fn remove(&self, key: &str) {
        let storage_type = self.config.storage_type();
        let Some(backend) = self.persistent(storage_type) else {
            return self.memory.remove(key);
        };
        match backend.try_remove(key) {
            Ok(()) => self.release(storage_type, key),
            Err(e) => {
                Self::fall_back(storage_type, "remove", key, &e);
                self.hold(storage_type, key, None);
            }
        }
    }
}
