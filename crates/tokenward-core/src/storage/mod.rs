//! Key-value storage backends for credentials.
//!
//! This module provides:
//! - `Storage`: the infallible get/set/remove capability the token manager uses
//! - `FallibleStorage`: the same operations for backends that can fail
//! - `MemoryStorage`, `FileStorage`, `KeyringStorage`: concrete backends
//! - `ConfiguredStorage`: routes calls to the backend named by the shared
//!   configuration, falling back to memory when a persistent backend fails
//!
//! Keys are plain strings. Namespacing is the caller's job.

pub mod configured;
pub mod error;
pub mod file;
pub mod keychain;
pub mod memory;

use std::sync::Arc;

pub use configured::ConfiguredStorage;
pub use error::StorageError;
pub use file::FileStorage;
pub use keychain::KeyringStorage;
pub use memory::MemoryStorage;

/// Synchronous key-value capability. Each call is atomic on its own; nothing
/// here groups several keys into one transaction.
pub trait Storage: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str);
    fn remove(&self, key: &str);
}

/// Backend whose operations can fail (disk, keychain).
pub trait FallibleStorage: Send + Sync {
    fn try_get(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn try_set(&self, key: &str, value: &str) -> Result<(), StorageError>;
    fn try_remove(&self, key: &str) -> Result<(), StorageError>;
}

impl<S: Storage + ?Sized> Storage for Arc<S> {
    fn get(&self, key: &str) -> Option<String> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) {
        (**self).set(key, value)
    }

    fn remove(&self, key: &str) {
        (**self).remove(key)
    }
}
