//! Authentication configuration management.
//!
//! This module holds the configuration record consumed by the token state
//! manager and the request authenticator: storage key names and prefix, the
//! token extraction path, the header injection settings, and the storage
//! backend selector.
//!
//! Configuration is stored at `~/.config/tokenward/config.json`.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Application name used for config/storage directory paths
pub const APP_NAME: &str = "tokenward";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Which storage backend credentials are written to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageType {
    /// Process-local map, gone when the process exits
    Memory,
    /// JSON file in the user data directory
    #[default]
    File,
    /// OS keychain
    Keyring,
}

impl StorageType {
    pub fn as_str(&self) -> &'static str {
        match self {
            StorageType::Memory => "memory",
            StorageType::File => "file",
            StorageType::Keyring => "keyring",
        }
    }
}

impl fmt::Display for StorageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StorageType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(StorageType::Memory),
            "file" => Ok(StorageType::File),
            "keyring" => Ok(StorageType::Keyring),
            other => Err(anyhow::anyhow!(
                "Unknown storage type '{}' (expected memory, file or keyring)",
                other
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Namespace joined to every logical key with `_`
    pub storage_prefix: Option<String>,
    pub storage_key_token: String,
    pub storage_key_is_guest: String,
    /// Dotted path under the response `data` object where the token lives
    pub token_root: Option<String>,
    pub token_name: String,
    pub token_header: Option<String>,
    /// Scheme prepended to the token in the header value, e.g. `Bearer`
    pub token_type: Option<String>,
    pub http_interceptor: bool,
    pub storage_type: StorageType,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            storage_prefix: Some(APP_NAME.to_string()),
            storage_key_token: "token".to_string(),
            storage_key_is_guest: "is_guest".to_string(),
            token_root: None,
            token_name: "access_token".to_string(),
            token_header: Some("Authorization".to_string()),
            token_type: Some("Bearer".to_string()),
            http_interceptor: true,
            storage_type: StorageType::default(),
        }
    }
}

impl AuthConfig {
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    /// Load from an explicit path, falling back to defaults when the file is absent
    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))
        } else {
            Ok(Self::default())
        }
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    /// Storage key for a logical key name, namespaced by `storage_prefix`
    pub fn prefixed_key(&self, key: &str) -> String {
        match self.storage_prefix.as_deref() {
            Some(prefix) if !prefix.is_empty() => format!("{}_{}", prefix, key),
            _ => key.to_string(),
        }
    }

    pub fn token_key(&self) -> String {
        self.prefixed_key(&self.storage_key_token)
    }

    pub fn is_guest_key(&self) -> String {
        self.prefixed_key(&self.storage_key_is_guest)
    }
}

/// Configuration shared by reference between the token manager, the request
/// authenticator and the storage router.
///
/// Cloning shares the same underlying record, so a mutation through one handle
/// (e.g. [`SharedConfig::set_storage_type`]) is seen by every holder.
#[derive(Debug, Clone, Default)]
pub struct SharedConfig {
    inner: Arc<RwLock<AuthConfig>>,
}

impl SharedConfig {
    pub fn new(config: AuthConfig) -> Self {
        Self {
            inner: Arc::new(RwLock::new(config)),
        }
    }

    pub fn read(&self) -> RwLockReadGuard<'_, AuthConfig> {
        self.inner.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, AuthConfig> {
        self.inner.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Owned copy of the current configuration
    pub fn snapshot(&self) -> AuthConfig {
        self.read().clone()
    }

    pub fn storage_type(&self) -> StorageType {
        self.read().storage_type
    }

    pub fn set_storage_type(&self, storage_type: StorageType) {
        self.write().storage_type = storage_type;
    }

    /// Mutate the record in place; every holder sees the result
    pub fn update(&self, f: impl FnOnce(&mut AuthConfig)) {
        f(&mut self.write());
    }

    pub fn http_interceptor(&self) -> bool {
        self.read().http_interceptor
    }
}

impl From<AuthConfig> for SharedConfig {
    fn from(config: AuthConfig) -> Self {
        Self::new(config)
    }
}
