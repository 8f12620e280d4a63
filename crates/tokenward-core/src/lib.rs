//! Core library for tokenward.
//!
//! Keeps client-side authentication state: stores an opaque or JWT-shaped
//! credential, decides whether the session is authenticated (and whether it is
//! a guest session), and attaches the credential to outgoing HTTP requests.
//!
//! Modules:
//! - `config`: configuration record and the shared handle both components hold
//! - `storage`: key-value backends (memory, file, OS keychain)
//! - `token`: token extraction, JWT payload decoding, `TokenStateManager`
//! - `request`: `RequestAuthenticator` and the request abstraction

pub mod config;
pub mod request;
pub mod storage;
pub mod token;

use std::sync::Arc;

use anyhow::Result;

pub use config::{AuthConfig, SharedConfig, StorageType};
pub use request::{OutgoingRequest, RequestAuthenticator, RequestParts};
pub use storage::{ConfiguredStorage, Storage};
pub use token::{Payload, TokenStateManager};

/// Token manager and request authenticator wired to one shared configuration.
pub struct AuthContext {
    pub config: SharedConfig,
    pub tokens: Arc<TokenStateManager>,
    pub authenticator: RequestAuthenticator,
}

impl AuthContext {
    pub fn new(config: AuthConfig, storage: Arc<dyn Storage>) -> Self {
        Self::from_shared(SharedConfig::new(config), storage)
    }

    /// Storage follows `storage_type`: memory, the user data file, or the OS
    /// keychain
    pub fn with_default_storage(config: AuthConfig) -> Result<Self> {
        let config = SharedConfig::new(config);
        let storage = ConfiguredStorage::with_default_backends(config.clone())?;
        Ok(Self::from_shared(config, Arc::new(storage)))
    }

    /// Wire both components to an existing config handle, e.g. the one a
    /// [`ConfiguredStorage`] already follows
    pub fn from_shared(config: SharedConfig, storage: Arc<dyn Storage>) -> Self {
        let tokens = Arc::new(TokenStateManager::new(config.clone(), storage));
        let authenticator = RequestAuthenticator::new(config.clone(), tokens.clone());
        Self {
            config,
            tokens,
            authenticator,
        }
    }
}
