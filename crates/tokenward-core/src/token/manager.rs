use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use futures::future::{self, Ready};
use serde_json::Value;
use tracing::debug;

use super::extract::{extract_token, TokenPath};
use super::jwt::{self, Payload};
use crate::config::{SharedConfig, StorageType};
use crate::storage::Storage;

/// Stored values of the guest flag
const GUEST_TRUE: &str = "true";
const GUEST_FALSE: &str = "false";

/// Single source of truth for the stored credential and what it means.
///
/// The token and the guest flag live under two keys that are written and
/// removed together, as two independent storage calls. Status is derived on
/// every query; nothing here caches it.
pub struct TokenStateManager {
    config: SharedConfig,
    storage: Arc<dyn Storage>,
    token_key: String,
    is_guest_key: String,
}

impl TokenStateManager {
    /// Storage keys are computed from the configuration once, here.
    pub fn new(config: SharedConfig, storage: Arc<dyn Storage>) -> Self {
        let (token_key, is_guest_key) = {
            let current = config.read();
            (current.token_key(), current.is_guest_key())
        };
        Self {
            config,
            storage,
            token_key,
            is_guest_key,
        }
    }

    pub fn config(&self) -> &SharedConfig {
        &self.config
    }

    pub fn token_key(&self) -> &str {
        &self.token_key
    }

    pub fn is_guest_key(&self) -> &str {
        &self.is_guest_key
    }

    /// Raw stored token, verbatim
    pub fn token(&self) -> Option<String> {
        self.storage.get(&self.token_key)
    }

    /// Claims of a stored JWT-shaped token
    pub fn payload(&self) -> Option<Payload> {
        let token = self.token().filter(|t| !t.is_empty())?;
        jwt::decode_payload(&token).into_payload()
    }

    /// Store the token carried by a login response.
    ///
    /// A response with no recognizable token leaves storage untouched and
    /// returns `false`.
    pub fn set_token(&self, response: &Value, is_guest: bool) -> bool {
        let path = TokenPath::from_config(&self.config.read());
        let Some(token) = extract_token(response, &path) else {
            debug!("No token found in response, nothing stored");
            return false;
        };

        self.storage.set(&self.token_key, &token);
        self.storage.set(
            &self.is_guest_key,
            if is_guest { GUEST_TRUE } else { GUEST_FALSE },
        );
        debug!(
            is_guest = is_guest,
            jwt = jwt::is_jwt_shaped(&token),
            "Stored token"
        );
        true
    }

    pub fn remove_token(&self) {
        self.storage.remove(&self.token_key);
        self.storage.remove(&self.is_guest_key);
    }

    /// Authenticated with a non-guest credential
    pub fn is_authenticated(&self) -> bool {
        self.is_authenticated_with(true)
    }

    /// With `ignore_guest`, a guest credential never counts as authenticated.
    pub fn is_authenticated_with(&self, ignore_guest: bool) -> bool {
        self.is_authenticated_at(ignore_guest, Utc::now())
    }

    fn is_authenticated_at(&self, ignore_guest: bool, now: DateTime<Utc>) -> bool {
        let valid = self
            .token()
            .map(|token| jwt::is_token_valid_at(&token, now))
            .unwrap_or(false);

        if ignore_guest && self.stored_guest_flag() {
            return false;
        }
        valid
    }

    /// Holds a guest credential that is otherwise valid
    pub fn is_guest(&self) -> bool {
        self.stored_guest_flag() && self.is_authenticated_with(false)
    }

    /// Clear local credentials. The returned future is already complete; it
    /// exists so callers can chain further asynchronous logout work.
    pub fn logout(&self) -> Ready<()> {
        self.remove_token();
        debug!("Logged out");
        future::ready(())
    }

    /// Switch the storage backend for every component sharing the config.
    ///
    /// Tokens already written to the previous backend are not migrated.
    pub fn set_storage_type(&self, storage_type: StorageType) {
        self.config.set_storage_type(storage_type);
        debug!(storage = %storage_type, "Storage type changed");
    }

    /// Expiry of a stored JWT-shaped token with a numeric `exp` claim
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        jwt::expiry_time(&self.payload()?)
    }

    /// Negative once the token has expired
    pub fn time_until_expiry(&self) -> Option<Duration> {
        self.expires_at().map(|expiry| expiry - Utc::now())
    }

    fn stored_guest_flag(&self) -> bool {
        self.storage.get(&self.is_guest_key).as_deref() == Some(GUEST_TRUE)
    }
}
