use std::sync::Arc;

use reqwest::header::{HeaderName, HeaderValue};
use tracing::{debug, warn};

use super::OutgoingRequest;
use crate::config::SharedConfig;
use crate::token::TokenStateManager;

/// Attaches the stored credential to outgoing requests.
///
/// Runs synchronously before every dispatch. A request that opts out through
/// [`OutgoingRequest::skip_authorization`] is never touched.
pub struct RequestAuthenticator {
    config: SharedConfig,
    tokens: Arc<TokenStateManager>,
}

impl RequestAuthenticator {
    pub fn new(config: SharedConfig, tokens: Arc<TokenStateManager>) -> Self {
        Self { config, tokens }
    }

    pub fn tokens(&self) -> &TokenStateManager {
        &self.tokens
    }

    pub fn apply<R: OutgoingRequest>(&self, mut request: R) -> R {
        self.authorize(&mut request);
        request
    }

    /// In-place form of [`apply`](Self::apply). Returns whether a header was set.
    pub fn authorize<R: OutgoingRequest + ?Sized>(&self, request: &mut R) -> bool {
        if request.skip_authorization() {
            debug!("Request opted out of authorization");
            return false;
        }

        if !(self.tokens.is_authenticated() && self.config.http_interceptor()) {
            return false;
        }

        let Some((name, value)) = self.header() else {
            return false;
        };
        request.headers_mut().insert(name, value);
        true
    }

    /// Header name and value for the current credential
    fn header(&self) -> Option<(HeaderName, HeaderValue)> {
        let token = self.tokens.token()?;
        let (header, token_type) = {
            let config = self.config.read();
            (
                config.token_header.clone().filter(|h| !h.is_empty()),
                config.token_type.clone().filter(|t| !t.is_empty()),
            )
        };

        let Some(header) = header else {
            warn!("No token header configured, request left unauthenticated");
            return None;
        };

        let formatted = match token_type {
            Some(token_type) => format!("{} {}", token_type, token),
            None => token,
        };

        let name = match HeaderName::from_bytes(header.as_bytes()) {
            Ok(name) => name,
            Err(e) => {
                warn!(header = %header, error = %e, "Invalid token header name");
                return None;
            }
        };
        let mut value = match HeaderValue::from_str(&formatted) {
            Ok(value) => value,
            Err(e) => {
                warn!(header = %header, error = %e, "Token is not a valid header value");
                return None;
            }
        };
        value.set_sensitive(true);

        Some((name, value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AuthConfig, StorageType};
    use crate::request::RequestParts;
    use crate::storage::MemoryStorage;
    use crate::token::jwt::tests::jwt;
    use chrono::Utc;
    use reqwest::header::AUTHORIZATION;
    use serde_json::json;

    fn authenticator(config: AuthConfig) -> RequestAuthenticator {
        let config = SharedConfig::new(AuthConfig {
            storage_type: StorageType::Memory,
            ..config
        });
        let tokens = Arc::new(TokenStateManager::new(
            config.clone(),
            Arc::new(MemoryStorage::new()),
        ));
        RequestAuthenticator::new(config, tokens)
    }

    fn request() -> RequestParts {
        RequestParts::get("https://api.example.com/profile")
    }

    #[test]
    fn test_bearer_header() {
        let auth = authenticator(AuthConfig::default());
        auth.tokens().set_token(&json!({"access_token": "abc"}), false);

        let request = auth.apply(request());
        assert_eq!(request.headers[AUTHORIZATION], "Bearer abc");
        assert!(request.headers[AUTHORIZATION].is_sensitive());
    }

    #[test]
    fn test_raw_token_without_type() {
        let auth = authenticator(AuthConfig {
            token_header: Some("X-Auth-Token".to_string()),
            token_type: None,
            ..AuthConfig::default()
        });
        auth.tokens().set_token(&json!({"access_token": "abc"}), false);

        let request = auth.apply(request());
        assert_eq!(request.headers["x-auth-token"], "abc");
        assert!(!request.headers.contains_key(AUTHORIZATION));
    }

    #[test]
    fn test_opt_out_is_never_touched() {
        let auth = authenticator(AuthConfig::default());
        auth.tokens().set_token(&json!({"access_token": "abc"}), false);

        let request = auth.apply(request().without_authorization());
        assert!(request.headers.is_empty());

        // Even a pre-set header is left as is
        let mut parts = request.clone();
        parts
            .headers
            .insert(AUTHORIZATION, HeaderValue::from_static("Basic xyz"));
        let parts = auth.apply(parts);
        assert_eq!(parts.headers[AUTHORIZATION], "Basic xyz");
    }

    #[test]
    fn test_interceptor_disabled() {
        let auth = authenticator(AuthConfig {
            http_interceptor: false,
            ..AuthConfig::default()
        });
        auth.tokens().set_token(&json!({"access_token": "abc"}), false);

        assert!(auth.tokens().is_authenticated());
        assert!(auth.apply(request()).headers.is_empty());
    }

    #[test]
    fn test_unauthenticated_states() {
        let auth = authenticator(AuthConfig::default());
        assert!(auth.apply(request()).headers.is_empty());

        // Guest sessions are not authenticated by default
        auth.tokens().set_token(&json!({"access_token": "guest"}), true);
        assert!(auth.apply(request()).headers.is_empty());

        let expired = jwt(&json!({"exp": Utc::now().timestamp() - 10}));
        auth.tokens().set_token(&json!({ "access_token": expired }), false);
        assert!(auth.apply(request()).headers.is_empty());
    }

    #[test]
    fn test_missing_or_invalid_header_config() {
        let auth = authenticator(AuthConfig {
            token_header: None,
            ..AuthConfig::default()
        });
        auth.tokens().set_token(&json!({"access_token": "abc"}), false);
        assert!(auth.apply(request()).headers.is_empty());

        let auth = authenticator(AuthConfig {
            token_header: Some("Bad Header".to_string()),
            ..AuthConfig::default()
        });
        auth.tokens().set_token(&json!({"access_token": "abc"}), false);
        assert!(auth.apply(request()).headers.is_empty());

        let auth = authenticator(AuthConfig::default());
        auth.tokens().set_token(&json!({"access_token": "line\nbreak"}), false);
        let mut parts = request();
        assert!(!auth.authorize(&mut parts));
        assert!(parts.headers.is_empty());
    }

    #[test]
    fn test_reqwest_request() {
        let auth = authenticator(AuthConfig::default());
        auth.tokens().set_token(&json!({"access_token": "abc"}), false);

        let client = reqwest::Client::new();
        let request = client
            .get("https://api.example.com/profile")
            .build()
            .unwrap();
        let request = auth.apply(request);
        assert_eq!(request.headers()[AUTHORIZATION], "Bearer abc");
    }

    #[test]
    fn test_interceptor_toggle_is_observed() {
        let auth = authenticator(AuthConfig::default());
        auth.tokens().set_token(&json!({"access_token": "abc"}), false);

        // Flipping the shared flag reaches the authenticator
        auth.config.update(|c| c.http_interceptor = false);
        assert!(auth.apply(request()).headers.is_empty());
    }
}
