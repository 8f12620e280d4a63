//! Token extraction from login response bodies.
//!
//! Servers hand tokens back in a few shapes. Each shape is handled by one
//! strategy; strategies are tried in order and the first one that produces
//! something wins:
//!
//! 1. `{"access_token": {"data": {...}, ...}}`: the wrapped response is
//!    unwrapped and extraction starts over on it
//! 2. `{"access_token": "<token>"}`
//! 3. `{"data": {...}}`: the token sits under the configured field name,
//!    optionally below a dotted root path inside `data`

use serde_json::Value;

use crate::config::AuthConfig;

/// Where the token lives inside a response `data` object
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenPath {
    pub root: Option<String>,
    pub name: String,
}

impl TokenPath {
    pub fn from_config(config: &AuthConfig) -> Self {
        Self {
            root: config.token_root.clone().filter(|root| !root.is_empty()),
            name: config.token_name.clone(),
        }
    }
}

enum Step<'a> {
    Found(String),
    Restart(&'a Value),
}

type Strategy = for<'a> fn(&'a Value, &TokenPath) -> Option<Step<'a>>;

const STRATEGIES: [Strategy; 3] = [unwrap_nested_response, access_token_string, token_at_path];

/// Token carried by `response`, if any strategy finds one.
pub fn extract_token(response: &Value, path: &TokenPath) -> Option<String> {
    let mut current = response;
    // Every restart descends into `current`, so this ends
    'restart: loop {
        for strategy in STRATEGIES {
            match strategy(current, path) {
                Some(Step::Found(token)) => return Some(token),
                Some(Step::Restart(inner)) => {
                    current = inner;
                    continue 'restart;
                }
                None => {}
            }
        }
        return None;
    }
}

fn unwrap_nested_response<'a>(response: &'a Value, _path: &TokenPath) -> Option<Step<'a>> {
    let access_token = response.get("access_token")?;
    access_token
        .get("data")
        .filter(|data| data.is_object())
        .map(|_| Step::Restart(access_token))
}

fn access_token_string<'a>(response: &'a Value, _path: &TokenPath) -> Option<Step<'a>> {
    response
        .get("access_token")
        .and_then(Value::as_str)
        .filter(|token| !token.is_empty())
        .map(|token| Step::Found(token.to_string()))
}

fn token_at_path<'a>(response: &'a Value, path: &TokenPath) -> Option<Step<'a>> {
    let data = response.get("data")?;
    let container = path
        .root
        .as_deref()
        .and_then(|root| resolve_dotted(data, root))
        .unwrap_or(data);
    token_value(container.get(&path.name)?).map(Step::Found)
}

/// Sequential property lookup; `None` when any step is missing or null
fn resolve_dotted<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.')
        .try_fold(value, |current, segment| current.get(segment))
        .filter(|resolved| !resolved.is_null())
}

fn token_value(value: &Value) -> Option<String> {
    match value {
        Value::String(token) if !token.is_empty() => Some(token.clone()),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn path(root: Option<&str>, name: &str) -> TokenPath {
        TokenPath {
            root: root.map(str::to_string),
            name: name.to_string(),
        }
    }

    #[test]
    fn test_access_token_string() {
        let response = json!({"access_token": "abc", "data": {"access_token": "other"}});
        assert_eq!(
            extract_token(&response, &path(None, "access_token")).as_deref(),
            Some("abc")
        );
    }

    #[test]
    fn test_empty_access_token_falls_through_to_data() {
        let response = json!({"access_token": "", "data": {"token": "from-data"}});
        assert_eq!(
            extract_token(&response, &path(None, "token")).as_deref(),
            Some("from-data")
        );
    }

    #[test]
    fn test_wrapped_response_is_unwrapped() {
        let response = json!({
            "access_token": {"data": {"token": "inner"}},
            "data": {"token": "outer"}
        });
        assert_eq!(
            extract_token(&response, &path(None, "token")).as_deref(),
            Some("inner")
        );

        // Restarting also honours a string access_token on the inner object
        let response = json!({"access_token": {"access_token": "nested", "data": {}}});
        assert_eq!(
            extract_token(&response, &path(None, "token")).as_deref(),
            Some("nested")
        );
    }

    #[test]
    fn test_object_access_token_without_data_is_ignored() {
        let response = json!({"access_token": {"token": "x"}, "data": {"token": "outer"}});
        assert_eq!(
            extract_token(&response, &path(None, "token")).as_deref(),
            Some("outer")
        );
    }

    #[test]
    fn test_token_root_path() {
        let response = json!({"data": {"session": {"auth": {"jwt": "deep"}}, "jwt": "shallow"}});
        assert_eq!(
            extract_token(&response, &path(Some("session.auth"), "jwt")).as_deref(),
            Some("deep")
        );
        // Unresolvable root falls back to `data` itself
        assert_eq!(
            extract_token(&response, &path(Some("session.missing"), "jwt")).as_deref(),
            Some("shallow")
        );
        assert_eq!(
            extract_token(&response, &path(Some("nope.never"), "jwt")).as_deref(),
            Some("shallow")
        );
    }

    #[test]
    fn test_nothing_resolvable() {
        let by_name = path(None, "access_token");
        assert_eq!(extract_token(&json!({}), &by_name), None);
        assert_eq!(extract_token(&json!(null), &by_name), None);
        assert_eq!(extract_token(&json!("abc"), &by_name), None);
        assert_eq!(extract_token(&json!({"data": "abc"}), &by_name), None);
        assert_eq!(extract_token(&json!({"data": {"access_token": null}}), &by_name), None);
        assert_eq!(extract_token(&json!({"data": {"access_token": {}}}), &by_name), None);
    }

    #[test]
    fn test_numeric_token_field() {
        let response = json!({"data": {"token": 12345}});
        assert_eq!(
            extract_token(&response, &path(None, "token")).as_deref(),
            Some("12345")
        );
    }
}
