//! Request authentication: api_key and basic.

use base64::Engine;
use http::header::HeaderMap;

use crate::routing::route::{AuthKind, AuthPolicy};

/// Check a request's credentials against the route's auth policy.
///
/// `api_key` accepts the `X-API-Key` header or the `api_key` query
/// parameter; the key must exist in the policy's key map. `basic` checks
/// `keys[user] == password`.
pub fn authorize(policy: &AuthPolicy, headers: &HeaderMap, query: Option<&str>) -> bool {
    match policy.kind {
        AuthKind::None => true,
        AuthKind::ApiKey => {
            let header_key = headers.get("x-api-key").and_then(|v| v.to_str().ok());
            let key = match header_key {
                Some(k) if !k.is_empty() => k,
                _ => match query_api_key(query) {
                    Some(k) if !k.is_empty() => k,
                    _ => return false,
                },
            };
            policy.keys.contains_key(key)
        }
        AuthKind::Basic => {
            let Some((user, password)) = basic_credentials(headers) else {
                return false;
            };
            policy.keys.get(&user).is_some_and(|p| *p == password)
        }
    }
}

fn query_api_key(query: Option<&str>) -> Option<&str> {
    query?.split('&').find_map(|pair| {
        let mut parts = pair.splitn(2, '=');
        (parts.next()? == "api_key").then(|| parts.next().unwrap_or(""))
    })
}

fn basic_credentials(headers: &HeaderMap) -> Option<(String, String)> {
    let value = headers.get("authorization")?.to_str().ok()?;
    let encoded = value.strip_prefix("Basic ")?;
    let decoded = base64::engine::general_purpose::STANDARD
        .decode(encoded)
        .ok()?;
    let decoded = String::from_utf8(decoded).ok()?;
    let (user, password) = decoded.split_once(':')?;
    Some((user.to_string(), password.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn api_key_policy(keys: &[&str]) -> AuthPolicy {
        AuthPolicy {
            kind: AuthKind::ApiKey,
            keys: keys
                .iter()
                .map(|k| (k.to_string(), "caller".to_string()))
                .collect(),
        }
    }

    fn basic_policy(user: &str, password: &str) -> AuthPolicy {
        let mut keys = HashMap::new();
        keys.insert(user.to_string(), password.to_string());
        AuthPolicy {
            kind: AuthKind::Basic,
            keys,
        }
    }

    #[test]
    fn test_none_always_passes() {
        let policy = AuthPolicy {
            kind: AuthKind::None,
            keys: HashMap::new(),
        };
        assert!(authorize(&policy, &HeaderMap::new(), None));
    }

    #[test]
    fn test_api_key_header() {
        let policy = api_key_policy(&["secret-1"]);

        let mut headers = HeaderMap::new();
        headers.insert("x-api-key", "secret-1".parse().unwrap());
        assert!(authorize(&policy, &headers, None));

        let mut wrong = HeaderMap::new();
        wrong.insert("x-api-key", "nope".parse().unwrap());
        assert!(!authorize(&policy, &wrong, None));

        assert!(!authorize(&policy, &HeaderMap::new(), None));
    }

    #[test]
    fn test_api_key_query_fallback() {
        let policy = api_key_policy(&["secret-1"]);
        let headers = HeaderMap::new();

        assert!(authorize(&policy, &headers, Some("api_key=secret-1")));
        assert!(authorize(&policy, &headers, Some("a=b&api_key=secret-1")));
        assert!(!authorize(&policy, &headers, Some("api_key=bad")));
        assert!(!authorize(&policy, &headers, Some("other=1")));
    }

    #[test]
    fn test_basic_auth() {
        let policy = basic_policy("admin", "hunter2");

        let encoded = base64::engine::general_purpose::STANDARD.encode("admin:hunter2");
        let mut headers = HeaderMap::new();
        headers.insert(
            "authorization",
            format!("Basic {encoded}").parse().unwrap(),
        );
        assert!(authorize(&policy, &headers, None));

        let bad = base64::engine::general_purpose::STANDARD.encode("admin:wrong");
        let mut headers = HeaderMap::new();
        headers.insert("authorization", format!("Basic {bad}").parse().unwrap());
        assert!(!authorize(&policy, &headers, None));

        assert!(!authorize(&policy, &HeaderMap::new(), None));
    }

    #[test]
    fn test_basic_rejects_malformed_header() {
        let policy = basic_policy("admin", "hunter2");

        let mut headers = HeaderMap::new();
        headers.insert("authorization", "Bearer token".parse().unwrap());
        assert!(!authorize(&policy, &headers, None));

        let mut headers = HeaderMap::new();
        headers.insert("authorization", "Basic !!!notbase64".parse().unwrap());
        assert!(!authorize(&policy, &headers, None));
    }
}
