//! Route matching logic.
//!
//! # Responsibilities
//! - Match the request method against the route's method set
//! - Match the path: glob first, then prefix with a `/` boundary
//! - Evaluate rule conditions under AND/OR semantics
//!
//! # Design Decisions
//! - All predicate parts are a conjunction; a route with rules only
//!   matches when method, path, and rules all pass
//! - `*` matches any run of characters (a trailing `*` matches any
//!   suffix), `?` matches exactly one; no regex engine
//! - Condition extraction treats an empty value as absent

use http::header::HeaderMap;
use http::Method;

use super::route::{Condition, ConditionKind, ConditionOp, ConfigRoute, MatchLogic, RuleSet};

/// The request fields the matcher looks at.
#[derive(Debug, Clone, Copy)]
pub struct MatchInput<'a> {
    pub method: &'a Method,
    pub path: &'a str,
    pub query: Option<&'a str>,
    pub headers: &'a HeaderMap,
    pub host: &'a str,
}

/// Check whether a request matches a route's predicate.
pub fn route_matches(route: &ConfigRoute, input: &MatchInput<'_>) -> bool {
    if !route.methods.is_empty()
        && !route
            .methods
            .iter()
            .any(|m| m.eq_ignore_ascii_case(input.method.as_str()))
    {
        return false;
    }

    if !path_matches(&route.path, input.path) {
        return false;
    }

    match &route.rules {
        Some(rules) if !rules.conditions.is_empty() => evaluate_rules(rules, input),
        _ => true,
    }
}

fn path_matches(pattern: &str, path: &str) -> bool {
    if wildcard_match(pattern, path) {
        return true;
    }

    // Prefix fallback: the pattern itself, or pattern + "/" as a boundary.
    if pattern.is_empty() || pattern == "/" {
        return false;
    }
    path == pattern
        || (path.len() > pattern.len()
            && path.starts_with(pattern)
            && path.as_bytes()[pattern.len()] == b'/')
}

/// Glob match over bytes with iterative backtracking on `*`.
pub(crate) fn wildcard_match(pattern: &str, text: &str) -> bool {
    let (p, t) = (pattern.as_bytes(), text.as_bytes());
    let (mut pi, mut ti) = (0usize, 0usize);
    let mut star: Option<usize> = None;
    let mut mark = 0usize;

    while ti < t.len() {
        if pi < p.len() && (p[pi] == b'?' || p[pi] == t[ti]) {
            pi += 1;
            ti += 1;
        } else if pi < p.len() && p[pi] == b'*' {
            star = Some(pi);
            mark = ti;
            pi += 1;
        } else if let Some(s) = star {
            pi = s + 1;
            mark += 1;
            ti = mark;
        } else {
            return false;
        }
    }

    while pi < p.len() && p[pi] == b'*' {
        pi += 1;
    }
    pi == p.len()
}

fn evaluate_rules(rules: &RuleSet, input: &MatchInput<'_>) -> bool {
    let is_or = rules.match_logic == MatchLogic::Or;

    for condition in &rules.conditions {
        let matched = condition_matches(condition, input);
        if is_or && matched {
            return true;
        }
        if !is_or && !matched {
            return false;
        }
    }

    // AND: all matched. OR: none matched.
    !is_or
}

fn condition_matches(condition: &Condition, input: &MatchInput<'_>) -> bool {
    let (value, exists) = match condition.kind {
        ConditionKind::Header => {
            let v = input
                .headers
                .get(condition.key.as_str())
                .and_then(|v| v.to_str().ok())
                .unwrap_or("");
            (v, !v.is_empty())
        }
        ConditionKind::Query => {
            let v = query_param(input.query, &condition.key).unwrap_or("");
            (v, !v.is_empty())
        }
        ConditionKind::Host => (input.host, true),
    };

    match condition.operator {
        ConditionOp::Equals => value == condition.value,
        ConditionOp::Contains => value.contains(&condition.value),
        ConditionOp::Exists => exists,
        ConditionOp::NotExists => !exists,
        ConditionOp::Regex => wildcard_match(&condition.value, value),
    }
}

fn query_param<'a>(query: Option<&'a str>, key: &str) -> Option<&'a str> {
    query?.split('&').find_map(|pair| {
        let mut parts = pair.splitn(2, '=');
        (parts.next()? == key).then(|| parts.next().unwrap_or(""))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::route::Algorithm;

    fn route(path: &str) -> ConfigRoute {
        ConfigRoute {
            path: path.to_string(),
            methods: Vec::new(),
            priority: 0,
            targets: Vec::new(),
            source: None,
            health_check: None,
            rules: None,
            algorithm: Algorithm::RoundRobin,
            weights: None,
            canary: None,
            affinity: None,
            resilience: None,
            circuit_breaker: None,
            rate_limit: None,
            auth: None,
            cache: None,
            headers: None,
        }
    }

    fn input<'a>(method: &'a Method, path: &'a str, headers: &'a HeaderMap) -> MatchInput<'a> {
        MatchInput {
            method,
            path,
            query: None,
            headers,
            host: "example.com",
        }
    }

    #[test]
    fn test_wildcard_match() {
        assert!(wildcard_match("/api/*", "/api/test"));
        assert!(wildcard_match("/api/*", "/api/a/b"));
        assert!(wildcard_match("/api/*", "/api/"));
        assert!(!wildcard_match("/api/*", "/web/test"));
        assert!(wildcard_match("/exact", "/exact"));
        assert!(!wildcard_match("/exact", "/exact/sub"));
        assert!(wildcard_match("/a?c", "/abc"));
        assert!(!wildcard_match("/a?c", "/ac"));
        assert!(wildcard_match("*", "anything"));
        assert!(wildcard_match("*", ""));
    }

    #[test]
    fn test_prefix_fallback() {
        assert!(path_matches("/api", "/api"));
        assert!(path_matches("/api", "/api/users"));
        // No boundary: /apifoo must not match /api
        assert!(!path_matches("/api", "/apifoo"));
        // "/" only matches itself, never as a prefix
        assert!(path_matches("/", "/"));
        assert!(!path_matches("/", "/anything"));
    }

    #[test]
    fn test_method_filter() {
        let headers = HeaderMap::new();
        let mut r = route("/method");
        r.methods = vec!["POST".to_string()];

        assert!(route_matches(&r, &input(&Method::POST, "/method", &headers)));
        assert!(!route_matches(&r, &input(&Method::GET, "/method", &headers)));
    }

    #[test]
    fn test_header_condition() {
        let mut r = route("/header");
        r.rules = Some(RuleSet {
            conditions: vec![Condition {
                kind: ConditionKind::Header,
                key: "X-Premium".to_string(),
                operator: ConditionOp::Equals,
                value: "true".to_string(),
            }],
            match_logic: MatchLogic::And,
        });

        let mut headers = HeaderMap::new();
        headers.insert("x-premium", "true".parse().unwrap());
        assert!(route_matches(&r, &input(&Method::GET, "/header", &headers)));

        let empty = HeaderMap::new();
        assert!(!route_matches(&r, &input(&Method::GET, "/header", &empty)));
    }

    #[test]
    fn test_query_condition() {
        let mut r = route("/query");
        r.rules = Some(RuleSet {
            conditions: vec![Condition {
                kind: ConditionKind::Query,
                key: "v".to_string(),
                operator: ConditionOp::Contains,
                value: "2".to_string(),
            }],
            match_logic: MatchLogic::And,
        });

        let headers = HeaderMap::new();
        let mut with_query = input(&Method::GET, "/query", &headers);
        with_query.query = Some("v=2024");
        assert!(route_matches(&r, &with_query));

        let mut wrong = input(&Method::GET, "/query", &headers);
        wrong.query = Some("v=1999");
        assert!(!route_matches(&r, &wrong));
    }

    #[test]
    fn test_or_logic() {
        let mut r = route("/or");
        r.rules = Some(RuleSet {
            conditions: vec![
                Condition {
                    kind: ConditionKind::Header,
                    key: "X-A".to_string(),
                    operator: ConditionOp::Exists,
                    value: String::new(),
                },
                Condition {
                    kind: ConditionKind::Header,
                    key: "X-B".to_string(),
                    operator: ConditionOp::Exists,
                    value: String::new(),
                },
            ],
            match_logic: MatchLogic::Or,
        });

        let mut headers = HeaderMap::new();
        headers.insert("x-b", "1".parse().unwrap());
        assert!(route_matches(&r, &input(&Method::GET, "/or", &headers)));

        let empty = HeaderMap::new();
        assert!(!route_matches(&r, &input(&Method::GET, "/or", &empty)));
    }

    #[test]
    fn test_not_exists_and_host() {
        let mut r = route("/rules");
        r.rules = Some(RuleSet {
            conditions: vec![
                Condition {
                    kind: ConditionKind::Header,
                    key: "X-Debug".to_string(),
                    operator: ConditionOp::NotExists,
                    value: String::new(),
                },
                Condition {
                    kind: ConditionKind::Host,
                    key: String::new(),
                    operator: ConditionOp::Regex,
                    value: "*.com".to_string(),
                },
            ],
            match_logic: MatchLogic::And,
        });

        let empty = HeaderMap::new();
        assert!(route_matches(&r, &input(&Method::GET, "/rules", &empty)));

        let mut headers = HeaderMap::new();
        headers.insert("x-debug", "1".parse().unwrap());
        assert!(!route_matches(&r, &input(&Method::GET, "/rules", &headers)));
    }

    #[test]
    fn test_rules_are_conjunctive_with_path() {
        let mut r = route("/scoped");
        r.rules = Some(RuleSet {
            conditions: vec![Condition {
                kind: ConditionKind::Header,
                key: "X-Yes".to_string(),
                operator: ConditionOp::Exists,
                value: String::new(),
            }],
            match_logic: MatchLogic::And,
        });

        let mut headers = HeaderMap::new();
        headers.insert("x-yes", "1".parse().unwrap());
        // Matching header alone is not enough when the path differs.
        assert!(!route_matches(&r, &input(&Method::GET, "/other", &headers)));
    }
}
