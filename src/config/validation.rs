//! Configuration validation logic.

use http::Uri;

use crate::config::schema::ProxyConfig;
use crate::routing::route::ConfigRoute;

/// Error type for configuration validation failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError(pub String);

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Validation error: {}", self.0)
    }
}

/// Validate a ProxyConfig for semantic correctness. All problems are
/// collected so the operator sees the full list at once.
pub fn validate_config(config: &ProxyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    check_bind_address(&config.listener.bind_address, "listener", &mut errors);
    if config.admin.enabled {
        check_bind_address(&config.admin.bind_address, "admin", &mut errors);
    }
    if config.observability.metrics_enabled {
        check_bind_address(
            &config.observability.metrics_address,
            "observability.metrics",
            &mut errors,
        );
    }

    for target in &config.default_targets {
        check_target(target, "default_targets", &mut errors);
    }

    for route in &config.routes {
        validate_route(route, &mut errors);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn validate_route(route: &ConfigRoute, errors: &mut Vec<ValidationError>) {
    let context = format!("route '{}'", route.path);

    for target in &route.targets {
        check_target(target, &context, errors);
    }

    if let Some(canary) = &route.canary {
        if canary.weight > 100 {
            errors.push(ValidationError(format!(
                "{}: canary weight {} exceeds 100",
                context, canary.weight
            )));
        }
        for target in &canary.targets {
            check_target(target, &context, errors);
        }
    }

    if let Some(rate_limit) = &route.rate_limit {
        if rate_limit.requests_per_second <= 0.0 {
            errors.push(ValidationError(format!(
                "{}: rate_limit.requests_per_second must be > 0",
                context
            )));
        }
        if rate_limit.burst == 0 {
            errors.push(ValidationError(format!(
                "{}: rate_limit.burst must be > 0",
                context
            )));
        }
    }

    if let Some(breaker) = &route.circuit_breaker {
        if breaker.error_threshold == 0 {
            errors.push(ValidationError(format!(
                "{}: circuit_breaker.error_threshold must be > 0",
                context
            )));
        }
        if breaker.timeout_ms == 0 {
            errors.push(ValidationError(format!(
                "{}: circuit_breaker.timeout_ms must be > 0",
                context
            )));
        }
    }

    if let Some(cache) = &route.cache {
        if cache.enabled && cache.ttl == 0 {
            errors.push(ValidationError(format!(
                "{}: cache.ttl_seconds must be > 0 when enabled",
                context
            )));
        }
    }
}

fn check_bind_address(address: &str, context: &str, errors: &mut Vec<ValidationError>) {
    if address.parse::<std::net::SocketAddr>().is_err() {
        errors.push(ValidationError(format!(
            "{}: '{}' is not a valid socket address",
            context, address
        )));
    }
}

fn check_target(target: &str, context: &str, errors: &mut Vec<ValidationError>) {
    let valid = target
        .parse::<Uri>()
        .map(|uri| uri.scheme().is_some() && uri.authority().is_some())
        .unwrap_or(false);
    if !valid {
        errors.push(ValidationError(format!(
            "{}: '{}' is not a valid backend URL",
            context, target
        )));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::route::{Algorithm, CanaryPolicy, RateLimitPolicy};

    fn route(path: &str, targets: &[&str]) -> ConfigRoute {
        ConfigRoute {
            path: path.to_string(),
            methods: Vec::new(),
            priority: 0,
            targets: targets.iter().map(|t| t.to_string()).collect(),
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

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&ProxyConfig::default()).is_ok());
    }

    #[test]
    fn test_bad_listener_address() {
        let config = ProxyConfig {
            listener: crate::config::ListenerConfig {
                bind_address: "nope".to_string(),
            },
            ..Default::default()
        };
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn test_bad_route_target() {
        let config = ProxyConfig {
            routes: vec![route("/api", &["127.0.0.1:9001"])],
            ..Default::default()
        };
        let errors = validate_config(&config).unwrap_err();
        assert!(errors[0].0.contains("not a valid backend URL"));
    }

    #[test]
    fn test_canary_weight_bound() {
        let mut r = route("/api", &["http://127.0.0.1:9001"]);
        r.canary = Some(CanaryPolicy {
            weight: 150,
            targets: vec!["http://127.0.0.1:9002".to_string()],
        });
        let config = ProxyConfig {
            routes: vec![r],
            ..Default::default()
        };
        let errors = validate_config(&config).unwrap_err();
        assert!(errors[0].0.contains("exceeds 100"));
    }

    #[test]
    fn test_rate_limit_bounds() {
        let mut r = route("/api", &["http://127.0.0.1:9001"]);
        r.rate_limit = Some(RateLimitPolicy {
            requests_per_second: 0.0,
            burst: 0,
        });
        let config = ProxyConfig {
            routes: vec![r],
            ..Default::default()
        };
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 2);
    }

    #[test]
    fn test_multiple_errors_collected() {
        let config = ProxyConfig {
            default_targets: vec!["bad one".to_string()],
            routes: vec![route("/a", &["also bad"])],
            ..Default::default()
        };
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 2);
    }
}
