//! Route definitions: the wire-level config schema and the compiled form.
//!
//! `ConfigRoute` is the JSON/TOML shape accepted by the admin API and the
//! startup config. `Route` is the installed form with its backend pools
//! built and validated. Routes are immutable once installed; the table
//! replaces them wholesale on reconfigure.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::http::HttpClient;
use crate::load_balancer::backend::InvalidTarget;
use crate::load_balancer::pool::Pool;

/// A route configuration as exchanged with the control plane.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ConfigRoute {
    /// Path pattern. Glob match first (`*` matches any run of characters,
    /// `?` exactly one), then a prefix match with a `/` boundary.
    pub path: String,

    /// HTTP methods to accept. Empty means all methods.
    #[serde(default)]
    pub methods: Vec<String>,

    /// Evaluation priority; lower numbers are checked first.
    #[serde(default)]
    pub priority: i32,

    /// Backend URLs for the primary pool.
    #[serde(default)]
    pub targets: Vec<String>,

    /// Provenance metadata, passed through untouched.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<RouteSource>,

    /// Per-route liveness probing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub health_check: Option<HealthCheckPolicy>,

    /// Additional match conditions beyond method and path.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rules: Option<RuleSet>,

    /// Load-balancing algorithm for the primary pool.
    #[serde(default)]
    pub algorithm: Algorithm,

    /// Per-target weights, keyed by target URL. Only read by the
    /// `weighted` algorithm; echoed back with current values.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weights: Option<HashMap<String, i32>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub canary: Option<CanaryPolicy>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub affinity: Option<AffinityPolicy>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resilience: Option<ResiliencePolicy>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub circuit_breaker: Option<BreakerPolicy>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rate_limit: Option<RateLimitPolicy>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth: Option<AuthPolicy>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache: Option<CachePolicy>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub headers: Option<HeaderRewritePolicy>,
}

/// Load-balancing algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Algorithm {
    #[default]
    RoundRobin,
    Random,
    Weighted,
}

/// Canary traffic split: a fraction of requests in [0, 100) rolls onto a
/// secondary pool.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CanaryPolicy {
    /// Percentage of traffic routed to the canary pool (0-100).
    #[serde(default)]
    pub weight: u32,

    /// Backend URLs for the canary pool.
    #[serde(default)]
    pub targets: Vec<String>,
}

/// Session affinity configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AffinityPolicy {
    #[serde(rename = "type")]
    pub kind: AffinityKind,

    /// Cookie to read when `kind` is `cookie`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cookie_name: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AffinityKind {
    #[default]
    None,
    ClientIp,
    Cookie,
}

/// Forwarding deadline and retry budget.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ResiliencePolicy {
    /// Per-attempt deadline in milliseconds. Zero means the 30 s default.
    #[serde(default)]
    pub timeout_ms: u64,

    /// Additional attempts after the first when the upstream answers >= 500
    /// or the transport fails.
    #[serde(default)]
    pub max_retries: u32,
}

/// Circuit breaker thresholds.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BreakerPolicy {
    /// Consecutive failures that trip the breaker open.
    pub error_threshold: u32,

    /// Time to stay open before allowing a probe, in milliseconds.
    pub timeout_ms: u64,
}

/// Token-bucket rate limit.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RateLimitPolicy {
    pub requests_per_second: f64,
    pub burst: u32,
}

/// Request authentication.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AuthPolicy {
    #[serde(rename = "type")]
    pub kind: AuthKind,

    /// For `api_key`: the set of accepted keys (values are labels).
    /// For `basic`: username → password.
    #[serde(default)]
    pub keys: HashMap<String, String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthKind {
    #[default]
    None,
    ApiKey,
    Basic,
}

/// Response caching.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CachePolicy {
    pub enabled: bool,

    #[serde(rename = "ttl_seconds", default)]
    pub ttl: u64,
}

/// Header rewrites applied on the way in and out.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct HeaderRewritePolicy {
    #[serde(default)]
    pub add_request: HashMap<String, String>,
    #[serde(default)]
    pub remove_request: Vec<String>,
    #[serde(default)]
    pub add_response: HashMap<String, String>,
    #[serde(default)]
    pub remove_response: Vec<String>,
}

/// Additional match conditions, combined under AND or OR.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RuleSet {
    pub conditions: Vec<Condition>,

    #[serde(default)]
    pub match_logic: MatchLogic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MatchLogic {
    #[default]
    #[serde(alias = "and")]
    And,
    #[serde(alias = "or")]
    Or,
}

/// A single match condition.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Condition {
    #[serde(rename = "type")]
    pub kind: ConditionKind,

    #[serde(default)]
    pub key: String,

    pub operator: ConditionOp,

    #[serde(default)]
    pub value: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditionKind {
    Header,
    Query,
    Host,
}

/// Condition operator. `regex` deliberately uses the same glob syntax as
/// path patterns; the name is kept for wire compatibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditionOp {
    Equals,
    Contains,
    Exists,
    #[serde(alias = "not-exists")]
    NotExists,
    Regex,
}

/// Per-route health check settings. `path` may be a bare path substituted
/// into each backend URL, or an absolute URL probed as-is.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HealthCheckPolicy {
    #[serde(default)]
    pub path: String,

    /// Probe interval in seconds; below 1 falls back to 10.
    #[serde(default)]
    pub interval: u64,

    /// Probe timeout in seconds; zero falls back to 2.
    #[serde(default)]
    pub timeout: u64,
}

/// Identifies where a route came from.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RouteSource {
    #[serde(rename = "type")]
    pub kind: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deployment_id: Option<String>,
}

/// An installed route: its config plus built backend pools.
#[derive(Debug)]
pub struct Route {
    pub config: ConfigRoute,
    pub pool: Arc<Pool>,
    pub canary_pool: Option<Arc<Pool>>,
}

impl Route {
    /// Build a route from its config, validating every backend URL.
    pub fn build(config: ConfigRoute, client: &HttpClient) -> Result<Self, InvalidTarget> {
        let pool = Arc::new(Pool::from_targets(
            &config.targets,
            config.weights.as_ref(),
            client.clone(),
        )?);

        let canary_pool = match &config.canary {
            Some(canary) if !canary.targets.is_empty() => Some(Arc::new(Pool::from_targets(
                &canary.targets,
                None,
                client.clone(),
            )?)),
            _ => None,
        };

        Ok(Self {
            config,
            pool,
            canary_pool,
        })
    }

    /// The route path pattern, also the key for the per-route policy maps.
    pub fn path(&self) -> &str {
        &self.config.path
    }

    /// Echo this route as a config, refreshing targets and weights from the
    /// installed pool.
    pub fn to_config(&self) -> ConfigRoute {
        let mut config = self.config.clone();
        config.targets = self.pool.target_urls();
        config.weights = Some(self.pool.weight_map());
        config
    }
}
