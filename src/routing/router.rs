//! Route table storage and atomic replacement.
//!
//! # Responsibilities
//! - Hold the active routes sorted by ascending priority
//! - Replace the whole table under an exclusive lock
//! - Hand readers a snapshot they can use without holding any lock
//!
//! # Design Decisions
//! - Readers clone an `Arc` under a read lock and drop the guard before
//!   any I/O; in-flight requests keep old routes (and their pools) alive
//!   until they complete
//! - The default pool is fixed at startup and is not part of replacement

use std::sync::{Arc, RwLock};

use super::matcher::{route_matches, MatchInput};
use super::route::{ConfigRoute, Route};
use crate::load_balancer::pool::Pool;

/// The active routing table plus the fallback pool.
#[derive(Debug)]
pub struct RouteTable {
    routes: RwLock<Arc<Vec<Arc<Route>>>>,
    default_pool: Option<Arc<Pool>>,
}

impl RouteTable {
    pub fn new(default_pool: Option<Arc<Pool>>) -> Self {
        Self {
            routes: RwLock::new(Arc::new(Vec::new())),
            default_pool,
        }
    }

    /// Snapshot the active routes. The returned `Arc` stays valid across
    /// table replacements.
    pub fn snapshot(&self) -> Arc<Vec<Arc<Route>>> {
        self.routes.read().expect("route table lock poisoned").clone()
    }

    pub fn default_pool(&self) -> Option<&Arc<Pool>> {
        self.default_pool.as_ref()
    }

    /// Install a new route set, sorted by ascending priority. Ties keep
    /// their submission order.
    pub fn replace(&self, mut routes: Vec<Arc<Route>>) {
        routes.sort_by_key(|r| r.config.priority);
        let mut active = self.routes.write().expect("route table lock poisoned");
        *active = Arc::new(routes);
    }

    /// Find the first route whose predicate matches, in priority order.
    pub fn match_request(&self, input: &MatchInput<'_>) -> Option<Arc<Route>> {
        self.snapshot()
            .iter()
            .find(|r| route_matches(&r.config, input))
            .cloned()
    }

    /// Echo the active table as configs, with targets and weights refreshed
    /// from the installed pools.
    pub fn current_config(&self) -> Vec<ConfigRoute> {
        self.snapshot().iter().map(|r| r.to_config()).collect()
    }
}
