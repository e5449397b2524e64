//! Backend pool and selection algorithms.
//!
//! # Responsibilities
//! - Hold an ordered set of backends for one route (or the default)
//! - Select a backend per request: affinity first, then the configured
//!   algorithm over the live subset
//! - Degrade to the full list when nothing is live

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use rand::Rng;

use super::backend::{Backend, InvalidTarget};
use crate::http::HttpClient;
use crate::routing::route::{AffinityKind, AffinityPolicy, Algorithm};

const DEFAULT_WEIGHT: i32 = 100;

/// Request-derived keys the selector may need.
#[derive(Debug, Clone, Copy, Default)]
pub struct SelectionKeys<'a> {
    /// Host portion of the client's remote address.
    pub client_ip: Option<&'a str>,
    /// Raw `Cookie` request header.
    pub cookie_header: Option<&'a str>,
}

/// An ordered set of backends with a round-robin cursor.
#[derive(Debug)]
pub struct Pool {
    backends: Vec<Arc<Backend>>,
    cursor: AtomicU64,
}

impl Pool {
    /// Build a pool from target URLs, failing on the first invalid one.
    /// Weights default to 100 unless overridden per target URL.
    pub fn from_targets(
        targets: &[String],
        weights: Option<&HashMap<String, i32>>,
        client: HttpClient,
    ) -> Result<Self, InvalidTarget> {
        let mut backends = Vec::with_capacity(targets.len());
        for target in targets {
            let weight = weights
                .and_then(|w| w.get(target).copied())
                .unwrap_or(DEFAULT_WEIGHT);
            backends.push(Arc::new(Backend::new(target, weight, client.clone())?));
        }

        Ok(Self {
            backends,
            cursor: AtomicU64::new(0),
        })
    }

    pub fn backends(&self) -> &[Arc<Backend>] {
        &self.backends
    }

    pub fn is_empty(&self) -> bool {
        self.backends.is_empty()
    }

    pub fn target_urls(&self) -> Vec<String> {
        self.backends.iter().map(|b| b.url().to_string()).collect()
    }

    pub fn weight_map(&self) -> HashMap<String, i32> {
        self.backends
            .iter()
            .map(|b| (b.url().to_string(), b.weight()))
            .collect()
    }

    /// Select a backend. Affinity takes precedence over the algorithm when
    /// a key is present. Returns `None` only for an empty pool.
    pub fn select(
        &self,
        algorithm: Algorithm,
        affinity: Option<&AffinityPolicy>,
        keys: SelectionKeys<'_>,
    ) -> Option<Arc<Backend>> {
        if self.backends.is_empty() {
            return None;
        }

        let mut live: Vec<&Arc<Backend>> =
            self.backends.iter().filter(|b| b.is_alive()).collect();
        if live.is_empty() {
            // Degraded service beats refusal.
            live = self.backends.iter().collect();
        }

        if let Some(key) = affinity.and_then(|a| affinity_key(a, &keys)) {
            let idx = (stable_hash(&key) % live.len() as u64) as usize;
            return Some(live[idx].clone());
        }

        let chosen = match algorithm {
            Algorithm::RoundRobin => {
                let next = self.cursor.fetch_add(1, Ordering::Relaxed);
                live[(next % live.len() as u64) as usize]
            }
            Algorithm::Random => live[rand::thread_rng().gen_range(0..live.len())],
            Algorithm::Weighted => {
                let effective = |b: &Backend| {
                    if b.weight() <= 0 {
                        DEFAULT_WEIGHT as i64
                    } else {
                        b.weight() as i64
                    }
                };
                let total: i64 = live.iter().map(|b| effective(b)).sum();
                let mut roll = rand::thread_rng().gen_range(0..total);
                let mut chosen = live[0];
                for &backend in &live {
                    roll -= effective(backend);
                    if roll < 0 {
                        chosen = backend;
                        break;
                    }
                }
                chosen
            }
        };

        Some(chosen.clone())
    }
}

fn affinity_key(affinity: &AffinityPolicy, keys: &SelectionKeys<'_>) -> Option<String> {
    match affinity.kind {
        AffinityKind::None => None,
        AffinityKind::ClientIp => keys.client_ip.map(|ip| ip.to_string()),
        AffinityKind::Cookie => {
            let name = affinity.cookie_name.as_deref()?;
            cookie_value(keys.cookie_header?, name)
        }
    }
}

fn cookie_value(header: &str, name: &str) -> Option<String> {
    header.split(';').map(str::trim).find_map(|pair| {
        let mut parts = pair.splitn(2, '=');
        (parts.next()? == name).then(|| parts.next().unwrap_or("").to_string())
    })
}

/// Stable string hash (31-multiplier). Reproducible across processes so a
/// given (key, live-set-size) always maps to the same backend.
fn stable_hash(key: &str) -> u64 {
    key.bytes()
        .fold(0u64, |hash, byte| hash.wrapping_mul(31).wrapping_add(byte as u64))
}
