//! TTL response cache, keyed by full request URL.
//!
//! # Design Decisions
//! - Readers observing an expired entry treat it as absent and remove it
//! - Writes overwrite; only 200 responses are stored (enforced by the
//!   pipeline)
//! - No size bound; operators bound the cache via TTL
//! - Hop-by-hop headers are stripped before storing so a replayed entry
//!   reframes cleanly

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use bytes::Bytes;
use http::header::HeaderMap;

/// Headers that describe the original connection or framing, not the
/// cached representation.
const HOP_BY_HOP: &[&str] = &[
    "connection",
    "keep-alive",
    "transfer-encoding",
    "te",
    "trailer",
    "proxy-authenticate",
    "proxy-authorization",
    "upgrade",
    "content-length",
];

/// One cached response.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub body: Bytes,
    pub headers: HeaderMap,
    pub expiration: Instant,
}

/// In-memory response cache.
#[derive(Debug, Default)]
pub struct ResponseCache {
    entries: Mutex<HashMap<String, CacheEntry>>,
}

impl ResponseCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a fresh entry. Expired entries are removed and reported as
    /// a miss.
    pub fn lookup(&self, key: &str) -> Option<CacheEntry> {
        let mut entries = self.entries.lock().expect("cache mutex poisoned");
        match entries.get(key) {
            Some(entry) if Instant::now() < entry.expiration => Some(entry.clone()),
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    /// Store a response body and headers under the URL key.
    pub fn store(&self, key: String, body: Bytes, headers: &HeaderMap, ttl: Duration) {
        let mut stored = HeaderMap::with_capacity(headers.len());
        for (name, value) in headers {
            if !HOP_BY_HOP.contains(&name.as_str()) {
                stored.append(name.clone(), value.clone());
            }
        }

        let entry = CacheEntry {
            body,
            headers: stored,
            expiration: Instant::now() + ttl,
        };
        self.entries
            .lock()
            .expect("cache mutex poisoned")
            .insert(key, entry);
    }

    pub fn len(&self) -> usize {
        self.entries.lock().expect("cache mutex poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
