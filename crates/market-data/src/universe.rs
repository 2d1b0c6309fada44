//! Process-lifetime cache for the listed-stock universe.
//!
//! The universe changes rarely and the provider's list endpoint is slow, so
//! one copy is held in memory for the life of the process. The clock is
//! injected so expiry is deterministic under test.

use chrono::{DateTime, Duration, Utc};
use dashboard_core::StockListing;
use dashmap::DashMap;
use std::sync::Arc;

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

struct CacheEntry {
    listings: Vec<StockListing>,
    cached_at: DateTime<Utc>,
}

pub struct UniverseCache {
    entries: DashMap<String, CacheEntry>,
    ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl UniverseCache {
    pub fn new(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
            clock,
        }
    }

    /// Fresh listings for `key`, or None when absent or past the TTL.
    pub fn get(&self, key: &str) -> Option<Vec<StockListing>> {
        let entry = self.entries.get(key)?;
        if self.clock.now() - entry.cached_at < self.ttl {
            Some(entry.listings.clone())
        } else {
            None
        }
    }

    pub fn put(&self, key: &str, listings: Vec<StockListing>) {
        self.entries.insert(
            key.to_string(),
            CacheEntry {
                listings,
                cached_at: self.clock.now(),
            },
        );
    }
}
