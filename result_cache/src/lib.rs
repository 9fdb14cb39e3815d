use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use chrono::{DateTime, Duration, Utc};
use holdings_core::EnrichedHolding;
use tracing::debug;

/// Time source seam; tests advance a manual clock instead of sleeping
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Production clock backed by the system time
#[derive(Debug, Clone, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// What a cached payload covers: one chain's holdings or the full wallet view.
///
/// Keeping the discriminator explicit stops a single-chain entry from ever
/// answering a whole-wallet lookup, and vice versa.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheScope {
    AllChains,
    Chain(u64),
}

/// Cache key: normalized wallet address plus scope
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    wallet_address: String,
    scope: CacheScope,
}

impl CacheKey {
    pub fn new(wallet_address: &str, scope: CacheScope) -> Self {
        Self {
            wallet_address: wallet_address.to_lowercase(),
            scope,
        }
    }

    pub fn wallet_address(&self) -> &str {
        &self.wallet_address
    }

    pub fn scope(&self) -> CacheScope {
        self.scope
    }
}

#[derive(Debug)]
struct CacheEntry {
    payload: Arc<Vec<EnrichedHolding>>,
    created_at: DateTime<Utc>,
}

/// TTL cache of enriched holdings payloads.
///
/// Payloads are stored behind an `Arc`, so a `put` is one pointer swap and a
/// concurrent reader sees either the old or the new payload, never a partial
/// one. Expired entries are dropped lazily when a lookup touches them.
pub struct HoldingsCache {
    ttl: Duration,
    clock: Arc<dyn Clock>,
    entries: RwLock<HashMap<CacheKey, CacheEntry>>,
}

impl HoldingsCache {
    pub fn new(ttl_seconds: u64, clock: Arc<dyn Clock>) -> Self {
        Self {
            ttl: Duration::seconds(ttl_seconds as i64),
            clock,
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub fn with_system_clock(ttl_seconds: u64) -> Self {
        Self::new(ttl_seconds, Arc::new(SystemClock))
    }

    fn is_fresh(&self, entry: &CacheEntry, now: DateTime<Utc>) -> bool {
        now - entry.created_at < self.ttl
    }

    /// Fresh payload for `key`, or `None` on miss/expiry
    pub fn get(&self, key: &CacheKey) -> Option<Arc<Vec<EnrichedHolding>>> {
        let now = self.clock.now();

        {
            let entries = self
                .entries
                .read()
                .unwrap_or_else(PoisonError::into_inner);
            match entries.get(key) {
                Some(entry) if self.is_fresh(entry, now) => {
                    debug!(
                        "Cache hit for {} ({:?}): {} holdings",
                        key.wallet_address,
                        key.scope,
                        entry.payload.len()
                    );
                    return Some(Arc::clone(&entry.payload));
                }
                Some(_) => {}
                None => {
                    debug!("Cache miss for {} ({:?})", key.wallet_address, key.scope);
                    return None;
                }
            }
        }

        // Entry was stale; purge it unless a fresher write raced this lookup
        let mut entries = self
            .entries
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        match entries.get(key) {
            Some(entry) if self.is_fresh(entry, now) => Some(Arc::clone(&entry.payload)),
            Some(_) => {
                debug!(
                    "Cache entry expired for {} ({:?})",
                    key.wallet_address, key.scope
                );
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    /// Store a payload, replacing whatever the key held before
    pub fn put(&self, key: CacheKey, payload: Arc<Vec<EnrichedHolding>>) {
        let entry = CacheEntry {
            payload,
            created_at: self.clock.now(),
        };

        let mut entries = self
            .entries
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        debug!(
            "Cached {} holdings for {} ({:?})",
            entry.payload.len(),
            key.wallet_address,
            key.scope
        );
        entries.insert(key, entry);
    }

    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
