//! Cross-request cache for built menu trees.
//!
//! The processor stores serialized trees as strings under keys derived
//! from menuconf, language and site. Any key/value store with per-entry
//! TTL can back it; [`MokaCacheStore`] is the in-process default.

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use moka::Expiry;
use moka::sync::Cache;
use tracing::debug;

/// Default maximum number of cached trees.
pub const DEFAULT_CAPACITY: u64 = 10_000;

/// Key/value store with TTL used for built trees.
///
/// Writes may race; the last write wins. Reads never block on writes.
pub trait CacheStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;

    fn set(&self, key: &str, value: String, ttl: Duration);

    fn delete_many(&self, keys: &[String]);
}

#[derive(Clone)]
struct Entry {
    value: Arc<str>,
    ttl: Duration,
}

/// Per-entry TTL taken from the value.
struct EntryExpiry;

impl Expiry<String, Entry> for EntryExpiry {
    fn expire_after_create(
        &self,
        _key: &String,
        entry: &Entry,
        _created_at: Instant,
    ) -> Option<Duration> {
        Some(entry.ttl)
    }

    fn expire_after_update(
        &self,
        _key: &String,
        entry: &Entry,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Some(entry.ttl)
    }
}

/// In-process cache backed by Moka.
#[derive(Clone)]
pub struct MokaCacheStore {
    local: Cache<String, Entry>,
}

impl MokaCacheStore {
    /// Create a store holding at most `capacity` trees.
    pub fn new(capacity: u64) -> Self {
        let local = Cache::builder()
            .max_capacity(capacity)
            .expire_after(EntryExpiry)
            .build();
        Self { local }
    }

    /// Number of live entries (approximate until pending tasks run).
    pub fn entry_count(&self) -> u64 {
        self.local.run_pending_tasks();
        self.local.entry_count()
    }
}

impl Default for MokaCacheStore {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl CacheStore for MokaCacheStore {
    fn get(&self, key: &str) -> Option<String> {
        let hit = self.local.get(key).map(|entry| entry.value.to_string());
        debug!(key = %key, hit = hit.is_some(), "menu cache lookup");
        hit
    }

    fn set(&self, key: &str, value: String, ttl: Duration) {
        self.local.insert(
            key.to_string(),
            Entry {
                value: value.into(),
                ttl,
            },
        );
        debug!(key = %key, ttl_secs = ttl.as_secs(), "menu cache set");
    }

    fn delete_many(&self, keys: &[String]) {
        for key in keys {
            self.local.invalidate(key);
        }
        debug!(keys = keys.len(), "menu cache keys deleted");
    }
}

impl fmt::Debug for MokaCacheStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MokaCacheStore")
            .field("entries", &self.local.entry_count())
            .finish()
    }
}
