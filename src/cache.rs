//! Expiring key-value cache
//!
//! Best-effort persistence of upstream responses. Entries expire lazily on
//! read; under capacity pressure the oldest entries are evicted and the
//! write is retried once. Nothing here ever fails the caller's data flow:
//! problems degrade to a cache miss or a dropped write.

pub mod clock;
pub mod store;

pub use clock::{Clock, ManualClock, SystemClock};
pub use store::{FileStore, KeyValueStore, MemoryStore, StoreError};

use crate::logging::get_logger;
use chrono::{DateTime, Duration, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// TTL applied when the caller has no better idea
pub const DEFAULT_TTL_HOURS: u32 = 24;

/// Entries removed per eviction round, at least
const MIN_EVICTIONS: usize = 3;
/// Fraction of cache entries removed per eviction round
const EVICTION_FRACTION: f64 = 0.2;

/// Stored envelope around a cached value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheEntry<T> {
    pub value: T,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub stored_at: DateTime<Utc>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub expires_at: DateTime<Utc>,
}

impl<T> CacheEntry<T> {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at < now
    }
}

/// Envelope timestamps without the payload
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EntryStamp {
    #[serde(with = "chrono::serde::ts_milliseconds")]
    stored_at: DateTime<Utc>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    expires_at: DateTime<Utc>,
}

/// Outcome of a cache write
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheWrite {
    Stored,
    StoredAfterEviction { evicted: usize },
    /// The write was abandoned; the cache is unchanged for this key
    Dropped { reason: String },
}

impl CacheWrite {
    pub fn is_stored(&self) -> bool {
        !matches!(self, CacheWrite::Dropped { .. })
    }
}

/// Number of entries to evict from a cache holding `count` entries
pub fn eviction_count(count: usize) -> usize {
    let fraction = (count as f64 * EVICTION_FRACTION).ceil() as usize;
    fraction.max(MIN_EVICTIONS).min(count)
}

/// Expiring cache over any [`KeyValueStore`]
pub struct TtlCache<S: KeyValueStore, C: Clock = SystemClock> {
    store: S,
    clock: C,
    logger: crate::logging::StructuredLogger,
}

impl<S: KeyValueStore> TtlCache<S, SystemClock> {
    pub fn new(store: S) -> Self {
        Self::with_clock(store, SystemClock)
    }
}

impl<S: KeyValueStore, C: Clock> TtlCache<S, C> {
    pub fn with_clock(store: S, clock: C) -> Self {
        Self {
            store,
            clock,
            logger: get_logger("cache"),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn into_store(self) -> S {
        self.store
    }

    /// Store `value` under `key` for `ttl_hours`
    pub fn set<T: Serialize>(&mut self, key: &str, value: &T, ttl_hours: u32) -> CacheWrite {
        let now = self.clock.now();
        let Some(expires_at) = Duration::try_hours(i64::from(ttl_hours))
            .and_then(|ttl| now.checked_add_signed(ttl))
        else {
            return self.drop_write(key, format!("TTL of {} hours is out of range", ttl_hours));
        };
        let entry = CacheEntry {
            value,
            stored_at: now,
            expires_at,
        };
        let payload = match serde_json::to_string(&entry) {
            Ok(p) => p,
            Err(e) => return self.drop_write(key, format!("serialization failed: {}", e)),
        };

        match self.store.set(key, payload.clone()) {
            Ok(()) => CacheWrite::Stored,
            Err(StoreError::QuotaExceeded { .. }) => {
                let evicted = self.evict_oldest();
                match self.store.set(key, payload) {
                    Ok(()) => CacheWrite::StoredAfterEviction { evicted },
                    Err(e) => self.drop_write(key, format!("retry after eviction failed: {}", e)),
                }
            }
            Err(e) => self.drop_write(key, e.to_string()),
        }
    }

    /// Store with [`DEFAULT_TTL_HOURS`]
    pub fn set_default<T: Serialize>(&mut self, key: &str, value: &T) -> CacheWrite {
        self.set(key, value, DEFAULT_TTL_HOURS)
    }

    /// Value under `key` if present, well-formed and unexpired
    pub fn get<T: DeserializeOwned>(&mut self, key: &str) -> Option<T> {
        self.get_entry(key).map(|entry| entry.value)
    }

    /// Like [`Self::get`] but keeps the envelope timestamps
    pub fn get_entry<T: DeserializeOwned>(&mut self, key: &str) -> Option<CacheEntry<T>> {
        let raw = self.store.get(key)?;
        let entry = match serde_json::from_str::<CacheEntry<T>>(&raw) {
            Ok(entry) => entry,
            Err(e) => {
                self.logger
                    .debug(&format!("Removing malformed cache entry {}: {}", key, e));
                self.store.remove(key);
                return None;
            }
        };
        if entry.is_expired_at(self.clock.now()) {
            self.logger.debug(&format!(
                "Cache entry {} expired at {}",
                key,
                entry.expires_at.to_rfc3339()
            ));
            self.store.remove(key);
            return None;
        }
        Some(entry)
    }

    pub fn remove(&mut self, key: &str) {
        self.store.remove(key);
    }

    /// Drop every expired entry now; returns how many were removed
    pub fn purge_expired(&mut self) -> usize {
        let now = self.clock.now();
        let expired: Vec<String> = self
            .stamps()
            .into_iter()
            .filter(|(_, stamp)| stamp.expires_at < now)
            .map(|(key, _)| key)
            .collect();
        for key in &expired {
            self.store.remove(key);
        }
        expired.len()
    }

    /// Keys that hold cache envelopes, with their timestamps
    fn stamps(&self) -> Vec<(String, EntryStamp)> {
        self.store
            .keys()
            .into_iter()
            .filter_map(|key| {
                let raw = self.store.get(&key)?;
                let stamp = serde_json::from_str::<EntryStamp>(&raw).ok()?;
                Some((key, stamp))
            })
            .collect()
    }

    /// Remove the oldest `max(3, ceil(20%))` cache entries by storage time
    fn evict_oldest(&mut self) -> usize {
        let mut stamps = self.stamps();
        stamps.sort_by_key(|(_, stamp)| stamp.stored_at);
        let count = eviction_count(stamps.len());
        for (key, _) in stamps.iter().take(count) {
            self.store.remove(key);
        }
        self.logger.info(&format!(
            "Capacity pressure: evicted {} of {} cache entries",
            count,
            stamps.len()
        ));
        count
    }

    fn drop_write(&self, key: &str, reason: String) -> CacheWrite {
        self.logger
            .warn(&format!("Cache write for {} dropped: {}", key, reason));
        CacheWrite::Dropped { reason }
    }
}
