//! In-memory entry store with eviction notifications

use crate::key::CacheKey;
use crate::types::{CacheEntry, Eviction, EvictionReason, Resource};
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::debug;

/// Map from key to entry, shared by request handlers and the sweeper
///
/// Each operation takes the lock once and never suspends while holding it,
/// so inserts, deletes and sweeps are atomic with respect to one another.
/// `lookup` does not enforce TTL: a logically expired entry stays visible
/// until a sweep or an explicit delete removes it.
///
/// Every subscriber gets its own unbounded queue, so publishing never
/// blocks the store and no eviction is ever dropped for a live subscriber.
#[derive(Default)]
pub struct EntryStore {
    entries: RwLock<HashMap<CacheKey, CacheEntry>>,
    subscribers: Mutex<Vec<mpsc::UnboundedSender<Eviction>>>,
    evictions: AtomicU64,
}

impl EntryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Receive a notification for every future eviction
    ///
    /// The receiver yields `None` once the store is dropped.
    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<Eviction> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers.lock().push(tx);
        rx
    }

    pub fn lookup(&self, key: &CacheKey) -> Option<CacheEntry> {
        self.entries.read().get(key).cloned()
    }

    /// Store or overwrite the entry for `key`, stamped with the current time
    pub fn insert(&self, key: CacheKey, value: Arc<Resource>, ttl: Duration) {
        let entry = CacheEntry {
            key: key.clone(),
            value,
            inserted_at: Instant::now(),
            ttl,
        };

        let replaced = self.entries.write().insert(key.clone(), entry).is_some();
        debug!(key = %key, replaced, "Stored cache entry");
    }

    /// Remove the entry for `key`; returns whether one was present
    pub fn delete(&self, key: &CacheKey) -> bool {
        let removed = self.entries.write().remove(key).is_some();
        if removed {
            self.notify(vec![key.clone()], EvictionReason::Explicit);
        }
        removed
    }

    /// Remove every entry whose age has reached its TTL
    pub fn evict_expired(&self, now: Instant) -> usize {
        let mut expired = Vec::new();
        self.entries.write().retain(|key, entry| {
            if entry.is_expired(now) {
                expired.push(key.clone());
                false
            } else {
                true
            }
        });

        self.notify(expired, EvictionReason::Expired)
    }

    /// Remove everything, notifying with [`EvictionReason::Shutdown`]
    pub fn drain(&self) -> usize {
        let drained: Vec<CacheKey> = self.entries.write().drain().map(|(key, _)| key).collect();
        self.notify(drained, EvictionReason::Shutdown)
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Sum of content lengths across live entries
    pub fn total_size(&self) -> u64 {
        self.entries
            .read()
            .values()
            .map(|entry| entry.value.content.len() as u64)
            .sum()
    }

    /// Total evictions since construction, for all reasons
    pub fn evictions(&self) -> u64 {
        self.evictions.load(Ordering::Relaxed)
    }

    /// Publish one notification per key to every live subscriber
    fn notify(&self, keys: Vec<CacheKey>, reason: EvictionReason) -> usize {
        let count = keys.len();
        if count == 0 {
            return 0;
        }
        self.evictions.fetch_add(count as u64, Ordering::Relaxed);

        let mut subscribers = self.subscribers.lock();
        for key in keys {
            debug!(key = %key, reason = %reason, "Evicted cache entry");
            // A failed send means the receiver is gone; prune it
            subscribers.retain(|tx| {
                tx.send(Eviction {
                    key: key.clone(),
                    reason,
                })
                .is_ok()
            });
        }
        count
    }
}
