//! Fetch-once, serve-many cache over a [`Fetcher`]

use crate::error::{CacheError, Result};
use crate::key::{self, CacheKey, FetchOptions};
use crate::store::EntryStore;
use crate::sweeper::Sweeper;
use crate::types::{CacheConfig, CacheStats, Eviction, Resource};
use futures::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use remote_fetcher::{Fetcher, Url};
use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinError;
use tokio::time::Instant;
use tracing::{debug, info, warn};

type SharedFetch = Shared<BoxFuture<'static, Result<Arc<Resource>>>>;
type InFlight = Arc<Mutex<HashMap<CacheKey, SharedFetch>>>;

enum Lookup {
    Hit(Arc<Resource>),
    Pending(SharedFetch),
}

/// Whether a response came from the store or from the upstream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStatus {
    Hit,
    Miss,
}

impl CacheStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CacheStatus::Hit => "HIT",
            CacheStatus::Miss => "MISS",
        }
    }
}

/// A TTL cache of remote resources
///
/// Construction starts a [`Sweeper`]; [`ResourceCache::shutdown`] stops it
/// and can drain the remaining entries. Dropping the cache also stops the
/// sweeper, without draining.
///
/// A miss runs the fetch and insert on its own task, so a caller that gives
/// up waiting does not cancel the fetch; its result still lands in the store.
pub struct ResourceCache<F> {
    store: Arc<EntryStore>,
    fetcher: Arc<F>,
    config: CacheConfig,
    in_flight: InFlight,
    sweeper: Mutex<Option<Sweeper>>,
    hits: AtomicU64,
    misses: AtomicU64,
    fetches: Arc<AtomicU64>,
}

impl<F> ResourceCache<F>
where
    F: Fetcher + 'static,
{
    /// Create a cache and start its sweeper on the current Tokio runtime
    pub fn new(config: CacheConfig, fetcher: F) -> Result<Self> {
        config.validate()?;

        let store = Arc::new(EntryStore::new());
        let sweeper = Sweeper::start(store.clone(), config.check_period);

        info!(
            ttl_secs = config.ttl.as_secs(),
            check_period_secs = config.check_period.as_secs(),
            single_flight = config.single_flight,
            strict_ttl = config.strict_ttl,
            "Resource cache initialized"
        );

        Ok(Self {
            store,
            fetcher: Arc::new(fetcher),
            config,
            in_flight: Arc::new(Mutex::new(HashMap::new())),
            sweeper: Mutex::new(Some(sweeper)),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            fetches: Arc::new(AtomicU64::new(0)),
        })
    }

    /// Serve a resource from the cache, fetching it on a miss
    pub async fn get(&self, locator: &str, options: FetchOptions) -> Result<Arc<Resource>> {
        self.get_with_status(locator, options)
            .await
            .map(|(resource, _)| resource)
    }

    /// Like [`ResourceCache::get`], also reporting hit or miss
    pub async fn get_with_status(
        &self,
        locator: &str,
        options: FetchOptions,
    ) -> Result<(Arc<Resource>, CacheStatus)> {
        let (url, key) = key::resolve(locator, options)?;

        let pending = match self.begin(url, key, options) {
            Lookup::Hit(resource) => return Ok((resource, CacheStatus::Hit)),
            Lookup::Pending(pending) => pending,
        };

        let resource = pending.await?;
        Ok((resource, CacheStatus::Miss))
    }

    /// Whether a live entry exists for the locator and options
    pub fn contains(&self, locator: &str, options: FetchOptions) -> Result<bool> {
        let key = CacheKey::build(locator, options)?;
        Ok(self.lookup_fresh(&key).is_some())
    }

    /// Explicitly evict the entry for a locator and options
    pub fn invalidate(&self, locator: &str, options: FetchOptions) -> Result<bool> {
        let key = CacheKey::build(locator, options)?;
        Ok(self.store.delete(&key))
    }

    /// Run a sweep now, outside the periodic schedule
    pub fn evict_expired(&self) -> usize {
        self.store.evict_expired(Instant::now())
    }

    /// Time left before the cached entry for a locator and options expires,
    /// or `None` when nothing is cached for it
    pub fn time_to_live(&self, locator: &str, options: FetchOptions) -> Result<Option<Duration>> {
        let key = CacheKey::build(locator, options)?;
        Ok(self
            .store
            .lookup(&key)
            .map(|entry| entry.expires_in(Instant::now())))
    }

    /// Receive a notification for every eviction from now on
    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<Eviction> {
        self.store.subscribe()
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    pub fn is_sweeping(&self) -> bool {
        self.sweeper
            .lock()
            .as_ref()
            .is_some_and(Sweeper::is_running)
    }

    /// Get current cache statistics
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.store.len(),
            total_size: self.store.total_size(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            fetches: self.fetches.load(Ordering::Relaxed),
            evictions: self.store.evictions(),
        }
    }

    /// Stop the sweeper and, when `drain` is set, evict every remaining
    /// entry with reason `shutdown`. Returns the number drained.
    ///
    /// Safe to call more than once.
    pub async fn shutdown(&self, drain: bool) -> usize {
        let sweeper = self.sweeper.lock().take();
        if let Some(sweeper) = sweeper {
            sweeper.stop().await;
        }

        if !drain {
            return 0;
        }

        let drained = self.store.drain();
        info!(drained, "Resource cache drained");
        drained
    }

    /// Serve from the store or hand back the fetch to await
    fn begin(&self, url: Url, key: CacheKey, options: FetchOptions) -> Lookup {
        if !self.config.single_flight {
            if let Some(resource) = self.lookup_fresh(&key) {
                return self.hit(&key, resource);
            }
            self.record_miss(&key);
            return Lookup::Pending(self.spawn_fetch(url, key, options).boxed().shared());
        }

        // Checked under the registry lock so a finishing flight is seen
        // either in the store or in the registry, never in neither.
        let mut in_flight = self.in_flight.lock();
        if let Some(resource) = self.lookup_fresh(&key) {
            return self.hit(&key, resource);
        }
        self.record_miss(&key);

        if let Some(flight) = in_flight.get(&key) {
            debug!(key = %key, "Joining in-flight fetch");
            return Lookup::Pending(flight.clone());
        }

        let flight = self
            .spawn_fetch(url, key.clone(), options)
            .boxed()
            .shared();
        in_flight.insert(key, flight.clone());
        Lookup::Pending(flight)
    }

    fn lookup_fresh(&self, key: &CacheKey) -> Option<Arc<Resource>> {
        let entry = self.store.lookup(key)?;
        if self.config.strict_ttl && entry.is_expired(Instant::now()) {
            debug!(
                key = %key,
                age_secs = entry.age(Instant::now()).as_secs(),
                "Ignoring stale entry"
            );
            return None;
        }
        Some(entry.value)
    }

    fn hit(&self, key: &CacheKey, resource: Arc<Resource>) -> Lookup {
        self.hits.fetch_add(1, Ordering::Relaxed);
        debug!(key = %key, "Cache hit");
        Lookup::Hit(resource)
    }

    fn record_miss(&self, key: &CacheKey) {
        self.misses.fetch_add(1, Ordering::Relaxed);
        debug!(key = %key, "Cache miss");
    }

    /// Fetch and insert on a detached task; the returned future only
    /// observes the outcome
    fn spawn_fetch(
        &self,
        url: Url,
        key: CacheKey,
        options: FetchOptions,
    ) -> impl Future<Output = Result<Arc<Resource>>> + Send + 'static {
        let fetcher = Arc::clone(&self.fetcher);
        let store = Arc::clone(&self.store);
        let fetches = Arc::clone(&self.fetches);
        let in_flight = self
            .config
            .single_flight
            .then(|| Arc::clone(&self.in_flight));
        let ttl = self.config.ttl;

        let task_key = key.clone();
        let task_in_flight = in_flight.clone();
        let handle = tokio::spawn(async move {
            fetches.fetch_add(1, Ordering::Relaxed);
            let fetched = fetcher.fetch(&url).await;

            // Insert and deregister together so late arrivals find the entry
            let mut registry = task_in_flight.as_ref().map(|r| r.lock());
            let result = match fetched {
                Ok(fetched) => {
                    let resource = Arc::new(Resource::from_fetched(fetched, options));
                    store.insert(task_key.clone(), resource.clone(), ttl);
                    Ok(resource)
                }
                Err(e) => {
                    warn!(key = %task_key, error = %e, "Fetch failed, nothing cached");
                    Err(CacheError::from(e))
                }
            };
            if let Some(registry) = registry.as_mut() {
                registry.remove(&task_key);
            }
            result
        });

        async move {
            match handle.await {
                Ok(result) => result,
                Err(e) => {
                    if let Some(in_flight) = in_flight {
                        in_flight.lock().remove(&key);
                    }
                    Err(task_failure(&key, e))
                }
            }
        }
    }
}

fn task_failure(key: &CacheKey, err: JoinError) -> CacheError {
    if err.is_cancelled() {
        warn!(key = %key, "Fetch task cancelled");
        CacheError::Cancelled(format!("fetch task for {} was cancelled", key))
    } else {
        CacheError::StoreCorruption(format!(
            "fetch task for {} ended without a result: {}",
            key, err
        ))
    }
}
