//! Periodic reclamation of expired entries

use crate::store::EntryStore;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

/// Background task calling [`EntryStore::evict_expired`] every `check_period`
///
/// The first sweep happens one full period after start. Dropping the handle
/// stops the task at its next wakeup.
pub struct Sweeper {
    shutdown: Option<oneshot::Sender<()>>,
    handle: JoinHandle<()>,
}

impl Sweeper {
    /// Spawn the sweep loop on the current Tokio runtime
    pub fn start(store: Arc<EntryStore>, check_period: Duration) -> Self {
        let (shutdown, mut stop_rx) = oneshot::channel::<()>();

        let handle = tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + check_period, check_period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            info!(check_period_secs = check_period.as_secs_f64(), "Sweeper started");

            loop {
                tokio::select! {
                    _ = &mut stop_rx => break,
                    _ = ticker.tick() => {
                        let removed = store.evict_expired(Instant::now());
                        debug!(removed, remaining = store.len(), "Swept expired entries");
                    }
                }
            }

            info!("Sweeper stopped");
        });

        Self {
            shutdown: Some(shutdown),
            handle,
        }
    }

    pub fn is_running(&self) -> bool {
        !self.handle.is_finished()
    }

    /// Signal the loop to exit and wait for it
    pub async fn stop(mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }

        if let Err(e) = (&mut self.handle).await {
            warn!(error = %e, "Sweeper task ended abnormally");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::{CacheKey, FetchOptions};
    use crate::types::{Content, EvictionReason, Resource};

    fn key(path: &str) -> CacheKey {
        CacheKey::build(&format!("https://example.com/{}", path), FetchOptions::bytes()).unwrap()
    }

    fn resource() -> Arc<Resource> {
        Arc::new(Resource {
            content_type: "image/png".to_string(),
            content: Content::Bytes(vec![1, 2, 3]),
        })
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweeps_on_each_period() {
        let store = Arc::new(EntryStore::new());
        let start = Instant::now();
        store.insert(key("a"), resource(), Duration::from_secs(2));

        let sweeper = Sweeper::start(store.clone(), Duration::from_secs(1));
        assert!(sweeper.is_running());

        // Ticks at 1s leave the entry alone
        tokio::time::sleep_until(start + Duration::from_millis(1500)).await;
        assert_eq!(store.len(), 1);

        // The tick at 2s removes it
        tokio::time::sleep_until(start + Duration::from_millis(2500)).await;
        assert_eq!(store.len(), 0);

        sweeper.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_expiry_within_one_period_of_ttl() {
        let store = Arc::new(EntryStore::new());
        let mut rx = store.subscribe();
        let start = Instant::now();

        let sweeper = Sweeper::start(store.clone(), Duration::from_secs(3));

        // Inserted off the sweep grid, so expiry lands between ticks
        tokio::time::sleep_until(start + Duration::from_secs(1)).await;
        store.insert(key("a"), resource(), Duration::from_secs(4));

        // Nominal expiry at 5s; tick at 3s is too early, tick at 6s removes
        tokio::time::sleep_until(start + Duration::from_millis(4900)).await;
        assert_eq!(store.len(), 1);

        tokio::time::sleep_until(start + Duration::from_millis(5900)).await;
        assert_eq!(store.len(), 1, "stale entry stays until the next sweep");

        tokio::time::sleep_until(start + Duration::from_millis(6100)).await;
        assert_eq!(store.len(), 0);

        let eviction = rx.try_recv().unwrap();
        assert_eq!(eviction.key, key("a"));
        assert_eq!(eviction.reason, EvictionReason::Expired);

        sweeper.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_halts_sweeping() {
        let store = Arc::new(EntryStore::new());
        let start = Instant::now();

        let sweeper = Sweeper::start(store.clone(), Duration::from_secs(1));
        sweeper.stop().await;

        store.insert(key("a"), resource(), Duration::from_secs(1));
        tokio::time::sleep_until(start + Duration::from_secs(10)).await;

        // No sweeper left to reclaim it
        assert_eq!(store.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_stops_task() {
        let store = Arc::new(EntryStore::new());
        let start = Instant::now();

        let sweeper = Sweeper::start(store.clone(), Duration::from_secs(1));
        drop(sweeper);

        store.insert(key("a"), resource(), Duration::from_secs(1));
        tokio::time::sleep_until(start + Duration::from_secs(10)).await;
        assert_eq!(store.len(), 1);
    }
}
