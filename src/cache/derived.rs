//! Memoization front door used by the read path.

use std::future::Future;
use std::sync::Arc;

use metrics::counter;
use serde::{Serialize, de::DeserializeOwned};
use tracing::{debug, warn};

use super::config::CacheConfig;
use super::consumer::CacheConsumer;
use super::events::EventQueue;
use super::keys::CacheKey;
use super::store::{DerivedStore, PutOutcome};
use super::trigger::CacheTrigger;

pub(crate) const METRIC_CACHE_HIT_TOTAL: &str = "plaqueboard_cache_hit_total";
pub(crate) const METRIC_CACHE_MISS_TOTAL: &str = "plaqueboard_cache_miss_total";
pub(crate) const METRIC_CACHE_EVICT_TOTAL: &str = "plaqueboard_cache_evict_total";

/// Read-through cache of derived values.
///
/// Values are stored as JSON. Anything that fails to decode is treated as a
/// miss, so correctness never depends on what the store holds.
#[derive(Clone)]
pub struct DerivedCache {
    config: CacheConfig,
    store: Arc<DerivedStore>,
    trigger: Arc<CacheTrigger>,
}

impl DerivedCache {
    pub fn new(config: CacheConfig) -> Self {
        let store = Arc::new(DerivedStore::new(&config));
        let queue = Arc::new(EventQueue::new());
        let consumer = Arc::new(CacheConsumer::new(
            config.clone(),
            store.clone(),
            queue.clone(),
        ));
        let trigger = Arc::new(CacheTrigger::new(config.clone(), queue, consumer));
        Self {
            config,
            store,
            trigger,
        }
    }

    /// Handle used by write paths to invalidate after a commit.
    pub fn trigger(&self) -> Arc<CacheTrigger> {
        self.trigger.clone()
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    pub async fn get_or_compute<T, E, F, Fut>(&self, key: &CacheKey, compute: F) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        if !self.config.is_enabled() {
            return compute().await;
        }

        let rendered = key.render();
        if let Some(raw) = self.store.get(&rendered) {
            match serde_json::from_str::<T>(&raw) {
                Ok(value) => {
                    counter!(METRIC_CACHE_HIT_TOTAL).increment(1);
                    return Ok(value);
                }
                Err(err) => warn!(
                    target: "plaqueboard::cache",
                    key = %rendered,
                    error = %err,
                    "Discarding undecodable cache entry"
                ),
            }
        }
        counter!(METRIC_CACHE_MISS_TOTAL).increment(1);

        let generation = self.store.generation();
        let value = compute().await?;

        match serde_json::to_string(&value) {
            Ok(serialized) => match self.store.put_if_current(rendered, serialized, generation) {
                PutOutcome::Stored {
                    evicted: Some(evicted),
                } => {
                    counter!(METRIC_CACHE_EVICT_TOTAL).increment(1);
                    debug!(target: "plaqueboard::cache", evicted = %evicted, "Cache entry evicted");
                }
                PutOutcome::Stored { evicted: None } => {}
                PutOutcome::Stale => {
                    debug!(target: "plaqueboard::cache", "Skipped caching a value computed before a flush");
                }
            },
            Err(err) => warn!(
                target: "plaqueboard::cache",
                key = %key,
                error = %err,
                "Failed to serialize derived value"
            ),
        }

        Ok(value)
    }
}
