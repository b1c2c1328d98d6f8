//! Cache consumer: turns queued mutation events into a flush.

use std::sync::Arc;
use std::time::Instant;

use metrics::{counter, gauge, histogram};
use tracing::{info, instrument};

use super::config::CacheConfig;
use super::events::EventQueue;
use super::store::DerivedStore;

pub(crate) const METRIC_CACHE_FLUSH_TOTAL: &str = "plaqueboard_cache_flush_total";
pub(crate) const METRIC_CACHE_EVENT_QUEUE_LEN: &str = "plaqueboard_cache_event_queue_len";
pub(crate) const METRIC_CACHE_CONSUME_MS: &str = "plaqueboard_cache_consume_ms";

/// Drains the event queue and flushes the whole derived store.
///
/// Invalidation is deliberately coarse: any event clears every entry, since
/// admin and anonymous views, counts and random picks all depend on the same
/// rows and writes are rare.
pub struct CacheConsumer {
    config: CacheConfig,
    store: Arc<DerivedStore>,
    queue: Arc<EventQueue>,
}

impl CacheConsumer {
    pub fn new(config: CacheConfig, store: Arc<DerivedStore>, queue: Arc<EventQueue>) -> Self {
        Self {
            config,
            store,
            queue,
        }
    }

    /// Consume every pending event. Returns true if anything was processed.
    #[instrument(skip(self))]
    pub async fn consume(&self) -> bool {
        let started_at = Instant::now();
        let mut event_count = 0usize;
        let mut kinds = Vec::new();

        loop {
            let batch = self.queue.drain(self.config.consume_batch_size());
            if batch.is_empty() {
                break;
            }
            event_count += batch.len();
            kinds.extend(batch.iter().map(|event| event.kind.as_str()));
        }
        gauge!(METRIC_CACHE_EVENT_QUEUE_LEN).set(self.queue.len() as f64);

        if event_count == 0 {
            return false;
        }

        let removed = self.store.clear();
        counter!(METRIC_CACHE_FLUSH_TOTAL).increment(1);

        info!(
            target: "plaqueboard::cache",
            event_count,
            event_kinds = ?kinds,
            removed,
            "Cache flushed"
        );

        histogram!(METRIC_CACHE_CONSUME_MS)
            .record(started_at.elapsed().as_secs_f64() * 1000.0);

        true
    }

    pub fn store(&self) -> &Arc<DerivedStore> {
        &self.store
    }
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::*;
    use crate::cache::events::EventKind;

    fn consumer_with_batch(consume_batch_limit: usize) -> CacheConsumer {
        let config = CacheConfig {
            consume_batch_limit,
            ..Default::default()
        };
        let store = Arc::new(DerivedStore::new(&config));
        CacheConsumer::new(config, store, Arc::new(EventQueue::new()))
    }

    #[tokio::test]
    async fn consume_without_events_is_a_no_op() {
        let consumer = consumer_with_batch(10);
        let generation = consumer.store.generation();
        consumer
            .store
            .put_if_current("rss".into(), "<rss/>".into(), generation);

        assert!(!consumer.consume().await);
        assert_eq!(consumer.store.len(), 1);
    }

    #[tokio::test]
    async fn any_event_flushes_everything() {
        let consumer = consumer_with_batch(10);
        let generation = consumer.store.generation();
        consumer
            .store
            .put_if_current("rss".into(), "<rss/>".into(), generation);
        consumer
            .store
            .put_if_current("chrome:role=admin".into(), "{}".into(), generation);

        consumer.queue.publish(EventKind::CommentAdded {
            plaque_id: Uuid::new_v4(),
        });

        assert!(consumer.consume().await);
        assert!(consumer.store.is_empty());
        assert!(consumer.queue.is_empty());
    }

    #[tokio::test]
    async fn consume_drains_past_the_batch_limit() {
        let consumer = consumer_with_batch(2);
        for _ in 0..5 {
            consumer.queue.publish(EventKind::ManualFlush);
        }

        assert!(consumer.consume().await);
        assert!(consumer.queue.is_empty());
    }
}
