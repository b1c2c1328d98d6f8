//! Cache trigger service.
//!
//! Write paths call the trigger after their transaction commits; the event is
//! consumed immediately so the next read recomputes.

use std::sync::Arc;

use tracing::debug;
use uuid::Uuid;

use super::config::CacheConfig;
use super::consumer::CacheConsumer;
use super::events::{EventKind, EventQueue};

pub struct CacheTrigger {
    config: CacheConfig,
    queue: Arc<EventQueue>,
    consumer: Arc<CacheConsumer>,
}

impl CacheTrigger {
    pub fn new(config: CacheConfig, queue: Arc<EventQueue>, consumer: Arc<CacheConsumer>) -> Self {
        Self {
            config,
            queue,
            consumer,
        }
    }

    /// Publish an event and, if `consume_now`, flush before returning.
    pub async fn trigger(&self, kind: EventKind, consume_now: bool) {
        if !self.config.is_enabled() {
            debug!(
                target: "plaqueboard::cache",
                event_kind = kind.as_str(),
                "Cache trigger skipped: cache disabled"
            );
            return;
        }

        self.queue.publish(kind);

        if consume_now {
            self.consumer.consume().await;
        }
    }

    pub async fn plaque_submitted(&self, plaque_id: Uuid) {
        self.trigger(EventKind::PlaqueSubmitted { plaque_id }, true)
            .await;
    }

    pub async fn plaque_edited(&self, plaque_id: Uuid) {
        self.trigger(EventKind::PlaqueEdited { plaque_id }, true).await;
    }

    pub async fn plaque_approved(&self, plaque_id: Uuid) {
        self.trigger(EventKind::PlaqueApproved { plaque_id }, true)
            .await;
    }

    pub async fn plaque_disapproved(&self, plaque_id: Uuid) {
        self.trigger(EventKind::PlaqueDisapproved { plaque_id }, true)
            .await;
    }

    pub async fn plaque_deleted(&self, plaque_id: Uuid) {
        self.trigger(EventKind::PlaqueDeleted { plaque_id }, true).await;
    }

    pub async fn plaque_featured(&self, plaque_id: Uuid) {
        self.trigger(EventKind::PlaqueFeatured { plaque_id }, true)
            .await;
    }

    pub async fn pending_approved(&self, count: usize) {
        self.trigger(EventKind::PendingApproved { count }, true).await;
    }

    pub async fn comment_added(&self, plaque_id: Uuid) {
        self.trigger(EventKind::CommentAdded { plaque_id }, true).await;
    }

    pub async fn backfilled(&self, updated: u64) {
        self.trigger(EventKind::Backfilled { updated }, true).await;
    }

    pub async fn manual_flush(&self) {
        self.trigger(EventKind::ManualFlush, true).await;
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    pub fn queue(&self) -> &Arc<EventQueue> {
        &self.queue
    }
}
