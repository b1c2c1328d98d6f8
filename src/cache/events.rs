//! Cache event system.
//!
//! Mutations publish an event describing what changed; the consumer drains
//! them and flushes the derived store.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use time::OffsetDateTime;
use tracing::info;
use uuid::Uuid;

use super::lock::mutex_lock;

const SOURCE: &str = "cache::events";

/// Monotonic, per-process event sequence number.
pub type Epoch = u64;

#[derive(Debug, Clone)]
pub struct CacheEvent {
    pub id: Uuid,
    pub epoch: Epoch,
    pub kind: EventKind,
    pub timestamp: OffsetDateTime,
}

impl CacheEvent {
    pub fn new(kind: EventKind, epoch: Epoch) -> Self {
        Self {
            id: Uuid::new_v4(),
            epoch,
            kind,
            timestamp: OffsetDateTime::now_utc(),
        }
    }
}

/// What changed in the entity store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventKind {
    PlaqueSubmitted { plaque_id: Uuid },
    PlaqueEdited { plaque_id: Uuid },
    PlaqueApproved { plaque_id: Uuid },
    PlaqueDisapproved { plaque_id: Uuid },
    PlaqueDeleted { plaque_id: Uuid },
    PlaqueFeatured { plaque_id: Uuid },
    PendingApproved { count: usize },
    CommentAdded { plaque_id: Uuid },
    /// Maintenance rewrote stored fields (backfill).
    Backfilled { updated: u64 },
    /// An operator asked for a flush.
    ManualFlush,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::PlaqueSubmitted { .. } => "plaque_submitted",
            EventKind::PlaqueEdited { .. } => "plaque_edited",
            EventKind::PlaqueApproved { .. } => "plaque_approved",
            EventKind::PlaqueDisapproved { .. } => "plaque_disapproved",
            EventKind::PlaqueDeleted { .. } => "plaque_deleted",
            EventKind::PlaqueFeatured { .. } => "plaque_featured",
            EventKind::PendingApproved { .. } => "pending_approved",
            EventKind::CommentAdded { .. } => "comment_added",
            EventKind::Backfilled { .. } => "backfilled",
            EventKind::ManualFlush => "manual_flush",
        }
    }
}

/// In-memory FIFO of cache events.
pub struct EventQueue {
    queue: Mutex<VecDeque<CacheEvent>>,
    epoch_counter: AtomicU64,
}

impl EventQueue {
    pub fn new() -> Self {
        Self {
            queue: Mutex::new(VecDeque::new()),
            epoch_counter: AtomicU64::new(0),
        }
    }

    pub fn next_epoch(&self) -> Epoch {
        self.epoch_counter.fetch_add(1, Ordering::SeqCst)
    }

    pub fn publish(&self, kind: EventKind) {
        let event = CacheEvent::new(kind, self.next_epoch());

        info!(
            target: "plaqueboard::cache",
            event_id = %event.id,
            event_epoch = event.epoch,
            event_kind = event.kind.as_str(),
            "Cache event enqueued"
        );

        mutex_lock(&self.queue, SOURCE, "publish").push_back(event);
    }

    /// Drain up to `limit` events in FIFO order.
    pub fn drain(&self, limit: usize) -> Vec<CacheEvent> {
        let mut queue = mutex_lock(&self.queue, SOURCE, "drain");
        let count = limit.min(queue.len());
        queue.drain(..count).collect()
    }

    pub fn len(&self) -> usize {
        mutex_lock(&self.queue, SOURCE, "len").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        mutex_lock(&self.queue, SOURCE, "clear").clear();
    }
}

impl Default for EventQueue {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::panic::{AssertUnwindSafe, catch_unwind};

    use super::*;

    #[test]
    fn epochs_increase() {
        let queue = EventQueue::new();
        let first = queue.next_epoch();
        let second = queue.next_epoch();
        assert!(first < second);
    }

    #[test]
    fn publish_and_drain_in_order() {
        let queue = EventQueue::new();
        let plaque_id = Uuid::new_v4();

        queue.publish(EventKind::PlaqueSubmitted { plaque_id });
        queue.publish(EventKind::PlaqueApproved { plaque_id });
        queue.publish(EventKind::ManualFlush);
        assert_eq!(queue.len(), 3);

        let events = queue.drain(2);
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].kind, EventKind::PlaqueSubmitted { plaque_id });
        assert_eq!(events[1].kind, EventKind::PlaqueApproved { plaque_id });
        assert!(events[0].epoch < events[1].epoch);
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn drain_more_than_available() {
        let queue = EventQueue::new();
        queue.publish(EventKind::ManualFlush);

        assert_eq!(queue.drain(100).len(), 1);
        assert!(queue.is_empty());
    }

    #[test]
    fn clear_queue() {
        let queue = EventQueue::new();
        queue.publish(EventKind::ManualFlush);
        queue.publish(EventKind::Backfilled { updated: 3 });

        queue.clear();
        assert!(queue.is_empty());
    }

    #[test]
    fn event_queue_recovers_from_poisoned_lock() {
        let queue = EventQueue::new();

        let _ = catch_unwind(AssertUnwindSafe(|| {
            let _guard = queue.queue.lock().expect("queue lock should be acquired");
            panic!("poison queue lock");
        }));

        queue.publish(EventKind::ManualFlush);
        assert_eq!(queue.len(), 1);
    }
}
