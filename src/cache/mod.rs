//! Derived cache layer.
//!
//! Read paths memoize composed values (listing pages, footer aggregates, the
//! feed, exports) under keys that include every shaping parameter and the
//! viewer role. Any plaque or comment mutation publishes an event whose
//! consumption flushes the whole store.
//!
//! ```toml
//! [cache]
//! enabled = true
//! entry_limit = 1000
//! consume_batch_limit = 100
//! ```

mod config;
mod consumer;
mod derived;
mod events;
mod keys;
mod lock;
mod store;
mod trigger;

pub use config::CacheConfig;
pub use consumer::CacheConsumer;
pub use derived::DerivedCache;
pub use events::{CacheEvent, Epoch, EventKind, EventQueue};
pub use keys::CacheKey;
pub use store::{DerivedStore, PutOutcome};
pub use trigger::CacheTrigger;

pub(crate) mod metric_names {
    pub(crate) use super::consumer::{
        METRIC_CACHE_CONSUME_MS, METRIC_CACHE_EVENT_QUEUE_LEN, METRIC_CACHE_FLUSH_TOTAL,
    };
    pub(crate) use super::derived::{
        METRIC_CACHE_EVICT_TOTAL, METRIC_CACHE_HIT_TOTAL, METRIC_CACHE_MISS_TOTAL,
    };
}
