//! Cache configuration.

use std::num::NonZeroUsize;

use serde::Deserialize;

const DEFAULT_ENTRY_LIMIT: usize = 1000;
const DEFAULT_CONSUME_BATCH_LIMIT: usize = 100;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// When false every read recomputes and mutations publish no events.
    pub enabled: bool,
    /// Maximum number of derived values held before LRU eviction.
    pub entry_limit: usize,
    /// Maximum events drained per consumption batch.
    pub consume_batch_limit: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            entry_limit: DEFAULT_ENTRY_LIMIT,
            consume_batch_limit: DEFAULT_CONSUME_BATCH_LIMIT,
        }
    }
}

impl From<&crate::config::CacheSettings> for CacheConfig {
    fn from(settings: &crate::config::CacheSettings) -> Self {
        Self {
            enabled: settings.enabled,
            entry_limit: settings.entry_limit,
            consume_batch_limit: settings.consume_batch_limit,
        }
    }
}

impl CacheConfig {
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Returns the entry limit as NonZeroUsize, clamping to 1 if zero.
    pub fn entry_limit_non_zero(&self) -> NonZeroUsize {
        NonZeroUsize::new(self.entry_limit).unwrap_or(NonZeroUsize::MIN)
    }

    /// Batch size used when draining events; never zero.
    pub fn consume_batch_size(&self) -> usize {
        self.consume_batch_limit.max(1)
    }
}
