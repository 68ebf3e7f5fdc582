//! Cache configuration.
//!
//! Controls freshness and capacity of the query cache via `folio.toml`.

use std::num::NonZeroUsize;
use std::time::Duration;

use serde::Deserialize;

const DEFAULT_STALE_TIME_MS: u64 = 30_000;
const DEFAULT_MAX_ENTRIES: usize = 500;

/// Cache configuration from the `[cache]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// When false every read goes to the network and nothing is stored.
    pub enabled: bool,
    /// How long (ms) a fetched entry is served without refetching.
    pub stale_time_ms: u64,
    /// Maximum cached query results before LRU eviction.
    pub max_entries: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            stale_time_ms: DEFAULT_STALE_TIME_MS,
            max_entries: DEFAULT_MAX_ENTRIES,
        }
    }
}

impl From<&crate::config::CacheSettings> for CacheConfig {
    fn from(settings: &crate::config::CacheSettings) -> Self {
        Self {
            enabled: settings.enabled,
            stale_time_ms: settings.stale_time_ms,
            max_entries: settings.max_entries,
        }
    }
}

impl CacheConfig {
    pub fn stale_time(&self) -> Duration {
        Duration::from_millis(self.stale_time_ms)
    }

    /// Returns the entry limit as NonZeroUsize, clamping to 1 if zero.
    pub fn max_entries_non_zero(&self) -> NonZeroUsize {
        NonZeroUsize::new(self.max_entries).unwrap_or(NonZeroUsize::MIN)
    }
}
