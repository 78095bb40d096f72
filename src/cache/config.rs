//! Response cache configuration derived from the `[cache]` settings section.

use std::time::Duration;

use crate::config::CacheSettings;

const DEFAULT_TTL_SECS: u64 = 5;
const DEFAULT_STATS_TTL_SECS: u64 = 10;

/// What a read returns when the refresh fails and only an expired entry is available.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StalePolicy {
    /// Hand out the expired value.
    ServeStale,
    /// Ignore the expired value and return the caller default.
    UseDefault,
}

#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Lifetime of catalog responses (players, matches, tallies).
    pub ttl: Duration,
    /// Lifetime of site statistics.
    pub stats_ttl: Duration,
    pub stale_policy: StalePolicy,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(DEFAULT_TTL_SECS),
            stats_ttl: Duration::from_secs(DEFAULT_STATS_TTL_SECS),
            stale_policy: StalePolicy::ServeStale,
        }
    }
}

impl From<&CacheSettings> for CacheConfig {
    fn from(settings: &CacheSettings) -> Self {
        Self {
            ttl: settings.ttl,
            stats_ttl: settings.stats_ttl,
            stale_policy: if settings.serve_stale {
                StalePolicy::ServeStale
            } else {
                StalePolicy::UseDefault
            },
        }
    }
}
