//! TTL-bounded key/value store with read-through refresh.

use std::{collections::HashMap, fmt::Display, future::Future, sync::RwLock, time::Duration};

use tokio::time::Instant;
use tracing::{debug, warn};

use super::config::{CacheConfig, StalePolicy};
use super::lock::{rw_read, rw_write};

const SOURCE: &str = "cache::store";

struct CacheEntry<V> {
    value: V,
    fetched_at: Instant,
}

/// Entries plus invalidation counters. A refresh only lands if neither its key's
/// generation nor the global epoch moved while the upstream call was in flight.
struct CacheState<V> {
    entries: HashMap<String, CacheEntry<V>>,
    generations: HashMap<String, u64>,
    epoch: u64,
}

impl<V> CacheState<V> {
    fn stamp(&self, key: &str) -> (u64, u64) {
        (self.epoch, self.generations.get(key).copied().unwrap_or(0))
    }
}

/// Where the value handed back by [`ResponseCache::get_or_fetch`] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheOrigin {
    /// A live entry, no upstream call was made.
    Fresh,
    /// The upstream call succeeded and the entry was replaced.
    Fetched,
    /// The upstream call failed and an expired entry was served.
    Stale,
    /// The upstream call failed and the caller default was returned.
    Default,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CacheRead<V> {
    pub value: V,
    pub origin: CacheOrigin,
}

/// Response cache keyed by resource path.
///
/// Owned explicitly and shared behind an `Arc`; the lock is never held across the
/// upstream call, so two concurrent misses on one key may both fetch. A refresh that
/// races an invalidation of its key is returned to its caller but not stored.
pub struct ResponseCache<V> {
    state: RwLock<CacheState<V>>,
    stale_policy: StalePolicy,
}

impl<V: Clone> ResponseCache<V> {
    pub fn new(config: &CacheConfig) -> Self {
        Self::with_policy(config.stale_policy)
    }

    pub fn with_policy(stale_policy: StalePolicy) -> Self {
        Self {
            state: RwLock::new(CacheState {
                entries: HashMap::new(),
                generations: HashMap::new(),
                epoch: 0,
            }),
            stale_policy,
        }
    }

    /// Return the entry for `key` while it is younger than `ttl`, otherwise refresh it
    /// with `fetch`. Never fails: an unusable refresh yields a stale value or `default`.
    pub async fn get_or_fetch<F, Fut, E>(
        &self,
        key: &str,
        ttl: Duration,
        default: V,
        fetch: F,
    ) -> CacheRead<V>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
        E: Display,
    {
        let (cached, stamp) = {
            let state = rw_read(&self.state, SOURCE, "get_or_fetch");
            let cached = state.entries.get(key).map(|entry| {
                let age = Instant::now().saturating_duration_since(entry.fetched_at);
                (entry.value.clone(), age)
            });
            (cached, state.stamp(key))
        };

        let stale = match cached {
            Some((value, age)) if age <= ttl => {
                metrics::counter!("matchday_cache_hit_total", "resource" => resource_label(key))
                    .increment(1);
                return CacheRead {
                    value,
                    origin: CacheOrigin::Fresh,
                };
            }
            Some((value, _)) => Some(value),
            None => None,
        };

        metrics::counter!("matchday_cache_miss_total", "resource" => resource_label(key))
            .increment(1);

        match fetch().await {
            Ok(value) => {
                if self.store(key, stamp, value.clone()) {
                    debug!(target = "matchday::cache", key, "cache entry refreshed");
                } else {
                    debug!(
                        target = "matchday::cache",
                        key,
                        "key invalidated during refresh, result not stored"
                    );
                }
                CacheRead {
                    value,
                    origin: CacheOrigin::Fetched,
                }
            }
            Err(error) => match (stale, self.stale_policy) {
                (Some(value), StalePolicy::ServeStale) => {
                    warn!(
                        target = "matchday::cache",
                        key,
                        error = %error,
                        "refresh failed, serving expired entry"
                    );
                    metrics::counter!(
                        "matchday_cache_stale_total",
                        "resource" => resource_label(key)
                    )
                    .increment(1);
                    CacheRead {
                        value,
                        origin: CacheOrigin::Stale,
                    }
                }
                _ => {
                    warn!(
                        target = "matchday::cache",
                        key,
                        error = %error,
                        "refresh failed, returning default"
                    );
                    metrics::counter!(
                        "matchday_cache_default_total",
                        "resource" => resource_label(key)
                    )
                    .increment(1);
                    CacheRead {
                        value: default,
                        origin: CacheOrigin::Default,
                    }
                }
            },
        }
    }

    /// Drop the named keys so the next read goes upstream.
    pub fn invalidate<K: AsRef<str>>(&self, keys: &[K]) {
        let mut state = rw_write(&self.state, SOURCE, "invalidate");
        for key in keys {
            let key = key.as_ref();
            state.entries.remove(key);
            *state.generations.entry(key.to_string()).or_default() += 1;
        }
    }

    pub fn invalidate_all(&self) {
        let mut state = rw_write(&self.state, SOURCE, "invalidate_all");
        state.entries.clear();
        state.epoch += 1;
    }

    /// Number of stored entries, expired ones included.
    pub fn len(&self) -> usize {
        rw_read(&self.state, SOURCE, "len").entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn store(&self, key: &str, stamp: (u64, u64), value: V) -> bool {
        let mut state = rw_write(&self.state, SOURCE, "store");
        if state.stamp(key) != stamp {
            return false;
        }
        state.entries.insert(
            key.to_string(),
            CacheEntry {
                value,
                fetched_at: Instant::now(),
            },
        );
        true
    }
}

fn resource_label(key: &str) -> String {
    key.trim_start_matches('/')
        .split('/')
        .next()
        .unwrap_or_default()
        .to_string()
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    const TTL: Duration = Duration::from_secs(5);

    async fn read(
        cache: &ResponseCache<u32>,
        calls: &AtomicUsize,
        result: Result<u32, &'static str>,
    ) -> CacheRead<u32> {
        cache
            .get_or_fetch("/players", TTL, 0, move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                result
            })
            .await
    }

    #[tokio::test(start_paused = true)]
    async fn reads_within_ttl_fetch_once() {
        let cache = ResponseCache::with_policy(StalePolicy::ServeStale);
        let calls = AtomicUsize::new(0);

        let first = read(&cache, &calls, Ok(1)).await;
        tokio::time::advance(Duration::from_secs(4)).await;
        let second = read(&cache, &calls, Ok(2)).await;

        assert_eq!(first.origin, CacheOrigin::Fetched);
        assert_eq!(second.origin, CacheOrigin::Fresh);
        assert_eq!(second.value, 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn expired_entry_is_refetched() {
        let cache = ResponseCache::with_policy(StalePolicy::ServeStale);
        let calls = AtomicUsize::new(0);

        read(&cache, &calls, Ok(1)).await;
        tokio::time::advance(Duration::from_secs(6)).await;
        let refreshed = read(&cache, &calls, Ok(2)).await;

        assert_eq!(refreshed.origin, CacheOrigin::Fetched);
        assert_eq!(refreshed.value, 2);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_refresh_serves_stale_when_allowed() {
        let cache = ResponseCache::with_policy(StalePolicy::ServeStale);
        let calls = AtomicUsize::new(0);

        read(&cache, &calls, Ok(7)).await;
        tokio::time::advance(Duration::from_secs(6)).await;
        let stale = read(&cache, &calls, Err("down")).await;

        assert_eq!(stale.origin, CacheOrigin::Stale);
        assert_eq!(stale.value, 7);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_refresh_uses_default_when_stale_is_disallowed() {
        let cache = ResponseCache::with_policy(StalePolicy::UseDefault);
        let calls = AtomicUsize::new(0);

        read(&cache, &calls, Ok(7)).await;
        tokio::time::advance(Duration::from_secs(6)).await;
        let fallback = read(&cache, &calls, Err("down")).await;

        assert_eq!(fallback.origin, CacheOrigin::Default);
        assert_eq!(fallback.value, 0);
    }

    #[tokio::test]
    async fn total_miss_returns_default_and_stores_nothing() {
        let cache = ResponseCache::with_policy(StalePolicy::ServeStale);
        let calls = AtomicUsize::new(0);

        let miss = read(&cache, &calls, Err("down")).await;

        assert_eq!(miss.origin, CacheOrigin::Default);
        assert_eq!(miss.value, 0);
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn invalidate_forces_a_live_fetch() {
        let cache = ResponseCache::with_policy(StalePolicy::ServeStale);
        let calls = AtomicUsize::new(0);

        read(&cache, &calls, Ok(1)).await;
        cache.invalidate(&["/players", "/unrelated"]);
        let after = read(&cache, &calls, Ok(2)).await;

        assert_eq!(after.origin, CacheOrigin::Fetched);
        assert_eq!(after.value, 2);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn keys_are_independent() {
        let cache: ResponseCache<u32> = ResponseCache::with_policy(StalePolicy::ServeStale);

        cache
            .get_or_fetch("/votes/1", TTL, 0, || async { Ok::<_, &str>(1) })
            .await;
        cache
            .get_or_fetch("/votes/2", TTL, 0, || async { Ok::<_, &str>(2) })
            .await;
        cache.invalidate(&["/votes/1"]);

        assert_eq!(cache.len(), 1);
        let kept = cache
            .get_or_fetch("/votes/2", TTL, 0, || async { Ok::<_, &str>(99) })
            .await;
        assert_eq!(kept.value, 2);
        assert_eq!(kept.origin, CacheOrigin::Fresh);
    }

    #[tokio::test]
    async fn refresh_racing_an_invalidation_is_not_stored() {
        let cache = ResponseCache::with_policy(StalePolicy::ServeStale);
        let calls = AtomicUsize::new(0);

        let racing = cache
            .get_or_fetch("/players", TTL, 0, || async {
                cache.invalidate(&["/players"]);
                Ok::<_, &str>(1)
            })
            .await;

        assert_eq!(racing.origin, CacheOrigin::Fetched);
        assert_eq!(racing.value, 1);
        assert!(cache.is_empty());

        let next = read(&cache, &calls, Ok(2)).await;
        assert_eq!(next.origin, CacheOrigin::Fetched);
        assert_eq!(next.value, 2);
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        let cached = read(&cache, &calls, Ok(3)).await;
        assert_eq!(cached.origin, CacheOrigin::Fresh);
        assert_eq!(cached.value, 2);
    }

    #[tokio::test]
    async fn refresh_racing_a_full_flush_is_not_stored() {
        let cache = ResponseCache::with_policy(StalePolicy::ServeStale);

        cache
            .get_or_fetch("/stats", TTL, 0, || async {
                cache.invalidate_all();
                Ok::<_, &str>(5)
            })
            .await;

        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn invalidating_another_key_does_not_block_a_refresh() {
        let cache = ResponseCache::with_policy(StalePolicy::ServeStale);

        cache
            .get_or_fetch("/players", TTL, 0, || async {
                cache.invalidate(&["/votes/10"]);
                Ok::<_, &str>(4)
            })
            .await;

        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn resource_label_uses_first_segment() {
        assert_eq!(resource_label("/votes/12"), "votes");
        assert_eq!(resource_label("/stats"), "stats");
    }
}
