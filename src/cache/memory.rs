//! # In-Memory Identity Cache
//!
//! Process-local [`IdentityCache`] backed by a mutex-guarded map.
//! Expiry is evaluated against an injected [`Clock`]. An expired entry is
//! dropped when read, and writes sweep every expired entry at most once per
//! [`SWEEP_INTERVAL`] so keys that are never read again do not pile up.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::cache::port::IdentityCache;
use crate::time::{Clock, SystemClock};

/// Minimum time between two sweeps of expired entries.
pub const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Clone, Copy, Debug)]
struct Entry {
    user_id: i64,
    expires_at: Option<DateTime<Utc>>,
}

impl Entry {
    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

struct State {
    entries: HashMap<String, Entry>,
    next_sweep: DateTime<Utc>,
}

impl State {
    fn sweep_if_due(&mut self, now: DateTime<Utc>) {
        if now < self.next_sweep {
            return;
        }
        let before = self.entries.len();
        self.entries.retain(|_, e| !e.is_expired(now));
        self.next_sweep = after(now, SWEEP_INTERVAL);

        let swept = before - self.entries.len();
        if swept > 0 {
            tracing::debug!(swept, remaining = self.entries.len(), "swept expired auth proxy cache entries");
        }
    }
}

fn after(now: DateTime<Utc>, by: Duration) -> DateTime<Utc> {
    chrono::Duration::from_std(by)
        .ok()
        .and_then(|d| now.checked_add_signed(d))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

pub struct InMemoryIdentityCache {
    state: Mutex<State>,
    clock: Arc<dyn Clock>,
}

impl Default for InMemoryIdentityCache {
    fn default() -> Self {
        Self::new(Arc::new(SystemClock))
    }
}

impl InMemoryIdentityCache {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        let next_sweep = after(clock.now(), SWEEP_INTERVAL);
        Self {
            state: Mutex::new(State {
                entries: HashMap::new(),
                next_sweep,
            }),
            clock,
        }
    }

    /// Number of stored entries, expired but not yet swept ones included.
    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        // A poisoned map only ever holds complete entries.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl IdentityCache for InMemoryIdentityCache {
    async fn get(&self, key: &str) -> Result<Option<i64>> {
        let now = self.clock.now();
        let mut state = self.lock();

        match state.entries.get(key).copied() {
            Some(entry) if entry.is_expired(now) => {
                state.entries.remove(key);
                Ok(None)
            }
            Some(entry) => Ok(Some(entry.user_id)),
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, user_id: i64, ttl: Duration) -> Result<()> {
        let now = self.clock.now();
        let expires_at = if ttl.is_zero() {
            None
        } else {
            let ttl = chrono::Duration::from_std(ttl).context("cache ttl out of range")?;
            Some(now.checked_add_signed(ttl).context("cache ttl out of range")?)
        };

        let mut state = self.lock();
        state.sweep_if_due(now);
        state.entries.insert(key.to_string(), Entry { user_id, expires_at });
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.lock().entries.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::clock::testing::FixedClock;

    fn cache_with_clock() -> (InMemoryIdentityCache, Arc<FixedClock>) {
        let clock = Arc::new(FixedClock::at_epoch_offset(1_000));
        (InMemoryIdentityCache::new(clock.clone()), clock)
    }

    #[tokio::test]
    async fn get_returns_none_for_unknown_key() {
        let cache = InMemoryIdentityCache::default();
        assert_eq!(cache.get("nope").await.unwrap(), None);
    }

    #[tokio::test]
    async fn set_then_get_returns_value() {
        let cache = InMemoryIdentityCache::default();
        cache.set("k", 33, Duration::from_secs(60)).await.unwrap();

        assert_eq!(cache.get("k").await.unwrap(), Some(33));
    }

    #[tokio::test]
    async fn set_overwrites_previous_value() {
        let cache = InMemoryIdentityCache::default();
        cache.set("k", 33, Duration::ZERO).await.unwrap();
        cache.set("k", 1, Duration::ZERO).await.unwrap();

        assert_eq!(cache.get("k").await.unwrap(), Some(1));
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn entries_expire_after_ttl() {
        let (cache, clock) = cache_with_clock();
        cache.set("k", 7, Duration::from_secs(60)).await.unwrap();

        clock.advance(chrono::Duration::seconds(59));
        assert_eq!(cache.get("k").await.unwrap(), Some(7));

        clock.advance(chrono::Duration::seconds(1));
        assert_eq!(cache.get("k").await.unwrap(), None);
        assert!(cache.is_empty(), "expired entry should be evicted on read");
    }

    #[tokio::test]
    async fn zero_ttl_never_expires() {
        let (cache, clock) = cache_with_clock();
        cache.set("k", 7, Duration::ZERO).await.unwrap();

        clock.advance(chrono::Duration::days(3650));
        assert_eq!(cache.get("k").await.unwrap(), Some(7));
    }

    #[tokio::test]
    async fn writes_sweep_expired_entries_that_are_never_read() {
        let (cache, clock) = cache_with_clock();
        for i in 0..1000 {
            cache.set(&format!("k{i}"), i, Duration::from_secs(60)).await.unwrap();
        }
        cache.set("forever", 1, Duration::ZERO).await.unwrap();
        assert_eq!(cache.len(), 1001);

        clock.advance(chrono::Duration::seconds(3600));
        cache.set("fresh", 2, Duration::from_secs(60)).await.unwrap();

        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get("forever").await.unwrap(), Some(1));
        assert_eq!(cache.get("fresh").await.unwrap(), Some(2));
    }

    #[tokio::test]
    async fn sweep_keeps_live_entries_and_waits_for_interval() {
        let (cache, clock) = cache_with_clock();
        cache.set("short", 1, Duration::from_secs(5)).await.unwrap();
        cache.set("long", 2, Duration::from_secs(600)).await.unwrap();

        clock.advance(chrono::Duration::seconds(10));
        cache.set("other", 3, Duration::from_secs(600)).await.unwrap();
        // Sweep not due yet; the expired entry is still stored.
        assert_eq!(cache.len(), 3);

        clock.advance(chrono::Duration::seconds(60));
        cache.set("other", 3, Duration::from_secs(600)).await.unwrap();
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get("long").await.unwrap(), Some(2));
    }

    #[tokio::test]
    async fn huge_ttl_is_an_error_not_a_panic() {
        let cache = InMemoryIdentityCache::default();

        let err = cache
            .set("k", 1, Duration::from_secs(u64::MAX / 4))
            .await
            .unwrap_err();

        assert!(err.to_string().contains("out of range"));
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn delete_removes_entry_and_tolerates_missing_keys() {
        let cache = InMemoryIdentityCache::default();
        cache.set("k", 7, Duration::ZERO).await.unwrap();

        cache.delete("k").await.unwrap();
        cache.delete("k").await.unwrap();

        assert_eq!(cache.get("k").await.unwrap(), None);
    }
}
