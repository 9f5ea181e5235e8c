//! Time-bounded in-memory caches shared between concurrent triggers.

use std::collections::VecDeque;
use std::hash::Hash;
use std::time::Duration;

use dashmap::DashMap;
use tokio::time::Instant;

/// Key/value cache whose entries expire a fixed time after insertion.
///
/// Expiry is passive: stale entries are dropped when read or when
/// [`TtlCache::purge_expired`] runs.
#[derive(Debug)]
pub struct TtlCache<K, V>
where
    K: Eq + Hash,
{
    entries: DashMap<K, (V, Instant)>,
    ttl: Duration,
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Get a live entry.
    pub fn get(&self, key: &K) -> Option<V> {
        let now = Instant::now();
        if let Some(entry) = self.entries.get(key) {
            let (value, expires_at) = entry.value();
            if *expires_at > now {
                return Some(value.clone());
            }
        }
        // guard dropped above; remove only if still expired
        self.entries.remove_if(key, |_, (_, expires_at)| *expires_at <= now);
        None
    }

    pub fn insert(&self, key: K, value: V) {
        self.entries.insert(key, (value, Instant::now() + self.ttl));
    }

    pub fn remove(&self, key: &K) -> Option<V> {
        self.entries.remove(key).map(|(_, (value, _))| value)
    }

    /// Drop every expired entry, returning how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries.retain(|_, (_, expires_at)| *expires_at > now);
        before.saturating_sub(self.entries.len())
    }

    /// Number of stored entries, expired ones included until purged.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Sliding-window rate limiter: at most `limit` uses per key within `window`.
#[derive(Debug)]
pub struct Cooldown<K>
where
    K: Eq + Hash,
{
    uses: DashMap<K, VecDeque<Instant>>,
    limit: usize,
    window: Duration,
}

impl<K> Cooldown<K>
where
    K: Eq + Hash,
{
    pub fn new(limit: usize, window: Duration) -> Self {
        Self {
            uses: DashMap::new(),
            limit: limit.max(1),
            window,
        }
    }

    /// Record a use of `key`.
    ///
    /// Returns how long to wait if the key already used up its window.
    pub fn try_acquire(&self, key: K) -> Result<(), Duration> {
        let now = Instant::now();
        let mut entry = self.uses.entry(key).or_default();
        let uses = entry.value_mut();

        while uses
            .front()
            .is_some_and(|first| now.duration_since(*first) >= self.window)
        {
            uses.pop_front();
        }

        if uses.len() >= self.limit {
            let oldest = uses.front().copied().unwrap_or(now);
            return Err(self.window.saturating_sub(now.duration_since(oldest)));
        }

        uses.push_back(now);
        Ok(())
    }

    /// Forget keys whose uses have all left the window.
    pub fn purge_expired(&self) {
        let now = Instant::now();
        self.uses.retain(|_, uses| {
            uses.back()
                .is_some_and(|last| now.duration_since(*last) < self.window)
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_entries_expire_after_ttl() {
        let cache = TtlCache::new(Duration::from_secs(60));
        cache.insert("a", 1);

        tokio::time::advance(Duration::from_secs(59)).await;
        assert_eq!(cache.get(&"a"), Some(1));

        tokio::time::advance(Duration::from_secs(2)).await;
        assert_eq!(cache.get(&"a"), None);
        assert!(cache.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_purge_expired() {
        let cache = TtlCache::new(Duration::from_secs(10));
        cache.insert(1u64, "one");
        tokio::time::advance(Duration::from_secs(5)).await;
        cache.insert(2u64, "two");
        tokio::time::advance(Duration::from_secs(6)).await;

        assert_eq!(cache.purge_expired(), 1);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get(&2), Some("two"));
        assert_eq!(cache.remove(&2), Some("two"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cooldown_window() {
        let cooldown = Cooldown::new(3, Duration::from_secs(60));

        for _ in 0..3 {
            assert!(cooldown.try_acquire(7u64).is_ok());
        }
        let wait = cooldown.try_acquire(7).unwrap_err();
        assert_eq!(wait, Duration::from_secs(60));

        // other keys are independent
        assert!(cooldown.try_acquire(8).is_ok());

        tokio::time::advance(Duration::from_secs(45)).await;
        assert_eq!(cooldown.try_acquire(7).unwrap_err(), Duration::from_secs(15));

        tokio::time::advance(Duration::from_secs(15)).await;
        assert!(cooldown.try_acquire(7).is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cooldown_purge() {
        let cooldown = Cooldown::new(1, Duration::from_secs(15));
        cooldown.try_acquire(("user", "login")).unwrap();
        tokio::time::advance(Duration::from_secs(16)).await;
        cooldown.purge_expired();
        assert!(cooldown.uses.is_empty());
    }
}
