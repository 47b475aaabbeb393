//! Time-bounded response cache.
//!
//! Each key owns a slot guarded by its own async mutex. A caller holds the
//! slot lock across the fetch, so concurrent requests for the same key wait
//! for one backend round-trip instead of racing. Different keys never block
//! each other beyond the short map lock.

use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;

struct Entry<V> {
    value: V,
    stored_at: Instant,
    ttl: Duration,
}

impl<V> Entry<V> {
    fn is_fresh(&self, now: Instant, ttl: Duration) -> bool {
        now.duration_since(self.stored_at) < ttl
    }
}

type Slot<V> = Arc<Mutex<Option<Entry<V>>>>;

/// Expiry-based memo keyed by call arguments.
///
/// Entries leave only through `sweep_expired`, `clear` or process exit.
pub struct TtlCache<K, V> {
    slots: Mutex<HashMap<K, Slot<V>>>,
}

impl<K, V> Default for TtlCache<K, V> {
    fn default() -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
        }
    }
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash + Clone + std::fmt::Debug,
    V: Clone,
{
    pub fn new() -> Self {
        Self::default()
    }

    async fn slot(&self, key: &K) -> Slot<V> {
        let mut slots = self.slots.lock().await;
        Arc::clone(slots.entry(key.clone()).or_default())
    }

    /// Returns the cached value for `key` if younger than `ttl`, otherwise
    /// runs `fetch`, stores its result and returns it.
    pub async fn get_or_fetch<F, Fut>(&self, key: K, ttl: Duration, fetch: F) -> V
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = V>,
    {
        let slot = self.slot(&key).await;
        let mut entry = slot.lock().await;
        if let Some(cached) = entry.as_ref() {
            if cached.is_fresh(Instant::now(), ttl) {
                debug!(?key, "cache hit");
                return cached.value.clone();
            }
        }

        debug!(?key, "cache miss");
        let value = fetch().await;
        *entry = Some(Entry {
            value: value.clone(),
            stored_at: Instant::now(),
            ttl,
        });
        value
    }

    /// Like `get_or_fetch`, but a `None` from `fetch` is not stored: the
    /// previous value is returned even if expired, or `None` if there never
    /// was one.
    pub async fn get_or_refresh<F, Fut>(&self, key: K, ttl: Duration, fetch: F) -> Option<V>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Option<V>>,
    {
        let slot = self.slot(&key).await;
        let mut entry = slot.lock().await;
        if let Some(cached) = entry.as_ref() {
            if cached.is_fresh(Instant::now(), ttl) {
                debug!(?key, "cache hit");
                return Some(cached.value.clone());
            }
        }

        match fetch().await {
            Some(value) => {
                *entry = Some(Entry {
                    value: value.clone(),
                    stored_at: Instant::now(),
                    ttl,
                });
                Some(value)
            }
            None => {
                let stale = entry.as_ref().map(|cached| cached.value.clone());
                if stale.is_some() {
                    debug!(?key, "refresh failed, serving stale entry");
                }
                stale
            }
        }
    }

    /// Drops entries older than the TTL they were stored with. Slots that are
    /// mid-fetch are left alone. Returns the number of entries removed.
    pub async fn sweep_expired(&self) -> usize {
        let now = Instant::now();
        let mut slots = self.slots.lock().await;
        let before = slots.len();
        slots.retain(|_, slot| match slot.try_lock() {
            Ok(entry) => entry
                .as_ref()
                .is_some_and(|cached| cached.is_fresh(now, cached.ttl)),
            Err(_) => true,
        });
        before - slots.len()
    }

    pub async fn len(&self) -> usize {
        self.slots.lock().await.len()
    }

    pub async fn clear(&self) {
        self.slots.lock().await.clear();
    }
}
