use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use futures::future::{BoxFuture, FutureExt, Shared};
use serde::Serialize;
use std::future::Future;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing::debug;

/// Source of "now" for staleness checks.
pub trait Clock: Send + Sync + 'static {
    fn now(&self) -> Instant;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Clock that only moves when told to. Used by tests to expire entries.
#[derive(Debug, Clone)]
pub struct ManualClock {
    base: Instant,
    offset: Arc<Mutex<Duration>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            base: Instant::now(),
            offset: Arc::new(Mutex::new(Duration::ZERO)),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut offset = self.offset.lock().unwrap_or_else(|e| e.into_inner());
        *offset += by;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        let offset = self.offset.lock().unwrap_or_else(|e| e.into_inner());
        self.base + *offset
    }
}

#[derive(Debug, Clone)]
struct CacheEntry<V> {
    value: V,
    stored_at: Instant,
}

/// Snapshot of cache counters, exposed on the health route.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub coalesced: u64,
    pub entries: usize,
}

#[derive(Debug, Default)]
struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
    coalesced: AtomicU64,
}

type InFlight<V> = Shared<BoxFuture<'static, V>>;

/// Per-key staleness cache with in-flight request de-duplication.
///
/// A fresh entry is served until `ttl` elapses. Concurrent misses on the same
/// key share one fetch future; whichever caller completes first stores the
/// result.
pub struct QueryCache<K, V> {
    name: &'static str,
    ttl: Duration,
    clock: Arc<dyn Clock>,
    entries: DashMap<K, CacheEntry<V>>,
    in_flight: DashMap<K, InFlight<V>>,
    counters: Counters,
}

impl<K, V> QueryCache<K, V>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    pub fn new(name: &'static str, ttl: Duration) -> Self {
        Self::with_clock(name, ttl, Arc::new(SystemClock))
    }

    pub fn with_clock(name: &'static str, ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            name,
            ttl,
            clock,
            entries: DashMap::new(),
            in_flight: DashMap::new(),
            counters: Counters::default(),
        }
    }

    fn is_fresh(&self, entry: &CacheEntry<V>, now: Instant) -> bool {
        now.saturating_duration_since(entry.stored_at) < self.ttl
    }

    /// Fresh value for `key`, if any. A stale entry is dropped on read.
    pub fn get(&self, key: &K) -> Option<V> {
        let now = self.clock.now();
        {
            let entry = self.entries.get(key)?;
            if self.is_fresh(&entry, now) {
                return Some(entry.value.clone());
            }
        }
        self.entries.remove_if(key, |_, entry| !self.is_fresh(entry, now));
        None
    }

    /// Store `value` and sweep every entry whose window has elapsed.
    pub fn insert(&self, key: K, value: V) {
        let now = self.clock.now();
        self.entries.retain(|_, entry| self.is_fresh(entry, now));
        self.entries.insert(key, CacheEntry { value, stored_at: now });
    }

    /// Return the cached value or run `fetch`, storing every result.
    pub async fn get_or_fetch<F, Fut>(&self, key: K, fetch: F) -> V
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = V> + Send + 'static,
    {
        self.get_or_fetch_if(key, fetch, |_| true).await
    }

    /// Return the cached value or run `fetch`, storing the result only when
    /// `keep` accepts it. Rejected results are still shared with concurrent
    /// waiters but are not reused afterwards.
    pub async fn get_or_fetch_if<F, Fut, P>(&self, key: K, fetch: F, keep: P) -> V
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = V> + Send + 'static,
        P: Fn(&V) -> bool,
    {
        if let Some(value) = self.get(&key) {
            self.counters.hits.fetch_add(1, Ordering::Relaxed);
            return value;
        }

        let shared = match self.in_flight.entry(key.clone()) {
            Entry::Occupied(existing) => {
                self.counters.coalesced.fetch_add(1, Ordering::Relaxed);
                debug!("{} cache: joining in-flight fetch", self.name);
                existing.get().clone()
            }
            Entry::Vacant(slot) => {
                self.counters.misses.fetch_add(1, Ordering::Relaxed);
                let future = fetch().boxed().shared();
                slot.insert(future.clone());
                future
            }
        };

        let value = shared.clone().await;

        let owns_slot = self
            .in_flight
            .get(&key)
            .map(|current| current.ptr_eq(&shared))
            .unwrap_or(false);
        if owns_slot {
            if keep(&value) {
                self.insert(key.clone(), value.clone());
            }
            self.in_flight.remove_if(&key, |_, current| current.ptr_eq(&shared));
        }

        value
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.counters.hits.load(Ordering::Relaxed),
            misses: self.counters.misses.load(Ordering::Relaxed),
            coalesced: self.counters.coalesced.load(Ordering::Relaxed),
            entries: self.entries.len(),
        }
    }
}
