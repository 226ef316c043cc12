//! Keyed read cache with stale tracking and read cancellation.

use crate::client::ClientResult;
use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::hash::Hash;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Outcome of a cache fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchStatus {
    /// The fetched value was stored.
    Updated,
    /// The read was cancelled while in flight; its result was dropped.
    Discarded,
}

#[derive(Debug)]
struct Entry<V> {
    value: Option<V>,
    stale: bool,
    /// Bumped on cancellation; in-flight reads from an older generation
    /// are dropped on arrival.
    generation: u64,
}

impl<V> Default for Entry<V> {
    fn default() -> Self {
        Self {
            value: None,
            stale: true,
            generation: 0,
        }
    }
}

#[derive(Debug)]
struct State<K, V> {
    entries: HashMap<K, Entry<V>>,
    pending_mutations: HashSet<K>,
}

/// Local copy of remotely stored collections, keyed structurally.
///
/// Only fetches and the optimistic mutation protocol write to it; both live
/// in this module tree.
#[derive(Debug)]
pub struct QueryCache<K, V> {
    state: RwLock<State<K, V>>,
}

impl<K, V> Default for QueryCache<K, V> {
    fn default() -> Self {
        Self {
            state: RwLock::new(State {
                entries: HashMap::new(),
                pending_mutations: HashSet::new(),
            }),
        }
    }
}

impl<K, V> QueryCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, State<K, V>> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, State<K, V>> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Cached value for `key`, if any.
    pub fn get(&self, key: &K) -> Option<V> {
        self.read().entries.get(key).and_then(|e| e.value.clone())
    }

    /// Whether the value is missing or must be refetched.
    pub fn is_stale(&self, key: &K) -> bool {
        self.read().entries.get(key).is_none_or(|e| e.stale)
    }

    /// Mark a value as out of date.
    pub fn invalidate(&self, key: &K) {
        self.write().entries.entry(key.clone()).or_default().stale = true;
    }

    /// Drop the results of every read for `key` currently in flight.
    pub fn cancel(&self, key: &K) {
        self.write().entries.entry(key.clone()).or_default().generation += 1;
    }

    fn generation(&self, key: &K) -> u64 {
        self.read().entries.get(key).map_or(0, |e| e.generation)
    }

    /// Read `key` through `request` and store the result.
    ///
    /// The read is tagged when this is called, not when the future is
    /// first polled, so a [`cancel`](Self::cancel) issued in between drops it.
    pub fn fetch<'a, Fut>(
        &'a self,
        key: K,
        request: Fut,
    ) -> impl Future<Output = ClientResult<FetchStatus>> + 'a
    where
        Fut: Future<Output = ClientResult<V>> + 'a,
        K: 'a,
        V: 'a,
    {
        let generation = self.generation(&key);
        async move {
            let value = request.await?;
            let mut state = self.write();
            let entry = state.entries.entry(key).or_default();
            if entry.generation != generation {
                return Ok(FetchStatus::Discarded);
            }
            entry.value = Some(value);
            entry.stale = false;
            Ok(FetchStatus::Updated)
        }
    }

    /// Overwrite the cached value (optimistic write or rollback).
    /// `None` restores the "not cached" state.
    pub(crate) fn replace(&self, key: &K, value: Option<V>) {
        self.write().entries.entry(key.clone()).or_default().value = value;
    }

    /// Whether a mutation for `key` is outstanding.
    pub fn is_mutating(&self, key: &K) -> bool {
        self.read().pending_mutations.contains(key)
    }

    /// Claim the mutation slot of `key`; `false` if already taken.
    pub(crate) fn try_claim(&self, key: &K) -> bool {
        self.write().pending_mutations.insert(key.clone())
    }

    pub(crate) fn release(&self, key: &K) {
        self.write().pending_mutations.remove(key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::ClientError;
    use pollster::block_on;

    #[test]
    fn test_fetch_stores_value() {
        let cache: QueryCache<&str, Vec<u32>> = QueryCache::new();
        assert!(cache.is_stale(&"items"));

        let status = block_on(cache.fetch("items", async { Ok(vec![1, 2]) })).unwrap();

        assert_eq!(status, FetchStatus::Updated);
        assert_eq!(cache.get(&"items"), Some(vec![1, 2]));
        assert!(!cache.is_stale(&"items"));
    }

    #[test]
    fn test_failed_fetch_keeps_previous_value() {
        let cache: QueryCache<&str, Vec<u32>> = QueryCache::new();
        block_on(cache.fetch("items", async { Ok(vec![1]) })).unwrap();
        cache.invalidate(&"items");

        let result = block_on(cache.fetch("items", async {
            Err(ClientError::Other("offline".into()))
        }));

        assert!(result.is_err());
        assert_eq!(cache.get(&"items"), Some(vec![1]));
        assert!(cache.is_stale(&"items"));
    }

    #[test]
    fn test_cancelled_read_is_discarded() {
        let cache: QueryCache<&str, Vec<u32>> = QueryCache::new();
        let in_flight = cache.fetch("items", async { Ok(vec![9]) });
        cache.cancel(&"items");

        assert_eq!(block_on(in_flight).unwrap(), FetchStatus::Discarded);
        assert_eq!(cache.get(&"items"), None);
    }

    #[test]
    fn test_cancel_is_per_key() {
        let cache: QueryCache<(u8, u8), u32> = QueryCache::new();
        let other = cache.fetch((1, 2), async { Ok(5) });
        cache.cancel(&(1, 3));
        assert_eq!(block_on(other).unwrap(), FetchStatus::Updated);
    }

    #[test]
    fn test_mutation_slot_is_exclusive() {
        let cache: QueryCache<&str, u32> = QueryCache::new();
        assert!(cache.try_claim(&"k"));
        assert!(!cache.try_claim(&"k"));
        assert!(cache.is_mutating(&"k"));
        cache.release(&"k");
        assert!(!cache.is_mutating(&"k"));
    }
}
