//! Optimistic mutations over a [`QueryCache`].
//!
//! One invocation runs the whole protocol:
//!
//! 1. cancel in-flight reads of the key,
//! 2. snapshot the cached value,
//! 3. apply the updater to the cache right away,
//! 4. run the remote call,
//! 5. on failure restore the snapshot,
//! 6. on success hand the result to the success callback,
//! 7. in both cases mark the key stale and refetch it once.
//!
//! Only use this for changes that are a cheap, invertible transform of data
//! already in the cache (moves, removals, edits). Creations and workflow
//! transitions wait for the server instead.

use super::query::QueryCache;
use crate::client::{ClientError, ClientResult};
use std::future::Future;
use std::hash::Hash;
use thiserror::Error;

/// Mutation errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MutationError {
    #[error("Another change to this data is still being saved")]
    Pending,
    #[error(transparent)]
    Client(#[from] ClientError),
}

/// Result type for mutations.
pub type MutationResult<T> = Result<T, MutationError>;

/// Pre-mutation value of the cache, scoped to one invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheSnapshot<V> {
    /// `None` if the key was not cached.
    pub value: Option<V>,
}

/// Holds the mutation slot of a key; released on drop.
struct MutationSlot<'a, K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    cache: &'a QueryCache<K, V>,
    key: K,
}

impl<'a, K, V> MutationSlot<'a, K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    fn claim(cache: &'a QueryCache<K, V>, key: &K) -> MutationResult<Self> {
        if !cache.try_claim(key) {
            return Err(MutationError::Pending);
        }
        Ok(Self {
            cache,
            key: key.clone(),
        })
    }
}

impl<K, V> Drop for MutationSlot<'_, K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    fn drop(&mut self) {
        self.cache.release(&self.key);
    }
}

type Updater<'a, V, I> = Box<dyn Fn(&V, &I) -> Option<V> + 'a>;
type SuccessHook<'a, R> = Box<dyn FnOnce(&R) + 'a>;

/// An optimistic change to one cached collection.
pub struct OptimisticMutation<'a, K, V, I, R>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    cache: &'a QueryCache<K, V>,
    key: K,
    updater: Updater<'a, V, I>,
    on_success: Option<SuccessHook<'a, R>>,
}

impl<'a, K, V, I, R> OptimisticMutation<'a, K, V, I, R>
where
    K: Eq + Hash + Clone + 'a,
    V: Clone + 'a,
{
    /// `updater` computes the optimistic value; returning `None` skips the
    /// optimistic write for this invocation.
    pub fn new(
        cache: &'a QueryCache<K, V>,
        key: K,
        updater: impl Fn(&V, &I) -> Option<V> + 'a,
    ) -> Self {
        Self {
            cache,
            key,
            updater: Box::new(updater),
            on_success: None,
        }
    }

    /// Called with the remote result before the cache is resynchronized.
    pub fn on_success(mut self, hook: impl FnOnce(&R) + 'a) -> Self {
        self.on_success = Some(Box::new(hook));
        self
    }

    /// Run the protocol. `mutate` performs the remote change; `refetch`
    /// reads the authoritative value afterwards.
    pub async fn run<M, MFut, F, FFut>(
        self,
        input: I,
        mutate: M,
        refetch: F,
    ) -> MutationResult<R>
    where
        M: FnOnce(I) -> MFut,
        MFut: Future<Output = ClientResult<R>>,
        F: FnOnce() -> FFut,
        FFut: Future<Output = ClientResult<V>> + 'a,
    {
        let Self {
            cache,
            key,
            updater,
            on_success,
        } = self;
        let _slot = MutationSlot::claim(cache, &key)?;

        cache.cancel(&key);
        let snapshot = CacheSnapshot {
            value: cache.get(&key),
        };
        if let Some(next) = snapshot.value.as_ref().and_then(|v| updater(v, &input)) {
            cache.replace(&key, Some(next));
        }

        let result = mutate(input).await;

        match &result {
            Err(e) => {
                log::warn!("mutation failed, rolling back: {e}");
                cache.replace(&key, snapshot.value);
            }
            Ok(value) => {
                if let Some(hook) = on_success {
                    hook(value);
                }
            }
        }

        cache.invalidate(&key);
        if let Err(e) = cache.fetch(key, refetch()).await {
            log::error!("resync after mutation failed: {e}");
        }

        result.map_err(MutationError::from)
    }
}
