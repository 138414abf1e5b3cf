use crate::error::{ControlError, Result};
use futures_util::future::{BoxFuture, FutureExt, Shared};
use std::collections::HashMap;
use std::fmt::Debug;
use std::future::Future;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

type SharedExecution<T> = Shared<BoxFuture<'static, Result<T>>>;
type PendingMap<K, T> = Mutex<HashMap<K, PendingExecution<T>>>;

struct PendingExecution<T> {
    generation: u64,
    execution: SharedExecution<T>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Deduplicated<T> {
    pub value: T,
    /// `true` when this caller attached to an execution another caller started.
    pub joined: bool,
}

/// Coalesces concurrent calls that share a key into one underlying execution.
///
/// The execution runs as its own task, so it settles even if every waiter goes away. Its
/// registration is removed as soon as it settles (success, failure or panic); the next call
/// with the same key starts fresh.
pub struct InFlightDeduplicator<K, T> {
    pending: Arc<PendingMap<K, T>>,
    next_generation: AtomicU64,
}

impl<K, T> Default for InFlightDeduplicator<K, T> {
    fn default() -> Self {
        Self {
            pending: Arc::new(Mutex::new(HashMap::new())),
            next_generation: AtomicU64::new(1),
        }
    }
}

impl<K, T> InFlightDeduplicator<K, T>
where
    K: Eq + Hash + Clone + Debug + Send + Sync + 'static,
    T: Clone + Send + Sync + 'static,
{
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn pending_count(&self) -> usize {
        lock(&self.pending).len()
    }

    /// Join the pending execution for `key`, or start one with `factory`.
    pub async fn dedupe<F, Fut>(&self, key: K, factory: F) -> Result<Deduplicated<T>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T> + Send + 'static,
    {
        let (execution, joined) = {
            let mut pending = lock(&self.pending);
            match pending.get(&key) {
                Some(existing) => (existing.execution.clone(), true),
                None => {
                    let generation = self.next_generation.fetch_add(1, Ordering::Relaxed);
                    let execution = self.start(key.clone(), generation, factory());
                    pending.insert(
                        key.clone(),
                        PendingExecution {
                            generation,
                            execution: execution.clone(),
                        },
                    );
                    (execution, false)
                }
            }
        };

        if joined {
            log::debug!("joined in-flight execution for {key:?}");
        }
        let value = execution.await?;
        Ok(Deduplicated { value, joined })
    }

    // Called with the pending map locked; the spawned task cannot deregister before the
    // registration exists.
    fn start<Fut>(&self, key: K, generation: u64, fut: Fut) -> SharedExecution<T>
    where
        Fut: Future<Output = T> + Send + 'static,
    {
        let guard = Deregister {
            pending: Arc::clone(&self.pending),
            key,
            generation,
        };
        let handle = tokio::spawn(async move {
            let _guard = guard;
            fut.await
        });
        async move {
            handle
                .await
                .map_err(|err| ControlError::TaskFailed(err.to_string()))
        }
        .boxed()
        .shared()
    }
}

struct Deregister<K, T>
where
    K: Eq + Hash,
{
    pending: Arc<PendingMap<K, T>>,
    key: K,
    generation: u64,
}

impl<K, T> Drop for Deregister<K, T>
where
    K: Eq + Hash,
{
    fn drop(&mut self) {
        let mut pending = lock(&self.pending);
        if pending
            .get(&self.key)
            .is_some_and(|entry| entry.generation == self.generation)
        {
            pending.remove(&self.key);
        }
    }
}

fn lock<K, T>(pending: &PendingMap<K, T>) -> MutexGuard<'_, HashMap<K, PendingExecution<T>>> {
    pending.lock().unwrap_or_else(PoisonError::into_inner)
}
