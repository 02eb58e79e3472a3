use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use futures_util::FutureExt;
use futures_util::future::{BoxFuture, Shared, WeakShared};
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use crate::error::Result;
use crate::metrics::{DEDUP_JOINS, IN_FLIGHT_GENERATIONS};

type Generation<T> = Shared<BoxFuture<'static, Result<T>>>;

// In-flight entry for one key.
// Only a weak handle lives here: once every waiter is gone the generation is dropped.
struct Slot<T> {
    id: u64,
    handle: WeakShared<BoxFuture<'static, Result<T>>>,
}

// Clears the slot when the generation settles or is dropped
struct SlotGuard<T> {
    in_flight: Arc<DashMap<String, Slot<T>>>,
    key: String,
    id: u64,
}

impl<T> Drop for SlotGuard<T> {
    fn drop(&mut self) {
        let id = self.id;
        self.in_flight.remove_if(&self.key, |_, slot| slot.id == id);
        IN_FLIGHT_GENERATIONS.dec();
    }
}

/// Collapses concurrent requests for the same key into one upstream call.
///
/// Every caller that arrives while a generation for `key` is running awaits
/// that same generation and gets a clone of its result, success or error.
/// Nothing is kept after settlement, so the next call starts over.
pub struct Deduplicator<T> {
    in_flight: Arc<DashMap<String, Slot<T>>>,
    next_id: AtomicU64,
}

impl<T> Default for Deduplicator<T> {
    fn default() -> Self {
        Self {
            in_flight: Arc::new(DashMap::new()),
            next_id: AtomicU64::new(0),
        }
    }
}

impl<T> Deduplicator<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get_or_create<F, Fut>(&self, key: &str, factory: F) -> Result<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        let (generation, started) = self.attach_or_start(key, factory);
        if started {
            tracing::debug!(key, "started generation");
        } else {
            DEDUP_JOINS.inc();
            tracing::debug!(key, "joined in-flight generation");
        }
        generation.await
    }

    // Number of keys with a generation currently registered
    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    // Must not touch other shards while the entry guard is held
    fn attach_or_start<F, Fut>(&self, key: &str, factory: F) -> (Generation<T>, bool)
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        match self.in_flight.entry(key.to_string()) {
            Entry::Occupied(mut occupied) => {
                if let Some(generation) = occupied.get().handle.upgrade() {
                    return (generation, false);
                }
                // every waiter left before it settled
                let (slot, generation) = self.start(key, factory);
                occupied.insert(slot);
                (generation, true)
            }
            Entry::Vacant(vacant) => {
                let (slot, generation) = self.start(key, factory);
                vacant.insert(slot);
                (generation, true)
            }
        }
    }

    fn start<F, Fut>(&self, key: &str, factory: F) -> (Slot<T>, Generation<T>)
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        IN_FLIGHT_GENERATIONS.inc();
        let guard = SlotGuard {
            in_flight: Arc::clone(&self.in_flight),
            key: key.to_string(),
            id,
        };
        let call = factory();
        let generation = async move {
            let _guard = guard;
            call.await
        }
        .boxed()
        .shared();

        // not polled yet, so downgrade cannot fail
        let handle = generation
            .downgrade()
            .unwrap_or_else(|| unreachable!("fresh shared future is always pending"));
        (Slot { id, handle }, generation)
    }
}
