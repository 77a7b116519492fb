use futures::future::{BoxFuture, FutureExt, Shared};
use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

type Call<T> = Shared<BoxFuture<'static, T>>;
type Calls<T> = Arc<Mutex<HashMap<String, (u64, Call<T>)>>>;

/// Coalesces concurrent calls for the same key into one underlying future.
///
/// The first caller for a key (the leader) starts the work; callers arriving
/// while it is running await the same shared result. The key is released
/// when the leader finishes or is dropped, so the next call after that
/// starts fresh work. Results are cloned to every waiter, so errors have to
/// be shareable (wrap them in `Arc`).
pub struct SingleFlight<T> {
    calls: Calls<T>,
    next_id: AtomicU64,
}

impl<T> SingleFlight<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self {
            calls: Arc::new(Mutex::new(HashMap::new())),
            next_id: AtomicU64::new(0),
        }
    }

    /// Runs `make()` for `key` unless a call for `key` is already in flight,
    /// in which case its result is awaited instead. `make` is not invoked
    /// when joining.
    pub async fn run<F, Fut>(&self, key: &str, make: F) -> T
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T> + Send + 'static,
    {
        let (call, guard) = {
            let mut calls = lock(&self.calls);
            match calls.get(key) {
                Some((_, call)) => {
                    tracing::debug!(key, "Joining in-flight call");
                    (call.clone(), None)
                }
                None => {
                    let id = self.next_id.fetch_add(1, Ordering::Relaxed);
                    let call = make().boxed().shared();
                    calls.insert(key.to_owned(), (id, call.clone()));
                    let guard = LeaderGuard {
                        calls: Arc::clone(&self.calls),
                        key: key.to_owned(),
                        id,
                    };
                    (call, Some(guard))
                }
            }
        };

        let result = call.await;
        drop(guard);
        result
    }

    /// Number of keys with a call currently in flight.
    pub fn in_flight(&self) -> usize {
        lock(&self.calls).len()
    }
}

impl<T> Default for SingleFlight<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

fn lock<T>(calls: &Calls<T>) -> MutexGuard<'_, HashMap<String, (u64, Call<T>)>> {
    calls.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Releases the leader's key on completion or cancellation.
struct LeaderGuard<T> {
    calls: Calls<T>,
    key: String,
    id: u64,
}

impl<T> Drop for LeaderGuard<T> {
    fn drop(&mut self) {
        let mut calls = lock(&self.calls);
        // A newer call may already own the key if this one was cancelled.
        if calls.get(&self.key).is_some_and(|(id, _)| *id == self.id) {
            calls.remove(&self.key);
        }
    }
}
