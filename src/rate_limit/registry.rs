//! Registry of live rate limiters.
//!
//! Lets process shutdown stop every limiter's sweep task in one call. The
//! registry only holds weak references; it never keeps a limiter alive.

use super::config::RateLimiterConfig;
use super::limiter::TokenBucketLimiter;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use tracing::{debug, warn};

/// Cloneable handle to a shared set of limiters.
///
/// Create one at startup, hand it to every limiter constructor, and call
/// [`stop_all`](Self::stop_all) once during shutdown.
#[derive(Default, Clone, Debug)]
pub struct LimiterRegistry {
    inner: Arc<Mutex<HashMap<u64, Weak<TokenBucketLimiter>>>>,
}

impl LimiterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<u64, Weak<TokenBucketLimiter>>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Start a limiter registered with this registry.
    ///
    /// # Panics
    /// Panics if called outside a tokio runtime.
    pub fn start_limiter(&self, config: RateLimiterConfig) -> Arc<TokenBucketLimiter> {
        TokenBucketLimiter::start(config, Some(self))
    }

    /// Track `limiter`; replaces any entry with the same id.
    pub fn register(&self, limiter: &Arc<TokenBucketLimiter>) {
        let mut map = self.lock();
        if map.insert(limiter.id(), Arc::downgrade(limiter)).is_some() {
            warn!(target: "eventgate::rate_limit::registry", limiter = limiter.id(), "limiter registered twice; last registration wins");
        }
    }

    /// Forget a limiter. Unknown ids are ignored.
    pub fn deregister(&self, id: u64) {
        self.lock().remove(&id);
    }

    /// Whether `id` is tracked and still alive.
    pub fn contains(&self, id: u64) -> bool {
        self.lock().get(&id).is_some_and(|weak| weak.strong_count() > 0)
    }

    /// Number of tracked limiters that are still alive.
    pub fn len(&self) -> usize {
        let mut map = self.lock();
        map.retain(|_, weak| weak.strong_count() > 0);
        map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Stop every registered limiter and wait for their sweep tasks to exit.
    ///
    /// Works on a snapshot: the lock is released before any limiter is
    /// stopped, since stopping deregisters.
    pub async fn stop_all(&self) {
        let snapshot: Vec<Arc<TokenBucketLimiter>> = {
            let mut map = self.lock();
            let live = map.values().filter_map(Weak::upgrade).collect();
            map.clear();
            live
        };
        let count = snapshot.len();
        futures::future::join_all(snapshot.iter().map(|limiter| limiter.stop())).await;
        debug!(target: "eventgate::rate_limit::registry", stopped = count, "all rate limiters stopped");
    }
}
