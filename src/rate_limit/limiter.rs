//! Keyed token-bucket limiter with a background idle sweep.

use super::bucket::TokenBucket;
use super::config::RateLimiterConfig;
use super::registry::LimiterRegistry;
use super::{Decision, RateLimiter};
use crate::clock::{Clock, MonotonicClock};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, warn};

static NEXT_LIMITER_ID: AtomicU64 = AtomicU64::new(1);

/// Bucket map plus everything the sweep task needs to evict from it.
#[derive(Debug)]
struct BucketTable {
    buckets: Mutex<HashMap<String, TokenBucket>>,
    clock: Arc<dyn Clock>,
    capacity: f64,
    window_nanos: u64,
    idle_ttl_nanos: u64,
}

impl BucketTable {
    fn lock(&self) -> MutexGuard<'_, HashMap<String, TokenBucket>> {
        // Every critical section leaves the map consistent, so a poisoned
        // lock is still safe to use.
        self.buckets.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn take(&self, key: &str, token_interval: Duration) -> Decision {
        let mut buckets = self.lock();
        let now = self.clock.now_nanos();
        if let Some(bucket) = buckets.get_mut(key) {
            return Self::take_from(bucket, now, self.capacity, self.window_nanos, token_interval);
        }
        let bucket =
            buckets.entry(key.to_owned()).or_insert_with(|| TokenBucket::full(self.capacity, now));
        Self::take_from(bucket, now, self.capacity, self.window_nanos, token_interval)
    }

    fn take_from(
        bucket: &mut TokenBucket,
        now: u64,
        capacity: f64,
        window_nanos: u64,
        token_interval: Duration,
    ) -> Decision {
        bucket.refill(now, capacity, window_nanos);
        if bucket.try_take() {
            Decision::Allowed { remaining: bucket.tokens().floor() as u32 }
        } else {
            Decision::Denied { retry_after: token_interval }
        }
    }

    fn sweep(&self) -> usize {
        let mut buckets = self.lock();
        let now = self.clock.now_nanos();
        let before = buckets.len();
        buckets.retain(|_, bucket| !bucket.is_idle(now, self.idle_ttl_nanos));
        before - buckets.len()
    }
}

/// Handle to the running sweep task.
#[derive(Debug)]
struct Sweeper {
    cancel: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

/// Per-key token-bucket rate limiter.
///
/// All buckets live behind one lock, so the read-refill-take sequence for any
/// key is a single critical section. A background task started with the
/// limiter evicts buckets idle for longer than two windows; [`stop`] ends that
/// task and waits for it to exit.
///
/// [`stop`]: TokenBucketLimiter::stop
#[derive(Debug)]
pub struct TokenBucketLimiter {
    id: u64,
    config: RateLimiterConfig,
    table: Arc<BucketTable>,
    sweeper: tokio::sync::Mutex<Option<Sweeper>>,
    registry: Option<LimiterRegistry>,
}

impl TokenBucketLimiter {
    /// Build a limiter and start its sweep task.
    ///
    /// When `registry` is given the limiter registers itself there so
    /// [`LimiterRegistry::stop_all`] can reach it.
    ///
    /// # Panics
    /// Panics if called outside a tokio runtime.
    pub fn start(config: RateLimiterConfig, registry: Option<&LimiterRegistry>) -> Arc<Self> {
        Self::start_with_clock(config, registry, Arc::new(MonotonicClock::default()))
    }

    /// Like [`start`](Self::start) with an injected clock for bucket timing.
    ///
    /// # Panics
    /// Panics if called outside a tokio runtime.
    pub fn start_with_clock(
        config: RateLimiterConfig,
        registry: Option<&LimiterRegistry>,
        clock: Arc<dyn Clock>,
    ) -> Arc<Self> {
        let table = Arc::new(BucketTable {
            buckets: Mutex::new(HashMap::new()),
            clock,
            capacity: f64::from(config.max_requests()),
            window_nanos: duration_nanos(config.window()),
            idle_ttl_nanos: duration_nanos(config.idle_ttl()),
        });
        let id = NEXT_LIMITER_ID.fetch_add(1, Ordering::Relaxed);
        let sweeper = spawn_sweeper(id, table.clone(), config.sweep_interval());
        let limiter = Arc::new(Self {
            id,
            config,
            table,
            sweeper: tokio::sync::Mutex::new(Some(sweeper)),
            registry: registry.cloned(),
        });
        if let Some(registry) = &limiter.registry {
            registry.register(&limiter);
        }
        debug!(
            target: "eventgate::rate_limit",
            limiter = id,
            max_requests = limiter.config.max_requests(),
            window = ?limiter.config.window(),
            "rate limiter started"
        );
        limiter
    }

    /// Process-unique identifier.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Validated configuration this limiter was started with.
    pub fn config(&self) -> &RateLimiterConfig {
        &self.config
    }

    /// Try to take one token for `key`.
    ///
    /// Unseen keys start with a full bucket. A denial reports how long until
    /// one token accrues.
    pub fn allow(&self, key: &str) -> Decision {
        self.table.take(key, self.config.token_interval())
    }

    /// Number of keys currently holding a bucket.
    pub fn tracked_keys(&self) -> usize {
        self.table.lock().len()
    }

    /// Tokens held by `key`'s bucket as of its last refill.
    pub fn tokens(&self, key: &str) -> Option<f64> {
        self.table.lock().get(key).map(TokenBucket::tokens)
    }

    /// Evict idle buckets now; returns how many were removed.
    pub fn sweep_now(&self) -> usize {
        self.table.sweep()
    }

    /// Whether the sweep task is running.
    pub async fn is_running(&self) -> bool {
        self.sweeper.lock().await.is_some()
    }

    /// Stop the sweep task and deregister.
    ///
    /// Returns once the task has observed cancellation and exited. Calling it
    /// again is a no-op. `allow` keeps working, but buckets are no longer swept.
    pub async fn stop(&self) {
        let mut guard = self.sweeper.lock().await;
        let Some(sweeper) = guard.take() else {
            return;
        };
        if let Some(registry) = &self.registry {
            registry.deregister(self.id);
        }
        // The task may already be gone if it panicked.
        let _ = sweeper.cancel.send(true);
        if let Err(err) = sweeper.handle.await {
            warn!(target: "eventgate::rate_limit", limiter = self.id, error = %err, "sweep task ended abnormally");
        }
        debug!(target: "eventgate::rate_limit", limiter = self.id, "rate limiter stopped");
    }

    /// Restart the sweep task after [`stop`](Self::stop) and re-register.
    /// No-op while running.
    ///
    /// # Panics
    /// Panics if called outside a tokio runtime.
    pub async fn resume(self: &Arc<Self>) {
        let mut guard = self.sweeper.lock().await;
        if guard.is_some() {
            return;
        }
        *guard = Some(spawn_sweeper(self.id, self.table.clone(), self.config.sweep_interval()));
        if let Some(registry) = &self.registry {
            registry.register(self);
        }
        debug!(target: "eventgate::rate_limit", limiter = self.id, "rate limiter resumed");
    }
}

#[cfg(test)]
impl TokenBucketLimiter {
    /// Live references to the bucket table; the sweep task holds one while running.
    pub(super) fn table_refs(&self) -> usize {
        Arc::strong_count(&self.table)
    }
}

impl RateLimiter for TokenBucketLimiter {
    fn allow(&self, key: &str) -> Decision {
        TokenBucketLimiter::allow(self, key)
    }

    fn limit(&self) -> u32 {
        self.config.max_requests()
    }
}

fn duration_nanos(d: Duration) -> u64 {
    u64::try_from(d.as_nanos()).unwrap_or(u64::MAX)
}

fn spawn_sweeper(id: u64, table: Arc<BucketTable>, period: Duration) -> Sweeper {
    let (cancel, rx) = watch::channel(false);
    let handle = tokio::spawn(sweep_loop(id, table, period, rx));
    Sweeper { cancel, handle }
}

async fn sweep_loop(id: u64, table: Arc<BucketTable>, period: Duration, mut cancel: watch::Receiver<bool>) {
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        if *cancel.borrow_and_update() {
            break;
        }
        tokio::select! {
            biased;
            changed = cancel.changed() => {
                // A closed channel means the limiter was dropped without stop().
                if changed.is_err() {
                    break;
                }
            }
            _ = ticker.tick() => {
                let evicted = table.sweep();
                if evicted > 0 {
                    debug!(target: "eventgate::rate_limit", limiter = id, evicted, "swept idle buckets");
                }
            }
        }
    }
    debug!(target: "eventgate::rate_limit", limiter = id, "sweep task exited");
}
