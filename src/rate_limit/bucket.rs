/// Per-key token bucket state.
///
/// Holds at most `capacity` tokens, refilled continuously at a fixed rate.
/// Carries no synchronization of its own; the owning limiter serializes access.
#[derive(Debug, Clone, PartialEq)]
pub struct TokenBucket {
    tokens: f64,
    last_refill_nanos: u64,
}

impl TokenBucket {
    /// A full bucket stamped at `now_nanos`.
    pub fn full(capacity: f64, now_nanos: u64) -> Self {
        Self { tokens: capacity, last_refill_nanos: now_nanos }
    }

    /// Tokens currently held (may be fractional).
    pub fn tokens(&self) -> f64 {
        self.tokens
    }

    /// Clock reading of the last refill.
    pub fn last_refill_nanos(&self) -> u64 {
        self.last_refill_nanos
    }

    /// Credit tokens accrued since the last refill, capped at `capacity`.
    ///
    /// The rate is `capacity / window_nanos`; multiplying before dividing keeps
    /// whole-token boundaries exact. A reading older than the stored one adds
    /// nothing and leaves the timestamp untouched.
    pub fn refill(&mut self, now_nanos: u64, capacity: f64, window_nanos: u64) {
        let elapsed = now_nanos.saturating_sub(self.last_refill_nanos) as f64;
        let accrued = elapsed * capacity / window_nanos.max(1) as f64;
        self.tokens = (self.tokens + accrued).min(capacity);
        self.last_refill_nanos = self.last_refill_nanos.max(now_nanos);
    }

    /// Take one token if a whole one is available.
    pub fn try_take(&mut self) -> bool {
        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }

    /// True when untouched for longer than `ttl_nanos`.
    pub fn is_idle(&self, now_nanos: u64, ttl_nanos: u64) -> bool {
        now_nanos.saturating_sub(self.last_refill_nanos) > ttl_nanos
    }
}
