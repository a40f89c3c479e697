//! Rate limiting primitives.
//!
//! This module provides the building blocks for per-key rate limiting:
//! - [`RateLimiter`]: The core trait for rate limiting logic.
//! - [`TokenBucketLimiter`]: Keyed token buckets with a background idle sweep.
//! - [`LimiterRegistry`]: Tracks live limiters so shutdown can stop them all.
//! - [`RateLimitLayer`]: Tower middleware that enforces the limit.
//! - [`Decision`]: The result of a rate limit check (Allowed/Denied).
//!
//! # Architecture
//!
//! - **Middleware**: `RateLimitLayer` wraps your service. It doesn't know *how* limiting works,
//!   only that it should ask a `RateLimiter` about a key extracted from the request.
//! - **Logic**: `TokenBucket` (in `bucket` module) handles the refill math.
//! - **State**: `TokenBucketLimiter` owns every bucket behind a single lock and evicts
//!   buckets idle for more than two windows.

use std::time::Duration;

pub mod bucket;
pub mod config;
pub mod headers;
pub mod limiter;
pub mod middleware;
pub mod registry;

pub use bucket::TokenBucket;
pub use config::{RateLimiterConfig, RateLimiterConfigBuilder};
pub use headers::RateLimitHeaders;
pub use limiter::TokenBucketLimiter;
pub use middleware::{RateLimitLayer, RateLimitService};
pub use registry::LimiterRegistry;

/// The decision returned by a rate limiter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// The request is allowed to proceed.
    Allowed {
        /// Whole tokens remaining after this acquisition.
        /// Useful for `X-RateLimit-Remaining` headers.
        remaining: u32,
    },
    /// The request is denied.
    Denied {
        /// How long until one token is available.
        /// Useful for `Retry-After` headers.
        retry_after: Duration,
    },
}

impl Decision {
    /// Helper to check if allowed.
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allowed { .. })
    }

    /// Remaining tokens; zero when denied.
    pub fn remaining(&self) -> u32 {
        match self {
            Decision::Allowed { remaining } => *remaining,
            Decision::Denied { .. } => 0,
        }
    }

    /// Wait hint; zero when allowed.
    pub fn retry_after(&self) -> Duration {
        match self {
            Decision::Allowed { .. } => Duration::ZERO,
            Decision::Denied { retry_after } => *retry_after,
        }
    }

    /// Flatten into `(allowed, remaining, retry_after)`.
    pub fn into_parts(self) -> (bool, u32, Duration) {
        (self.is_allowed(), self.remaining(), self.retry_after())
    }
}

/// Core interface for rate limiting logic.
///
/// Decouples the middleware from the limiter implementation. `allow` never
/// fails: configuration problems are rejected when the limiter is built.
pub trait RateLimiter: Send + Sync {
    /// Try to take one permit for `key`.
    fn allow(&self, key: &str) -> Decision;

    /// Maximum permits per window, reported as `X-RateLimit-Limit`.
    fn limit(&self) -> u32;
}

impl<L: RateLimiter + ?Sized> RateLimiter for std::sync::Arc<L> {
    fn allow(&self, key: &str) -> Decision {
        (**self).allow(key)
    }

    fn limit(&self) -> u32 {
        (**self).limit()
    }
}
